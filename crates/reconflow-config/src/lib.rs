//! reconflow settings
//!
//! Locates and loads the settings file and applies `ARM_*` environment
//! overrides on top of it.

pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{Settings, TimeoutSettings};

use std::path::PathBuf;

/// 設定ファイル名
pub const CONFIG_FILE: &str = "config.yaml";

/// グローバル設定ファイルのパス (~/.config/reconflow/config.yaml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reconflow").join(CONFIG_FILE))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 RECONFLOW_CONFIG_PATH (直接パス指定)
/// 2. ./.reconflow/config.yaml
/// 3. ~/.config/reconflow/config.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("RECONFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    // 2. ./.reconflow/ ディレクトリ
    let local = std::env::current_dir()?.join(".reconflow").join(CONFIG_FILE);
    if local.exists() {
        return Ok(local);
    }

    // 3. グローバル設定ファイル
    if let Some(global) = global_config_path() {
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_config_file_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let dir = temp_dir.path().join(".reconflow");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("config.yaml"), "subscription_id: s").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("RECONFLOW_CONFIG_PATH", find_config_file);
        assert!(result.unwrap().ends_with(".reconflow/config.yaml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "subscription_id: s").unwrap();

        let result = temp_env::with_var(
            "RECONFLOW_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            find_config_file,
        );
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_find_config_file_global() {
        let temp_dir = tempfile::tempdir().unwrap();
        let xdg = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let global = xdg.path().join("reconflow");
        fs::create_dir(&global).unwrap();
        fs::write(global.join("config.yaml"), "subscription_id: s").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_vars(
            [
                ("RECONFLOW_CONFIG_PATH", None),
                ("XDG_CONFIG_HOME", Some(xdg.path().to_str().unwrap())),
            ],
            find_config_file,
        );
        assert_eq!(result.unwrap(), global.join("config.yaml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let xdg = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        // 空のディレクトリに移動
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_vars(
            [
                ("RECONFLOW_CONFIG_PATH", None),
                ("XDG_CONFIG_HOME", Some(xdg.path().to_str().unwrap())),
            ],
            find_config_file,
        );
        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));

        std::env::set_current_dir(original_dir).unwrap();
    }
}
