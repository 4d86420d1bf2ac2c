use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - ./.reconflow/config.yaml\n\
        - ~/.config/reconflow/config.yaml\n\
        または RECONFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ConfigFileNotFound,

    #[error("必須の設定がありません: {field} (環境変数 {env_var} でも指定できます)")]
    MissingSetting {
        field: &'static str,
        env_var: &'static str,
    },

    #[error("設定ファイルの解析に失敗しました ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
