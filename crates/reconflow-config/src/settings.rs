//! Settings file model

use crate::error::{ConfigError, Result};
use reconflow_cloud::Timeouts;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Contents of `config.yaml`
///
/// ```yaml
/// subscription_id: 00000000-0000-0000-0000-000000000000
/// endpoint: https://management.azure.com
/// timeouts:
///   read: 120
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub subscription_id: Option<String>,
    pub access_token: Option<String>,
    pub endpoint: Option<String>,
    pub timeouts: TimeoutSettings,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("subscription_id", &self.subscription_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "(sensitive)"))
            .field("endpoint", &self.endpoint)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Per-operation deadlines in seconds; unset ones keep their defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub create: Option<u64>,
    pub read: Option<u64>,
    pub update: Option<u64>,
    pub delete: Option<u64>,
}

impl TimeoutSettings {
    pub fn to_timeouts(&self) -> Timeouts {
        let defaults = Timeouts::default();
        let pick = |secs: Option<u64>, default: Duration| secs.map(Duration::from_secs).unwrap_or(default);
        Timeouts {
            create: pick(self.create, defaults.create),
            read: pick(self.read, defaults.read),
            update: pick(self.update, defaults.update),
            delete: pick(self.delete, defaults.delete),
        }
    }
}

impl Settings {
    /// Parse a settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Discover the settings file and apply environment overrides.
    /// A missing file is not an error; everything can come from the environment.
    pub fn load() -> Result<Self> {
        let mut settings = match crate::find_config_file() {
            Ok(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_file(&path)?
            }
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::debug!("No settings file found, using environment only");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Load an explicit file (no discovery) and apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// `ARM_SUBSCRIPTION_ID`, `ARM_ACCESS_TOKEN` and `ARM_ENDPOINT` win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_value("ARM_SUBSCRIPTION_ID") {
            self.subscription_id = Some(v);
        }
        if let Some(v) = env_value("ARM_ACCESS_TOKEN") {
            self.access_token = Some(v);
        }
        if let Some(v) = env_value("ARM_ENDPOINT") {
            self.endpoint = Some(v);
        }
    }

    pub fn subscription_id(&self) -> Result<&str> {
        self.subscription_id
            .as_deref()
            .ok_or(ConfigError::MissingSetting {
                field: "subscription_id",
                env_var: "ARM_SUBSCRIPTION_ID",
            })
    }

    pub fn access_token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or(ConfigError::MissingSetting {
                field: "access_token",
                env_var: "ARM_ACCESS_TOKEN",
            })
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts.to_timeouts()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const ARM_VARS: [(&str, Option<&str>); 3] = [
        ("ARM_SUBSCRIPTION_ID", None),
        ("ARM_ACCESS_TOKEN", None),
        ("ARM_ENDPOINT", None),
    ];

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(
            &path,
            "subscription_id: sub-file\nendpoint: https://arm.example\ntimeouts:\n  read: 60\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.subscription_id.as_deref(), Some("sub-file"));
        assert_eq!(settings.endpoint.as_deref(), Some("https://arm.example"));

        let timeouts = settings.timeouts();
        assert_eq!(timeouts.read, Duration::from_secs(60));
        assert_eq!(timeouts.create, Timeouts::default().create);
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "timeouts: [1, 2").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "subscription_id: sub-file\naccess_token: file-token\n").unwrap();

        let settings = temp_env::with_vars(
            [
                ("ARM_SUBSCRIPTION_ID", Some("sub-env")),
                ("ARM_ACCESS_TOKEN", Some("")),
                ("ARM_ENDPOINT", None),
            ],
            || Settings::load_from(&path).unwrap(),
        );

        assert_eq!(settings.subscription_id().unwrap(), "sub-env");
        // empty values do not override
        assert_eq!(settings.access_token().unwrap(), "file-token");
        assert!(settings.endpoint.is_none());
    }

    #[test]
    #[serial]
    fn test_load_without_file_uses_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("nope.yaml");
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let settings = temp_env::with_vars(
            [
                ("RECONFLOW_CONFIG_PATH", Some(missing.to_str().unwrap())),
                ("XDG_CONFIG_HOME", Some(temp_dir.path().to_str().unwrap())),
                ("ARM_SUBSCRIPTION_ID", Some("sub-env")),
                ("ARM_ACCESS_TOKEN", None),
                ("ARM_ENDPOINT", None),
            ],
            || Settings::load().unwrap(),
        );

        std::env::set_current_dir(original_dir).unwrap();

        assert_eq!(settings.subscription_id().unwrap(), "sub-env");
        assert!(matches!(
            settings.access_token(),
            Err(ConfigError::MissingSetting { env_var: "ARM_ACCESS_TOKEN", .. })
        ));
    }

    #[test]
    #[serial]
    fn test_defaults_without_anything() {
        let settings = temp_env::with_vars(ARM_VARS, || {
            let mut settings = Settings::default();
            settings.apply_env_overrides();
            settings
        });
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeouts(), Timeouts::default());
    }

    #[test]
    fn test_debug_hides_token() {
        let settings = Settings {
            access_token: Some("super-secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", settings).contains("super-secret"));
    }
}
