//! Per-invocation context: settings, handle store and ARM client

use reconflow_cloud::{HandleStore, Timeouts};
use reconflow_cloud_azure::{ArmClient, ArmConfig};
use reconflow_config::Settings;
use std::path::{Path, PathBuf};

/// Placeholder subscription used for offline identity resolution
pub const OFFLINE_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

pub struct Context {
    pub settings: Settings,
    pub project_root: PathBuf,
    pub store: HandleStore,
}

impl Context {
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let settings = match config_path {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };
        let project_root = std::env::current_dir()?;
        let store = HandleStore::new(&project_root);

        Ok(Self {
            settings,
            project_root,
            store,
        })
    }

    pub fn subscription_id(&self) -> anyhow::Result<&str> {
        Ok(self.settings.subscription_id()?)
    }

    /// Subscription for commands that never talk to ARM
    pub fn offline_subscription_id(&self) -> &str {
        self.settings
            .subscription_id
            .as_deref()
            .unwrap_or(OFFLINE_SUBSCRIPTION)
    }

    pub fn timeouts(&self) -> Timeouts {
        self.settings.timeouts()
    }

    pub fn client(&self) -> anyhow::Result<ArmClient> {
        let mut config = ArmConfig::new(self.subscription_id()?, self.settings.access_token()?);
        if let Some(endpoint) = &self.settings.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        tracing::debug!("ARM endpoint: {}", config.endpoint);
        Ok(ArmClient::new(&config))
    }
}
