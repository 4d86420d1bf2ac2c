//! Azure backends for reconflow
//!
//! This crate plugs Azure Resource Manager into the generic reconciler of
//! `reconflow-cloud`.
//!
//! # Resource kinds
//!
//! - `data_factory_linked_service_cosmosdb_mongoapi`: Data Factory linked
//!   service for CosmosDB's MongoDB API
//! - `iothub_endpoint_storage_container`: IoT Hub routing endpoint writing
//!   to a storage container
//!
//! # Requirements
//!
//! - `ARM_SUBSCRIPTION_ID` and `ARM_ACCESS_TOKEN` env vars (or a reconflow
//!   settings file); `ARM_ENDPOINT` for non-public clouds
//!
//! # Example
//!
//! ```ignore
//! use reconflow_cloud::WriteMode;
//! use reconflow_cloud_azure::{ArmClient, ArmConfig, datafactory};
//!
//! let config = ArmConfig::from_env()?;
//! let client = ArmClient::new(&config);
//! let reconciler = datafactory::cosmosdb_mongoapi_reconciler(client, &config.subscription_id);
//!
//! let id = reconciler.apply(WriteMode::Create, &record).await?;
//! let live = reconciler.read(&id).await?;
//! ```

pub mod arm;
pub mod datafactory;
pub mod error;
pub mod iothub;
pub mod validate;

pub use arm::{ArmClient, ArmConfig, DEFAULT_ENDPOINT};
pub use datafactory::{CosmosDbMongoApiMapper, LinkedServiceBackend, LinkedServiceResource};
pub use error::{AzureError, Result};
pub use iothub::{IotHubEndpointBackend, RoutingEndpoint, StorageContainerMapper};
