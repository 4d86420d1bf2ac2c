//! Resource files and the resource kinds the CLI knows about

use reconflow_cloud::{
    IdentityResolver, PropertyMapper, PropertyRecord, ResourceIdentity, Schema,
};
use reconflow_cloud_azure::{CosmosDbMongoApiMapper, StorageContainerMapper};
use serde::Deserialize;
use std::path::Path;

/// リソース種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
pub enum ResourceKind {
    #[value(name = "data_factory_linked_service_cosmosdb_mongoapi")]
    #[serde(rename = "data_factory_linked_service_cosmosdb_mongoapi")]
    CosmosDbMongoApi,
    #[value(name = "iothub_endpoint_storage_container")]
    #[serde(rename = "iothub_endpoint_storage_container")]
    IotHubStorageContainer,
}

impl ResourceKind {
    pub fn resource_type(&self) -> &'static str {
        match self {
            ResourceKind::CosmosDbMongoApi => CosmosDbMongoApiMapper::new().resource_type(),
            ResourceKind::IotHubStorageContainer => StorageContainerMapper::new().resource_type(),
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            ResourceKind::CosmosDbMongoApi => CosmosDbMongoApiMapper::new().schema().clone(),
            ResourceKind::IotHubStorageContainer => StorageContainerMapper::new().schema().clone(),
        }
    }

    /// Resolver for offline work (validation, id parsing)
    pub fn resolver(&self, subscription_id: &str) -> IdentityResolver {
        match self {
            ResourceKind::CosmosDbMongoApi => {
                let mapper = CosmosDbMongoApiMapper::new();
                IdentityResolver::new(mapper.id_format(), mapper.identity_fields(), subscription_id)
            }
            ResourceKind::IotHubStorageContainer => {
                let mapper = StorageContainerMapper::new();
                IdentityResolver::new(mapper.id_format(), mapper.identity_fields(), subscription_id)
            }
        }
    }
}

/// A YAML resource file
///
/// ```yaml
/// kind: iothub_endpoint_storage_container
/// address: telemetry-archive
/// properties:
///   name: acctest
///   resource_group_name: acctestRG
///   iothub_name: acctestIoTHub
///   container_name: acctestcont
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceFile {
    pub kind: ResourceKind,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub properties: PropertyRecord,
}

impl ResourceFile {
    /// Load a resource file; the address defaults to the file stem
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("リソースファイルを読み込めません ({}): {}", path.display(), e)
        })?;
        let mut file: ResourceFile = serde_yaml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("リソースファイルの解析に失敗しました ({}): {}", path.display(), e)
        })?;

        if file.address.is_none() {
            file.address = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string);
        }
        Ok(file)
    }

    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(self.kind.resource_type())
    }

    /// Properties with schema defaults filled in, validated
    pub fn desired(&self) -> anyhow::Result<PropertyRecord> {
        let schema = self.kind.schema();
        let record = schema.apply_defaults(&self.properties);
        schema.validate(&record)?;
        Ok(record)
    }

    /// Validated properties and the identity they address
    pub fn resolve(&self, subscription_id: &str) -> anyhow::Result<(PropertyRecord, ResourceIdentity)> {
        let record = self.desired()?;
        let identity = self.kind.resolver(subscription_id).resolve_for_write(&record)?;
        Ok((record, identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ENDPOINT: &str = r#"
kind: iothub_endpoint_storage_container
properties:
  name: acctest
  resource_group_name: acctestRG
  iothub_name: acctestIoTHub
  connection_string: DefaultEndpointsProtocol=https;AccountName=acc;AccountKey=key
  container_name: acctestcont
  batch_frequency_in_seconds: 60
"#;

    #[test]
    fn test_load_defaults_address_to_file_stem() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("archive.yaml");
        fs::write(&path, ENDPOINT).unwrap();

        let file = ResourceFile::load(&path).unwrap();
        assert_eq!(file.kind, ResourceKind::IotHubStorageContainer);
        assert_eq!(file.address(), "archive");
        assert_eq!(
            file.properties.get_int("batch_frequency_in_seconds").unwrap(),
            Some(60)
        );
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("archive.yaml");
        fs::write(&path, ENDPOINT).unwrap();

        let file = ResourceFile::load(&path).unwrap();
        let (record, identity) = file.resolve("sub").unwrap();
        assert_eq!(record.get_str("encoding").unwrap(), Some("Avro"));
        assert_eq!(
            identity.to_string(),
            "/subscriptions/sub/resourceGroups/acctestRG/providers/Microsoft.Devices/IotHubs/acctestIoTHub/Endpoints/acctest"
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("x.yaml");
        fs::write(&path, "kind: storage_account\nproperties: {}\n").unwrap();
        assert!(ResourceFile::load(&path).is_err());
    }
}
