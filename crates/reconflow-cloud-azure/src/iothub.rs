//! IoT Hub routing endpoints
//!
//! Endpoints are not ARM resources of their own. They live in the hub
//! document under `properties.routing.endpoints`, so every write is a
//! read-modify-write of the whole hub. Endpoint names are unique per hub
//! across all endpoint kinds and are matched case-insensitively.

use crate::arm::{ArmClient, is_masked_secret};
use crate::validate;
use async_trait::async_trait;
use reconflow_cloud::{
    Backend, BackendError, BackendObject, Comparison, FieldSpec, IdFormat, IdentityFields,
    PropertyMapper, PropertyRecord, ReconcileError, Reconciler, ResourceIdentity, Result, Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2021-07-02";

/// `/subscriptions/{s}/resourceGroups/{rg}/providers/Microsoft.Devices/IotHubs/{hub}/Endpoints/{n}`
pub const ENDPOINT_ID: IdFormat = IdFormat::new("Microsoft.Devices", "IotHubs", "Endpoints");

pub const STORAGE_CONTAINER_RESOURCE_TYPE: &str = "iothub_endpoint_storage_container";
pub const STORAGE_CONTAINER_KIND: &str = "StorageContainer";

pub const DEFAULT_FILE_NAME_FORMAT: &str = "{iothub}/{partition}/{YYYY}/{MM}/{DD}/{HH}/{mm}";
pub const DEFAULT_BATCH_FREQUENCY_IN_SECONDS: i64 = 300;
pub const DEFAULT_MAX_CHUNK_SIZE_IN_BYTES: i64 = 314_572_800;
pub const DEFAULT_ENCODING: &str = "Avro";
pub const ENCODINGS: &[&str] = &["Avro", "AvroDeflate", "JSON"];

pub const FIELDS: IdentityFields = IdentityFields {
    name: "name",
    resource_group: "resource_group_name",
    parent_name: "iothub_name",
    parent_id: "iothub_id",
};

// ============ Wire Types ============

/// Which list of the hub's routing endpoints an endpoint lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    StorageContainer,
    ServiceBusQueue,
    ServiceBusTopic,
    EventHub,
}

impl EndpointKind {
    pub const ALL: [EndpointKind; 4] = [
        EndpointKind::StorageContainer,
        EndpointKind::ServiceBusQueue,
        EndpointKind::ServiceBusTopic,
        EndpointKind::EventHub,
    ];

    /// Key of the list under `properties.routing.endpoints`
    pub fn list_key(&self) -> &'static str {
        match self {
            EndpointKind::StorageContainer => "storageContainers",
            EndpointKind::ServiceBusQueue => "serviceBusQueues",
            EndpointKind::ServiceBusTopic => "serviceBusTopics",
            EndpointKind::EventHub => "eventHubs",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            EndpointKind::StorageContainer => STORAGE_CONTAINER_KIND,
            EndpointKind::ServiceBusQueue => "ServiceBusQueue",
            EndpointKind::ServiceBusTopic => "ServiceBusTopic",
            EndpointKind::EventHub => "EventHub",
        }
    }
}

/// One routing endpoint of a hub
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingEndpoint {
    StorageContainer(StorageContainerEndpoint),
    /// Any other endpoint kind, kept as raw JSON
    Other { kind: EndpointKind, body: Value },
}

impl RoutingEndpoint {
    pub fn endpoint_kind(&self) -> EndpointKind {
        match self {
            RoutingEndpoint::StorageContainer(_) => EndpointKind::StorageContainer,
            RoutingEndpoint::Other { kind, .. } => *kind,
        }
    }

    fn to_value(&self) -> std::result::Result<Value, BackendError> {
        match self {
            RoutingEndpoint::StorageContainer(endpoint) => {
                serde_json::to_value(endpoint).map_err(|e| BackendError::Decode(e.to_string()))
            }
            RoutingEndpoint::Other { body, .. } => Ok(body.clone()),
        }
    }
}

impl BackendObject for RoutingEndpoint {
    fn kind(&self) -> &str {
        self.endpoint_kind().tag()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageContainerEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    #[serde(default)]
    pub container_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name_format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_frequency_in_seconds: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_size_in_bytes: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    /// Fields this crate does not manage (endpointUri, authenticationType, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ============ Hub document ============

fn endpoint_name(endpoint: &Value) -> Option<&str> {
    endpoint.get("name").and_then(Value::as_str)
}

fn endpoint_list<'a>(hub: &'a Value, kind: EndpointKind) -> &'a [Value] {
    hub.pointer(&format!("/properties/routing/endpoints/{}", kind.list_key()))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn endpoints_mut(hub: &mut Value) -> std::result::Result<&mut Map<String, Value>, BackendError> {
    let mut cursor = hub;
    for key in ["properties", "routing", "endpoints"] {
        let object = cursor.as_object_mut().ok_or_else(|| {
            BackendError::Decode(format!("IoT Hub document: parent of `{}` is not an object", key))
        })?;
        cursor = object
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
    }
    cursor
        .as_object_mut()
        .ok_or_else(|| BackendError::Decode("IoT Hub document: `endpoints` is not an object".into()))
}

/// Find an endpoint of any kind by name, ignoring case
pub fn find_endpoint(
    hub: &Value,
    name: &str,
) -> std::result::Result<Option<RoutingEndpoint>, BackendError> {
    for kind in EndpointKind::ALL {
        let found = endpoint_list(hub, kind)
            .iter()
            .find(|e| endpoint_name(e).is_some_and(|n| n.eq_ignore_ascii_case(name)));

        if let Some(body) = found {
            let endpoint = match kind {
                EndpointKind::StorageContainer => RoutingEndpoint::StorageContainer(
                    serde_json::from_value(body.clone())
                        .map_err(|e| BackendError::Decode(e.to_string()))?,
                ),
                _ => RoutingEndpoint::Other {
                    kind,
                    body: body.clone(),
                },
            };
            return Ok(Some(endpoint));
        }
    }
    Ok(None)
}

/// Replace the same-named endpoint in the endpoint's own list, or append it.
///
/// Fails with [`BackendError::Conflict`] when an endpoint of another kind
/// already holds the name.
pub fn upsert_endpoint(
    hub: &mut Value,
    endpoint: &RoutingEndpoint,
) -> std::result::Result<(), BackendError> {
    let value = endpoint.to_value()?;
    let name = endpoint_name(&value)
        .ok_or_else(|| BackendError::Decode("endpoint has no name".into()))?
        .to_string();

    let own_kind = endpoint.endpoint_kind();
    for kind in EndpointKind::ALL.into_iter().filter(|k| *k != own_kind) {
        if let Some(taken) = endpoint_list(hub, kind)
            .iter()
            .filter_map(endpoint_name)
            .find(|n| n.eq_ignore_ascii_case(&name))
        {
            return Err(BackendError::Conflict(format!(
                "endpoint name {:?} is already used by {} endpoint {:?}",
                name,
                kind.tag(),
                taken
            )));
        }
    }

    let endpoints = endpoints_mut(hub)?;
    let list = endpoints
        .entry(endpoint.endpoint_kind().list_key())
        .or_insert_with(|| Value::Array(Vec::new()));
    if list.is_null() {
        *list = Value::Array(Vec::new());
    }
    let list = list.as_array_mut().ok_or_else(|| {
        BackendError::Decode(format!(
            "IoT Hub document: `{}` is not a list",
            endpoint.endpoint_kind().list_key()
        ))
    })?;

    match list
        .iter_mut()
        .find(|e| endpoint_name(e).is_some_and(|n| n.eq_ignore_ascii_case(&name)))
    {
        Some(existing) => *existing = value,
        None => list.push(value),
    }
    Ok(())
}

/// Remove a storage container endpoint by name. Returns whether one was removed.
pub fn remove_endpoint(hub: &mut Value, name: &str) -> bool {
    let key = EndpointKind::StorageContainer.list_key();
    let Some(list) = hub
        .pointer_mut(&format!("/properties/routing/endpoints/{}", key))
        .and_then(Value::as_array_mut)
    else {
        return false;
    };

    let before = list.len();
    list.retain(|e| !endpoint_name(e).is_some_and(|n| n.eq_ignore_ascii_case(name)));
    list.len() != before
}

// ============ Mapper ============

/// Record shape of `iothub_endpoint_storage_container`
pub struct StorageContainerMapper {
    schema: Schema,
}

impl StorageContainerMapper {
    pub fn new() -> Self {
        let schema = Schema::new()
            .field(
                FieldSpec::string("name")
                    .required()
                    .non_empty()
                    .validate_with(validate::iothub_endpoint_name),
            )
            .field(
                FieldSpec::string("iothub_name")
                    .computed()
                    .non_empty()
                    .validate_with(validate::iothub_name),
            )
            .field(FieldSpec::string("iothub_id").computed().non_empty())
            .field(
                FieldSpec::string("resource_group_name")
                    .computed()
                    .compare(Comparison::CaseInsensitive),
            )
            .field(
                FieldSpec::string("connection_string")
                    .required()
                    .sensitive()
                    .non_empty()
                    .compare(Comparison::ConnectionString),
            )
            .field(FieldSpec::string("container_name").required().non_empty())
            .field(
                FieldSpec::string("file_name_format")
                    .non_empty()
                    .default_value(DEFAULT_FILE_NAME_FORMAT),
            )
            .field(
                FieldSpec::int("batch_frequency_in_seconds")
                    .default_value(DEFAULT_BATCH_FREQUENCY_IN_SECONDS),
            )
            .field(
                FieldSpec::int("max_chunk_size_in_bytes")
                    .default_value(DEFAULT_MAX_CHUNK_SIZE_IN_BYTES),
            )
            .field(
                FieldSpec::string("encoding")
                    .default_value(DEFAULT_ENCODING)
                    .one_of(ENCODINGS)
                    .compare(Comparison::CaseInsensitive),
            )
            .exactly_one_of("iothub_name", "iothub_id");

        Self { schema }
    }
}

impl Default for StorageContainerMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyMapper for StorageContainerMapper {
    type Object = RoutingEndpoint;

    fn resource_type(&self) -> &'static str {
        STORAGE_CONTAINER_RESOURCE_TYPE
    }

    fn kind(&self) -> &'static str {
        STORAGE_CONTAINER_KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn id_format(&self) -> IdFormat {
        ENDPOINT_ID
    }

    fn identity_fields(&self) -> IdentityFields {
        FIELDS
    }

    fn expand(&self, config: &PropertyRecord) -> Result<RoutingEndpoint> {
        Ok(RoutingEndpoint::StorageContainer(StorageContainerEndpoint {
            name: config.get_str("name")?.unwrap_or_default().to_string(),
            connection_string: config.get_str("connection_string")?.map(str::to_string),
            container_name: config.require_str("container_name")?.to_string(),
            file_name_format: config.get_str("file_name_format")?.map(str::to_string),
            batch_frequency_in_seconds: config.get_int("batch_frequency_in_seconds")?,
            max_chunk_size_in_bytes: config.get_int("max_chunk_size_in_bytes")?,
            encoding: config.get_str("encoding")?.map(str::to_string),
            ..Default::default()
        }))
    }

    fn flatten(&self, object: &RoutingEndpoint) -> Result<PropertyRecord> {
        let RoutingEndpoint::StorageContainer(endpoint) = object else {
            return Err(ReconcileError::type_mismatch(
                STORAGE_CONTAINER_KIND,
                object.kind(),
            ));
        };

        let mut record = PropertyRecord::new();
        if let Some(connection_string) = &endpoint.connection_string {
            if !is_masked_secret(connection_string) {
                record.insert("connection_string", connection_string.clone());
            }
        }
        record.insert("container_name", endpoint.container_name.clone());
        record.insert_opt("file_name_format", endpoint.file_name_format.clone());
        record.insert_opt(
            "batch_frequency_in_seconds",
            endpoint.batch_frequency_in_seconds,
        );
        record.insert_opt("max_chunk_size_in_bytes", endpoint.max_chunk_size_in_bytes);
        record.insert_opt("encoding", endpoint.encoding.clone());
        Ok(record)
    }
}

// ============ Backend ============

/// Endpoint CRUD by read-modify-write of the parent hub
///
/// Concurrent writers to the same hub are not coordinated; the last PUT wins.
#[derive(Clone)]
pub struct IotHubEndpointBackend {
    client: ArmClient,
}

impl IotHubEndpointBackend {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    async fn get_hub(&self, id: &ResourceIdentity) -> std::result::Result<Value, BackendError> {
        Ok(self
            .client
            .get_json(&id.parent().to_string(), API_VERSION)
            .await?)
    }

    async fn put_hub(
        &self,
        id: &ResourceIdentity,
        hub: &Value,
    ) -> std::result::Result<(), BackendError> {
        Ok(self
            .client
            .put_json(&id.parent().to_string(), API_VERSION, hub)
            .await?)
    }
}

#[async_trait]
impl Backend for IotHubEndpointBackend {
    type Object = RoutingEndpoint;

    async fn get(&self, id: &ResourceIdentity) -> std::result::Result<Self::Object, BackendError> {
        let hub = self.get_hub(id).await?;
        find_endpoint(&hub, &id.name)?.ok_or(BackendError::NotFound)
    }

    async fn create_or_update(
        &self,
        id: &ResourceIdentity,
        object: Self::Object,
    ) -> std::result::Result<(), BackendError> {
        let mut hub = self.get_hub(id).await?;

        let object = match object {
            RoutingEndpoint::StorageContainer(mut endpoint) => {
                endpoint.name = id.name.clone();
                endpoint.resource_group = Some(id.resource_group.clone());
                endpoint.subscription_id = Some(id.subscription_id.clone());
                RoutingEndpoint::StorageContainer(endpoint)
            }
            other => other,
        };
        upsert_endpoint(&mut hub, &object)?;

        tracing::info!("Writing endpoint {} on IoT Hub {}", id.name, id.parent_name);
        self.put_hub(id, &hub).await
    }

    async fn delete(&self, id: &ResourceIdentity) -> std::result::Result<(), BackendError> {
        let mut hub = self.get_hub(id).await?;
        if !remove_endpoint(&mut hub, &id.name) {
            return Err(BackendError::NotFound);
        }

        tracing::info!("Removing endpoint {} from IoT Hub {}", id.name, id.parent_name);
        self.put_hub(id, &hub).await
    }
}

/// Reconciler for `iothub_endpoint_storage_container`
pub fn storage_container_reconciler(
    client: ArmClient,
    subscription_id: impl Into<String>,
) -> Reconciler<StorageContainerMapper, IotHubEndpointBackend> {
    Reconciler::new(
        StorageContainerMapper::new(),
        IotHubEndpointBackend::new(client),
        subscription_id,
    )
}
