//! Data Factory linked services
//!
//! Wire model for `Microsoft.DataFactory/factories/{f}/linkedservices/{n}`
//! and the CosmosDB (MongoDB API) resource kind built on it.

use crate::arm::{ArmClient, is_masked_secret};
use crate::validate;
use async_trait::async_trait;
use reconflow_cloud::{
    Backend, BackendError, BackendObject, Comparison, FieldSpec, IdFormat, IdentityFields,
    PropertyMapper, PropertyRecord, ReconcileError, Reconciler, ResourceIdentity, Result, Schema,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2018-06-01";

/// `/subscriptions/{s}/resourceGroups/{rg}/providers/Microsoft.DataFactory/factories/{f}/linkedservices/{n}`
pub const LINKED_SERVICE_ID: IdFormat =
    IdFormat::new("Microsoft.DataFactory", "factories", "linkedservices");

pub const COSMOSDB_MONGOAPI_RESOURCE_TYPE: &str = "data_factory_linked_service_cosmosdb_mongoapi";
pub const COSMOSDB_MONGOAPI_KIND: &str = "CosmosDbMongoDbApi";

pub const FIELDS: IdentityFields = IdentityFields {
    name: "name",
    resource_group: "resource_group_name",
    parent_name: "data_factory_name",
    parent_id: "data_factory_id",
};

// ============ Wire Types ============

/// ARM envelope of a linked service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedServiceResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    pub properties: LinkedService,
}

impl LinkedServiceResource {
    pub fn new(properties: LinkedService) -> Self {
        Self {
            id: None,
            name: None,
            etag: None,
            properties,
        }
    }
}

impl BackendObject for LinkedServiceResource {
    fn kind(&self) -> &str {
        self.properties.kind()
    }

    fn reported_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Linked service properties, discriminated by the `type` tag
///
/// Only the CosmosDB MongoDB API shape is modelled; any other kind is kept
/// as raw JSON together with its tag.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkedService {
    CosmosDbMongoDbApi(CosmosDbMongoDbApiLinkedService),
    Other { kind: String, body: Map<String, Value> },
}

impl LinkedService {
    pub fn kind(&self) -> &str {
        match self {
            LinkedService::CosmosDbMongoDbApi(_) => COSMOSDB_MONGOAPI_KIND,
            LinkedService::Other { kind, .. } => kind,
        }
    }
}

impl Serialize for LinkedService {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut body = match self {
            LinkedService::CosmosDbMongoDbApi(service) => match serde_json::to_value(service) {
                Ok(Value::Object(map)) => map,
                Ok(_) => Map::new(),
                Err(e) => return Err(serde::ser::Error::custom(e)),
            },
            LinkedService::Other { body, .. } => body.clone(),
        };
        body.insert("type".to_string(), Value::String(self.kind().to_string()));
        body.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LinkedService {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut body = Map::<String, Value>::deserialize(deserializer)?;
        let kind = match body.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(D::Error::missing_field("type")),
        };

        if kind == COSMOSDB_MONGOAPI_KIND {
            let service = serde_json::from_value(Value::Object(body)).map_err(D::Error::custom)?;
            Ok(LinkedService::CosmosDbMongoDbApi(service))
        } else {
            Ok(LinkedService::Other { kind, body })
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmosDbMongoDbApiLinkedService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_via: Option<IntegrationRuntimeReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, ParameterSpecification>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<Value>>,

    #[serde(default)]
    pub type_properties: CosmosDbMongoDbApiTypeProperties,

    /// Unmodelled top-level properties, passed through as-is
    #[serde(flatten)]
    pub additional_properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmosDbMongoDbApiTypeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<SecureString>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_server_version_above32: Option<bool>,
}

/// Secret value; `Debug` never prints it
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SecureString {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl SecureString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            kind: "SecureString".to_string(),
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureString")
            .field("type", &self.kind)
            .field("value", &"(sensitive)")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRuntimeReference {
    pub reference_name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl IntegrationRuntimeReference {
    pub fn new(reference_name: impl Into<String>) -> Self {
        Self {
            reference_name: reference_name.into(),
            kind: "IntegrationRuntimeReference".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpecification {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl ParameterSpecification {
    pub fn string(default_value: impl Into<String>) -> Self {
        Self {
            kind: "String".to_string(),
            default_value: Some(Value::String(default_value.into())),
        }
    }
}

// ============ Mapper ============

/// Record shape of `data_factory_linked_service_cosmosdb_mongoapi`
pub struct CosmosDbMongoApiMapper {
    schema: Schema,
}

impl CosmosDbMongoApiMapper {
    pub fn new() -> Self {
        let schema = Schema::new()
            .field(
                FieldSpec::string("name")
                    .required()
                    .non_empty()
                    .validate_with(validate::linked_service_name),
            )
            .field(
                FieldSpec::string("data_factory_name")
                    .computed()
                    .non_empty()
                    .validate_with(validate::data_factory_name),
            )
            .field(FieldSpec::string("data_factory_id").computed().non_empty())
            .field(
                FieldSpec::string("resource_group_name")
                    .computed()
                    .compare(Comparison::CaseInsensitive),
            )
            .field(
                FieldSpec::string("connection_string")
                    .sensitive()
                    .non_empty()
                    .compare(Comparison::ConnectionString),
            )
            .field(FieldSpec::string("database").non_empty())
            .field(FieldSpec::bool("server_version_is_32_or_higher").default_value(false))
            .field(FieldSpec::string("description").non_empty())
            .field(FieldSpec::string("integration_runtime_name").non_empty())
            .field(FieldSpec::map("parameters"))
            .field(FieldSpec::list("annotations").compare(Comparison::Unordered))
            .field(FieldSpec::map("additional_properties").validate_keys_with(unmodelled_key))
            .exactly_one_of("data_factory_name", "data_factory_id");

        Self { schema }
    }
}

impl Default for CosmosDbMongoApiMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyMapper for CosmosDbMongoApiMapper {
    type Object = LinkedServiceResource;

    fn resource_type(&self) -> &'static str {
        COSMOSDB_MONGOAPI_RESOURCE_TYPE
    }

    fn kind(&self) -> &'static str {
        COSMOSDB_MONGOAPI_KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn id_format(&self) -> IdFormat {
        LINKED_SERVICE_ID
    }

    fn identity_fields(&self) -> IdentityFields {
        FIELDS
    }

    fn expand(&self, config: &PropertyRecord) -> Result<LinkedServiceResource> {
        let type_properties = CosmosDbMongoDbApiTypeProperties {
            connection_string: config.get_str("connection_string")?.map(SecureString::new),
            database: config.get_str("database")?.map(str::to_string),
            is_server_version_above32: config.get_bool("server_version_is_32_or_higher")?,
        };

        // empty collections are sent as unset
        let parameters = config
            .get_map("parameters")?
            .filter(|params| !params.is_empty())
            .map(|params| {
                params
                    .iter()
                    .map(|(k, v)| (k.clone(), ParameterSpecification::string(v.clone())))
                    .collect()
            });

        let annotations = config
            .get_list("annotations")?
            .filter(|items| !items.is_empty())
            .map(|items| items.iter().cloned().map(Value::String).collect());

        let mut additional_properties = BTreeMap::new();
        for (k, v) in config.get_map("additional_properties")?.into_iter().flatten() {
            unmodelled_key(k).map_err(|reason| {
                ReconcileError::invalid_config(format!(
                    "`additional_properties` key {:?} {}",
                    k, reason
                ))
            })?;
            additional_properties.insert(k.clone(), Value::String(v.clone()));
        }

        let service = CosmosDbMongoDbApiLinkedService {
            description: config.get_str("description")?.map(str::to_string),
            connect_via: config
                .get_str("integration_runtime_name")?
                .map(IntegrationRuntimeReference::new),
            parameters,
            annotations,
            type_properties,
            additional_properties,
        };

        Ok(LinkedServiceResource::new(LinkedService::CosmosDbMongoDbApi(
            service,
        )))
    }

    fn flatten(&self, object: &LinkedServiceResource) -> Result<PropertyRecord> {
        let service = match &object.properties {
            LinkedService::CosmosDbMongoDbApi(service) => service,
            other => {
                return Err(ReconcileError::type_mismatch(
                    COSMOSDB_MONGOAPI_KIND,
                    other.kind(),
                ));
            }
        };

        let mut record = PropertyRecord::new();
        record.insert_opt("description", service.description.clone());
        record.insert_opt(
            "integration_runtime_name",
            service
                .connect_via
                .as_ref()
                .map(|r| r.reference_name.clone()),
        );

        if let Some(parameters) = service.parameters.as_ref().filter(|p| !p.is_empty()) {
            let flattened: BTreeMap<String, String> = parameters
                .iter()
                .map(|(k, spec)| {
                    let value = spec.default_value.as_ref().map(value_to_string);
                    (k.clone(), value.unwrap_or_default())
                })
                .collect();
            record.insert("parameters", flattened);
        }

        if let Some(annotations) = service.annotations.as_ref().filter(|a| !a.is_empty()) {
            let flattened: Vec<String> = annotations.iter().map(value_to_string).collect();
            record.insert("annotations", flattened);
        }

        if !service.additional_properties.is_empty() {
            let flattened: BTreeMap<String, String> = service
                .additional_properties
                .iter()
                .map(|(k, v)| (k.clone(), value_to_string(v)))
                .collect();
            record.insert("additional_properties", flattened);
        }

        let props = &service.type_properties;
        if let Some(secret) = &props.connection_string {
            if !is_masked_secret(&secret.value) {
                record.insert("connection_string", secret.value.clone());
            }
        }
        record.insert_opt("database", props.database.clone());
        record.insert_opt(
            "server_version_is_32_or_higher",
            props.is_server_version_above32,
        );

        Ok(record)
    }
}

/// Top-level keys of the linked service object that fields already model
const MODELLED_KEYS: [&str; 6] = [
    "type",
    "description",
    "connectVia",
    "parameters",
    "annotations",
    "typeProperties",
];

/// Additional properties share the object with modelled ones and must not
/// shadow them
fn unmodelled_key(key: &str) -> std::result::Result<(), String> {
    if MODELLED_KEYS.contains(&key) {
        Err(format!("collides with the modelled property {:?}", key))
    } else {
        Ok(())
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============ Backend ============

/// Linked service CRUD against ARM
#[derive(Clone)]
pub struct LinkedServiceBackend {
    client: ArmClient,
}

impl LinkedServiceBackend {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Backend for LinkedServiceBackend {
    type Object = LinkedServiceResource;

    async fn get(&self, id: &ResourceIdentity) -> std::result::Result<Self::Object, BackendError> {
        Ok(self.client.get_json(&id.to_string(), API_VERSION).await?)
    }

    async fn create_or_update(
        &self,
        id: &ResourceIdentity,
        object: Self::Object,
    ) -> std::result::Result<(), BackendError> {
        tracing::info!("Writing linked service {} in factory {}", id.name, id.parent_name);
        Ok(self
            .client
            .put_json(&id.to_string(), API_VERSION, &object)
            .await?)
    }

    async fn delete(&self, id: &ResourceIdentity) -> std::result::Result<(), BackendError> {
        tracing::info!("Deleting linked service {} in factory {}", id.name, id.parent_name);
        Ok(self.client.delete(&id.to_string(), API_VERSION).await?)
    }
}

/// Reconciler for `data_factory_linked_service_cosmosdb_mongoapi`
pub fn cosmosdb_mongoapi_reconciler(
    client: ArmClient,
    subscription_id: impl Into<String>,
) -> Reconciler<CosmosDbMongoApiMapper, LinkedServiceBackend> {
    Reconciler::new(
        CosmosDbMongoApiMapper::new(),
        LinkedServiceBackend::new(client),
        subscription_id,
    )
}
