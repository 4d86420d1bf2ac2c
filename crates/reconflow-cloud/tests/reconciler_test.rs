use reconflow_cloud::{
    ActionType, BackendError, BackendObject, Comparison, FieldSpec, IdFormat, IdentityFields,
    MemoryBackend, Operation, PropertyMapper, PropertyRecord, ReadOutcome, ReconcileError,
    Reconciler, ResourceIdentity, Result, Schema, Timeouts, WriteMode,
};
use std::sync::Arc;
use std::time::Duration;

const FORMAT: IdFormat = IdFormat::new("Example.Widgets", "workshops", "widgets");

#[derive(Debug, Clone, PartialEq)]
enum Widget {
    Gadget {
        id: Option<String>,
        size: Option<i64>,
        label: Option<String>,
        secret: Option<String>,
        tags: Option<Vec<String>>,
    },
    Gizmo,
}

impl BackendObject for Widget {
    fn kind(&self) -> &str {
        match self {
            Widget::Gadget { .. } => "Gadget",
            Widget::Gizmo => "Gizmo",
        }
    }

    fn reported_id(&self) -> Option<&str> {
        match self {
            Widget::Gadget { id, .. } => id.as_deref(),
            Widget::Gizmo => None,
        }
    }
}

struct GadgetMapper {
    schema: Schema,
}

impl GadgetMapper {
    fn new() -> Self {
        Self {
            schema: Schema::new()
                .field(FieldSpec::string("name").required())
                .field(FieldSpec::string("resource_group_name").computed())
                .field(FieldSpec::string("workshop_name").computed())
                .field(FieldSpec::string("workshop_id").computed())
                .field(FieldSpec::int("size"))
                .field(FieldSpec::string("label"))
                .field(FieldSpec::string("secret").sensitive())
                .field(FieldSpec::list("tags").compare(Comparison::Unordered))
                .exactly_one_of("workshop_name", "workshop_id"),
        }
    }
}

impl PropertyMapper for GadgetMapper {
    type Object = Widget;

    fn resource_type(&self) -> &'static str {
        "example_gadget"
    }

    fn kind(&self) -> &'static str {
        "Gadget"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn id_format(&self) -> IdFormat {
        FORMAT
    }

    fn identity_fields(&self) -> IdentityFields {
        IdentityFields {
            name: "name",
            resource_group: "resource_group_name",
            parent_name: "workshop_name",
            parent_id: "workshop_id",
        }
    }

    fn expand(&self, config: &PropertyRecord) -> Result<Widget> {
        Ok(Widget::Gadget {
            id: None,
            size: config.get_int("size")?,
            label: config.get_str("label")?.map(str::to_string),
            secret: config.get_str("secret")?.map(str::to_string),
            tags: config.get_list("tags")?.map(|t| t.to_vec()),
        })
    }

    fn flatten(&self, object: &Widget) -> Result<PropertyRecord> {
        let Widget::Gadget {
            size,
            label,
            secret,
            tags,
            ..
        } = object
        else {
            return Err(ReconcileError::type_mismatch("Gadget", object.kind()));
        };

        let mut record = PropertyRecord::new();
        record.insert_opt("size", *size);
        record.insert_opt("label", label.clone());
        record.insert_opt("secret", secret.clone());
        record.insert_opt("tags", tags.clone());
        Ok(record)
    }
}

type TestReconciler = Reconciler<GadgetMapper, Arc<MemoryBackend<Widget>>>;

fn setup() -> (TestReconciler, Arc<MemoryBackend<Widget>>) {
    let backend = Arc::new(MemoryBackend::new());
    let reconciler = Reconciler::new(GadgetMapper::new(), backend.clone(), "sub-1");
    (reconciler, backend)
}

fn config() -> PropertyRecord {
    PropertyRecord::new()
        .with("name", "gadget1")
        .with("resource_group_name", "MyGroup")
        .with("workshop_name", "shop1")
        .with("size", 3)
        .with("label", "blue")
}

fn identity() -> ResourceIdentity {
    ResourceIdentity::new(FORMAT, "sub-1", "MyGroup", "shop1", "gadget1")
}

#[tokio::test]
async fn test_create_then_read() {
    let (reconciler, _backend) = setup();

    let id = reconciler.apply(WriteMode::Create, &config()).await.unwrap();
    assert_eq!(id, identity());

    let record = reconciler.read(&id).await.unwrap().into_record().unwrap();
    assert_eq!(record.get_int("size").unwrap(), Some(3));
    assert_eq!(record.get_str("label").unwrap(), Some("blue"));
    assert_eq!(record.get_str("workshop_name").unwrap(), Some("shop1"));
    assert_eq!(record.get_str("resource_group_name").unwrap(), Some("MyGroup"));
    assert!(!record.contains("secret"));
}

#[tokio::test]
async fn test_read_never_created_is_absent() {
    let (reconciler, _backend) = setup();
    assert_eq!(reconciler.read(&identity()).await.unwrap(), ReadOutcome::Absent);
}

#[tokio::test]
async fn test_import_guard_reports_existing_id() {
    let (reconciler, backend) = setup();
    backend
        .insert(
            &identity(),
            Widget::Gadget {
                id: Some("/remote/id".to_string()),
                size: None,
                label: None,
                secret: None,
                tags: None,
            },
        )
        .await;

    let err = reconciler.apply(WriteMode::Create, &config()).await.unwrap_err();
    match err {
        ReconcileError::AlreadyExists { resource_type, id } => {
            assert_eq!(resource_type, "example_gadget");
            assert_eq!(id, "/remote/id");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_import_guard_matches_group_case_insensitively() {
    let (reconciler, _backend) = setup();
    reconciler.apply(WriteMode::Create, &config()).await.unwrap();

    let lowered = config().with("resource_group_name", "mygroup");
    let err = reconciler.apply(WriteMode::Create, &lowered).await.unwrap_err();
    assert!(matches!(err, ReconcileError::AlreadyExists { id, .. } if id.contains("/resourceGroups/mygroup/")));
}

#[tokio::test]
async fn test_update_overwrites_without_existence_check() {
    let (reconciler, backend) = setup();
    reconciler.apply(WriteMode::Create, &config()).await.unwrap();

    let changed = config().with("size", 5);
    reconciler.apply(WriteMode::Update, &changed).await.unwrap();

    let stored = backend.stored(&identity()).await.unwrap();
    assert!(matches!(stored, Widget::Gadget { size: Some(5), .. }));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (reconciler, _backend) = setup();
    let id = reconciler.apply(WriteMode::Create, &config()).await.unwrap();

    reconciler.delete(&id).await.unwrap();
    reconciler.delete(&id).await.unwrap();
    assert!(reconciler.read(&id).await.unwrap().is_absent());
}

#[tokio::test]
async fn test_backend_error_keeps_resource_context() {
    let (reconciler, backend) = setup();
    backend
        .fail_next(BackendError::Api {
            status: 500,
            code: "InternalServerError".to_string(),
            message: "boom".to_string(),
        })
        .await;

    let err = reconciler.delete(&identity()).await.unwrap_err();
    match err {
        ReconcileError::Backend { resource, source } => {
            assert_eq!(resource, identity().to_string());
            assert!(matches!(source, BackendError::Api { status: 500, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_existence_check_is_backend_error_and_stores_nothing() {
    let (reconciler, backend) = setup();
    backend
        .fail_next(BackendError::Transport("connection refused".to_string()))
        .await;

    let err = reconciler.apply(WriteMode::Create, &config()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Backend { .. }));
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_timeout() {
    let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(200)));
    let reconciler = Reconciler::new(GadgetMapper::new(), backend, "sub-1")
        .with_timeouts(Timeouts::uniform(Duration::from_millis(10)));

    let err = reconciler.read(&identity()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(
        err,
        ReconcileError::Timeout {
            operation: Operation::Read,
            ..
        }
    ));
}

#[tokio::test]
async fn test_foreign_kind_is_type_mismatch() {
    let (reconciler, backend) = setup();
    backend.insert(&identity(), Widget::Gizmo).await;

    let err = reconciler.read(&identity()).await.unwrap_err();
    match err {
        ReconcileError::TypeMismatch {
            resource,
            expected,
            received,
        } => {
            assert_eq!(resource, identity().to_string());
            assert_eq!(expected, "Gadget");
            assert_eq!(received, "Gizmo");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_read_handle_rejects_malformed() {
    let (reconciler, _backend) = setup();
    let err = reconciler.read_handle("not-a-valid-id").await.unwrap_err();
    assert!(matches!(err, ReconcileError::MalformedIdentity { .. }));
}

#[tokio::test]
async fn test_import() {
    let (reconciler, _backend) = setup();
    let handle = identity().to_string();

    let err = reconciler.import(&handle).await.unwrap_err();
    assert!(err.to_string().contains("cannot import non-existent remote object"));

    reconciler.apply(WriteMode::Create, &config()).await.unwrap();
    let (id, record) = reconciler.import(&handle).await.unwrap();
    assert_eq!(id, identity());
    assert_eq!(record.get_str("label").unwrap(), Some("blue"));
}

#[tokio::test]
async fn test_plan_lifecycle() {
    let (reconciler, _backend) = setup();

    let plan = reconciler.plan(&config()).await.unwrap();
    assert_eq!(plan.action_type, ActionType::Create);

    reconciler.apply(WriteMode::Create, &config()).await.unwrap();
    let plan = reconciler.plan(&config()).await.unwrap();
    assert_eq!(plan.action_type, ActionType::NoOp);

    let plan = reconciler.plan(&config().with("label", "red")).await.unwrap();
    assert_eq!(plan.action_type, ActionType::Update);
    assert_eq!(plan.changes.len(), 1);
    assert_eq!(plan.changes[0].field, "label");
}

#[tokio::test]
async fn test_flatten_preserves_backend_order() {
    let (reconciler, backend) = setup();
    backend
        .insert(
            &identity(),
            Widget::Gadget {
                id: None,
                size: None,
                label: None,
                secret: None,
                tags: Some(vec!["z".to_string(), "a".to_string()]),
            },
        )
        .await;

    let record = reconciler.read(&identity()).await.unwrap().into_record().unwrap();
    assert_eq!(
        record.get_list("tags").unwrap().unwrap(),
        ["z".to_string(), "a".to_string()]
    );
}
