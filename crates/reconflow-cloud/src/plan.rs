//! Plans: what a reconcile would change

use crate::property::{PropertyRecord, PropertyValue};
use crate::schema::{SENSITIVE_PLACEHOLDER, Schema};
use serde::{Deserialize, Serialize};

/// Type of action a reconcile would take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// How a single field changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Change,
    Remove,
}

/// Change to one field. Values are rendered for display, sensitive ones masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub kind: ChangeKind,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Planned reconcile of one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Resource type (e.g. "iothub_endpoint_storage_container")
    pub resource_type: String,

    /// Canonical resource id
    pub resource_id: String,

    /// Action the reconcile would take
    pub action_type: ActionType,

    /// Field-level changes
    pub changes: Vec<FieldChange>,
}

impl Plan {
    /// Plan for a resource that does not exist yet
    pub fn create(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        schema: &Schema,
        desired: &PropertyRecord,
    ) -> Self {
        let changes = schema
            .fields()
            .iter()
            .filter_map(|spec| {
                configured(desired, spec.name).map(|value| FieldChange {
                    field: spec.name.to_string(),
                    kind: ChangeKind::Add,
                    old: None,
                    new: Some(render(schema, spec.name, value)),
                })
            })
            .collect();

        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            action_type: ActionType::Create,
            changes,
        }
    }

    /// Plan for a live resource
    pub fn update(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        schema: &Schema,
        desired: &PropertyRecord,
        current: &PropertyRecord,
    ) -> Self {
        let changes = diff(schema, desired, current);
        let action_type = if changes.is_empty() {
            ActionType::NoOp
        } else {
            ActionType::Update
        };

        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            action_type,
            changes,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.action_type != ActionType::NoOp
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        let count = |kind: ChangeKind| self.changes.iter().filter(|c| c.kind == kind).count();
        PlanSummary {
            add: count(ChangeKind::Add),
            change: count(ChangeKind::Change),
            remove: count(ChangeKind::Remove),
        }
    }
}

/// Summary of field changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub add: usize,
    pub change: usize,
    pub remove: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} to remove",
            self.add, self.change, self.remove
        )
    }
}

/// Field differences between desired configuration and live state.
///
/// Only schema fields are compared, and an empty list or map is the same
/// as an unset field. Computed fields the configuration
/// leaves out, and sensitive fields the backend does not echo back, are
/// not changes.
pub fn diff(schema: &Schema, desired: &PropertyRecord, current: &PropertyRecord) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for spec in schema.fields() {
        let name = spec.name;
        match (configured(desired, name), configured(current, name)) {
            (None, None) => {}
            (Some(_), None) if spec.sensitive => {}
            (None, Some(_)) if spec.computed => {}
            (Some(new), None) => changes.push(FieldChange {
                field: name.to_string(),
                kind: ChangeKind::Add,
                old: None,
                new: Some(render(schema, name, new)),
            }),
            (None, Some(old)) => changes.push(FieldChange {
                field: name.to_string(),
                kind: ChangeKind::Remove,
                old: Some(render(schema, name, old)),
                new: None,
            }),
            (Some(new), Some(old)) => {
                if !spec.comparison.equivalent(new, old) {
                    changes.push(FieldChange {
                        field: name.to_string(),
                        kind: ChangeKind::Change,
                        old: Some(render(schema, name, old)),
                        new: Some(render(schema, name, new)),
                    });
                }
            }
        }
    }

    changes
}

/// Field value, with empty collections counting as unset
fn configured<'a>(record: &'a PropertyRecord, name: &str) -> Option<&'a PropertyValue> {
    record.get(name).filter(|value| !value.is_empty_collection())
}

fn render(schema: &Schema, name: &str, value: &PropertyValue) -> String {
    if schema.is_sensitive(name) {
        SENSITIVE_PLACEHOLDER.to_string()
    } else {
        value.to_string()
    }
}
