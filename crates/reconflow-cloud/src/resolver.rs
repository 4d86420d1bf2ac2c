//! Identity resolution
//!
//! Two input shapes address the parent of a resource: the legacy
//! name + resource group pair, and the parent's full id. Both are folded
//! into a [`ParentRef`] here, once, and everything downstream only ever
//! sees a [`ResourceIdentity`].

use crate::error::{ReconcileError, Result};
use crate::identity::{IdFormat, ParentIdentity, ResourceIdentity, check_segment};
use crate::property::PropertyRecord;

/// Names of the configuration fields that carry identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityFields {
    pub name: &'static str,
    pub resource_group: &'static str,
    pub parent_name: &'static str,
    pub parent_id: &'static str,
}

impl IdentityFields {
    pub fn all(&self) -> [&'static str; 4] {
        [
            self.name,
            self.resource_group,
            self.parent_name,
            self.parent_id,
        ]
    }
}

/// How the configuration addressed the parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    ByName {
        resource_group: String,
        parent_name: String,
    },
    ById(ParentIdentity),
}

/// Builds and parses identities for one resource kind
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    format: IdFormat,
    fields: IdentityFields,
    subscription_id: String,
}

impl IdentityResolver {
    /// `subscription_id` is used for the by-name shape, which carries none
    pub fn new(format: IdFormat, fields: IdentityFields, subscription_id: impl Into<String>) -> Self {
        Self {
            format,
            fields,
            subscription_id: subscription_id.into(),
        }
    }

    pub fn format(&self) -> IdFormat {
        self.format
    }

    pub fn fields(&self) -> IdentityFields {
        self.fields
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Work out which parent shape the configuration uses
    pub fn parent_ref(&self, config: &PropertyRecord) -> Result<ParentRef> {
        let f = &self.fields;
        let resource_group = non_empty(config.get_str(f.resource_group)?);
        let parent_name = non_empty(config.get_str(f.parent_name)?);
        let parent_id = non_empty(config.get_str(f.parent_id)?);

        match (parent_name, parent_id) {
            (Some(_), Some(_)) => Err(ReconcileError::invalid_config(format!(
                "only one of `{}` or `{}` can be specified",
                f.parent_name, f.parent_id
            ))),
            (None, None) => Err(ReconcileError::invalid_config(format!(
                "one of `{}` or `{}` must be specified",
                f.parent_name, f.parent_id
            ))),
            (Some(parent_name), None) => {
                let resource_group = resource_group.ok_or_else(|| {
                    ReconcileError::invalid_config(format!(
                        "`{}` is required when `{}` is used",
                        f.resource_group, f.parent_name
                    ))
                })?;
                segment(f.resource_group, resource_group)?;
                segment(f.parent_name, parent_name)?;
                Ok(ParentRef::ByName {
                    resource_group: resource_group.to_string(),
                    parent_name: parent_name.to_string(),
                })
            }
            (None, Some(parent_id)) => {
                let parent = self.format.parse_parent(parent_id).map_err(|e| {
                    ReconcileError::invalid_config(format!("`{}`: {}", f.parent_id, e))
                })?;
                if let Some(group) = resource_group {
                    if !group.eq_ignore_ascii_case(&parent.resource_group) {
                        return Err(ReconcileError::invalid_config(format!(
                            "`{}` {:?} does not match the resource group {:?} of `{}`",
                            f.resource_group, group, parent.resource_group, f.parent_id
                        )));
                    }
                }
                Ok(ParentRef::ById(parent))
            }
        }
    }

    /// Identity for a create or update, built from configuration
    pub fn resolve_for_write(&self, config: &PropertyRecord) -> Result<ResourceIdentity> {
        let name = non_empty(config.get_str(self.fields.name)?).ok_or_else(|| {
            ReconcileError::invalid_config(format!("`{}` is required", self.fields.name))
        })?;
        segment(self.fields.name, name)?;

        let parent = match self.parent_ref(config)? {
            ParentRef::ByName {
                resource_group,
                parent_name,
            } => {
                check_segment(&self.subscription_id).map_err(|reason| {
                    ReconcileError::invalid_config(format!("subscription id {}", reason))
                })?;
                ParentIdentity::new(
                    self.format,
                    self.subscription_id.clone(),
                    resource_group,
                    parent_name,
                )
            }
            ParentRef::ById(parent) => parent,
        };

        Ok(parent.child(name))
    }

    /// Strict parse of a persisted handle
    pub fn parse(&self, handle: &str) -> Result<ResourceIdentity> {
        self.format.parse(handle)
    }

    /// Identity fields as they are reported back on read
    pub fn flatten_identity(&self, identity: &ResourceIdentity) -> PropertyRecord {
        PropertyRecord::new()
            .with(self.fields.name, identity.name.as_str())
            .with(self.fields.resource_group, identity.resource_group.as_str())
            .with(self.fields.parent_name, identity.parent_name.as_str())
            .with(self.fields.parent_id, identity.parent().to_string())
    }
}

/// Identity values end up as path segments of the handle
fn segment(field: &str, value: &str) -> Result<()> {
    check_segment(value)
        .map_err(|reason| ReconcileError::invalid_config(format!("`{}` {}", field, reason)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
