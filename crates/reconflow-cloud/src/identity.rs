//! Structured resource identifiers
//!
//! Every resource kind addresses its objects with a four-part key rendered
//! in the ARM path layout:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{parentType}/{parent}/{childType}/{name}
//! ```
//!
//! Parsing is strict: segment count and segment key casing must match the
//! kind's [`IdFormat`] exactly, so `parse(id.to_string()) == id` always holds.

use crate::error::{ReconcileError, Result};

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";

const PARENT_SEGMENTS: usize = 8;
const CHILD_SEGMENTS: usize = 10;

/// Path layout for one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdFormat {
    /// Provider namespace (e.g. "Microsoft.DataFactory")
    pub namespace: &'static str,
    /// Segment key naming the parent (e.g. "factories")
    pub parent_type: &'static str,
    /// Segment key naming the resource itself (e.g. "linkedservices")
    pub child_type: &'static str,
}

impl IdFormat {
    pub const fn new(
        namespace: &'static str,
        parent_type: &'static str,
        child_type: &'static str,
    ) -> Self {
        Self {
            namespace,
            parent_type,
            child_type,
        }
    }

    /// Parse a full resource handle
    pub fn parse(&self, handle: &str) -> Result<ResourceIdentity> {
        let segments = split_segments(handle, CHILD_SEGMENTS)?;
        let parent = self.parent_from_segments(handle, &segments)?;
        expect_key(handle, &segments, 8, self.child_type)?;
        let name = expect_value(handle, &segments, 9)?;

        Ok(ResourceIdentity {
            format: *self,
            subscription_id: parent.subscription_id,
            resource_group: parent.resource_group,
            parent_name: parent.parent_name,
            name: name.to_string(),
        })
    }

    /// Parse a parent handle (the parent-by-id input shape)
    pub fn parse_parent(&self, handle: &str) -> Result<ParentIdentity> {
        let segments = split_segments(handle, PARENT_SEGMENTS)?;
        self.parent_from_segments(handle, &segments)
    }

    fn parent_from_segments(&self, handle: &str, segments: &[&str]) -> Result<ParentIdentity> {
        expect_key(handle, segments, 0, SUBSCRIPTIONS)?;
        let subscription_id = expect_value(handle, segments, 1)?;
        expect_key(handle, segments, 2, RESOURCE_GROUPS)?;
        let resource_group = expect_value(handle, segments, 3)?;
        expect_key(handle, segments, 4, PROVIDERS)?;
        expect_key(handle, segments, 5, self.namespace)?;
        expect_key(handle, segments, 6, self.parent_type)?;
        let parent_name = expect_value(handle, segments, 7)?;

        Ok(ParentIdentity {
            format: *self,
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            parent_name: parent_name.to_string(),
        })
    }
}

fn split_segments(handle: &str, expected: usize) -> Result<Vec<&str>> {
    let Some(rest) = handle.strip_prefix('/') else {
        return Err(ReconcileError::malformed(handle, "must start with '/'"));
    };
    let segments: Vec<&str> = rest.split('/').collect();
    if segments.len() != expected {
        return Err(ReconcileError::malformed(
            handle,
            format!(
                "expected {} path segments, found {}",
                expected,
                segments.len()
            ),
        ));
    }
    Ok(segments)
}

fn expect_key(handle: &str, segments: &[&str], index: usize, key: &str) -> Result<()> {
    if segments[index] != key {
        return Err(ReconcileError::malformed(
            handle,
            format!(
                "expected segment {:?} at position {}, found {:?}",
                key, index, segments[index]
            ),
        ));
    }
    Ok(())
}

fn expect_value<'a>(handle: &str, segments: &[&'a str], index: usize) -> Result<&'a str> {
    let value = segments[index];
    check_segment(value).map_err(|reason| {
        ReconcileError::malformed(
            handle,
            format!("segment after {:?} {}", segments[index - 1], reason),
        )
    })?;
    Ok(value)
}

/// Characters that cannot appear inside a single id segment
const RESERVED_CHARS: &[char] = &['/', '\\', '?', '#', '%'];

/// Whether `value` can be embedded as one path segment of an id.
///
/// Anything produced from configuration goes through this before it is
/// rendered, so every rendered identity parses back to itself.
pub fn check_segment(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("is empty".to_string());
    }
    if let Some(c) = value
        .chars()
        .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
    {
        return Err(format!("contains forbidden character {:?}", c));
    }
    if value.trim() != value {
        return Err("has leading or trailing whitespace".to_string());
    }
    Ok(())
}

/// Identity of the parent object (data factory, IoT hub, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentIdentity {
    pub format: IdFormat,
    pub subscription_id: String,
    pub resource_group: String,
    pub parent_name: String,
}

impl ParentIdentity {
    pub fn new(
        format: IdFormat,
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        parent_name: impl Into<String>,
    ) -> Self {
        Self {
            format,
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            parent_name: parent_name.into(),
        }
    }

    /// Identity of a child resource under this parent
    pub fn child(&self, name: impl Into<String>) -> ResourceIdentity {
        ResourceIdentity {
            format: self.format,
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            parent_name: self.parent_name.clone(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ParentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "/{}/{}/{}/{}/{}/{}/{}/{}",
            SUBSCRIPTIONS,
            self.subscription_id,
            RESOURCE_GROUPS,
            self.resource_group,
            PROVIDERS,
            self.format.namespace,
            self.format.parent_type,
            self.parent_name
        )
    }
}

/// Composite key addressing exactly one backend object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub format: IdFormat,
    pub subscription_id: String,
    pub resource_group: String,
    pub parent_name: String,
    pub name: String,
}

impl ResourceIdentity {
    pub fn new(
        format: IdFormat,
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        parent_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            format,
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            parent_name: parent_name.into(),
            name: name.into(),
        }
    }

    pub fn parent(&self) -> ParentIdentity {
        ParentIdentity {
            format: self.format,
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            parent_name: self.parent_name.clone(),
        }
    }

    /// Whether `other` addresses the same backend object.
    ///
    /// The backend may return subscription and resource group in a different
    /// case than the one the user supplied, so those two compare
    /// case-insensitively.
    pub fn same_resource(&self, other: &ResourceIdentity) -> bool {
        self.format == other.format
            && self.subscription_id.eq_ignore_ascii_case(&other.subscription_id)
            && self.resource_group.eq_ignore_ascii_case(&other.resource_group)
            && self.parent_name == other.parent_name
            && self.name == other.name
    }
}

impl std::fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.parent(), self.format.child_type, self.name)
    }
}
