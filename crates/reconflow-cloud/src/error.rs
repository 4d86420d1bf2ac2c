//! Reconciler error types

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a backend RPC client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Resource not found")]
    NotFound,

    #[error("API error (status {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// An asynchronous operation was accepted but finished unsuccessfully
    #[error("Operation ended with status {status} (code {code}): {message}")]
    OperationFailed {
        status: String,
        code: String,
        message: String,
    },

    /// The write would clash with something else the backend holds
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound)
    }
}

/// Operation being performed when a deadline expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Reconciler errors
///
/// Nothing here is retried internally. `Timeout` is the only variant for
/// which retrying the whole operation is known to be safe.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed resource id {handle:?}: {reason}")]
    MalformedIdentity { handle: String, reason: String },

    #[error(
        "A resource with the ID {id:?} already exists - to be managed it needs to be imported into the state as {resource_type}"
    )]
    AlreadyExists { resource_type: String, id: String },

    #[error("Classifying {resource}: expected kind {expected:?}, received {received:?}")]
    TypeMismatch {
        resource: String,
        expected: String,
        received: String,
    },

    #[error("Backend call for {resource} failed: {source}")]
    Backend {
        resource: String,
        #[source]
        source: BackendError,
    },

    #[error("Timed out after {after:?} during {operation} of {resource}")]
    Timeout {
        operation: Operation,
        resource: String,
        after: Duration,
    },

    #[error("State file error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReconcileError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ReconcileError::InvalidConfig(message.into())
    }

    pub fn malformed(handle: impl Into<String>, reason: impl Into<String>) -> Self {
        ReconcileError::MalformedIdentity {
            handle: handle.into(),
            reason: reason.into(),
        }
    }

    /// Kind mismatch raised by a mapper, which has no identity at hand.
    /// The reconciler fills in the resource via [`ReconcileError::for_resource`].
    pub fn type_mismatch(expected: impl Into<String>, received: impl Into<String>) -> Self {
        ReconcileError::TypeMismatch {
            resource: String::new(),
            expected: expected.into(),
            received: received.into(),
        }
    }

    pub fn backend(resource: impl Into<String>, source: BackendError) -> Self {
        ReconcileError::Backend {
            resource: resource.into(),
            source,
        }
    }

    /// Attach resource context to errors raised without it
    pub fn for_resource(self, resource: &str) -> Self {
        match self {
            ReconcileError::TypeMismatch {
                resource: r,
                expected,
                received,
            } if r.is_empty() => ReconcileError::TypeMismatch {
                resource: resource.to_string(),
                expected,
                received,
            },
            other => other,
        }
    }

    /// Whether retrying the whole operation is safe
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconcileError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_gets_resource_context() {
        let err = ReconcileError::type_mismatch("CosmosDbMongoDbApi", "AzureBlobStorage")
            .for_resource("/subscriptions/s/resourceGroups/rg");
        match err {
            ReconcileError::TypeMismatch { resource, .. } => {
                assert_eq!(resource, "/subscriptions/s/resourceGroups/rg");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_only_timeout_is_retryable() {
        let timeout = ReconcileError::Timeout {
            operation: Operation::Read,
            resource: "x".to_string(),
            after: Duration::from_secs(1),
        };
        assert!(timeout.is_retryable());
        assert!(!ReconcileError::invalid_config("bad").is_retryable());
        assert!(!ReconcileError::backend("x", BackendError::NotFound).is_retryable());
    }

    #[test]
    fn test_operation_failure_message() {
        let err = BackendError::OperationFailed {
            status: "Failed".to_string(),
            code: "BadRequest".to_string(),
            message: "container missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Operation ended with status Failed (code BadRequest): container missing"
        );
        assert!(!err.is_not_found());
    }
}
