//! Azure provider error types

use reconflow_cloud::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("ARM API error (status {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Long-running operation ended with status {status}: {message}")]
    OperationFailed {
        status: String,
        code: String,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AzureError>;

impl From<AzureError> for BackendError {
    fn from(err: AzureError) -> Self {
        match err {
            AzureError::NotFound(_) => BackendError::NotFound,
            AzureError::Api {
                status,
                code,
                message,
            } => BackendError::Api {
                status,
                code,
                message,
            },
            AzureError::OperationFailed {
                status,
                code,
                message,
            } => BackendError::OperationFailed {
                status,
                code,
                message,
            },
            AzureError::Http(e) if e.is_decode() => BackendError::Decode(e.to_string()),
            AzureError::Http(e) => BackendError::Transport(e.to_string()),
            AzureError::Json(e) => BackendError::Decode(e.to_string()),
            AzureError::UnexpectedResponse(msg) => BackendError::Decode(msg),
            AzureError::MissingEnvVar(var) => {
                BackendError::Transport(format!("missing environment variable {}", var))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_backend_not_found() {
        let err: BackendError = AzureError::NotFound("/subscriptions/s".to_string()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_api_error_keeps_status_and_code() {
        let err: BackendError = AzureError::Api {
            status: 409,
            code: "Conflict".to_string(),
            message: "busy".to_string(),
        }
        .into();
        assert_eq!(
            err,
            BackendError::Api {
                status: 409,
                code: "Conflict".to_string(),
                message: "busy".to_string(),
            }
        );
    }

    #[test]
    fn test_operation_failure_is_not_an_http_status() {
        let err: BackendError = AzureError::OperationFailed {
            status: "Failed".to_string(),
            code: "InternalServerError".to_string(),
            message: "linked service provisioning failed".to_string(),
        }
        .into();
        assert_eq!(
            err,
            BackendError::OperationFailed {
                status: "Failed".to_string(),
                code: "InternalServerError".to_string(),
                message: "linked service provisioning failed".to_string(),
            }
        );
        assert!(!matches!(err, BackendError::Api { .. }));
    }

    #[test]
    fn test_bad_json_is_decode_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BackendError = AzureError::Json(json_err).into();
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
