//! Azure Resource Manager REST client
//!
//! Thin bearer-token JSON client. Resources are addressed by their full ARM
//! id and every request carries an explicit `api-version`. Writes that ARM
//! answers asynchronously are polled until they reach a terminal state; the
//! caller's deadline is what bounds the wait.

use crate::error::{AzureError, Result};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Public-cloud management endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Connection settings for ARM
#[derive(Clone)]
pub struct ArmConfig {
    pub subscription_id: String,
    pub access_token: String,
    pub endpoint: String,
}

impl std::fmt::Debug for ArmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmConfig")
            .field("subscription_id", &self.subscription_id)
            .field("access_token", &"(sensitive)")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ArmConfig {
    pub fn new(subscription_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            access_token: access_token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Create ArmConfig from environment variables
    ///
    /// `ARM_SUBSCRIPTION_ID` and `ARM_ACCESS_TOKEN` are required,
    /// `ARM_ENDPOINT` falls back to the public cloud.
    pub fn from_env() -> Result<Self> {
        let subscription_id = std::env::var("ARM_SUBSCRIPTION_ID")
            .map_err(|_| AzureError::MissingEnvVar("ARM_SUBSCRIPTION_ID".to_string()))?;
        let access_token = std::env::var("ARM_ACCESS_TOKEN")
            .map_err(|_| AzureError::MissingEnvVar("ARM_ACCESS_TOKEN".to_string()))?;
        let endpoint =
            std::env::var("ARM_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            subscription_id,
            access_token,
            endpoint,
        })
    }
}

/// ARM REST client
#[derive(Clone)]
pub struct ArmClient {
    client: reqwest::Client,
    access_token: String,
    endpoint: String,
    poll_interval: Duration,
}

impl ArmClient {
    pub fn new(config: &ArmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: config.access_token.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Interval between polls of a long-running operation when ARM sends no `Retry-After`
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request URL for a resource id
    pub fn url(&self, id: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, id, api_version)
    }

    /// GET a resource and decode its JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, id: &str, api_version: &str) -> Result<T> {
        tracing::debug!("GET {}", id);
        let response = self
            .client
            .get(self.url(id, api_version))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let response = check(id, response).await?;
        Ok(response.json().await?)
    }

    /// PUT a resource and wait for the write to settle
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        id: &str,
        api_version: &str,
        body: &B,
    ) -> Result<()> {
        tracing::debug!("PUT {}", id);
        let response = self
            .client
            .put(self.url(id, api_version))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let response = check(id, response).await?;
        self.wait_for_completion(response.status(), response.headers())
            .await
    }

    /// DELETE a resource and wait for the deletion to settle
    pub async fn delete(&self, id: &str, api_version: &str) -> Result<()> {
        tracing::debug!("DELETE {}", id);
        let response = self
            .client
            .delete(self.url(id, api_version))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let response = check(id, response).await?;
        self.wait_for_completion(response.status(), response.headers())
            .await
    }

    async fn wait_for_completion(&self, status: StatusCode, headers: &HeaderMap) -> Result<()> {
        if let Some(url) = header_str(headers, "azure-asyncoperation") {
            return self.poll_async_operation(&url, headers).await;
        }
        if status == StatusCode::ACCEPTED {
            if let Some(url) = header_str(headers, "location") {
                return self.poll_location(&url, headers).await;
            }
        }
        Ok(())
    }

    async fn poll_async_operation(&self, url: &str, initial: &HeaderMap) -> Result<()> {
        let mut delay = retry_after(initial).unwrap_or(self.poll_interval);
        loop {
            tokio::time::sleep(delay).await;

            let response = self
                .client
                .get(url)
                .bearer_auth(&self.access_token)
                .send()
                .await?;
            let response = check(url, response).await?;
            delay = retry_after(response.headers()).unwrap_or(self.poll_interval);

            let operation: OperationStatus = response.json().await?;
            if operation.is_terminal() {
                return operation.into_result();
            }
            tracing::debug!("Operation still {}, polling again", operation.status);
        }
    }

    async fn poll_location(&self, url: &str, initial: &HeaderMap) -> Result<()> {
        let mut delay = retry_after(initial).unwrap_or(self.poll_interval);
        loop {
            tokio::time::sleep(delay).await;

            let response = self
                .client
                .get(url)
                .bearer_auth(&self.access_token)
                .send()
                .await?;
            let response = check(url, response).await?;
            if response.status() != StatusCode::ACCEPTED {
                return Ok(());
            }
            delay = retry_after(response.headers()).unwrap_or(self.poll_interval);
        }
    }
}

/// Whether ARM masked a secret value instead of echoing it
pub fn is_masked_secret(value: &str) -> bool {
    value.contains("****")
}

async fn check(id: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(AzureError::NotFound(id.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> AzureError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => AzureError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => AzureError::Api {
            status: status.as_u16(),
            code: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: body.to_string(),
        },
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_str(headers, "retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorBody>,
}

impl OperationStatus {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "Succeeded" | "Failed" | "Canceled")
    }

    fn into_result(self) -> Result<()> {
        if self.status == "Succeeded" {
            return Ok(());
        }
        let error = self.error.unwrap_or_default();
        Err(AzureError::OperationFailed {
            status: self.status,
            code: error.code,
            message: error.message,
        })
    }
}
