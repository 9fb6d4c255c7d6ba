// Gateway trait for remote wellness data access
use crate::domain::period::DatePeriod;
use crate::infrastructure::garmin::endpoints::Endpoint;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Request to {endpoint} failed with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl GatewayError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, GatewayError::Authentication(_))
    }
}

/// Raw payload returned for one endpoint, `None` when the service had nothing
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResponse {
    pub data: Option<Value>,
    pub endpoint: Endpoint,
}

#[async_trait]
pub trait HealthGateway: Send + Sync {
    /// Log in, reusing a saved session when one is available
    async fn authenticate(&self) -> Result<(), GatewayError>;

    /// Fetch one endpoint over a period. An authentication failure is retried
    /// once after logging in again before it is returned.
    async fn fetch(&self, endpoint: Endpoint, period: &DatePeriod)
        -> Result<Option<Value>, GatewayError>;
}

/// True for payloads that carry no data: null, empty list or empty object
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}
