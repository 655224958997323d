//! JSON-RPC transport to the gateway.

use super::types::{JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use reqwest::Client;
use shared_types::SoloMachineError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request failed in transit
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The gateway answered with an error object
    #[error("JSON-RPC error: {0}")]
    Rpc(String),
    /// The response could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),
    /// The gateway is unreachable
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl GatewayError {
    /// Classify for the orchestrator: transport trouble is retryable
    /// `Network`, an unreadable response is `Serialization`.
    pub fn into_solo(self, chain: &str) -> SoloMachineError {
        match self {
            GatewayError::Parse(message) => SoloMachineError::serialization(message),
            other => SoloMachineError::network(chain, other),
        }
    }
}

/// Raw method calls against a gateway.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Call `method`; `None` when the gateway answers with a null result.
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, GatewayError>;
}

/// HTTP transport.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    request_id: AtomicU64,
}

impl HttpTransport {
    /// Create a transport for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, GatewayError> {
        let request = JsonRpcRequest::new(method, params, self.next_id());
        debug!(method, id = request.id, url = %self.base_url, "gateway call");

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GatewayError::Connection(format!("Cannot connect to {}", self.base_url))
                } else {
                    GatewayError::Http(e)
                }
            })?;

        let rpc_response: JsonRpcResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            return Err(GatewayError::Rpc(error.to_string()));
        }
        Ok(rpc_response.result.filter(|value| !value.is_null()))
    }
}
