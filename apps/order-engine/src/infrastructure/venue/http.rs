//! HTTP execution venue client.
//!
//! One request per attempt; the engine's retry controller owns backoff.
//! Orders are posted as JSON to `{base_url}/orders` with the order's
//! idempotency key in the `Idempotency-Key` header so the venue can
//! de-duplicate retried attempts.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::application::ports::{ExecutionVenuePort, VenueError, VenueOrderRequest};
use crate::application::services::is_retryable_status;
use crate::config::VenueConfig;
use crate::domain::order_management::ExecutionFill;

/// Error body the venue may return.
#[derive(Debug, Deserialize)]
struct VenueErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Execution venue reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpVenue {
    client: Client,
    orders_url: String,
    api_key: Option<String>,
}

impl HttpVenue {
    /// Create a client from config.
    pub fn new(config: &VenueConfig) -> Result<Self, VenueError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VenueError::permanent(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            orders_url: format!("{}/orders", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }
}

#[async_trait]
impl ExecutionVenuePort for HttpVenue {
    async fn submit_order(&self, request: &VenueOrderRequest) -> Result<ExecutionFill, VenueError> {
        let mut http = self
            .client
            .post(&self.orders_url)
            .header("Idempotency-Key", request.idempotency_key.as_str())
            .json(request);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| {
            tracing::warn!(
                idempotency_key = %request.idempotency_key,
                error = %e,
                "Venue request failed"
            );
            VenueError::transient(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VenueError::transient(e.to_string()))?;

        if status.is_success() {
            // The venue accepted the order; an unreadable body is retried
            // under the same idempotency key.
            return serde_json::from_str(&body)
                .map_err(|e| VenueError::transient(format!("unreadable fill: {e}")));
        }

        let detail = match serde_json::from_str::<VenueErrorBody>(&body) {
            Ok(VenueErrorBody {
                code: Some(code),
                message: Some(message),
            }) => format!("{code}: {message}"),
            Ok(VenueErrorBody {
                message: Some(message),
                ..
            }) => message,
            _ => body,
        };
        let message = format!("{} {}", status.as_u16(), detail.trim());

        if is_retryable_status(status.as_u16()) {
            Err(VenueError::transient(message))
        } else {
            Err(VenueError::permanent(message))
        }
    }
}
