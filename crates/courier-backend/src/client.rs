// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! reqwest client for the Courier REST API.
//!
//! Every request attaches the current bearer token when one is set. Failures
//! are classified once, here, so callers only ever see
//! [`CourierError::Transient`] (retry later) or [`CourierError::Rejected`]
//! (do not retry).

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use courier_config::model::BackendConfig;
use courier_core::{
    ActivityBatch, Backend, CourierError, ErrorEvent, HealthStatus, OptimisticOrder,
    OrderReceipt,
};

use crate::endpoint::{HEALTH_PATH, LOG_BATCH_PATH, LOG_ERROR_PATH, ORDERS_PATH};

/// Header carrying the order's client id so the server can deduplicate retries.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Backend API client over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: ArcSwapOption<String>,
    beacons: TaskTracker,
}

/// Order creation response. Servers name the identifier either way.
#[derive(Debug, Default, Deserialize)]
struct CreatedOrder {
    #[serde(default, alias = "order_id")]
    id: Option<serde_json::Value>,
}

impl HttpBackend {
    /// Builds a client from the backend configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, CourierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CourierError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: ArcSwapOption::new(config.auth_token.clone().map(Arc::new)),
            beacons: TaskTracker::new(),
        })
    }

    /// Replaces the bearer token used by subsequent requests.
    pub fn set_token(&self, token: Option<String>) {
        self.token.store(token.map(Arc::new));
    }

    /// Returns the current bearer token.
    pub fn token(&self) -> Option<String> {
        self.token.load_full().map(|t| t.as_ref().clone())
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits up to `timeout` for in-flight beacons. Called once at shutdown.
    pub async fn wait_for_beacons(&self, timeout: Duration) {
        self.beacons.close();
        if tokio::time::timeout(timeout, self.beacons.wait()).await.is_err() {
            warn!(
                pending = self.beacons.len(),
                "beacon delivery still in flight at shutdown"
            );
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.load_full() {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, CourierError> {
        let request = self.authorized(self.client.post(self.url(path)).json(body));
        let response = request.send().await.map_err(transport_error)?;
        check_status(response).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit_order(&self, order: &OptimisticOrder) -> Result<OrderReceipt, CourierError> {
        let request = self
            .client
            .post(self.url(ORDERS_PATH))
            .header(IDEMPOTENCY_HEADER, order.client_id.as_str())
            .json(&order.payload);
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;

        let body = response.text().await.unwrap_or_default();
        let created: CreatedOrder = serde_json::from_str(&body).unwrap_or_default();
        let order_id = created.id.map(|id| match id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        debug!(client_id = %order.client_id, ?order_id, "order accepted");
        Ok(OrderReceipt { order_id })
    }

    async fn send_batch(&self, batch: &ActivityBatch) -> Result<(), CourierError> {
        self.post_json(LOG_BATCH_PATH, batch).await?;
        debug!(events = batch.events.len(), "activity batch delivered");
        Ok(())
    }

    async fn send_error(&self, event: &ErrorEvent) -> Result<(), CourierError> {
        self.post_json(LOG_ERROR_PATH, event).await?;
        debug!(error_type = %event.error_type, "error event delivered");
        Ok(())
    }

    fn send_beacon(&self, batch: &ActivityBatch) {
        let body = match serde_json::to_vec(batch) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "dropping beacon batch that failed to serialize");
                return;
            }
        };
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("no async runtime available, beacon dropped");
            return;
        }

        let request = self.authorized(
            self.client
                .post(self.url(LOG_BATCH_PATH))
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
        );
        let events = batch.events.len();
        self.beacons.spawn(async move {
            match request.send().await {
                Ok(response) => debug!(status = %response.status(), events, "beacon sent"),
                Err(e) => debug!(error = %e, events, "beacon failed"),
            }
        });
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        let response = self
            .authorized(self.client.get(self.url(HEALTH_PATH)))
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        Ok(if status.is_success() {
            HealthStatus::Healthy
        } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            HealthStatus::Degraded(format!("health endpoint returned {status}"))
        } else {
            HealthStatus::Unhealthy(format!("health endpoint returned {status}"))
        })
    }
}

/// Maps a non-success response to an error; passes successes through.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CourierError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

/// Classifies a non-success HTTP status.
///
/// 408, 425, 429, 401 and every 5xx are transient. Any other status is a
/// definitive rejection.
pub fn classify_status(status: StatusCode, body: &str) -> CourierError {
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.trim().to_string()
    };

    let transient = status.is_server_error()
        || matches!(status.as_u16(), 401 | 408 | 425 | 429);
    if transient {
        CourierError::Transient {
            message: format!("backend returned {status}: {message}"),
            source: None,
        }
    } else {
        CourierError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

/// Transport failures (connect, timeout, body) are always transient.
fn transport_error(e: reqwest::Error) -> CourierError {
    let kind = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    CourierError::Transient {
        message: format!("{kind}: {e}"),
        source: Some(Box::new(e)),
    }
}
