//! Webhook delivery with exponential-backoff retry.
//!
//! [`WebhookDelivery`] sends a [`ResourceEvent`] in its wire JSON shape to an
//! external URL via HTTP POST. Failed attempts are retried up to three times
//! with exponential backoff (1 s, 2 s, 4 s). [`WebhookForwarder`] drives it
//! from a bus subscription.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::ResourceEvent;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    /// The event could not be encoded as JSON.
    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers resource events to external webhook endpoints.
pub struct WebhookDelivery {
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl WebhookDelivery {
    /// Create a new delivery service with a pre-configured HTTP client.
    pub fn new() -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            retry_delays: RETRY_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        })
    }

    /// Override the backoff schedule. An empty schedule means a single attempt.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Deliver an event to a webhook URL with retry.
    ///
    /// Retries once per configured delay before giving up.
    /// Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(&self, url: &str, event: &ResourceEvent) -> Result<(), WebhookError> {
        let payload = event.to_json()?;

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(url, &payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(url, &payload).await.inspect_err(|e| {
            tracing::error!(url, error = %e, "Webhook delivery failed after all retries");
        })
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WebhookForwarder
// ---------------------------------------------------------------------------

/// Background service that forwards every bus event to one webhook URL.
pub struct WebhookForwarder {
    delivery: WebhookDelivery,
    url: String,
}

impl WebhookForwarder {
    pub fn new(delivery: WebhookDelivery, url: impl Into<String>) -> Self {
        Self {
            delivery,
            url: url.into(),
        }
    }

    /// Run the forwarding loop.
    ///
    /// Exits when `cancel` fires or the bus is dropped. Delivery failures
    /// are logged and the loop moves on to the next event.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<ResourceEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(url = %self.url, "Webhook forwarder cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => {
                        if let Err(e) = self.delivery.deliver(&self.url, &event).await {
                            tracing::error!(
                                error = %e,
                                event_type = %event.event_type,
                                resource_id = ?event.resource_id,
                                "Failed to forward event"
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Webhook forwarder lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, webhook forwarder shutting down");
                        break;
                    }
                },
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
