use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, warn};

/// Default broadcast endpoint; the channel id is appended per request.
pub const DEFAULT_BROADCAST_URL: &str = "https://api.twitch.tv/extensions/message";

/// Transport-level failure for one send. Caught per tick, never fatal to the
/// dispatch loop.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to read response body: {0}")]
    BodyRead(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryError::Timeout(Duration::from_secs(30))
        } else if err.is_connect() {
            DeliveryError::Network(err.to_string())
        } else {
            DeliveryError::RequestFailed(err.to_string())
        }
    }
}

/// Everything one send needs; the dispatcher builds one per tick.
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub channel_id: String,
    pub token: String,
    pub client_id: String,
    /// Serialized [`crate::outbound::Envelope`].
    pub body: String,
}

/// What came back from the remote.
///
/// A non-2xx status is not an error: the receipt carries whatever status
/// arrived and the caller decides what to log. Only transport failures take
/// the [`DeliveryError`] path.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The delivery seam: one HTTP POST per call, reported asynchronously.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    async fn deliver(&self, request: BroadcastRequest) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Production [`BroadcastSink`] backed by a shared `reqwest` client.
///
/// The client negotiates gzip transparently and reuses connections across
/// sends.
pub struct BroadcastHttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BroadcastHttpClient {
    /// Create a client with the default timeout (30 seconds).
    pub fn new() -> Result<Self, DeliveryError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("pubsub-broadcaster/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BROADCAST_URL.to_string(),
            timeout,
        })
    }

    /// Override the endpoint base, mainly for tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl BroadcastSink for BroadcastHttpClient {
    async fn deliver(&self, request: BroadcastRequest) -> Result<DeliveryReceipt, DeliveryError> {
        let url = format!("{}/{}", self.base_url, request.channel_id);
        debug!(url = %url, "sending broadcast");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", request.token))
            .header("Client-Id", &request.client_id)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(CONTENT_LENGTH, request.body.len())
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "broadcast request failed");
                DeliveryError::from(e)
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| DeliveryError::BodyRead(e.to_string()))?;

        Ok(DeliveryReceipt {
            status,
            headers,
            body,
        })
    }
}
