//! reqwest-backed cart remote.

use std::time::Duration;

use async_trait::async_trait;
use learnhub_commerce::{CartItem, CourseId, Money, RawCartItem};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::envelope::{decode_response, CartPayload, OrderTicket};
use crate::error::{RemoteError, RemoteResult};
use crate::remote::CartRemote;
use crate::retry::{BackoffStrategy, RetryPolicy};

/// Connection settings for the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRemoteConfig {
    /// API root, e.g. `https://api.learnhub.dev/api/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            retry: RetrySettings::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:4000/api/v1".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Retry settings as they appear in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        let base = Duration::from_millis(settings.backoff_ms);
        let backoff = if settings.backoff_ms == 0 {
            BackoffStrategy::None
        } else if settings.max_backoff_ms <= settings.backoff_ms {
            // No room to grow.
            BackoffStrategy::Fixed(base)
        } else {
            BackoffStrategy::Exponential {
                base,
                max: Duration::from_millis(settings.max_backoff_ms),
            }
        };
        RetryPolicy::new(settings.max_attempts).with_backoff(backoff)
    }
}

/// Cart remote speaking the LearnHub REST API.
///
/// Reads, adds and deletes are idempotent on the server and are retried per
/// the configured policy; order creation is sent once.
#[derive(Debug, Clone)]
pub struct HttpCartRemote {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpCartRemote {
    pub fn new(config: &HttpRemoteConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `<base>/cart/<id>` with the id percent-encoded as one path segment.
    fn cart_item_url(&self, id: &CourseId) -> RemoteResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.endpoint("cart"))
            .map_err(|e| RemoteError::Request(format!("invalid base url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Request(format!("base url cannot hold a path: {}", self.base_url)))?
            .push(id.as_str());
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> RemoteResult<Option<T>> {
        debug!(url, "cart request");
        let response = request.send().await.map_err(|e| classify(e, url))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(e, url))?;
        debug!(url, status, bytes = body.len(), "cart response");
        decode_response(status, url, &body)
    }
}

#[async_trait]
impl CartRemote for HttpCartRemote {
    async fn fetch_cart(&self, token: &str) -> RemoteResult<Vec<RawCartItem>> {
        let endpoint = self.endpoint("cart");
        let url = endpoint.as_str();

        let payload: Option<CartPayload> = self
            .retry
            .run(move || self.send(self.client.get(url).bearer_auth(token), url))
            .await?;

        Ok(payload.map(CartPayload::into_items).unwrap_or_default())
    }

    async fn add_item(&self, token: &str, item: &CartItem) -> RemoteResult<()> {
        let endpoint = self.endpoint("cart");
        let url = endpoint.as_str();
        let body = json!({ "courseId": item.id });
        let body = &body;

        self.retry
            .run(move || {
                self.send::<serde_json::Value>(
                    self.client.post(url).bearer_auth(token).json(body),
                    url,
                )
            })
            .await?;
        Ok(())
    }

    async fn remove_item(&self, token: &str, id: &CourseId) -> RemoteResult<()> {
        let endpoint = self.cart_item_url(id)?.to_string();
        let url = endpoint.as_str();

        self.retry
            .run(move || self.send::<serde_json::Value>(self.client.delete(url).bearer_auth(token), url))
            .await?;
        Ok(())
    }

    async fn create_order(&self, token: &str, amount: Money) -> RemoteResult<OrderTicket> {
        let url = self.endpoint("orders");
        let body = json!({
            "amount": amount.amount_minor,
            "currency": amount.currency.code(),
        });

        self.send::<OrderTicket>(self.client.post(&url).bearer_auth(token).json(&body), &url)
            .await?
            .ok_or_else(|| RemoteError::Deserialization(format!("{url}: order response had no data")))
    }
}

fn classify(error: reqwest::Error, url: &str) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout(url.to_string())
    } else if error.is_connect() {
        RemoteError::Connection(format!("{url}: {error}"))
    } else if error.is_decode() || error.is_body() {
        RemoteError::Deserialization(format!("{url}: {error}"))
    } else {
        RemoteError::Request(error.to_string())
    }
}
