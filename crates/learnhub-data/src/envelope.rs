//! The `{ success, data, message }` wrapper every API response uses.

use learnhub_commerce::{OrderId, RawCartItem};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RemoteError, RemoteResult};

/// API response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, turning `success: false` into a rejection.
    pub fn into_result(self) -> RemoteResult<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(RemoteError::Rejected(
                self.message.unwrap_or_else(|| "request rejected".to_string()),
            ))
        }
    }
}

/// Decode an HTTP response body into its envelope payload.
///
/// An empty 2xx body decodes to `None`. A 4xx other than 401/403 that carries
/// an envelope message becomes a rejection with that message.
pub fn decode_response<T: DeserializeOwned>(
    status: u16,
    url: &str,
    body: &[u8],
) -> RemoteResult<Option<T>> {
    if status >= 400 {
        if (400..500).contains(&status) && status != 401 && status != 403 {
            if let Ok(envelope) = serde_json::from_slice::<ApiEnvelope<Value>>(body) {
                if let Some(message) = envelope.message {
                    return Err(RemoteError::Rejected(message));
                }
            }
        }
        return Err(RemoteError::Http {
            status,
            url: url.to_string(),
        });
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice::<ApiEnvelope<T>>(body)
        .map_err(|e| RemoteError::Deserialization(format!("{url}: {e}")))?
        .into_result()
}

/// Cart payload: either a bare list or an object wrapping one.
///
/// Items are kept as raw JSON until [`CartPayload::into_items`], so one
/// malformed entry cannot fail the whole response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CartPayload {
    List(Vec<Value>),
    Wrapped {
        #[serde(alias = "courses", alias = "cartItems")]
        items: Vec<Value>,
    },
}

impl CartPayload {
    /// Parse each entry; entries that do not parse become an empty item,
    /// which ingestion later drops for lacking an identifier.
    pub fn into_items(self) -> Vec<RawCartItem> {
        let values = match self {
            CartPayload::List(values) => values,
            CartPayload::Wrapped { items } => items,
        };
        values
            .into_iter()
            .map(|value| serde_json::from_value(value).unwrap_or_default())
            .collect()
    }
}

/// Order created by the service ahead of payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTicket {
    #[serde(alias = "id")]
    pub order_id: OrderId,
    /// Amount in minor units as the service recorded it.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}
