//! Remote cart authority client.
//!
//! This crate provides:
//! - `CartRemote` - The async boundary the cart store talks through
//! - `HttpCartRemote` - reqwest-backed implementation against the REST API
//! - `ApiEnvelope` - The `{ success, data, message }` response wrapper
//! - `RetryPolicy` - Retry strategies for idempotent calls

mod envelope;
mod error;
mod http;
mod remote;
mod retry;

pub use envelope::*;
pub use error::*;
pub use http::*;
pub use remote::*;
pub use retry::*;
