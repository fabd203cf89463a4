//! LearnHub cart store.
//!
//! This crate provides:
//! - `CartStore` - Optimistic client-side cart kept in step with a `CartRemote`
//! - `AuthSession` - The learner's session and bearer token
//! - `PaymentInitiator` - Payment capability, with a bridge for callback SDKs
//!
//! # Example
//!
//! ```no_run
//! use learnhub_data::{HttpCartRemote, HttpRemoteConfig};
//! use learnhub_store::{AuthSession, CartStore, PaymentInitiator};
//!
//! async fn load<P: PaymentInitiator>(payment: P) -> Result<(), Box<dyn std::error::Error>> {
//!     let remote = HttpCartRemote::new(&HttpRemoteConfig::default())?;
//!     let store = CartStore::new(remote, payment);
//!     store.login(AuthSession::new("learner_1", "token"));
//!     store.fetch_cart().await?;
//!     println!("{} in cart", store.select_subtotal());
//!     Ok(())
//! }
//! ```

pub mod payment;
pub mod session;
pub mod store;

pub use payment::{
    CheckoutSdk, PaymentCallback, PaymentConfirmation, PaymentFailure, PaymentInitiator,
    PaymentRequest, PaymentResult, SdkPaymentInitiator,
};
pub use session::{AuthSession, SessionToken};
pub use store::{CartStore, CheckoutReceipt, FetchOutcome, MutationOutcome};
