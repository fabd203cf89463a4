//! Payment initiation capability.
//!
//! The cart store only needs "take this order and amount, tell me whether
//! it was paid". Gateway SDKs usually answer through callbacks, so
//! [`SdkPaymentInitiator`] bridges a callback-style [`CheckoutSdk`] into the
//! async [`PaymentInitiator`] the store awaits.

use std::sync::Arc;

use async_trait::async_trait;
use learnhub_commerce::{Money, OrderId, PaymentRef, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// What the payment flow is asked to collect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub amount: Money,
    /// Short line shown in the payment window.
    pub description: String,
    pub customer: UserId,
}

/// Successful payment as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub payment_ref: PaymentRef,
    /// Gateway signature, forwarded for server-side verification.
    pub signature: Option<String>,
}

/// Why a payment did not complete.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentFailure {
    #[error("{0}")]
    Declined(String),

    #[error("payment window closed")]
    Closed,
}

pub type PaymentResult = Result<PaymentConfirmation, PaymentFailure>;

/// Starts an external payment and resolves once the learner finishes it.
#[async_trait]
pub trait PaymentInitiator: Send + Sync {
    async fn initiate(&self, request: PaymentRequest) -> PaymentResult;
}

#[async_trait]
impl<T: PaymentInitiator + ?Sized> PaymentInitiator for Arc<T> {
    async fn initiate(&self, request: PaymentRequest) -> PaymentResult {
        (**self).initiate(request).await
    }
}

/// A callback-style payment SDK.
///
/// `open` starts the payment window and must eventually invoke exactly one of
/// the callback's methods, possibly from another task. Dropping the callback
/// unused counts as the window being closed.
pub trait CheckoutSdk: Send + Sync {
    fn open(&self, request: PaymentRequest, callback: PaymentCallback);
}

/// One-shot completion handle given to a [`CheckoutSdk`].
#[derive(Debug)]
pub struct PaymentCallback {
    sender: oneshot::Sender<PaymentResult>,
}

impl PaymentCallback {
    pub fn on_success(self, payment_ref: impl Into<PaymentRef>, signature: Option<String>) {
        // The receiver is gone only if checkout itself was dropped.
        let _ = self.sender.send(Ok(PaymentConfirmation {
            payment_ref: payment_ref.into(),
            signature,
        }));
    }

    pub fn on_failure(self, reason: impl Into<String>) {
        let _ = self.sender.send(Err(PaymentFailure::Declined(reason.into())));
    }
}

/// Adapts a [`CheckoutSdk`] to [`PaymentInitiator`].
#[derive(Debug, Clone)]
pub struct SdkPaymentInitiator<S> {
    sdk: S,
}

impl<S: CheckoutSdk> SdkPaymentInitiator<S> {
    pub fn new(sdk: S) -> Self {
        Self { sdk }
    }
}

#[async_trait]
impl<S: CheckoutSdk> PaymentInitiator for SdkPaymentInitiator<S> {
    async fn initiate(&self, request: PaymentRequest) -> PaymentResult {
        let (sender, receiver) = oneshot::channel();
        self.sdk.open(request, PaymentCallback { sender });
        receiver.await.unwrap_or(Err(PaymentFailure::Closed))
    }
}
