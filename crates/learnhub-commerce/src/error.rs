//! Cart error kinds.

use crate::cart::CartPhase;
use thiserror::Error;

/// Errors surfaced by cart operations.
///
/// Every remote failure is converted into one of these at the store
/// boundary, and a copy is kept on the cart state for display.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CartError {
    /// Network failure, timeout, 5xx or malformed response.
    #[error("cart service unavailable: {0}")]
    RemoteUnavailable(String),

    /// Bad item or identifier, or the service refused the request.
    #[error("validation error: {0}")]
    Validation(String),

    /// Checkout requested with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// No valid session token.
    #[error("authentication required")]
    AuthRequired,

    /// Another cart operation is still in flight.
    #[error("another cart operation is in progress ({phase})")]
    ConcurrentOperation { phase: CartPhase },

    /// The payment initiator reported failure.
    #[error("payment failed: {0}")]
    PaymentFailed(String),
}

impl CartError {
    /// True when re-invoking the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CartError::RemoteUnavailable(_) | CartError::ConcurrentOperation { .. }
        )
    }

    /// True when the caller should send the user to sign in.
    pub fn requires_login(&self) -> bool {
        matches!(self, CartError::AuthRequired)
    }

    /// Message suitable for showing to the learner.
    pub fn user_message(&self) -> String {
        match self {
            CartError::RemoteUnavailable(_) => {
                "We couldn't reach the cart service. Please try again.".to_string()
            }
            CartError::Validation(reason) => format!("That didn't work: {reason}"),
            CartError::EmptyCart => "Your cart is empty.".to_string(),
            CartError::AuthRequired => "Please sign in to continue.".to_string(),
            CartError::ConcurrentOperation { .. } => {
                "Your cart is still updating. Please wait a moment.".to_string()
            }
            CartError::PaymentFailed(reason) => format!("Payment was not completed: {reason}"),
        }
    }
}
