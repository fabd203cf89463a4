//! The remote cart authority boundary.

use std::sync::Arc;

use async_trait::async_trait;
use learnhub_commerce::{CartItem, CourseId, Money, RawCartItem};

use crate::envelope::OrderTicket;
use crate::error::RemoteResult;

/// The service that owns the persisted cart.
///
/// `token` is the learner's bearer token. Implementations report failures as
/// [`RemoteError`](crate::RemoteError); the cart store maps them onto cart
/// error kinds.
#[async_trait]
pub trait CartRemote: Send + Sync {
    /// Current cart contents, unvalidated.
    async fn fetch_cart(&self, token: &str) -> RemoteResult<Vec<RawCartItem>>;

    /// Persist an added course.
    async fn add_item(&self, token: &str, item: &CartItem) -> RemoteResult<()>;

    /// Delete a course from the persisted cart.
    async fn remove_item(&self, token: &str, id: &CourseId) -> RemoteResult<()>;

    /// Create an order for `amount` ahead of payment.
    async fn create_order(&self, token: &str, amount: Money) -> RemoteResult<OrderTicket>;
}

#[async_trait]
impl<T: CartRemote + ?Sized> CartRemote for Arc<T> {
    async fn fetch_cart(&self, token: &str) -> RemoteResult<Vec<RawCartItem>> {
        (**self).fetch_cart(token).await
    }

    async fn add_item(&self, token: &str, item: &CartItem) -> RemoteResult<()> {
        (**self).add_item(token, item).await
    }

    async fn remove_item(&self, token: &str, id: &CourseId) -> RemoteResult<()> {
        (**self).remove_item(token, id).await
    }

    async fn create_order(&self, token: &str, amount: Money) -> RemoteResult<OrderTicket> {
        (**self).create_order(token, amount).await
    }
}
