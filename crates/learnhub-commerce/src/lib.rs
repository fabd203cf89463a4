//! Course cart domain types for LearnHub.
//!
//! This crate holds the plain data the cart subsystem is built on:
//!
//! - **Ids**: newtype identifiers for courses, orders, users and payments
//! - **Money**: minor-unit amounts tagged with a currency
//! - **Cart**: cart items, their wire shape, and the derived cart state
//! - **Errors**: the error kinds surfaced to the presentation layer
//!
//! # Example
//!
//! ```rust
//! use learnhub_commerce::prelude::*;
//!
//! let mut state = CartState::new(Currency::INR);
//! state.push_item(CartItem::new("c1", "Rust for Beginners", Money::from_decimal(500.0, Currency::INR)));
//! state.push_item(CartItem::new("c2", "Async in Depth", Money::from_decimal(1500.0, Currency::INR)));
//!
//! assert_eq!(state.item_count(), 2);
//! assert_eq!(state.subtotal().display(), "\u{20b9}2000.00");
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;

pub use cart::{CartItem, CartPhase, CartState, RawCartItem};
pub use error::CartError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CartError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    pub use crate::cart::{CartItem, CartPhase, CartState, RawCartItem};
}
