//! Shopping cart module.
//!
//! Contains the cart item, its wire shape, and the cart state with its
//! derived totals.

mod item;
mod state;

pub use item::{CartItem, RawCartItem, UNTITLED_COURSE};
pub use state::{CartPhase, CartState};
