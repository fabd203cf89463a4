//! Cart state and derived totals.

use crate::cart::CartItem;
use crate::error::CartError;
use crate::ids::CourseId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartPhase {
    /// Nothing loaded, or the cart was cleared.
    #[default]
    Empty,
    /// Fetching from the remote.
    Loading,
    /// Settled with items.
    Ready,
    /// An add or remove is waiting on the remote.
    Mutating,
    /// Checkout is in progress.
    CheckingOut,
}

impl CartPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartPhase::Empty => "empty",
            CartPhase::Loading => "loading",
            CartPhase::Ready => "ready",
            CartPhase::Mutating => "mutating",
            CartPhase::CheckingOut => "checking_out",
        }
    }

    /// True while an operation is suspended on I/O.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            CartPhase::Loading | CartPhase::Mutating | CartPhase::CheckingOut
        )
    }
}

impl fmt::Display for CartPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The client-side view of a learner's cart.
///
/// Totals are computed from `items` on every call, so they cannot drift from
/// the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CartState {
    items: Vec<CartItem>,
    phase: CartPhase,
    error: Option<CartError>,
    currency: Currency,
}

impl CartState {
    pub fn new(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            phase: CartPhase::Empty,
            error: None,
            currency,
        }
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn phase(&self) -> CartPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&CartError> {
        self.error.as_ref()
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of item prices.
    pub fn subtotal(&self) -> Money {
        let total = self
            .items
            .iter()
            .fold(0i64, |acc, item| acc.saturating_add(item.price.amount_minor));
        Money::new(total, self.currency)
    }

    /// Sum of per-item discounts against original prices.
    pub fn savings(&self) -> Money {
        let total = self
            .items
            .iter()
            .filter_map(CartItem::discount)
            .fold(0i64, |acc, d| acc.saturating_add(d.amount_minor));
        Money::new(total, self.currency)
    }

    pub fn contains(&self, id: &CourseId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &CourseId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub fn position(&self, id: &CourseId) -> Option<usize> {
        self.items.iter().position(|i| &i.id == id)
    }

    /// Replace the whole collection, keeping the first of any duplicate ids.
    ///
    /// Returns how many duplicates were dropped.
    pub fn replace_items(&mut self, items: Vec<CartItem>) -> usize {
        let incoming = items.len();
        self.items.clear();
        for item in items {
            if !self.contains(&item.id) {
                self.items.push(item);
            }
        }
        incoming - self.items.len()
    }

    /// Append an item. Returns false, leaving the cart as is, on a duplicate id.
    pub fn push_item(&mut self, item: CartItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove an item, returning where it was and what it was.
    pub fn remove_item(&mut self, id: &CourseId) -> Option<(usize, CartItem)> {
        let index = self.position(id)?;
        Some((index, self.items.remove(index)))
    }

    /// Put a removed item back near its old position, unless it is already
    /// present again.
    pub fn restore_item(&mut self, index: usize, item: CartItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.phase = CartPhase::Empty;
        self.error = None;
    }

    pub fn set_phase(&mut self, phase: CartPhase) {
        self.phase = phase;
    }

    /// Leave any busy phase: `Ready` with items, `Empty` without.
    pub fn settle(&mut self) {
        self.phase = if self.items.is_empty() {
            CartPhase::Empty
        } else {
            CartPhase::Ready
        };
    }

    pub fn set_error(&mut self, error: CartError) {
        self.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}
