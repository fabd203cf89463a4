//! The cart store.
//!
//! [`CartStore`] owns the client-side [`CartState`] and keeps it in step with
//! the remote cart. Mutations are optimistic: the local state changes before
//! the remote call and is rolled back if the call fails. The state lock is
//! never held across an await, so readers always see a consistent snapshot.

use std::sync::{Mutex, MutexGuard, PoisonError};

use learnhub_commerce::{
    CartError, CartItem, CartPhase, CartState, CourseId, Currency, Money, OrderId, PaymentRef,
};
use learnhub_data::CartRemote;
use tracing::{debug, info, warn};

use crate::payment::{PaymentInitiator, PaymentRequest};
use crate::session::AuthSession;

/// Result of [`CartStore::fetch_cart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cart now holds `items` entries; `dropped` remote entries were
    /// malformed or duplicated.
    Replaced { items: usize, dropped: usize },
    /// A newer fetch or a session change made this result stale; it was
    /// not applied.
    Superseded,
}

/// Result of an add or remove.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Applied locally and confirmed remotely.
    Applied,
    /// Nothing to do: already present on add, absent on remove.
    Unchanged,
    /// The remote call failed and the optimistic change was undone.
    RolledBack { error: CartError },
    /// The session ended while the call was in flight; the result was ignored.
    Discarded,
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub payment_ref: PaymentRef,
    pub amount: Money,
    pub signature: Option<String>,
}

struct Inner {
    state: CartState,
    session: Option<AuthSession>,
    /// Bumped whenever the session ends or changes hands.
    epoch: u64,
    /// Bumped on every fetch; only the newest fetch may apply.
    fetch_generation: u64,
}

impl Inner {
    fn ensure_idle(&self) -> Result<(), CartError> {
        let phase = self.state.phase();
        if phase.is_busy() {
            return Err(CartError::ConcurrentOperation { phase });
        }
        Ok(())
    }

    fn require_session(&mut self) -> Result<AuthSession, CartError> {
        match self.session.as_ref().filter(|s| s.is_valid()) {
            Some(session) => Ok(session.clone()),
            None => {
                self.state.set_error(CartError::AuthRequired);
                Err(CartError::AuthRequired)
            }
        }
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.fetch_generation += 1;
        self.state.clear();
    }

    fn reject(&mut self, error: CartError) -> CartError {
        warn!(%error, "cart operation rejected");
        self.state.set_error(error.clone());
        error
    }
}

/// Client-side cart synchronized with a [`CartRemote`].
pub struct CartStore<R, P> {
    remote: R,
    payment: P,
    inner: Mutex<Inner>,
}

impl<R: CartRemote, P: PaymentInitiator> CartStore<R, P> {
    pub fn new(remote: R, payment: P) -> Self {
        Self {
            remote,
            payment,
            inner: Mutex::new(Inner {
                state: CartState::default(),
                session: None,
                epoch: 0,
                fetch_generation: 0,
            }),
        }
    }

    /// Use `currency` for prices that arrive without one. Call before the
    /// first fetch; it resets the cart.
    pub fn with_currency(mut self, currency: Currency) -> Self {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        inner.state = CartState::new(currency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- session -----------------------------------------------------------

    /// Start or refresh a session.
    ///
    /// Refreshing the same learner's token keeps the cart. A different
    /// learner starts from an empty cart.
    pub fn login(&self, session: AuthSession) {
        let mut inner = self.lock();
        let switched = inner
            .session
            .as_ref()
            .is_some_and(|current| current.user_id != session.user_id);
        if switched {
            inner.reset();
        }
        info!(user_id = %session.user_id, switched, "cart session started");
        inner.session = Some(session);
    }

    /// End the session and drop the local cart. Results of calls still in
    /// flight are discarded.
    pub fn logout(&self) {
        let mut inner = self.lock();
        if let Some(session) = inner.session.take() {
            info!(user_id = %session.user_id, "cart session ended");
        }
        inner.reset();
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.lock().session.clone()
    }

    // --- selectors ---------------------------------------------------------

    /// A copy of the current state.
    pub fn snapshot(&self) -> CartState {
        self.lock().state.clone()
    }

    pub fn select_subtotal(&self) -> Money {
        self.lock().state.subtotal()
    }

    pub fn select_item_count(&self) -> usize {
        self.lock().state.item_count()
    }

    pub fn select_savings(&self) -> Money {
        self.lock().state.savings()
    }

    pub fn phase(&self) -> CartPhase {
        self.lock().state.phase()
    }

    pub fn error(&self) -> Option<CartError> {
        self.lock().state.error().cloned()
    }

    /// Dismiss the current error message.
    pub fn clear_error(&self) {
        self.lock().state.clear_error();
    }

    // --- operations --------------------------------------------------------

    /// Replace the local cart with the remote one.
    ///
    /// A fetch may start while another is loading; the older one is then
    /// superseded and its result ignored whenever it arrives. On failure the
    /// previously loaded items stay in place.
    pub async fn fetch_cart(&self) -> Result<FetchOutcome, CartError> {
        let (session, generation, epoch) = {
            let mut inner = self.lock();
            let phase = inner.state.phase();
            if phase.is_busy() && phase != CartPhase::Loading {
                return Err(CartError::ConcurrentOperation { phase });
            }
            let session = inner.require_session()?;
            inner.fetch_generation += 1;
            inner.state.set_phase(CartPhase::Loading);
            (session, inner.fetch_generation, inner.epoch)
        };

        debug!(generation, "fetching cart");
        let result = self.remote.fetch_cart(session.token.as_str()).await;

        let mut inner = self.lock();
        if inner.epoch != epoch || inner.fetch_generation != generation {
            debug!(generation, latest = inner.fetch_generation, "ignoring stale cart fetch");
            return Ok(FetchOutcome::Superseded);
        }

        match result {
            Ok(raw) => {
                let currency = inner.state.currency();
                let received = raw.len();
                let items: Vec<CartItem> = raw
                    .iter()
                    .filter_map(|entry| CartItem::from_raw(entry, currency))
                    .collect();
                let malformed = received - items.len();
                let duplicates = inner.state.replace_items(items);
                let dropped = malformed + duplicates;
                if dropped > 0 {
                    warn!(malformed, duplicates, "dropped unusable cart entries");
                }
                inner.state.clear_error();
                inner.state.settle();
                let items = inner.state.item_count();
                debug!(items, "cart loaded");
                Ok(FetchOutcome::Replaced { items, dropped })
            }
            Err(e) => {
                let error = CartError::from(e);
                warn!(%error, "cart fetch failed, keeping previous items");
                inner.state.set_error(error.clone());
                inner.state.settle();
                Err(error)
            }
        }
    }

    /// Add a course. Adding one that is already in the cart is a no-op.
    ///
    /// A remote failure removes the item again and is reported as
    /// [`MutationOutcome::RolledBack`], with the error also kept on the state.
    pub async fn add_item(&self, item: CartItem) -> Result<MutationOutcome, CartError> {
        let (session, epoch) = {
            let mut inner = self.lock();
            if item.id.is_blank() {
                return Err(inner.reject(CartError::Validation(
                    "course id must not be empty".into(),
                )));
            }
            let negative = |m: &Money| m.amount_minor < 0;
            if negative(&item.price) || item.original_price.as_ref().is_some_and(negative) {
                return Err(inner.reject(CartError::Validation(
                    "price must not be negative".into(),
                )));
            }
            inner.ensure_idle()?;
            if inner.state.contains(&item.id) {
                debug!(course_id = %item.id, "course already in cart");
                return Ok(MutationOutcome::Unchanged);
            }
            let currency = inner.state.currency();
            if item.price.currency != currency {
                return Err(inner.reject(CartError::Validation(format!(
                    "price in {} but the cart is in {}",
                    item.price.currency.code(),
                    currency.code()
                ))));
            }
            let session = inner.require_session()?;
            inner.state.push_item(item.clone());
            inner.state.set_phase(CartPhase::Mutating);
            (session, inner.epoch)
        };

        debug!(course_id = %item.id, "adding course");
        let result = self.remote.add_item(session.token.as_str(), &item).await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Ok(MutationOutcome::Discarded);
        }
        match result {
            Ok(()) => {
                inner.state.clear_error();
                inner.state.settle();
                Ok(MutationOutcome::Applied)
            }
            Err(e) => {
                let error = CartError::from(e);
                warn!(course_id = %item.id, %error, "add failed, rolling back");
                inner.state.remove_item(&item.id);
                inner.state.set_error(error.clone());
                inner.state.settle();
                Ok(MutationOutcome::RolledBack { error })
            }
        }
    }

    /// Remove a course. Removing one that is not in the cart is a no-op.
    ///
    /// A remote failure puts the item back at its previous position.
    pub async fn remove_item(&self, id: &CourseId) -> Result<MutationOutcome, CartError> {
        let (session, epoch, index, removed) = {
            let mut inner = self.lock();
            if id.is_blank() {
                return Err(inner.reject(CartError::Validation(
                    "course id must not be empty".into(),
                )));
            }
            inner.ensure_idle()?;
            if !inner.state.contains(id) {
                debug!(course_id = %id, "course not in cart");
                return Ok(MutationOutcome::Unchanged);
            }
            let session = inner.require_session()?;
            let Some((index, removed)) = inner.state.remove_item(id) else {
                return Ok(MutationOutcome::Unchanged);
            };
            inner.state.set_phase(CartPhase::Mutating);
            (session, inner.epoch, index, removed)
        };

        debug!(course_id = %id, "removing course");
        let result = self.remote.remove_item(session.token.as_str(), id).await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Ok(MutationOutcome::Discarded);
        }
        match result {
            Ok(()) => {
                inner.state.clear_error();
                inner.state.settle();
                Ok(MutationOutcome::Applied)
            }
            Err(e) => {
                let error = CartError::from(e);
                warn!(course_id = %id, %error, "remove failed, restoring item");
                inner.state.restore_item(index, removed);
                inner.state.set_error(error.clone());
                inner.state.settle();
                Ok(MutationOutcome::RolledBack { error })
            }
        }
    }

    /// Create an order for the subtotal and collect payment.
    ///
    /// The cart is cleared only after payment succeeds. Any failure leaves
    /// the items in place with the error recorded on the state.
    pub async fn checkout(&self) -> Result<CheckoutReceipt, CartError> {
        let (session, amount, count, epoch) = {
            let mut inner = self.lock();
            inner.ensure_idle()?;
            if inner.state.is_empty() {
                return Err(inner.reject(CartError::EmptyCart));
            }
            let session = inner.require_session()?;
            inner.state.set_phase(CartPhase::CheckingOut);
            (
                session,
                inner.state.subtotal(),
                inner.state.item_count(),
                inner.epoch,
            )
        };

        info!(items = count, amount = %amount, "starting checkout");
        let ticket = match self.remote.create_order(session.token.as_str(), amount).await {
            Ok(ticket) => ticket,
            Err(e) => return Err(self.abort_checkout(epoch, CartError::from(e))),
        };
        debug!(order_id = %ticket.order_id, "order created");

        let request = PaymentRequest {
            order_id: ticket.order_id.clone(),
            amount,
            description: describe_order(count),
            customer: session.user_id.clone(),
        };
        let confirmation = match self.payment.initiate(request).await {
            Ok(confirmation) => confirmation,
            Err(failure) => {
                let error = CartError::PaymentFailed(failure.to_string());
                return Err(self.abort_checkout(epoch, error));
            }
        };

        let mut inner = self.lock();
        if inner.epoch == epoch {
            inner.state.clear();
        }
        info!(
            order_id = %ticket.order_id,
            payment_ref = %confirmation.payment_ref,
            amount = %amount,
            "checkout complete"
        );
        Ok(CheckoutReceipt {
            order_id: ticket.order_id,
            payment_ref: confirmation.payment_ref,
            amount,
            signature: confirmation.signature,
        })
    }

    fn abort_checkout(&self, epoch: u64, error: CartError) -> CartError {
        warn!(%error, "checkout failed");
        let mut inner = self.lock();
        if inner.epoch == epoch {
            inner.state.set_error(error.clone());
            inner.state.settle();
        }
        error
    }
}

fn describe_order(count: usize) -> String {
    match count {
        1 => "1 course".to_string(),
        n => format!("{n} courses"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{PaymentConfirmation, PaymentFailure, PaymentResult};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use learnhub_commerce::RawCartItem;
    use learnhub_data::{OrderTicket, RemoteError, RemoteResult};
    use rstest::rstest;
    use serde_json::json;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    // --- doubles -------------------------------------------------------------

    enum Script<T> {
        Now(RemoteResult<T>),
        Gated(oneshot::Receiver<RemoteResult<T>>),
    }

    impl<T> Script<T> {
        async fn resolve(self) -> RemoteResult<T> {
            match self {
                Script::Now(result) => result,
                Script::Gated(gate) => gate
                    .await
                    .unwrap_or_else(|_| Err(RemoteError::Connection("gate dropped".into()))),
            }
        }
    }

    #[derive(Default)]
    struct FakeRemote {
        fetches: Mutex<VecDeque<Script<Vec<RawCartItem>>>>,
        adds: Mutex<VecDeque<Script<()>>>,
        removes: Mutex<VecDeque<Script<()>>>,
        orders: Mutex<VecDeque<RemoteResult<OrderTicket>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRemote {
        fn on_fetch(&self, script: Script<Vec<RawCartItem>>) {
            self.fetches.lock().unwrap().push_back(script);
        }

        fn on_add(&self, script: Script<()>) {
            self.adds.lock().unwrap().push_back(script);
        }

        fn on_remove(&self, script: Script<()>) {
            self.removes.lock().unwrap().push_back(script);
        }

        fn on_order(&self, result: RemoteResult<OrderTicket>) {
            self.orders.lock().unwrap().push_back(result);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl CartRemote for FakeRemote {
        async fn fetch_cart(&self, _token: &str) -> RemoteResult<Vec<RawCartItem>> {
            self.record("fetch".into());
            let script = self.fetches.lock().unwrap().pop_front();
            match script {
                Some(script) => script.resolve().await,
                None => Ok(Vec::new()),
            }
        }

        async fn add_item(&self, _token: &str, item: &CartItem) -> RemoteResult<()> {
            self.record(format!("add {}", item.id));
            let script = self.adds.lock().unwrap().pop_front();
            match script {
                Some(script) => script.resolve().await,
                None => Ok(()),
            }
        }

        async fn remove_item(&self, _token: &str, id: &CourseId) -> RemoteResult<()> {
            self.record(format!("remove {id}"));
            let script = self.removes.lock().unwrap().pop_front();
            match script {
                Some(script) => script.resolve().await,
                None => Ok(()),
            }
        }

        async fn create_order(&self, _token: &str, amount: Money) -> RemoteResult<OrderTicket> {
            self.record(format!("order {}", amount.amount_minor));
            let scripted = self.orders.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| {
                Ok(OrderTicket {
                    order_id: OrderId::new("order_1"),
                    amount: Some(amount.amount_minor),
                    currency: Some(amount.currency.code().to_string()),
                })
            })
        }
    }

    #[derive(Default)]
    struct FakePayment {
        outcome: Mutex<Option<PaymentResult>>,
        requests: Mutex<Vec<PaymentRequest>>,
    }

    impl FakePayment {
        fn failing(reason: &str) -> Self {
            Self {
                outcome: Mutex::new(Some(Err(PaymentFailure::Declined(reason.into())))),
                requests: Mutex::default(),
            }
        }

        fn requests(&self) -> Vec<PaymentRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentInitiator for FakePayment {
        async fn initiate(&self, request: PaymentRequest) -> PaymentResult {
            let payment_ref = PaymentRef::new(format!("pay_{}", request.order_id));
            self.requests.lock().unwrap().push(request);
            self.outcome.lock().unwrap().take().unwrap_or(Ok(PaymentConfirmation {
                payment_ref,
                signature: Some("sig".into()),
            }))
        }
    }

    type TestStore = CartStore<Arc<FakeRemote>, Arc<FakePayment>>;

    fn store_with(remote: &Arc<FakeRemote>, payment: &Arc<FakePayment>) -> TestStore {
        let store = CartStore::new(remote.clone(), payment.clone());
        store.login(AuthSession::new("learner_1", "jwt-token"));
        store
    }

    fn raw(value: serde_json::Value) -> RawCartItem {
        serde_json::from_value(value).unwrap()
    }

    fn course(id: &str, rupees: f64) -> CartItem {
        CartItem::new(id, format!("Course {id}"), Money::from_decimal(rupees, Currency::INR))
    }

    fn ids(state: &CartState) -> Vec<&str> {
        state.items().iter().map(|i| i.id.as_str()).collect()
    }

    async fn loaded_store(
        remote: &Arc<FakeRemote>,
        payment: &Arc<FakePayment>,
        items: &[(&str, f64)],
    ) -> TestStore {
        let entries = items
            .iter()
            .map(|(id, price)| raw(json!({ "id": id, "name": id, "price": price })))
            .collect();
        remote.on_fetch(Script::Now(Ok(entries)));
        let store = store_with(remote, payment);
        store.fetch_cart().await.unwrap();
        store
    }

    fn unavailable() -> RemoteError {
        RemoteError::Http {
            status: 503,
            url: "http://test/cart".into(),
        }
    }

    // --- fetch ---------------------------------------------------------------

    #[tokio::test]
    async fn test_fetch_populates_cart_and_subtotal() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0), ("c2", 1500.0)]).await;

        assert_eq!(store.select_item_count(), 2);
        assert_eq!(store.select_subtotal().to_decimal(), 2000.0);
        assert_eq!(store.phase(), CartPhase::Ready);
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_fetch_skips_malformed_and_duplicate_entries() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        remote.on_fetch(Script::Now(Ok(vec![
            raw(json!({ "id": "c1", "price": 500 })),
            raw(json!({ "name": "no id", "price": 100 })),
            raw(json!({ "course": { "_id": "c2", "title": "Nested", "price": 250 } })),
            raw(json!({ "id": "c1", "price": 999 })),
        ])));
        let store = store_with(&remote, &payment);

        let outcome = store.fetch_cart().await.unwrap();

        assert_eq!(outcome, FetchOutcome::Replaced { items: 2, dropped: 2 });
        let state = store.snapshot();
        assert_eq!(ids(&state), ["c1", "c2"]);
        assert_eq!(state.subtotal().to_decimal(), 750.0);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_items() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;
        remote.on_fetch(Script::Now(Err(unavailable())));

        let err = store.fetch_cart().await.unwrap_err();

        assert!(matches!(err, CartError::RemoteUnavailable(_)));
        let state = store.snapshot();
        assert_eq!(ids(&state), ["c1"]);
        assert_eq!(state.phase(), CartPhase::Ready);
        assert_eq!(state.error(), Some(&err));
    }

    #[tokio::test]
    async fn test_fetch_requires_session() {
        let remote = Arc::new(FakeRemote::default());
        let store = CartStore::new(remote.clone(), Arc::new(FakePayment::default()));

        let err = store.fetch_cart().await.unwrap_err();

        assert_eq!(err, CartError::AuthRequired);
        assert_eq!(store.error(), Some(CartError::AuthRequired));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_older_fetch_resolving_last_is_ignored() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        remote.on_fetch(Script::Gated(first_rx));
        remote.on_fetch(Script::Gated(second_rx));
        let store = store_with(&remote, &payment);

        let release = async {
            second_tx
                .send(Ok(vec![raw(json!({ "id": "fresh", "price": 300 }))]))
                .unwrap();
            tokio::task::yield_now().await;
            first_tx
                .send(Ok(vec![raw(json!({ "id": "stale", "price": 100 }))]))
                .unwrap();
        };
        let (first, second, ()) = tokio::join!(store.fetch_cart(), store.fetch_cart(), release);

        assert_eq!(first.unwrap(), FetchOutcome::Superseded);
        assert_eq!(second.unwrap(), FetchOutcome::Replaced { items: 1, dropped: 0 });
        let state = store.snapshot();
        assert_eq!(ids(&state), ["fresh"]);
        assert_eq!(state.phase(), CartPhase::Ready);
    }

    // --- add -----------------------------------------------------------------

    #[tokio::test]
    async fn test_add_appends_and_updates_subtotal() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0), ("c2", 1500.0)]).await;

        let outcome = store.add_item(course("c3", 700.0)).await.unwrap();

        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(store.select_item_count(), 3);
        assert_eq!(store.select_subtotal().to_decimal(), 2700.0);
        assert_eq!(remote.calls().last().map(String::as_str), Some("add c3"));
    }

    #[tokio::test]
    async fn test_add_duplicate_is_noop_without_remote_call() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;
        let calls_before = remote.calls().len();

        let outcome = store.add_item(course("c1", 500.0)).await.unwrap();

        assert_eq!(outcome, MutationOutcome::Unchanged);
        assert_eq!(store.select_item_count(), 1);
        assert_eq!(remote.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_add_rejected_rolls_back() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;
        remote.on_add(Script::Now(Err(RemoteError::Rejected("course unavailable".into()))));

        let outcome = store.add_item(course("c2", 900.0)).await.unwrap();

        let expected = CartError::Validation("course unavailable".into());
        assert_eq!(outcome, MutationOutcome::RolledBack { error: expected.clone() });
        let state = store.snapshot();
        assert_eq!(ids(&state), ["c1"]);
        assert_eq!(state.error(), Some(&expected));
        assert_eq!(state.phase(), CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_add_is_visible_before_remote_confirms() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let (tx, rx) = oneshot::channel();
        remote.on_add(Script::Gated(rx));
        let store = store_with(&remote, &payment);

        let observe = async {
            let state = store.snapshot();
            assert_eq!(ids(&state), ["c1"]);
            assert_eq!(state.phase(), CartPhase::Mutating);
            tx.send(Ok(())).unwrap();
        };
        let (outcome, ()) = tokio::join!(store.add_item(course("c1", 100.0)), observe);

        assert!(outcome.unwrap().is_applied());
        assert_eq!(store.phase(), CartPhase::Ready);
    }

    #[rstest]
    #[case::blank_id(CartItem::new("  ", "Blank", Money::new(100, Currency::INR)))]
    #[case::wrong_currency(CartItem::new("c9", "Dollar", Money::new(100, Currency::USD)))]
    #[case::negative_price(CartItem::new("c9", "Refund", Money::new(-80_000, Currency::INR)))]
    #[case::negative_list_price(
        CartItem::new("c9", "Odd", Money::new(100, Currency::INR))
            .with_original_price(Money::new(-100, Currency::INR))
    )]
    #[tokio::test]
    async fn test_add_invalid_item_is_validation_error(#[case] item: CartItem) {
        let remote = Arc::new(FakeRemote::default());
        let store = store_with(&remote, &Arc::new(FakePayment::default()));

        let err = store.add_item(item).await.unwrap_err();

        assert!(matches!(err, CartError::Validation(_)));
        assert!(store.snapshot().is_empty());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_negative_price_cannot_reduce_checkout_amount() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;

        let refund = CartItem::new("c2", "Refund", Money::new(-80_000, Currency::INR));
        let err = store.add_item(refund).await.unwrap_err();

        assert!(matches!(err, CartError::Validation(_)));
        assert_eq!(ids(&store.snapshot()), ["c1"]);
        assert_eq!(store.select_subtotal(), Money::new(50_000, Currency::INR));
        assert!(!remote.calls().iter().any(|c| c.starts_with("add")));

        let receipt = store.checkout().await.unwrap();
        assert_eq!(receipt.amount, Money::new(50_000, Currency::INR));
    }

    #[tokio::test]
    async fn test_concurrent_mutation_is_rejected() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let (tx, rx) = oneshot::channel();
        remote.on_add(Script::Gated(rx));
        let store = store_with(&remote, &payment);

        let second = async {
            let result = store.add_item(course("c2", 200.0)).await;
            tx.send(Ok(())).unwrap();
            result
        };
        let (first, second) = tokio::join!(store.add_item(course("c1", 100.0)), second);

        assert_eq!(first.unwrap(), MutationOutcome::Applied);
        assert_eq!(
            second.unwrap_err(),
            CartError::ConcurrentOperation { phase: CartPhase::Mutating }
        );
        assert_eq!(ids(&store.snapshot()), ["c1"]);
    }

    // --- remove --------------------------------------------------------------

    #[tokio::test]
    async fn test_remove_absent_item_changes_nothing() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;
        let before = store.snapshot();
        let calls_before = remote.calls().len();

        let outcome = store.remove_item(&CourseId::new("missing")).await.unwrap();

        assert_eq!(outcome, MutationOutcome::Unchanged);
        assert_eq!(store.snapshot(), before);
        assert_eq!(remote.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_remove_applies() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0), ("c2", 1500.0)]).await;

        let outcome = store.remove_item(&CourseId::new("c1")).await.unwrap();

        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(ids(&store.snapshot()), ["c2"]);
        assert_eq!(store.select_subtotal().to_decimal(), 1500.0);
    }

    #[tokio::test]
    async fn test_remove_failure_restores_position() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store =
            loaded_store(&remote, &payment, &[("c1", 100.0), ("c2", 200.0), ("c3", 300.0)]).await;
        remote.on_remove(Script::Now(Err(unavailable())));

        let outcome = store.remove_item(&CourseId::new("c2")).await.unwrap();

        assert!(matches!(
            outcome,
            MutationOutcome::RolledBack { error: CartError::RemoteUnavailable(_) }
        ));
        let state = store.snapshot();
        assert_eq!(ids(&state), ["c1", "c2", "c3"]);
        assert!(state.error().is_some());
    }

    #[tokio::test]
    async fn test_removing_last_item_empties_cart() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 100.0)]).await;

        store.remove_item(&CourseId::new("c1")).await.unwrap();

        assert_eq!(store.phase(), CartPhase::Empty);
        assert!(store.select_subtotal().is_zero());
    }

    // --- checkout ------------------------------------------------------------

    #[tokio::test]
    async fn test_checkout_empty_cart_makes_no_remote_call() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = store_with(&remote, &payment);

        let err = store.checkout().await.unwrap_err();

        assert_eq!(err, CartError::EmptyCart);
        assert_eq!(store.error(), Some(CartError::EmptyCart));
        assert!(remote.calls().is_empty());
        assert!(payment.requests().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_with_expired_session_requires_auth() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;
        store.login(
            AuthSession::new("learner_1", "jwt-token").with_expiry(Utc::now() - Duration::hours(1)),
        );

        let err = store.checkout().await.unwrap_err();

        assert_eq!(err, CartError::AuthRequired);
        assert!(err.requires_login());
        assert_eq!(store.select_item_count(), 1);
        assert!(payment.requests().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_success_clears_cart() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0), ("c2", 1500.0)]).await;

        let receipt = store.checkout().await.unwrap();

        assert_eq!(receipt.order_id.as_str(), "order_1");
        assert_eq!(receipt.payment_ref.as_str(), "pay_order_1");
        assert_eq!(receipt.amount, Money::new(200_000, Currency::INR));

        let requests = payment.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, receipt.amount);
        assert_eq!(requests[0].description, "2 courses");
        assert_eq!(requests[0].customer.as_str(), "learner_1");
        assert!(remote.calls().contains(&"order 200000".to_string()));

        let state = store.snapshot();
        assert!(state.is_empty());
        assert_eq!(state.phase(), CartPhase::Empty);
        assert!(state.error().is_none());
    }

    #[tokio::test]
    async fn test_checkout_payment_failure_keeps_items() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::failing("card declined"));
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;

        let err = store.checkout().await.unwrap_err();

        assert_eq!(err, CartError::PaymentFailed("card declined".into()));
        let state = store.snapshot();
        assert_eq!(ids(&state), ["c1"]);
        assert_eq!(state.phase(), CartPhase::Ready);
        assert_eq!(state.error(), Some(&err));
    }

    #[tokio::test]
    async fn test_checkout_order_failure_skips_payment() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;
        remote.on_order(Err(RemoteError::Timeout("http://test/orders".into())));

        let err = store.checkout().await.unwrap_err();

        assert!(err.is_retryable());
        assert!(payment.requests().is_empty());
        assert_eq!(store.select_item_count(), 1);
    }

    // --- session -------------------------------------------------------------

    #[tokio::test]
    async fn test_logout_discards_in_flight_add() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let (tx, rx) = oneshot::channel();
        remote.on_add(Script::Gated(rx));
        let store = store_with(&remote, &payment);

        let sign_out = async {
            store.logout();
            tx.send(Err(unavailable())).unwrap();
        };
        let (outcome, ()) = tokio::join!(store.add_item(course("c1", 100.0)), sign_out);

        assert_eq!(outcome.unwrap(), MutationOutcome::Discarded);
        let state = store.snapshot();
        assert!(state.is_empty());
        assert!(state.error().is_none());
        assert!(store.session().is_none());
    }

    #[tokio::test]
    async fn test_switching_learner_resets_cart() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = loaded_store(&remote, &payment, &[("c1", 500.0)]).await;

        store.login(AuthSession::new("learner_1", "refreshed"));
        assert_eq!(store.select_item_count(), 1);

        store.login(AuthSession::new("learner_2", "other"));
        assert_eq!(store.select_item_count(), 0);
    }

    // --- derived values --------------------------------------------------------

    #[tokio::test]
    async fn test_savings_from_original_prices() {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        remote.on_fetch(Script::Now(Ok(vec![
            raw(json!({ "id": "c1", "price": 499, "originalPrice": 999 })),
            raw(json!({ "id": "c2", "price": 300 })),
        ])));
        let store = store_with(&remote, &payment);
        store.fetch_cart().await.unwrap();

        assert_eq!(store.select_savings().to_decimal(), 500.0);
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    #[case(42)]
    #[case(2024)]
    #[tokio::test]
    async fn test_random_mutations_keep_totals_consistent(#[case] seed: u64) {
        let remote = Arc::new(FakeRemote::default());
        let payment = Arc::new(FakePayment::default());
        let store = store_with(&remote, &payment);
        let mut model: HashSet<String> = HashSet::new();
        let mut rng = seed;

        for _ in 0..60 {
            rng = rng.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            let pick = (rng >> 33) % 6;
            let id = format!("c{pick}");
            if (rng >> 20) & 1 == 0 {
                store.add_item(course(&id, 100.0 * (pick + 1) as f64)).await.unwrap();
                model.insert(id);
            } else {
                store.remove_item(&CourseId::new(id.as_str())).await.unwrap();
                model.remove(&id);
            }

            let state = store.snapshot();
            assert_eq!(state.item_count(), model.len());
            let expected: i64 = state.items().iter().map(|i| i.price.amount_minor).sum();
            assert_eq!(state.subtotal().amount_minor, expected);
            let unique: HashSet<_> = state.items().iter().map(|i| &i.id).collect();
            assert_eq!(unique.len(), state.item_count());
            assert!(!state.phase().is_busy());
        }
    }
}
