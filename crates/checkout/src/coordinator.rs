//! Checkout coordinator.
//!
//! Drives a checkout attempt through its two phases:
//!
//! 1. **Validate** — re-read the catalog for every cart line, report every
//!    violation at once, and price the order from catalog data. Cart-held
//!    names and prices are display copies and are never trusted here.
//!    Validation mutates nothing.
//! 2. **Commit** — decrement stock line by line with the store's atomic
//!    floor-checked decrement. If any line fails, the already-applied
//!    decrements are rolled back in reverse and the attempt is rejected.
//!    Only a fully-committed attempt records an order and clears the cart.

use std::sync::Arc;

use chrono::Utc;

use cart::{CartService, CartSnapshot, CartStore};
use catalog::{CatalogError, CatalogStore};
use common::{Identity, Money};

use crate::error::{CheckoutError, Result, StockViolation};
use crate::order::{Order, OrderId, OrderLine, OrderRepository, ShippingInfo};
use crate::pricing::{OrderTotals, PricingPolicy};
use crate::state::CheckoutState;

/// A validated cart priced from the catalog, awaiting commit.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReservation {
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
}

/// One checkout attempt over a cart snapshot.
#[derive(Debug, Clone)]
pub struct Checkout {
    identity: Identity,
    snapshot: CartSnapshot,
    state: CheckoutState,
    reservation: Option<PendingReservation>,
}

impl Checkout {
    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// The pending reservation, present once validation has passed.
    pub fn reservation(&self) -> Option<&PendingReservation> {
        self.reservation.as_ref()
    }
}

/// Coordinates validation and commit against the catalog and order store.
pub struct CheckoutCoordinator<C: CatalogStore, R: OrderRepository> {
    catalog: Arc<C>,
    orders: Arc<R>,
    pricing: PricingPolicy,
}

impl<C: CatalogStore, R: OrderRepository> CheckoutCoordinator<C, R> {
    /// Creates a coordinator with the default pricing policy.
    pub fn new(catalog: Arc<C>, orders: Arc<R>) -> Self {
        Self::with_pricing(catalog, orders, PricingPolicy::default())
    }

    /// Creates a coordinator with an explicit pricing policy.
    pub fn with_pricing(catalog: Arc<C>, orders: Arc<R>, pricing: PricingPolicy) -> Self {
        Self {
            catalog,
            orders,
            pricing,
        }
    }

    pub fn pricing(&self) -> PricingPolicy {
        self.pricing
    }

    /// Opens a checkout attempt over a cart snapshot.
    ///
    /// The snapshot is fixed for the attempt's lifetime; later cart
    /// mutations do not affect it.
    pub fn begin(&self, identity: Identity, snapshot: CartSnapshot) -> Result<Checkout> {
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        metrics::counter!("checkout_attempts").increment(1);
        Ok(Checkout {
            identity,
            snapshot,
            state: CheckoutState::Draft,
            reservation: None,
        })
    }

    /// Validates the checkout's cart snapshot against the current catalog.
    ///
    /// Every line is checked and every violation reported; a single bad
    /// line never hides the others. Lines are re-priced from the catalog.
    /// On failure the attempt is rejected; nothing is mutated either way.
    #[tracing::instrument(skip(self, checkout), fields(identity = %checkout.identity.storage_key()))]
    pub async fn validate(&self, checkout: &mut Checkout) -> Result<PendingReservation> {
        if !checkout.state.can_validate() {
            return Err(CheckoutError::InvalidState {
                state: checkout.state,
            });
        }

        let mut violations = Vec::new();
        let mut lines = Vec::new();

        for line in &checkout.snapshot.lines {
            match self.catalog.get(line.item_id).await? {
                None => violations.push(StockViolation::ItemNotFound {
                    item_id: line.item_id,
                }),
                Some(item) if item.stock_level < line.quantity => {
                    violations.push(StockViolation::InsufficientStock {
                        item_id: line.item_id,
                        available: item.stock_level,
                        requested: line.quantity,
                    });
                }
                Some(item) => lines.push(OrderLine {
                    item_id: item.id,
                    name: item.name,
                    unit_price: item.price,
                    quantity: line.quantity,
                }),
            }
        }

        if !violations.is_empty() {
            checkout.state = CheckoutState::Rejected;
            metrics::counter!("checkout_rejected").increment(1);
            tracing::info!(count = violations.len(), "checkout validation failed");
            return Err(CheckoutError::ValidationFailed(violations));
        }

        let subtotal: Money = lines.iter().map(OrderLine::line_total).sum();
        let reservation = PendingReservation {
            lines,
            totals: self.pricing.totals(subtotal),
        };
        checkout.reservation = Some(reservation.clone());
        checkout.state = CheckoutState::Validating;
        Ok(reservation)
    }

    /// Commits a validated checkout: decrements stock, records the order,
    /// and clears the cart.
    ///
    /// Stock is taken line by line with the catalog's atomic decrement. A
    /// failure on any line rolls back the decrements already applied, in
    /// reverse order, and rejects the attempt with a retryable conflict.
    /// A failure writing the order record rolls back the same way; stock
    /// is never left decremented without an order on record.
    #[tracing::instrument(skip(self, checkout, carts, shipping), fields(identity = %checkout.identity.storage_key()))]
    pub async fn commit<S: CartStore>(
        &self,
        checkout: &mut Checkout,
        shipping: ShippingInfo,
        payment_method: impl Into<String> + std::fmt::Debug,
        carts: &CartService<S, C>,
    ) -> Result<Order> {
        if !checkout.state.can_commit() {
            return Err(CheckoutError::InvalidState {
                state: checkout.state,
            });
        }
        let commit_start = std::time::Instant::now();

        // can_commit implies validate has populated the reservation.
        let reservation = checkout
            .reservation
            .clone()
            .ok_or(CheckoutError::InvalidState {
                state: checkout.state,
            })?;

        let mut applied: Vec<&OrderLine> = Vec::with_capacity(reservation.lines.len());
        for line in &reservation.lines {
            match self.catalog.decrement_stock(line.item_id, line.quantity).await {
                Ok(()) => applied.push(line),
                Err(e) => {
                    self.rollback(&applied).await;
                    checkout.state = CheckoutState::Rejected;
                    metrics::counter!("checkout_conflicts").increment(1);
                    return Err(match e {
                        CatalogError::InsufficientStock {
                            item_id,
                            available,
                            requested,
                        } => CheckoutError::Conflict {
                            item_id,
                            available,
                            requested,
                        },
                        CatalogError::NotFound(item_id) => CheckoutError::Conflict {
                            item_id,
                            available: 0,
                            requested: line.quantity,
                        },
                        other => CheckoutError::Catalog(other),
                    });
                }
            }
        }

        let order = Order {
            id: OrderId::new(),
            identity: checkout.identity,
            lines: reservation.lines.clone(),
            totals: reservation.totals,
            shipping,
            payment_method: payment_method.into(),
            placed_at: Utc::now(),
        };
        if let Err(e) = self.orders.record(order.clone()).await {
            // Stock is already taken; put it back before surfacing the
            // failure, or a retried commit would decrement a second time.
            self.rollback(&applied).await;
            checkout.state = CheckoutState::Rejected;
            metrics::counter!("checkout_rejected").increment(1);
            return Err(e);
        }
        checkout.state = CheckoutState::Committed;

        // The order stands even if clearing the cart fails; the stock is
        // already taken and the record written. The cart can be cleared on
        // a later attempt.
        if let Err(e) = carts.clear(&checkout.identity).await {
            tracing::warn!(error = %e, order_id = %order.id, "failed to clear cart after commit");
        }

        metrics::counter!("checkout_committed").increment(1);
        metrics::histogram!("checkout_commit_duration_seconds")
            .record(commit_start.elapsed().as_secs_f64());
        Ok(order)
    }

    /// Returns already-taken stock, newest decrement first.
    async fn rollback(&self, applied: &[&OrderLine]) {
        for line in applied.iter().rev() {
            if let Err(e) = self.catalog.restock(line.item_id, line.quantity).await {
                // Nothing more can be done here; the discrepancy is logged
                // for operator attention.
                tracing::error!(
                    error = %e,
                    item_id = %line.item_id,
                    quantity = line.quantity,
                    "failed to restock during rollback"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::InMemoryOrderRepository;
    use cart::{CartError, InMemoryCartStore};
    use catalog::{InMemoryCatalogStore, Item, NewItem};
    use common::{ItemId, SessionId};

    struct Fixture {
        catalog: Arc<InMemoryCatalogStore>,
        orders: Arc<InMemoryOrderRepository>,
        carts: CartService<InMemoryCartStore, InMemoryCatalogStore>,
        cart_store: InMemoryCartStore,
        coordinator: CheckoutCoordinator<InMemoryCatalogStore, InMemoryOrderRepository>,
        identity: Identity,
    }

    async fn fixture() -> Fixture {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let cart_store = InMemoryCartStore::new();
        let carts = CartService::new(cart_store.clone(), Arc::clone(&catalog));
        let coordinator = CheckoutCoordinator::new(Arc::clone(&catalog), Arc::clone(&orders));
        Fixture {
            catalog,
            orders,
            carts,
            cart_store,
            coordinator,
            identity: Identity::Anonymous(SessionId::new()),
        }
    }

    async fn seed_item(f: &Fixture, name: &str, cents: i64, stock: u32) -> Item {
        f.catalog
            .create(NewItem::new(name, Money::from_cents(cents), stock))
            .await
            .unwrap()
    }

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            full_name: "Jo Buyer".to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "ZZ".to_string(),
            zip_code: "00001".to_string(),
        }
    }

    #[tokio::test]
    async fn begin_rejects_empty_cart() {
        let f = fixture().await;
        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        let result = f.coordinator.begin(f.identity, snapshot);
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn validate_prices_from_catalog_not_cart() {
        let f = fixture().await;
        let mut item = seed_item(&f, "Widget", 1000, 10).await;
        f.carts.add_item(&f.identity, item.id, 2).await.unwrap();

        // Price changes after the item went into the cart.
        item.price = Money::from_cents(1500);
        f.catalog.update(item.clone()).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        let reservation = f.coordinator.validate(&mut checkout).await.unwrap();

        assert_eq!(reservation.lines[0].unit_price.cents(), 1500);
        assert_eq!(reservation.totals.subtotal.cents(), 3000);
        assert_eq!(checkout.state(), CheckoutState::Validating);
    }

    #[tokio::test]
    async fn validate_aggregates_all_violations() {
        let f = fixture().await;
        let scarce = seed_item(&f, "Scarce", 1000, 1).await;
        let doomed = seed_item(&f, "Doomed", 500, 5).await;
        f.carts.add_item(&f.identity, scarce.id, 3).await.unwrap();
        f.carts.add_item(&f.identity, doomed.id, 1).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        f.catalog.delete(doomed.id).await.unwrap();

        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        let err = f.coordinator.validate(&mut checkout).await.unwrap_err();

        let CheckoutError::ValidationFailed(violations) = err else {
            panic!("expected ValidationFailed, got {err}");
        };
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&StockViolation::InsufficientStock {
            item_id: scarce.id,
            available: 1,
            requested: 3,
        }));
        assert!(violations.contains(&StockViolation::ItemNotFound { item_id: doomed.id }));
        assert_eq!(checkout.state(), CheckoutState::Rejected);
    }

    #[tokio::test]
    async fn validate_mutates_no_stock() {
        let f = fixture().await;
        let item = seed_item(&f, "Widget", 1000, 10).await;
        f.carts.add_item(&f.identity, item.id, 2).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        f.coordinator.validate(&mut checkout).await.unwrap();

        assert_eq!(f.catalog.stock_of(item.id), Some(10));
    }

    #[tokio::test]
    async fn commit_before_validate_is_rejected() {
        let f = fixture().await;
        let item = seed_item(&f, "Widget", 1000, 10).await;
        f.carts.add_item(&f.identity, item.id, 1).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();

        let result = f
            .coordinator
            .commit(&mut checkout, shipping(), "card", &f.carts)
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::InvalidState {
                state: CheckoutState::Draft
            })
        ));
    }

    #[tokio::test]
    async fn validate_twice_is_rejected() {
        let f = fixture().await;
        let item = seed_item(&f, "Widget", 1000, 10).await;
        f.carts.add_item(&f.identity, item.id, 1).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        f.coordinator.validate(&mut checkout).await.unwrap();

        let result = f.coordinator.validate(&mut checkout).await;
        assert!(matches!(result, Err(CheckoutError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn commit_takes_stock_records_order_and_clears_cart() {
        let f = fixture().await;
        let item = seed_item(&f, "Widget", 1000, 10).await;
        f.carts.add_item(&f.identity, item.id, 3).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        f.coordinator.validate(&mut checkout).await.unwrap();

        let order = f
            .coordinator
            .commit(&mut checkout, shipping(), "card", &f.carts)
            .await
            .unwrap();

        assert_eq!(checkout.state(), CheckoutState::Committed);
        assert_eq!(f.catalog.stock_of(item.id), Some(7));
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.totals.subtotal.cents(), 3000);
        assert_eq!(order.payment_method, "card");

        // Order is on record and the cart is empty.
        let recorded = f.orders.get(order.id).await.unwrap().unwrap();
        assert_eq!(recorded.id, order.id);
        let cart = f.carts.snapshot(&f.identity).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn commit_conflict_rolls_back_applied_decrements() {
        let f = fixture().await;
        let first = seed_item(&f, "A First", 1000, 5).await;
        let second = seed_item(&f, "B Second", 500, 5).await;
        f.carts.add_item(&f.identity, first.id, 2).await.unwrap();
        f.carts.add_item(&f.identity, second.id, 4).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        f.coordinator.validate(&mut checkout).await.unwrap();

        // A rival purchase lands between validate and commit.
        f.catalog.decrement_stock(second.id, 3).await.unwrap();

        let err = f
            .coordinator
            .commit(&mut checkout, shipping(), "card", &f.carts)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Conflict {
                available: 2,
                requested: 4,
                ..
            }
        ));
        assert_eq!(checkout.state(), CheckoutState::Rejected);
        // First line's decrement was rolled back; the rival's purchase stands.
        assert_eq!(f.catalog.stock_of(first.id), Some(5));
        assert_eq!(f.catalog.stock_of(second.id), Some(2));
        // Nothing was recorded and the cart survives.
        assert_eq!(f.orders.order_count(), 0);
        let cart = f.carts.snapshot(&f.identity).await.unwrap();
        assert_eq!(cart.lines.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_commits_take_stock_exactly_once() {
        let f = fixture().await;
        let item = seed_item(&f, "Last one", 1000, 1).await;

        let a = Identity::Anonymous(SessionId::new());
        let b = Identity::Anonymous(SessionId::new());
        f.carts.add_item(&a, item.id, 1).await.unwrap();
        f.carts.add_item(&b, item.id, 1).await.unwrap();

        // Both validate against stock 1 and race to commit.
        let snap_a = f.carts.snapshot(&a).await.unwrap();
        let snap_b = f.carts.snapshot(&b).await.unwrap();
        let mut checkout_a = f.coordinator.begin(a, snap_a).unwrap();
        let mut checkout_b = f.coordinator.begin(b, snap_b).unwrap();
        f.coordinator.validate(&mut checkout_a).await.unwrap();
        f.coordinator.validate(&mut checkout_b).await.unwrap();

        let result_a = f
            .coordinator
            .commit(&mut checkout_a, shipping(), "card", &f.carts)
            .await;
        let result_b = f
            .coordinator
            .commit(&mut checkout_b, shipping(), "card", &f.carts)
            .await;

        assert!(result_a.is_ok());
        assert!(matches!(
            result_b,
            Err(CheckoutError::Conflict {
                available: 0,
                requested: 1,
                ..
            })
        ));
        assert_eq!(f.catalog.stock_of(item.id), Some(0));
        assert_eq!(f.orders.order_count(), 1);
    }

    struct FailingOrderRepository;

    #[async_trait::async_trait]
    impl OrderRepository for FailingOrderRepository {
        async fn record(&self, _order: Order) -> Result<()> {
            Err(CheckoutError::OrderStore("order store down".to_string()))
        }

        async fn get(&self, _id: OrderId) -> Result<Option<Order>> {
            Ok(None)
        }

        async fn list_for(&self, _identity: &Identity) -> Result<Vec<Order>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn record_failure_rolls_back_stock_and_rejects() {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let carts = CartService::new(InMemoryCartStore::new(), Arc::clone(&catalog));
        let coordinator =
            CheckoutCoordinator::new(Arc::clone(&catalog), Arc::new(FailingOrderRepository));
        let identity = Identity::Anonymous(SessionId::new());

        let item = catalog
            .create(NewItem::new("Widget", Money::from_cents(1000), 5))
            .await
            .unwrap();
        carts.add_item(&identity, item.id, 2).await.unwrap();

        let snapshot = carts.snapshot(&identity).await.unwrap();
        let mut checkout = coordinator.begin(identity, snapshot).unwrap();
        coordinator.validate(&mut checkout).await.unwrap();

        let err = coordinator
            .commit(&mut checkout, shipping(), "card", &carts)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OrderStore(_)));

        // Decrements were rolled back and the attempt is terminal; a
        // second commit cannot take stock again.
        assert_eq!(catalog.stock_of(item.id), Some(5));
        assert_eq!(checkout.state(), CheckoutState::Rejected);
        let retry = coordinator
            .commit(&mut checkout, shipping(), "card", &carts)
            .await;
        assert!(matches!(retry, Err(CheckoutError::InvalidState { .. })));

        // The cart survives for a fresh checkout attempt.
        let cart = carts.snapshot(&identity).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
    }

    #[tokio::test]
    async fn commit_survives_cart_clear_failure() {
        let f = fixture().await;
        let item = seed_item(&f, "Widget", 1000, 10).await;
        f.carts.add_item(&f.identity, item.id, 1).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        f.coordinator.validate(&mut checkout).await.unwrap();

        f.cart_store.set_fail_on_delete(true);

        let order = f
            .coordinator
            .commit(&mut checkout, shipping(), "card", &f.carts)
            .await
            .unwrap();

        // The order stands; stock is taken.
        assert_eq!(checkout.state(), CheckoutState::Committed);
        assert_eq!(f.catalog.stock_of(item.id), Some(9));
        assert!(f.orders.get(order.id).await.unwrap().is_some());
        f.cart_store.set_fail_on_delete(false);
    }

    #[tokio::test]
    async fn stale_snapshot_ignores_later_cart_mutations() {
        let f = fixture().await;
        let item = seed_item(&f, "Widget", 1000, 10).await;
        f.carts.add_item(&f.identity, item.id, 2).await.unwrap();

        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        // Cart changes after the snapshot was taken.
        f.carts
            .update_quantity(&f.identity, item.id, 9)
            .await
            .unwrap();

        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        let reservation = f.coordinator.validate(&mut checkout).await.unwrap();
        assert_eq!(reservation.lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn validate_missing_item_is_a_violation_not_an_error() {
        let f = fixture().await;
        let item = seed_item(&f, "Widget", 1000, 10).await;
        f.carts.add_item(&f.identity, item.id, 1).await.unwrap();
        let snapshot = f.carts.snapshot(&f.identity).await.unwrap();
        f.catalog.delete(item.id).await.unwrap();

        let mut checkout = f.coordinator.begin(f.identity, snapshot).unwrap();
        let err = f.coordinator.validate(&mut checkout).await.unwrap_err();
        let CheckoutError::ValidationFailed(violations) = err else {
            panic!("expected ValidationFailed");
        };
        assert_eq!(
            violations,
            vec![StockViolation::ItemNotFound { item_id: item.id }]
        );
    }

    #[tokio::test]
    async fn conflict_is_distinct_from_cart_errors() {
        // Conflict carries enough detail for the client to re-validate.
        let err = CheckoutError::Conflict {
            item_id: ItemId::new(),
            available: 0,
            requested: 1,
        };
        assert!(err.to_string().contains("only 0 left"));
        let cart_err: CheckoutError = CartError::Persistence("db down".into()).into();
        assert!(matches!(cart_err, CheckoutError::Cart(_)));
    }
}
