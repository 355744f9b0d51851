use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::assignment::{attempt_assignment, AssignmentError, AssignmentOutcome};
use crate::engine::lifecycle::{Transition, TransitionError};
use crate::engine::pricing::{
    price_basket, quote, BasketError, BasketSnapshot, CodeLookup, DiscountRequest, PriceQuote,
};
use crate::models::assignment::{Assignment, AssignmentSource};
use crate::models::order::{LineItem, Order, OrderStatus};
use crate::models::payment::Payment;
use crate::state::AppState;
use crate::store::unit_of_work::UnitOfWork;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: Uuid,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quotation {
    pub basket: BasketSnapshot,
    pub quote: PriceQuote,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub basket: BasketSnapshot,
    pub quote: PriceQuote,
    pub payment: Payment,
    /// `None` when no courier was free; the scheduler picks the order up later.
    pub assignment: Option<Assignment>,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Basket(#[from] BasketError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CancelRejection {
    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("order belongs to another customer")]
    NotOwner,

    #[error("cancellation window of 5 minutes has elapsed")]
    WindowElapsed,

    #[error("order can no longer be cancelled from {0:?}")]
    NotCancellable(OrderStatus),
}

struct PricingInputs {
    basket: BasketSnapshot,
    birthdate: NaiveDate,
    history: Vec<Order>,
    code: CodeLookup,
}

impl PricingInputs {
    fn gather(store: &Store, request: &CheckoutRequest) -> Result<Self, BasketError> {
        let customer = store
            .customer(request.customer_id)
            .ok_or(BasketError::UnknownCustomer(request.customer_id))?;
        let basket = price_basket(store, &request.items)?;

        Ok(Self {
            basket,
            birthdate: customer.birthdate,
            history: store.orders_for_customer(customer.id),
            code: CodeLookup::resolve(store, request.code.as_deref()),
        })
    }

    fn quote(&self, current_order: Option<Uuid>, now: DateTime<Utc>) -> PriceQuote {
        quote(&DiscountRequest {
            basket: &self.basket,
            birthdate: self.birthdate,
            history: &self.history,
            current_order,
            code: &self.code,
            now,
        })
    }
}

/// Read-only price of a basket, as checkout would charge it at `now`.
pub fn preview(store: &Store, request: &CheckoutRequest, now: DateTime<Utc>) -> Result<Quotation, BasketError> {
    let inputs = PricingInputs::gather(store, request)?;
    let quote = inputs.quote(None, now);

    Ok(Quotation {
        basket: inputs.basket,
        quote,
    })
}

pub fn checkout(state: &AppState, request: &CheckoutRequest, now: DateTime<Utc>) -> Result<CheckoutReceipt, CheckoutError> {
    let result = place_order(state, request, now);

    let outcome = match &result {
        Ok(receipt) if receipt.assignment.is_some() => "dispatched",
        Ok(_) => "awaiting_courier",
        Err(CheckoutError::Basket(_)) => "rejected",
        Err(_) => "failed",
    };
    state.metrics.checkouts_total.with_label_values(&[outcome]).inc();

    if let Err(err) = &result {
        warn!(customer_id = %request.customer_id, error = %err, "checkout failed");
    }

    result
}

fn place_order(state: &AppState, request: &CheckoutRequest, now: DateTime<Utc>) -> Result<CheckoutReceipt, CheckoutError> {
    let store = &state.store;
    let order_id = Uuid::new_v4();

    let mut inputs = PricingInputs::gather(store, request)?;
    let mut quote = inputs.quote(Some(order_id), now);

    let mut uow = UnitOfWork::begin(store);
    uow.claim_order(order_id);

    if let Some(code_id) = quote.applied_code {
        match store.redeem_code(code_id, order_id, now) {
            Ok(_) => uow.code_redeemed(code_id, order_id),
            Err(issue) => {
                info!(order_id = %order_id, code_id = %code_id, reason = issue.as_str(), "discount code lost to another checkout");
                inputs.code = CodeLookup::Rejected(issue);
                quote = inputs.quote(Some(order_id), now);
            }
        }
    }

    let order = Order {
        id: order_id,
        customer_id: request.customer_id,
        items: inputs.basket.line_items(),
        status: OrderStatus::Pending,
        estimated_delivery_time: None,
        assigned_driver: None,
        discount_code_id: quote.applied_code,
        created_at: now,
        updated_at: now,
    };
    store.insert_order(order)?;
    uow.order_inserted(order_id);

    let assignment = match attempt_assignment(store, order_id, now, AssignmentSource::Checkout)? {
        AssignmentOutcome::Assigned {
            assignment,
            reservation,
            completed_delivery,
        } => {
            uow.courier_reserved(reservation);
            if completed_delivery.is_some() {
                state.metrics.deliveries_completed_total.inc();
            }
            Some(assignment)
        }
        AssignmentOutcome::NoCourier | AssignmentOutcome::NotAssignable(_) => None,
    };

    let payment = Payment {
        id: Uuid::new_v4(),
        order_id,
        amount: quote.final_total,
        paid_at: now,
    };
    store.record_payment(payment.clone())?;
    uow.payment_recorded(payment.id);

    let order = store
        .order(order_id)
        .ok_or_else(|| StoreError::not_found("order", order_id))?;

    uow.commit();

    if let Some(assignment) = &assignment {
        state.publish_assignment(assignment);
    }
    record_code_outcome(state, request, &quote);

    info!(
        order_id = %order_id,
        customer_id = %request.customer_id,
        total = %quote.final_total,
        status = ?order.status,
        "order placed"
    );

    Ok(CheckoutReceipt {
        order,
        basket: inputs.basket,
        quote,
        payment,
        assignment,
    })
}

fn record_code_outcome(state: &AppState, request: &CheckoutRequest, quote: &PriceQuote) {
    let supplied = request
        .code
        .as_deref()
        .is_some_and(|code| !code.trim().is_empty());
    if !supplied {
        return;
    }

    let outcome = match (quote.applied_code, quote.code_issue) {
        (Some(_), _) => "redeemed",
        (None, Some(issue)) => issue.as_str(),
        (None, None) => return,
    };
    state.metrics.discount_codes_total.with_label_values(&[outcome]).inc();
}

pub fn cancel(
    store: &Store,
    order_id: Uuid,
    requester: Uuid,
    now: DateTime<Utc>,
) -> Result<Order, CancelRejection> {
    let order = store
        .order(order_id)
        .ok_or(CancelRejection::OrderNotFound(order_id))?;

    if order.customer_id != requester {
        return Err(CancelRejection::NotOwner);
    }

    match store.transition_order(order_id, Transition::Cancel, now) {
        Ok(cancelled) => {
            info!(order_id = %order_id, "order cancelled");
            Ok(cancelled)
        }
        Err(StoreError::Transition(TransitionError::CancellationWindowElapsed)) => {
            Err(CancelRejection::WindowElapsed)
        }
        Err(StoreError::Transition(TransitionError::Invalid { from, .. })) => {
            Err(CancelRejection::NotCancellable(from))
        }
        Err(_) => Err(CancelRejection::OrderNotFound(order_id)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::{cancel, checkout, preview, CancelRejection, CheckoutError, CheckoutRequest};
    use crate::engine::pricing::BasketError;
    use crate::models::discount::CodeIssue;
    use crate::models::menu::ItemKind;
    use crate::models::money::MoneyValue;
    use crate::models::order::OrderStatus;
    use crate::state::AppState;
    use crate::store::fixtures;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 18, 0, 0).unwrap()
    }

    fn setup(birthdate: NaiveDate) -> (AppState, Uuid) {
        let state = AppState::new(16);
        let customer = fixtures::customer(&state.store, 1, birthdate, "1000");
        // 5.31 -> 7.43 -> 8.10 and 4.33 -> 6.06 -> 6.61
        fixtures::pizza(&state.store, 10, 431, &[100]);
        fixtures::pizza(&state.store, 11, 333, &[100]);
        fixtures::drink(&state.store, 20, 1000);
        fixtures::code(&state.store, 30, "SUMMER10", 10, now() + Duration::days(30));
        (state, customer.id)
    }

    fn drinks_request(customer_id: Uuid, code: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            customer_id,
            items: vec![fixtures::line(ItemKind::Drink, Uuid::from_u128(20), 2)],
            code: code.map(str::to_string),
        }
    }

    #[test]
    fn preview_and_checkout_agree() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 5, 20).unwrap());
        let request = CheckoutRequest {
            customer_id,
            items: vec![
                fixtures::line(ItemKind::Pizza, Uuid::from_u128(10), 1),
                fixtures::line(ItemKind::Pizza, Uuid::from_u128(11), 1),
                fixtures::line(ItemKind::Drink, Uuid::from_u128(20), 1),
            ],
            code: Some("SUMMER10".to_string()),
        };

        let previewed = preview(&state.store, &request, now()).unwrap();
        assert!(!state.store.find_code("SUMMER10").unwrap().is_used);

        let receipt = checkout(&state, &request, now()).unwrap();
        assert_eq!(previewed.quote.final_total, receipt.quote.final_total);
        assert_eq!(previewed.quote.breakdown, receipt.quote.breakdown);
        assert_eq!(receipt.payment.amount, receipt.quote.final_total);

        // 8.10 + 6.61 + 10.00 = 24.71; birthday -6.61 = 18.10; code -10% = 16.29
        assert_eq!(receipt.quote.final_total, MoneyValue::from_cents(1629));
    }

    #[test]
    fn summer10_applies_once_then_reports_already_used() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());

        let first = checkout(&state, &drinks_request(customer_id, Some("SUMMER10")), now()).unwrap();
        assert_eq!(first.quote.final_total, MoneyValue::from_cents(1800));
        assert_eq!(first.quote.breakdown.iter().filter(|line| line.applied).count(), 1);
        assert_eq!(first.order.discount_code_id, Some(Uuid::from_u128(30)));

        let code = state.store.find_code("SUMMER10").unwrap();
        assert!(code.is_used);
        assert_eq!(code.redeemed_by, Some(first.order.id));

        let second = checkout(&state, &drinks_request(customer_id, Some("SUMMER10")), now()).unwrap();
        assert_eq!(second.quote.final_total, MoneyValue::from_cents(2000));
        assert_eq!(second.quote.code_issue, Some(CodeIssue::AlreadyUsed));
        assert_eq!(second.order.discount_code_id, None);
    }

    #[test]
    fn invalid_code_does_not_block_checkout() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());

        let receipt = checkout(&state, &drinks_request(customer_id, Some("NOPE")), now()).unwrap();
        assert_eq!(receipt.quote.code_issue, Some(CodeIssue::NotFound));
        assert_eq!(receipt.payment.amount, MoneyValue::from_cents(2000));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_checkouts_redeem_code_once() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        let state = Arc::new(state);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let state = Arc::clone(&state);
                tokio::task::spawn_blocking(move || {
                    checkout(&state, &drinks_request(customer_id, Some("SUMMER10")), now())
                })
            })
            .collect();

        let mut receipts = Vec::new();
        for handle in handles {
            receipts.push(handle.await.unwrap().unwrap());
        }

        let discounted = receipts
            .iter()
            .filter(|receipt| receipt.quote.applied_code.is_some())
            .count();
        let rejected = receipts
            .iter()
            .filter(|receipt| receipt.quote.code_issue == Some(CodeIssue::AlreadyUsed))
            .count();
        assert_eq!(discounted, 1);
        assert_eq!(rejected, 1);
    }

    #[test]
    fn checkout_dispatches_when_a_courier_is_free() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        fixtures::courier(&state.store, 40, "1000", now());
        let mut events = state.assignment_events_tx.subscribe();

        let dispatched = checkout(&state, &drinks_request(customer_id, None), now()).unwrap();
        assert_eq!(dispatched.order.status, OrderStatus::OutForDelivery);
        assert_eq!(events.try_recv().unwrap().order_id, dispatched.order.id);

        let waiting = checkout(&state, &drinks_request(customer_id, None), now()).unwrap();
        assert!(waiting.assignment.is_none());
        assert_eq!(waiting.order.status, OrderStatus::PendingAssignment);
    }

    #[test]
    fn reused_courier_counts_its_finished_delivery() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        fixtures::courier(&state.store, 40, "1000", now());

        let first = checkout(&state, &drinks_request(customer_id, None), now()).unwrap();
        assert_eq!(state.metrics.deliveries_completed_total.get(), 0);

        let later = now() + Duration::minutes(30);
        let second = checkout(&state, &drinks_request(customer_id, None), later).unwrap();
        assert_eq!(second.order.status, OrderStatus::OutForDelivery);
        assert_eq!(state.store.order(first.order.id).unwrap().status, OrderStatus::Delivered);
        assert_eq!(state.metrics.deliveries_completed_total.get(), 1);
    }

    #[test]
    fn checkout_releases_its_claim_on_the_order() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());

        let receipt = checkout(&state, &drinks_request(customer_id, None), now()).unwrap();
        assert!(!state.store.is_checking_out(receipt.order.id));
    }

    #[test]
    fn malformed_basket_is_rejected_before_any_write() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        let request = CheckoutRequest {
            customer_id,
            items: Vec::new(),
            code: Some("SUMMER10".to_string()),
        };

        let err = checkout(&state, &request, now()).unwrap_err();
        assert!(matches!(err, CheckoutError::Basket(BasketError::Empty)));
        assert!(state.store.orders.is_empty());
        assert!(state.store.payments.is_empty());
        assert!(!state.store.find_code("SUMMER10").unwrap().is_used);
    }

    #[test]
    fn cancel_rules() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        let order = checkout(&state, &drinks_request(customer_id, None), now()).unwrap().order;

        assert_eq!(
            cancel(&state.store, Uuid::from_u128(999), customer_id, now()).unwrap_err(),
            CancelRejection::OrderNotFound(Uuid::from_u128(999))
        );
        assert_eq!(
            cancel(&state.store, order.id, Uuid::from_u128(2), now()).unwrap_err(),
            CancelRejection::NotOwner
        );
        assert_eq!(
            cancel(&state.store, order.id, customer_id, now() + Duration::minutes(5)).unwrap_err(),
            CancelRejection::WindowElapsed
        );

        let cancelled = cancel(&state.store, order.id, customer_id, now() + Duration::minutes(4)).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }

    #[test]
    fn dispatched_order_cannot_be_cancelled() {
        let (state, customer_id) = setup(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        fixtures::courier(&state.store, 40, "1000", now());
        let order = checkout(&state, &drinks_request(customer_id, None), now()).unwrap().order;

        assert_eq!(
            cancel(&state.store, order.id, customer_id, now()).unwrap_err(),
            CancelRejection::NotCancellable(OrderStatus::OutForDelivery)
        );
    }
}
