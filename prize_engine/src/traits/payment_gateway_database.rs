use chrono::Duration;
use pcs_common::Pence;
use thiserror::Error;

use crate::{
    db_types::{GatewayTransaction, NewOrder, Order, OrderItem, OrderRef, OrderStatusType, Ticket},
    order_objects::OrderQueryFilter,
    traits::{CheckoutOutcome, ExpirySweep, FailureOutcome, RevealOutcome, SettlementOutcome},
};

/// The order/payment flow contract. This is the trait that carries the two invariants the whole platform leans on:
///
/// * Ticket allocations for an order are created **at most once**. [`Self::confirm_order_paid`] performs the
///   `Pending` → `Paid` transition as a conditional update inside the same transaction as the allocation, so a
///   duplicate gateway delivery (sequential or concurrent) finds the order already `Paid` and allocates nothing.
/// * Wallet-credit deduction and order-total finalisation are atomic. [`Self::create_order`] debits credits and
///   writes the final total in one transaction, so two checkouts racing over the same balance cannot both spend it.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates an order (status `Pending`) with its items in a single atomic transaction.
    ///
    /// Availability and prices are re-checked against the authoritative competition rows. Up to `credit_requested`
    /// of the customer's unexpired wallet credit is applied, clamped to `min(requested, balance, subtotal)`, and the
    /// debit happens in the same transaction as the total finalisation.
    ///
    /// If the final total is zero the order settles immediately: it is marked `Paid` and tickets are allocated
    /// before the transaction commits.
    async fn create_order(
        &self,
        order: NewOrder,
        credit_requested: Pence,
    ) -> Result<CheckoutOutcome, PaymentGatewayError>;

    async fn fetch_order_by_ref(&self, order_ref: &OrderRef) -> Result<Option<Order>, PaymentGatewayError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, PaymentGatewayError>;

    async fn fetch_tickets_for_order(&self, order_id: i64) -> Result<Vec<Ticket>, PaymentGatewayError>;

    /// Applies a successful gateway outcome to the order, allocating tickets exactly once.
    ///
    /// In one transaction: verifies the reported amount against the order total, performs the `Pending` → `Paid`
    /// conditional update (storing the gateway transaction id, raw payload and paid timestamp), increments each
    /// competition's sold counter and inserts one ticket row per purchased entry.
    ///
    /// A re-delivery for an already-`Paid` order is not an error: the existing allocations are returned with
    /// `newly_paid == false`. Any other non-`Pending` status is a state conflict.
    async fn confirm_order_paid(
        &self,
        order_ref: &OrderRef,
        txn: &GatewayTransaction,
    ) -> Result<SettlementOutcome, PaymentGatewayError>;

    /// Applies a declined/errored gateway outcome: `Pending` → `PaymentFailed`, no allocation.
    /// Duplicate failure deliveries return `newly_failed == false`; a failure callback for a `Paid` order is a
    /// state conflict.
    async fn fail_order(
        &self,
        order_ref: &OrderRef,
        txn: &GatewayTransaction,
    ) -> Result<FailureOutcome, PaymentGatewayError>;

    /// Admin cancellation of a `Pending` order.
    async fn cancel_order(&self, order_ref: &OrderRef) -> Result<Order, PaymentGatewayError>;

    /// Reveals a ticket owned by `customer_id`. The first reveal marks the ticket, claims a matching unclaimed
    /// instant prize if one exists and, for Credit prizes, awards wallet credit valid for `credit_validity`, all in
    /// one transaction. Revealing again returns the recorded outcome without awarding anything twice.
    async fn reveal_ticket(
        &self,
        ticket_id: i64,
        customer_id: &str,
        credit_validity: Duration,
    ) -> Result<RevealOutcome, PaymentGatewayError>;

    /// Fetches orders according to criteria specified in the `OrderQueryFilter`.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentGatewayError>;

    /// Sweeps `Pending` orders that have not been updated within `unpaid_limit` to `Expired`, and zeroes out wallet
    /// credits past their expiry date.
    async fn expire_old_orders(&self, unpaid_limit: Duration) -> Result<ExpirySweep, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot create order, since it already exists with reference {0}")]
    OrderAlreadyExists(OrderRef),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderRef),
    #[error("Order {0} is {1} and cannot accept this transition")]
    OrderStateConflict(OrderRef, OrderStatusType),
    #[error("The gateway settled {received} but order total is {expected}")]
    AmountMismatch { expected: Pence, received: Pence },
    #[error("Orders must contain at least one item")]
    EmptyOrder,
    #[error("The requested competition {0} does not exist")]
    CompetitionNotFound(i64),
    #[error("Competition {0} is not purchasable: {1}")]
    NotPurchasable(i64, String),
    #[error("The submitted price for competition {0} no longer matches the listed price")]
    StalePrice(i64),
    #[error("The requested ticket {0} does not exist")]
    TicketNotFound(i64),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
