use std::fmt::Debug;

use chrono::Duration;
use log::*;
use pcs_common::Pence;

use crate::{
    db_types::{GatewayTransaction, NewOrder, Order, OrderRef, Ticket},
    events::{EventProducers, OrderFailedEvent, OrderPaidEvent},
    order_objects::{OrderQueryFilter, OrderSummary},
    traits::{CheckoutOutcome, ExpirySweep, FailureOutcome, PaymentGatewayDatabase, PaymentGatewayError, RevealOutcome, SettlementOutcome},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: checkout, gateway reconciliation, ticket reveals and
/// the expiry sweep. It owns the event producers, so the paid/failed hooks fire exactly once per real transition;
/// the storage layer's idempotency guarantees are what make "exactly once" meaningful here.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Submits a checkout. Availability is re-checked, wallet credit is applied and the order lands in `Pending`,
    /// unless credit covered the whole total, in which case it settles on the spot and the paid hook fires before
    /// this returns.
    pub async fn checkout(
        &self,
        order: NewOrder,
        credit_requested: Pence,
    ) -> Result<CheckoutOutcome, PaymentGatewayError> {
        let order_ref = order.order_ref.clone();
        let outcome = self.db.create_order(order, credit_requested).await?;
        debug!(
            "🔄️📦️ Order {order_ref} created. Subtotal {}, credit applied {}, total due {}",
            outcome.order.subtotal, outcome.order.credit_applied, outcome.order.total
        );
        if outcome.settled_immediately() {
            self.call_order_paid_hook(&outcome.order, &outcome.tickets).await;
        }
        Ok(outcome)
    }

    /// Applies a successful gateway outcome. On the first delivery the order transitions to `Paid`, tickets are
    /// allocated and the paid hook fires; re-deliveries return the recorded outcome and fire nothing.
    pub async fn confirm_payment(
        &self,
        order_ref: &OrderRef,
        txn: &GatewayTransaction,
    ) -> Result<SettlementOutcome, PaymentGatewayError> {
        let outcome = self.db.confirm_order_paid(order_ref, txn).await?;
        if outcome.newly_paid {
            info!(
                "🔄️💰️ Order {order_ref} paid via gateway txn [{}]. {} tickets allocated.",
                txn.txn_id,
                outcome.tickets.len()
            );
            self.call_order_paid_hook(&outcome.order, &outcome.tickets).await;
        } else {
            info!("🔄️💰️ Duplicate gateway delivery for {order_ref} ignored (already Paid).");
        }
        Ok(outcome)
    }

    /// Applies a declined/errored gateway outcome. Fires the failed hook on the first delivery only.
    pub async fn fail_payment(
        &self,
        order_ref: &OrderRef,
        txn: &GatewayTransaction,
    ) -> Result<FailureOutcome, PaymentGatewayError> {
        let outcome = self.db.fail_order(order_ref, txn).await?;
        if outcome.newly_failed {
            info!("🔄️❌️ Order {order_ref} failed at the gateway (txn [{}]).", txn.txn_id);
            self.call_order_failed_hook(&outcome.order).await;
        }
        Ok(outcome)
    }

    pub async fn cancel_order(&self, order_ref: &OrderRef) -> Result<Order, PaymentGatewayError> {
        self.db.cancel_order(order_ref).await
    }

    /// The read behind the client success page. When `customer_id` is given, an order belonging to someone else is
    /// reported as absent rather than as a permission error.
    pub async fn order_summary(
        &self,
        order_ref: &OrderRef,
        customer_id: Option<&str>,
    ) -> Result<Option<OrderSummary>, PaymentGatewayError> {
        let order = match self.db.fetch_order_by_ref(order_ref).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        if let Some(cid) = customer_id {
            if order.customer_id != cid {
                debug!("🔄️📦️ Order {order_ref} requested by non-owner; reporting as absent");
                return Ok(None);
            }
        }
        let items = self.db.fetch_order_items(order.id).await?;
        let tickets = self.db.fetch_tickets_for_order(order.id).await?;
        Ok(Some(OrderSummary { order, items, tickets }))
    }

    pub async fn reveal_ticket(
        &self,
        ticket_id: i64,
        customer_id: &str,
        credit_validity: Duration,
    ) -> Result<RevealOutcome, PaymentGatewayError> {
        self.db.reveal_ticket(ticket_id, customer_id, credit_validity).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentGatewayError> {
        self.db.search_orders(query).await
    }

    pub async fn expire_old_orders(&self, unpaid_limit: Duration) -> Result<ExpirySweep, PaymentGatewayError> {
        let sweep = self.db.expire_old_orders(unpaid_limit).await?;
        if sweep.order_count() > 0 || sweep.credits_expired > 0 {
            info!(
                "🔄️🕰️ Expiry sweep: {} orders expired, {} credits zeroed",
                sweep.order_count(),
                sweep.credits_expired
            );
        }
        Ok(sweep)
    }

    async fn call_order_paid_hook(&self, order: &Order, tickets: &[Ticket]) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone(), tickets.to_vec());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_failed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_failed_producer {
            debug!("🔄️📦️ Notifying order failed hook subscribers");
            let event = OrderFailedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
