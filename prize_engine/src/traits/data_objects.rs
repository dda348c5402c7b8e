use pcs_common::Pence;
use serde::{Deserialize, Serialize};

use crate::db_types::{InstantPrize, Order, OrderItem, Ticket, WalletCredit};

/// The result of a checkout. `tickets` is only populated when the order total came to zero (fully covered by wallet
/// credit) and the order settled immediately without a gateway round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub tickets: Vec<Ticket>,
}

impl CheckoutOutcome {
    pub fn settled_immediately(&self) -> bool {
        !self.tickets.is_empty()
    }
}

/// The result of applying a successful gateway outcome to an order. `newly_paid` is false when the callback was a
/// recognised duplicate delivery; in that case `tickets` holds the allocations from the first delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub order: Order,
    pub tickets: Vec<Ticket>,
    pub newly_paid: bool,
}

/// The result of applying a declined/errored gateway outcome to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureOutcome {
    pub order: Order,
    pub newly_failed: bool,
}

/// The result of revealing a ticket. `credit_awarded` is only set on the first reveal of a Credit-kind instant win.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealOutcome {
    pub ticket: Ticket,
    pub prize: Option<InstantPrize>,
    pub credit_awarded: Option<WalletCredit>,
}

/// What the periodic expiry sweep touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpirySweep {
    pub orders: Vec<Order>,
    pub credits_expired: u64,
}

impl ExpirySweep {
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSummary {
    pub customer_id: String,
    pub balance: Pence,
    pub credits: Vec<WalletCredit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayoutRunResult {
    pub processed: u64,
    pub total_amount: Pence,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawCheck {
    pub name: String,
    pub pass: bool,
}

impl DrawCheck {
    pub fn new<S: Into<String>>(name: S, pass: bool) -> Self {
        Self { name: name.into(), pass }
    }
}

/// A structured draw-integrity report. `valid` is the conjunction of all checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawVerification {
    pub competition_id: i64,
    pub valid: bool,
    pub checks: Vec<DrawCheck>,
}

impl DrawVerification {
    pub fn from_checks(competition_id: i64, checks: Vec<DrawCheck>) -> Self {
        let valid = checks.iter().all(|c| c.pass);
        Self { competition_id, valid, checks }
    }
}
