use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Ticket};

/// Emitted once per order, on the transition into `Paid`, whether that came from a gateway callback or a
/// fully-credit-funded checkout. Duplicate gateway deliveries do not re-emit this event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub tickets: Vec<Ticket>,
}

impl OrderPaidEvent {
    pub fn new(order: Order, tickets: Vec<Ticket>) -> Self {
        Self { order, tickets }
    }
}

/// Emitted once per order when the gateway reports a decline or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFailedEvent {
    pub order: Order,
}

impl OrderFailedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
