use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, OrderRef, OrderStatusType, Ticket};

/// Search criteria for order queries. Empty fields are not part of the filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub customer_id: Option<String>,
    pub order_ref: Option<OrderRef>,
    pub status: Option<Vec<OrderStatusType>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_customer_id<S: Into<String>>(mut self, id: S) -> Self {
        self.customer_id = Some(id.into());
        self
    }

    pub fn with_order_ref(mut self, order_ref: OrderRef) -> Self {
        self.order_ref = Some(order_ref);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, when: DateTime<Utc>) -> Self {
        self.since = Some(when);
        self
    }

    pub fn until(mut self, when: DateTime<Utc>) -> Self {
        self.until = Some(when);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none()
            && self.order_ref.is_none()
            && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
            && self.since.is_none()
            && self.until.is_none()
    }
}

/// Everything the client success page needs in one read: the order, its lines, and (once paid) its tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub tickets: Vec<Ticket>,
}
