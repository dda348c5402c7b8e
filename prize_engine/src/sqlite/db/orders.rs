use chrono::Duration;
use log::{debug, trace};
use pcs_common::Pence;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{GatewayTransaction, NewOrder, Order, OrderItem, OrderRef, OrderStatusType},
    order_objects::OrderQueryFilter,
};

/// Inserts a new `Pending` order row. Not atomic on its own; callers embed this in a transaction together with the
/// item inserts and any credit debits.
pub async fn insert_order(
    order: &NewOrder,
    subtotal: Pence,
    credit_applied: Pence,
    total: Pence,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO orders (order_ref, customer_id, subtotal, credit_applied, total, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.order_ref.as_str())
    .bind(&order.customer_id)
    .bind(subtotal)
    .bind(credit_applied)
    .bind(total)
    .bind(&order.currency)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn insert_order_items(
    order_id: i64,
    order: &NewOrder,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let mut result = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let row: OrderItem = sqlx::query_as(
            r#"
                INSERT INTO order_items (order_id, competition_id, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *;
            "#,
        )
        .bind(order_id)
        .bind(item.competition_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line_total())
        .fetch_one(&mut *conn)
        .await?;
        result.push(row);
    }
    Ok(result)
}

pub async fn fetch_order_by_ref(
    order_ref: &OrderRef,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_ref = $1")
        .bind(order_ref.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// The `Pending` → `Paid` compare-and-swap. The `status = 'Pending'` predicate is what makes duplicate gateway
/// deliveries harmless: the second delivery matches no row and the caller never reaches allocation.
pub async fn mark_paid(
    order_id: i64,
    txn: &GatewayTransaction,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'Paid',
                gateway_txn_id = $1,
                gateway_payload = $2,
                paid_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(&txn.txn_id)
    .bind(&txn.payload)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ mark_paid matched: {}", order.is_some());
    Ok(order)
}

pub async fn mark_failed(
    order_id: i64,
    txn: &GatewayTransaction,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'PaymentFailed',
                gateway_txn_id = $1,
                gateway_payload = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(&txn.txn_id)
    .bind(&txn.payload)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn mark_cancelled(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'Cancelled', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_ref) = query.order_ref {
        where_clause.push("order_ref = ");
        where_clause.push_bind_unseparated(order_ref.as_str().to_string());
    }
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ search_orders returned {} rows", orders.len());
    Ok(orders)
}

/// Sweeps `Pending` orders whose last update is older than `limit` into `Expired`.
pub async fn expire_pending(limit: Duration, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let rows: Vec<Order> = sqlx::query_as(
        format!(
            "UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = '{}' WHERE status = '{}' AND \
             (unixepoch(CURRENT_TIMESTAMP) - unixepoch(updated_at)) > {} RETURNING *;",
            OrderStatusType::Expired,
            OrderStatusType::Pending,
            limit.num_seconds()
        )
        .as_str(),
    )
    .fetch_all(conn)
    .await?;
    if !rows.is_empty() {
        debug!("🗃️ {} pending orders expired", rows.len());
    }
    Ok(rows)
}
