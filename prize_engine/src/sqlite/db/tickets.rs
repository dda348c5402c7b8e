use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InstantPrize, Order, OrderItem, Ticket},
    sqlite::db::competitions,
};

/// Materialises the ticket rows for a freshly paid order. For each item the competition's sold counter is bumped
/// first, and the new tickets take the numbers `sold+1 ..= sold+quantity` from the pre-increment counter. Runs
/// inside the caller's transaction, after the order-status compare-and-swap has succeeded.
pub async fn allocate_for_order(
    order: &Order,
    items: &[OrderItem],
    conn: &mut SqliteConnection,
) -> Result<Vec<Ticket>, sqlx::Error> {
    let mut tickets = Vec::new();
    for item in items {
        let sold_before = competitions::increment_sold(item.competition_id, item.quantity, &mut *conn).await?;
        trace!(
            "🎟️ Allocating {} tickets for competition {} starting at number {}",
            item.quantity,
            item.competition_id,
            sold_before + 1
        );
        for k in 1..=item.quantity {
            let ticket: Ticket = sqlx::query_as(
                r#"
                    INSERT INTO tickets (competition_id, order_id, customer_id, ticket_number)
                    VALUES ($1, $2, $3, $4)
                    RETURNING *;
                "#,
            )
            .bind(item.competition_id)
            .bind(order.id)
            .bind(&order.customer_id)
            .bind(sold_before + k)
            .fetch_one(&mut *conn)
            .await?;
            tickets.push(ticket);
        }
    }
    Ok(tickets)
}

pub async fn fetch_tickets_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Ticket>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tickets WHERE order_id = $1 ORDER BY competition_id, ticket_number")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_ticket(id: i64, conn: &mut SqliteConnection) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tickets WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn mark_revealed(id: i64, conn: &mut SqliteConnection) -> Result<Ticket, sqlx::Error> {
    sqlx::query_as("UPDATE tickets SET revealed = 1 WHERE id = $1 RETURNING *").bind(id).fetch_one(conn).await
}

pub async fn link_prize(ticket_id: i64, prize_id: i64, conn: &mut SqliteConnection) -> Result<Ticket, sqlx::Error> {
    sqlx::query_as("UPDATE tickets SET prize_id = $1 WHERE id = $2 RETURNING *")
        .bind(prize_id)
        .bind(ticket_id)
        .fetch_one(conn)
        .await
}

pub async fn fetch_prize(id: i64, conn: &mut SqliteConnection) -> Result<Option<InstantPrize>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM instant_prizes WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn find_unclaimed_prize(
    competition_id: i64,
    ticket_number: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<InstantPrize>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM instant_prizes WHERE competition_id = $1 AND ticket_number = $2 AND claimed_by IS NULL",
    )
    .bind(competition_id)
    .bind(ticket_number)
    .fetch_optional(conn)
    .await
}

pub async fn claim_prize(
    prize_id: i64,
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<InstantPrize, sqlx::Error> {
    sqlx::query_as("UPDATE instant_prizes SET claimed_by = $1 WHERE id = $2 RETURNING *")
        .bind(customer_id)
        .bind(prize_id)
        .fetch_one(conn)
        .await
}

pub async fn count_tickets(competition_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE competition_id = $1")
        .bind(competition_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// The `offset`-th ticket of the competition in ticket-number order. Used by the draw to turn a random index into
/// a concrete winner.
pub async fn nth_ticket(
    competition_id: i64,
    offset: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tickets WHERE competition_id = $1 ORDER BY ticket_number LIMIT 1 OFFSET $2")
        .bind(competition_id)
        .bind(offset)
        .fetch_optional(conn)
        .await
}

/// The winning ticket row for a recorded draw, if it exists.
pub async fn fetch_by_number(
    competition_id: i64,
    ticket_number: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tickets WHERE competition_id = $1 AND ticket_number = $2")
        .bind(competition_id)
        .bind(ticket_number)
        .fetch_optional(conn)
        .await
}
