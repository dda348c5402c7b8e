use sqlx::SqliteConnection;

use crate::db_types::Draw;

pub async fn insert_draw(
    competition_id: i64,
    winning_ticket_number: i64,
    winner_customer_id: &str,
    seal: &str,
    conn: &mut SqliteConnection,
) -> Result<Draw, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO draws (competition_id, winning_ticket_number, winner_customer_id, seal)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(competition_id)
    .bind(winning_ticket_number)
    .bind(winner_customer_id)
    .bind(seal)
    .fetch_one(conn)
    .await
}

pub async fn fetch_draw(competition_id: i64, conn: &mut SqliteConnection) -> Result<Option<Draw>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM draws WHERE competition_id = $1").bind(competition_id).fetch_optional(conn).await
}
