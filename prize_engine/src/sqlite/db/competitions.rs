use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{Competition, CompetitionStatus, NewCompetition, NewInstantPrize};

pub async fn insert_competition(
    competition: &NewCompetition,
    conn: &mut SqliteConnection,
) -> Result<Competition, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO competitions
                (slug, title, description, ticket_price, total_tickets, instant_win, image_file_id, draw_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(&competition.slug)
    .bind(&competition.title)
    .bind(&competition.description)
    .bind(competition.ticket_price)
    .bind(competition.total_tickets)
    .bind(competition.instant_win)
    .bind(competition.image_file_id)
    .bind(competition.draw_at)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn fetch_competition(id: i64, conn: &mut SqliteConnection) -> Result<Option<Competition>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM competitions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_competition_by_slug(
    slug: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Competition>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM competitions WHERE slug = $1").bind(slug).fetch_optional(conn).await
}

pub async fn fetch_active_competitions(conn: &mut SqliteConnection) -> Result<Vec<Competition>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM competitions WHERE status = 'Active' ORDER BY created_at ASC")
        .fetch_all(conn)
        .await
}

pub async fn fetch_competitions_by_ids(
    ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<Competition>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM competitions WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    builder.push(")");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Competition>().fetch_all(conn).await
}

pub async fn set_status(
    id: i64,
    status: CompetitionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Competition>, sqlx::Error> {
    sqlx::query_as("UPDATE competitions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(status.to_string())
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Bumps the sold counter by `quantity` and returns the counter value *before* the increment; the caller derives
/// the newly allocated ticket numbers from it. A competition that fills up flips to `SoldOut` in the same call.
pub async fn increment_sold(
    id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let (sold_after,): (i64,) = sqlx::query_as(
        r#"
            UPDATE competitions
            SET tickets_sold = tickets_sold + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING tickets_sold;
        "#,
    )
    .bind(quantity)
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    sqlx::query("UPDATE competitions SET status = 'SoldOut' WHERE id = $1 AND status = 'Active' AND tickets_sold >= total_tickets")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(sold_after - quantity)
}

pub async fn seed_prizes(
    competition_id: i64,
    prizes: &[NewInstantPrize],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0u64;
    for prize in prizes {
        sqlx::query(
            r#"
                INSERT INTO instant_prizes (competition_id, ticket_number, kind, value)
                VALUES ($1, $2, $3, $4);
            "#,
        )
        .bind(competition_id)
        .bind(prize.ticket_number)
        .bind(prize.kind.to_string())
        .bind(prize.value)
        .execute(&mut *conn)
        .await?;
        inserted += 1;
    }
    Ok(inserted)
}
