use chrono::{DateTime, Utc};
use log::{debug, trace};
use pcs_common::Pence;
use sqlx::SqliteConnection;

use crate::db_types::{NewWalletCredit, ReferralAttribution, WalletCredit, Withdrawal};

pub async fn spendable_credits(
    customer_id: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletCredit>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM wallet_credits
            WHERE customer_id = $1 AND remaining > 0 AND expires_at > $2
            ORDER BY expires_at ASC, id ASC
        "#,
    )
    .bind(customer_id)
    .bind(now)
    .fetch_all(conn)
    .await
}

pub async fn credits_for_customer(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletCredit>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wallet_credits WHERE customer_id = $1 ORDER BY expires_at ASC, id ASC")
        .bind(customer_id)
        .fetch_all(conn)
        .await
}

/// Debits up to `amount` from the customer's unexpired credits, oldest expiry first, and returns what was actually
/// taken. Callers run this inside the same transaction as whatever the debit is paying for.
pub async fn debit_credits(
    customer_id: &str,
    amount: Pence,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Pence, sqlx::Error> {
    if amount <= Pence::from(0) {
        return Ok(Pence::from(0));
    }
    let credits = spendable_credits(customer_id, now, &mut *conn).await?;
    let mut outstanding = amount;
    let mut applied = Pence::from(0);
    for credit in credits {
        if outstanding.is_zero() {
            break;
        }
        let take = outstanding.min(credit.remaining);
        sqlx::query(
            "UPDATE wallet_credits SET remaining = remaining - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(take)
        .bind(credit.id)
        .execute(&mut *conn)
        .await?;
        trace!("🗃️ Debited {take} from credit #{} for {customer_id}", credit.id);
        outstanding -= take;
        applied += take;
    }
    debug!("🗃️ Applied {applied} of wallet credit for {customer_id}");
    Ok(applied)
}

pub async fn insert_credit(
    credit: &NewWalletCredit,
    conn: &mut SqliteConnection,
) -> Result<WalletCredit, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO wallet_credits (customer_id, initial, remaining, source, expires_at)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(&credit.customer_id)
    .bind(credit.amount)
    .bind(credit.source.to_string())
    .bind(credit.expires_at)
    .fetch_one(conn)
    .await
}

pub async fn insert_withdrawal(
    customer_id: &str,
    amount: Pence,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO withdrawals (customer_id, amount)
            VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(customer_id)
    .bind(amount)
    .fetch_one(conn)
    .await
}

pub async fn fetch_requested_withdrawals(conn: &mut SqliteConnection) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM withdrawals WHERE status = 'Requested' ORDER BY requested_at ASC")
        .fetch_all(conn)
        .await
}

pub async fn mark_withdrawal_paid(id: i64, conn: &mut SqliteConnection) -> Result<Withdrawal, sqlx::Error> {
    sqlx::query_as(
        "UPDATE withdrawals SET status = 'Paid', processed_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(conn)
    .await
}

/// Zeroes out credit that sat past its expiry date. The spendable-credit queries already exclude expired rows, so
/// this is ledger hygiene rather than a correctness requirement.
pub async fn expire_credits(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE wallet_credits SET remaining = 0, updated_at = CURRENT_TIMESTAMP WHERE expires_at <= $1 AND remaining > 0",
    )
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_referral(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ReferralAttribution>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM referral_attributions WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(conn)
        .await
}

/// First-touch attribution: an unexpired existing row wins; an expired one is replaced by the new code.
pub async fn upsert_referral(
    customer_id: &str,
    code: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ReferralAttribution, sqlx::Error> {
    if let Some(existing) = fetch_referral(customer_id, &mut *conn).await? {
        if existing.is_active(now) {
            return Ok(existing);
        }
        return sqlx::query_as(
            r#"
                UPDATE referral_attributions
                SET code = $1, attributed_at = $2, expires_at = $3
                WHERE customer_id = $4
                RETURNING *;
            "#,
        )
        .bind(code)
        .bind(now)
        .bind(expires_at)
        .bind(customer_id)
        .fetch_one(conn)
        .await;
    }
    sqlx::query_as(
        r#"
            INSERT INTO referral_attributions (customer_id, code, attributed_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(customer_id)
    .bind(code)
    .bind(now)
    .bind(expires_at)
    .fetch_one(conn)
    .await
}
