//! Wallet credit application, withdrawals and referral attribution.

use chrono::{Duration, Utc};
use pcs_common::Pence;
use prize_engine::{
    db_types::{
        CompetitionStatus,
        NewCompetition,
        NewOrder,
        NewOrderItem,
        NewWalletCredit,
        OrderRef,
        OrderStatusType,
        WalletCreditSource,
        WithdrawalStatus,
    },
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{CompetitionManagement, WalletApiError},
    OrderFlowApi,
    SqliteDatabase,
    WalletApi,
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn active_competition(db: &SqliteDatabase, slug: &str, price: i64, total: i64) -> i64 {
    let competition = db
        .create_competition(NewCompetition {
            slug: slug.to_string(),
            title: format!("Win: {slug}"),
            description: None,
            ticket_price: Pence::from(price),
            total_tickets: total,
            instant_win: false,
            image_file_id: None,
            draw_at: None,
        })
        .await
        .expect("Error creating competition");
    db.set_competition_status(competition.id, CompetitionStatus::Active).await.expect("Error activating").id
}

fn credit(customer: &str, amount: i64, days: i64) -> NewWalletCredit {
    NewWalletCredit {
        customer_id: customer.to_string(),
        amount: Pence::from(amount),
        source: WalletCreditSource::Admin,
        expires_at: Utc::now() + Duration::days(days),
    }
}

#[tokio::test]
async fn credit_application_is_clamped_to_balance_and_subtotal() {
    let db = new_db().await;
    let comp_id = active_competition(&db, "supercar", 500, 100).await;
    let wallet = WalletApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    wallet.award_credit(credit("cust-1", 300, 30)).await.expect("Award failed");

    // Request far more than the balance: the application clamps to min(requested, balance, subtotal)
    let order = NewOrder::new(OrderRef("order-1".into()), "cust-1".into())
        .with_item(NewOrderItem::new(comp_id, 2, Pence::from(500)));
    let outcome = orders.checkout(order, Pence::from(10_000)).await.expect("Checkout failed");

    assert_eq!(outcome.order.subtotal, Pence::from(1000));
    assert_eq!(outcome.order.credit_applied, Pence::from(300));
    assert_eq!(outcome.order.total, Pence::from(700));
    assert_eq!(outcome.order.status, OrderStatusType::Pending);

    let summary = wallet.wallet("cust-1").await.expect("Summary failed");
    assert_eq!(summary.balance, Pence::from(0), "credit debit and total finalisation are one transaction");
}

#[tokio::test]
async fn fully_covered_order_settles_immediately() {
    let db = new_db().await;
    let comp_id = active_competition(&db, "speedboat", 200, 100).await;
    let wallet = WalletApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    wallet.award_credit(credit("cust-2", 600, 30)).await.expect("Award failed");

    let order = NewOrder::new(OrderRef("order-2".into()), "cust-2".into())
        .with_item(NewOrderItem::new(comp_id, 3, Pence::from(200)));
    let outcome = orders.checkout(order, Pence::from(600)).await.expect("Checkout failed");

    assert!(outcome.settled_immediately());
    assert_eq!(outcome.order.status, OrderStatusType::Paid);
    assert_eq!(outcome.order.total, Pence::from(0));
    assert_eq!(outcome.tickets.len(), 3);
}

#[tokio::test]
async fn expired_credit_is_not_spendable() {
    let db = new_db().await;
    let comp_id = active_competition(&db, "holiday", 100, 100).await;
    let wallet = WalletApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    wallet.award_credit(credit("cust-3", 500, -1)).await.expect("Award failed");

    let summary = wallet.wallet("cust-3").await.expect("Summary failed");
    assert_eq!(summary.balance, Pence::from(0));

    let order = NewOrder::new(OrderRef("order-3".into()), "cust-3".into())
        .with_item(NewOrderItem::new(comp_id, 1, Pence::from(100)));
    let outcome = orders.checkout(order, Pence::from(500)).await.expect("Checkout failed");
    assert_eq!(outcome.order.credit_applied, Pence::from(0));
    assert_eq!(outcome.order.total, Pence::from(100));
}

#[tokio::test]
async fn credit_is_spent_oldest_expiry_first() {
    let db = new_db().await;
    let comp_id = active_competition(&db, "console", 100, 100).await;
    let wallet = WalletApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let late = wallet.award_credit(credit("cust-4", 100, 60)).await.expect("Award failed");
    let soon = wallet.award_credit(credit("cust-4", 100, 5)).await.expect("Award failed");

    let order = NewOrder::new(OrderRef("order-4".into()), "cust-4".into())
        .with_item(NewOrderItem::new(comp_id, 1, Pence::from(100)));
    orders.checkout(order, Pence::from(100)).await.expect("Checkout failed");

    let summary = wallet.wallet("cust-4").await.expect("Summary failed");
    let remaining =
        |id: i64| summary.credits.iter().find(|c| c.id == id).map(|c| c.remaining).expect("credit missing");
    assert_eq!(remaining(soon.id), Pence::from(0), "the credit expiring soonest is consumed first");
    assert_eq!(remaining(late.id), Pence::from(100));
}

#[tokio::test]
async fn sequential_checkouts_cannot_spend_the_same_credit_twice() {
    let db = new_db().await;
    let comp_id = active_competition(&db, "tv", 100, 100).await;
    let wallet = WalletApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    wallet.award_credit(credit("cust-5", 150, 30)).await.expect("Award failed");

    let first = NewOrder::new(OrderRef("order-5a".into()), "cust-5".into())
        .with_item(NewOrderItem::new(comp_id, 1, Pence::from(100)));
    let second = NewOrder::new(OrderRef("order-5b".into()), "cust-5".into())
        .with_item(NewOrderItem::new(comp_id, 1, Pence::from(100)));

    let a = orders.checkout(first, Pence::from(100)).await.expect("First checkout failed");
    let b = orders.checkout(second, Pence::from(100)).await.expect("Second checkout failed");

    assert_eq!(a.order.credit_applied + b.order.credit_applied, Pence::from(150));
    assert_eq!(b.order.credit_applied, Pence::from(50), "only the leftover credit is available to the second order");
}

#[tokio::test]
async fn withdrawal_debits_credit_atomically() {
    let db = new_db().await;
    let wallet = WalletApi::new(db.clone());

    wallet.award_credit(credit("cust-6", 2000, 30)).await.expect("Award failed");
    let withdrawal = wallet.request_withdrawal("cust-6", Pence::from(1500)).await.expect("Withdrawal failed");
    assert_eq!(withdrawal.status, WithdrawalStatus::Requested);
    assert_eq!(withdrawal.amount, Pence::from(1500));

    let summary = wallet.wallet("cust-6").await.expect("Summary failed");
    assert_eq!(summary.balance, Pence::from(500));
}

#[tokio::test]
async fn withdrawal_beyond_balance_is_rejected() {
    let db = new_db().await;
    let wallet = WalletApi::new(db.clone());

    wallet.award_credit(credit("cust-7", 100, 30)).await.expect("Award failed");
    let err = wallet.request_withdrawal("cust-7", Pence::from(500)).await.expect_err("Expected rejection");
    assert!(matches!(err, WalletApiError::InsufficientBalance { .. }));

    let summary = wallet.wallet("cust-7").await.expect("Summary failed");
    assert_eq!(summary.balance, Pence::from(100), "a rejected withdrawal must not touch the balance");
}

#[tokio::test]
async fn zero_and_negative_amounts_are_invalid() {
    let db = new_db().await;
    let wallet = WalletApi::new(db.clone());

    let err = wallet.request_withdrawal("cust-8", Pence::from(0)).await.expect_err("Expected rejection");
    assert!(matches!(err, WalletApiError::InvalidAmount(_)));
    let err = wallet.award_credit(credit("cust-8", -50, 30)).await.expect_err("Expected rejection");
    assert!(matches!(err, WalletApiError::InvalidAmount(_)));
}

#[tokio::test]
async fn referral_attribution_is_first_touch_with_expiry() {
    let db = new_db().await;
    let wallet = WalletApi::new(db.clone());

    let first =
        wallet.attribute_referral("cust-9", "FRIEND50", Duration::days(30)).await.expect("Attribution failed");
    assert_eq!(first.code, "FRIEND50");

    // A second code within the window does not replace the first
    let second =
        wallet.attribute_referral("cust-9", "OTHER10", Duration::days(30)).await.expect("Attribution failed");
    assert_eq!(second.code, "FRIEND50");

    // Force the attribution past its window; the new code then takes over
    sqlx::query("UPDATE referral_attributions SET expires_at = datetime('now', '-1 day') WHERE customer_id = 'cust-9'")
        .execute(db.pool())
        .await
        .unwrap();
    assert!(wallet.referral("cust-9").await.expect("Fetch failed").is_none());

    let replaced =
        wallet.attribute_referral("cust-9", "OTHER10", Duration::days(30)).await.expect("Attribution failed");
    assert_eq!(replaced.code, "OTHER10");
}
