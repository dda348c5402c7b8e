use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use pcs_common::Pence;
use prize_engine::{
    db_types::{OrderStatusType, WalletCredit, WalletCreditSource, Withdrawal, WithdrawalStatus},
    events::EventProducers,
    traits::{PaymentGatewayError, WalletApiError, WalletSummary},
    CartApi,
    OrderFlowApi,
    WalletApi,
};

use super::{
    helpers::{get_request, post_json_request},
    mocks::{
        sample_competition,
        sample_order,
        sample_tickets,
        test_options,
        MockCompetitionDb,
        MockGatewayDb,
        MockWalletDb,
    },
};
use crate::routes::{MyWalletRoute, OrderByRefRoute, RequestWithdrawalRoute, RevealTicketRoute, ValidateCartRoute};

const CUSTOMER_HEADER: (&str, &str) = ("x-customer-id", "cust-1");

//----------------------------------------------   Cart   ----------------------------------------------------

fn configure_cart(cfg: &mut ServiceConfig) {
    let mut competitions = MockCompetitionDb::new();
    competitions.expect_fetch_competitions_by_ids().returning(|_| {
        Ok(vec![
            sample_competition(1, "supercar", 100, 1000, 0),
            sample_competition(2, "boat", 250, 100, 100), // sold out
        ])
    });
    cfg.service(ValidateCartRoute::<MockCompetitionDb>::new())
        .app_data(web::Data::new(CartApi::new(competitions)))
        .app_data(web::Data::new(test_options()));
}

#[actix_web::test]
async fn cart_validation_removes_and_reports() {
    let _ = env_logger::try_init().ok();
    let body = serde_json::json!({
        "lines": [
            { "competition_id": 1, "quantity": 2, "expected_unit_price": 100 },
            { "competition_id": 2, "quantity": 1, "expected_unit_price": 250 },
            { "competition_id": 3, "quantity": 1, "expected_unit_price": 50 },
        ]
    });
    let (status, body) =
        post_json_request(&[], "/cart/validate", body, configure_cart).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let validation: serde_json::Value = serde_json::from_str(&body).expect("Invalid JSON");
    assert_eq!(validation["lines"].as_array().unwrap().len(), 1);
    assert_eq!(validation["removed"].as_array().unwrap().len(), 2);
    let reasons = validation["removed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["reason"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert!(reasons.iter().any(|r| r.contains("sold out")));
    assert!(reasons.iter().any(|r| r.contains("no longer available")));
}

//----------------------------------------------   Orders  ----------------------------------------------------

fn configure_orders(cfg: &mut ServiceConfig) {
    let mut gateway = MockGatewayDb::new();
    gateway.expect_fetch_order_by_ref().returning(|order_ref| {
        if order_ref.as_str() == "order-123" {
            Ok(Some(sample_order("order-123", "cust-1", OrderStatusType::Paid, 300)))
        } else {
            Ok(None)
        }
    });
    gateway.expect_fetch_order_items().returning(|_| Ok(vec![]));
    gateway.expect_fetch_tickets_for_order().returning(|_| {
        let order = sample_order("order-123", "cust-1", OrderStatusType::Paid, 300);
        Ok(sample_tickets(&order, 1, 3))
    });
    cfg.service(OrderByRefRoute::<MockGatewayDb>::new())
        .app_data(web::Data::new(OrderFlowApi::new(gateway, EventProducers::default())))
        .app_data(web::Data::new(test_options()));
}

#[actix_web::test]
async fn owner_reads_their_order_with_tickets() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request(&[CUSTOMER_HEADER], "/orders/order-123", configure_orders).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let summary: serde_json::Value = serde_json::from_str(&body).expect("Invalid JSON");
    assert_eq!(summary["order"]["order_ref"], "order-123");
    assert_eq!(summary["tickets"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn foreign_order_reads_as_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        get_request(&[("x-customer-id", "cust-2")], "/orders/order-123", configure_orders)
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn missing_customer_identity_is_unauthorised() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(&[], "/orders/order-123", configure_orders).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

//----------------------------------------------   Reveal  ----------------------------------------------------

fn configure_reveal_missing(cfg: &mut ServiceConfig) {
    let mut gateway = MockGatewayDb::new();
    gateway.expect_reveal_ticket().returning(|ticket_id, _, _| Err(PaymentGatewayError::TicketNotFound(ticket_id)));
    cfg.service(RevealTicketRoute::<MockGatewayDb>::new())
        .app_data(web::Data::new(OrderFlowApi::new(gateway, EventProducers::default())))
        .app_data(web::Data::new(test_options()));
}

#[actix_web::test]
async fn revealing_a_foreign_ticket_is_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_json_request(&[CUSTOMER_HEADER], "/tickets/99/reveal", serde_json::json!({}), configure_reveal_missing)
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//----------------------------------------------   Wallet  ----------------------------------------------------

fn configure_wallet(cfg: &mut ServiceConfig) {
    let mut wallet = MockWalletDb::new();
    wallet.expect_wallet_summary().returning(|customer_id| {
        let ts = chrono::Utc::now();
        Ok(WalletSummary {
            customer_id: customer_id.to_string(),
            balance: Pence::from(750),
            credits: vec![WalletCredit {
                id: 1,
                customer_id: customer_id.to_string(),
                initial: Pence::from(1000),
                remaining: Pence::from(750),
                source: WalletCreditSource::Prize,
                expires_at: ts + Duration::days(100),
                created_at: ts,
                updated_at: ts,
            }],
        })
    });
    wallet.expect_request_withdrawal().returning(|customer_id, amount| {
        if amount > Pence::from(750) {
            Err(WalletApiError::InsufficientBalance { requested: amount, available: Pence::from(750) })
        } else {
            Ok(Withdrawal {
                id: 7,
                customer_id: customer_id.to_string(),
                amount,
                status: WithdrawalStatus::Requested,
                requested_at: chrono::Utc::now(),
                processed_at: None,
            })
        }
    });
    cfg.service(MyWalletRoute::<MockWalletDb>::new())
        .service(RequestWithdrawalRoute::<MockWalletDb>::new())
        .app_data(web::Data::new(WalletApi::new(wallet)))
        .app_data(web::Data::new(test_options()));
}

#[actix_web::test]
async fn wallet_summary_reports_spendable_balance() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&[CUSTOMER_HEADER], "/wallet", configure_wallet).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let summary: serde_json::Value = serde_json::from_str(&body).expect("Invalid JSON");
    assert_eq!(summary["balance"], 750);
    assert_eq!(summary["customer_id"], "cust-1");
}

#[actix_web::test]
async fn withdrawal_within_balance_is_accepted() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_json_request(
        &[CUSTOMER_HEADER],
        "/wallet/withdrawals",
        serde_json::json!({ "amount": 500 }),
        configure_wallet,
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let withdrawal: serde_json::Value = serde_json::from_str(&body).expect("Invalid JSON");
    assert_eq!(withdrawal["amount"], 500);
    assert_eq!(withdrawal["status"], "Requested");
}

#[actix_web::test]
async fn withdrawal_beyond_balance_is_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_json_request(
        &[CUSTOMER_HEADER],
        "/wallet/withdrawals",
        serde_json::json!({ "amount": 999999 }),
        configure_wallet,
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("unexpired credit"));
}
