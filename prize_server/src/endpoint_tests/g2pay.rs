use std::collections::BTreeMap;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use pcs_common::{Pence, Secret};
use prize_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    traits::{FailureOutcome, PaymentGatewayError, SettlementOutcome},
    OrderFlowApi,
};

use super::{
    helpers::post_form_request,
    mocks::{sample_order, sample_tickets, test_options, MockGatewayDb},
};
use crate::{
    config::G2PayConfig,
    g2pay::callback_signature,
    g2pay_routes::G2payCallbackRoute,
};

const SECRET: &str = "test-merchant-secret";

fn signed_form(status: &str, order_ref: &str, amount: &str) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = [
        ("transactionStatus", status),
        ("transactionId", "111000222"),
        ("clientUniqueId", order_ref),
        ("totalAmount", amount),
        ("currency", "GBP"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let signature = callback_signature(&fields, SECRET);
    fields.insert("signature".to_string(), signature);
    fields
}

fn app_data(cfg: &mut ServiceConfig, gateway: MockGatewayDb) {
    let api = OrderFlowApi::new(gateway, EventProducers::default());
    cfg.service(G2payCallbackRoute::<MockGatewayDb>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(test_options()))
        .app_data(web::Data::new(G2PayConfig { merchant_secret: Secret::new(SECRET.to_string()) }));
}

fn configure_approved(cfg: &mut ServiceConfig) {
    let mut gateway = MockGatewayDb::new();
    gateway.expect_confirm_order_paid().returning(|order_ref, txn| {
        assert_eq!(order_ref.as_str(), "order-123");
        assert_eq!(txn.txn_id, "111000222");
        assert_eq!(txn.amount, Some(Pence::from(2499)));
        let order = sample_order("order-123", "cust-1", OrderStatusType::Paid, 2499);
        let tickets = sample_tickets(&order, 1, 3);
        Ok(SettlementOutcome { order, tickets, newly_paid: true })
    });
    app_data(cfg, gateway);
}

#[actix_web::test]
async fn approved_callback_settles_and_returns_ok() {
    let _ = env_logger::try_init().ok();
    let form = signed_form("APPROVED", "order-123", "24.99");
    let (status, body) = post_form_request("/callback", &form, configure_approved).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

fn configure_declined(cfg: &mut ServiceConfig) {
    let mut gateway = MockGatewayDb::new();
    gateway.expect_fail_order().returning(|order_ref, _| {
        let order = sample_order(order_ref.as_str(), "cust-1", OrderStatusType::PaymentFailed, 2499);
        Ok(FailureOutcome { order, newly_failed: true })
    });
    app_data(cfg, gateway);
}

#[actix_web::test]
async fn declined_callback_fails_the_order() {
    let _ = env_logger::try_init().ok();
    let form = signed_form("DECLINED", "order-123", "24.99");
    let (status, body) = post_form_request("/callback", &form, configure_declined).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

// No expectations: reaching the engine at all would panic the test
fn configure_untouched(cfg: &mut ServiceConfig) {
    app_data(cfg, MockGatewayDb::new());
}

#[actix_web::test]
async fn tampered_signature_is_rejected_without_reaching_the_engine() {
    let _ = env_logger::try_init().ok();
    let mut form = signed_form("APPROVED", "order-123", "24.99");
    form.insert("totalAmount".to_string(), "0.01".to_string()); // field changed after signing
    let (status, body) = post_form_request("/callback", &form, configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("signature"));
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut form = signed_form("APPROVED", "order-123", "24.99");
    form.remove("signature");
    let (status, _) = post_form_request("/callback", &form, configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_transaction_status_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut fields: BTreeMap<String, String> = [
        ("transactionStatus", "PENDING"),
        ("transactionId", "111000222"),
        ("clientUniqueId", "order-123"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let signature = callback_signature(&fields, SECRET);
    fields.insert("signature".to_string(), signature);
    let (status, body) = post_form_request("/callback", &fields, configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("transaction status"));
}

fn configure_unknown_order(cfg: &mut ServiceConfig) {
    let mut gateway = MockGatewayDb::new();
    gateway
        .expect_confirm_order_paid()
        .returning(|order_ref, _| Err(PaymentGatewayError::OrderNotFound(order_ref.clone())));
    app_data(cfg, gateway);
}

#[actix_web::test]
async fn unknown_order_reference_is_a_404() {
    let _ = env_logger::try_init().ok();
    let form = signed_form("APPROVED", "order-nope", "24.99");
    let (status, _) = post_form_request("/callback", &form, configure_unknown_order).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn configure_amount_mismatch(cfg: &mut ServiceConfig) {
    let mut gateway = MockGatewayDb::new();
    gateway.expect_confirm_order_paid().returning(|_, txn| {
        Err(PaymentGatewayError::AmountMismatch {
            expected: Pence::from(2499),
            received: txn.amount.unwrap_or_default(),
        })
    });
    app_data(cfg, gateway);
}

#[actix_web::test]
async fn amount_mismatch_is_a_400() {
    let _ = env_logger::try_init().ok();
    let form = signed_form("APPROVED", "order-123", "12.00");
    let (status, _) = post_form_request("/callback", &form, configure_amount_mismatch).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn configure_duplicate(cfg: &mut ServiceConfig) {
    let mut gateway = MockGatewayDb::new();
    gateway.expect_confirm_order_paid().returning(|_, _| {
        let order = sample_order("order-123", "cust-1", OrderStatusType::Paid, 2499);
        let tickets = sample_tickets(&order, 1, 3);
        Ok(SettlementOutcome { order, tickets, newly_paid: false })
    });
    app_data(cfg, gateway);
}

#[actix_web::test]
async fn duplicate_delivery_still_returns_ok() {
    let _ = env_logger::try_init().ok();
    let form = signed_form("APPROVED", "order-123", "24.99");
    let (status, body) = post_form_request("/callback", &form, configure_duplicate).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}
