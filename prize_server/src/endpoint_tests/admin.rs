use actix_web::{http::StatusCode, web, web::ServiceConfig};
use pcs_common::{Pence, Secret};
use prize_engine::{
    traits::{DrawCheck, DrawVerification, MaintenanceError, PayoutRunResult},
    MaintenanceApi,
};

use super::{
    helpers::{get_request, post_json_request},
    mocks::MockMaintenanceDb,
};
use crate::{
    middleware::ApiKeyMiddlewareFactory,
    routes::{RunPayoutsRoute, VerifyDrawRoute},
};

const ADMIN_KEY: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";
const KEY_HEADER: (&str, &str) = ("x-pcs-admin-key", ADMIN_KEY);

fn configure(cfg: &mut ServiceConfig) {
    let mut maintenance = MockMaintenanceDb::new();
    maintenance.expect_process_pending_payouts().returning(|| {
        Ok(PayoutRunResult { processed: 2, total_amount: Pence::from(1250), errors: vec![] })
    });
    maintenance.expect_verify_draw().returning(|competition_id| {
        if competition_id == 1 {
            Ok(DrawVerification::from_checks(competition_id, vec![
                DrawCheck::new("seal matches", true),
                DrawCheck::new("winning ticket exists", true),
            ]))
        } else {
            Err(MaintenanceError::DrawNotFound(competition_id))
        }
    });
    let admin_scope = web::scope("/admin")
        .wrap(ApiKeyMiddlewareFactory::new(Secret::new(ADMIN_KEY.to_string())))
        .service(RunPayoutsRoute::<MockMaintenanceDb>::new())
        .service(VerifyDrawRoute::<MockMaintenanceDb>::new());
    cfg.service(admin_scope).app_data(web::Data::new(MaintenanceApi::new(maintenance)));
}

#[actix_web::test]
async fn payout_run_with_valid_key_succeeds() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_json_request(&[KEY_HEADER], "/admin/payouts/run", serde_json::json!({}), configure)
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).expect("Invalid JSON");
    assert_eq!(result["processed"], 2);
    assert_eq!(result["total_amount"], 1250);
}

#[actix_web::test]
async fn missing_admin_key_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let err = post_json_request(&[], "/admin/payouts/run", serde_json::json!({}), configure)
        .await
        .expect_err("Expected the middleware to reject");
    assert_eq!(err, "No admin API key supplied.");
}

#[actix_web::test]
async fn wrong_admin_key_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let err = post_json_request(
        &[("x-pcs-admin-key", "wrong-key")],
        "/admin/payouts/run",
        serde_json::json!({}),
        configure,
    )
    .await
    .expect_err("Expected the middleware to reject");
    assert_eq!(err, "Invalid admin API key.");
}

#[actix_web::test]
async fn draw_verification_relays_the_report() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request(&[KEY_HEADER], "/admin/competitions/1/draw/verify", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let report: serde_json::Value = serde_json::from_str(&body).expect("Invalid JSON");
    assert_eq!(report["valid"], true);
    assert_eq!(report["checks"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn verifying_an_undrawn_competition_is_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        get_request(&[KEY_HEADER], "/admin/competitions/2/draw/verify", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}
