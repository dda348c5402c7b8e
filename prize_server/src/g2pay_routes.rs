//----------------------------------------------  Gateway callback  ---------------------------------------------

use std::collections::BTreeMap;

use actix_web::{web, HttpRequest, HttpResponse};
use log::*;
use prize_engine::{db_types::GatewayTransaction, traits::PaymentGatewayDatabase, OrderFlowApi};

use crate::{
    config::{G2PayConfig, ServerOptions},
    errors::ServerError,
    g2pay::{verify_signature, G2PayCallback, TransactionStatus, SIGNATURE_FIELD},
    helpers::get_remote_ip,
    route,
};

route!(g2pay_callback => Post "/callback" impl PaymentGatewayDatabase);
/// The canonical payment-outcome callback from G2Pay.
///
/// The signature covers every POSTed field except `signature` itself, so the body is taken as a raw field map and
/// verified before any interpretation happens. Gateway retries of an already-processed transaction get a 200 and
/// change nothing; see the engine's settlement idempotency.
pub async fn g2pay_callback<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    form: web::Form<BTreeMap<String, String>>,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<G2PayConfig>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let mut fields = form.into_inner();
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    trace!("💳️ Received gateway callback with {} fields from {peer:?}", fields.len());
    let provided = fields.remove(SIGNATURE_FIELD).ok_or_else(|| {
        warn!("💳️ Callback rejected: no signature field");
        ServerError::InvalidSignature
    })?;
    if !verify_signature(&fields, &provided, config.merchant_secret.reveal()) {
        warn!("💳️ Callback rejected: signature mismatch");
        return Err(ServerError::InvalidSignature);
    }
    let callback = G2PayCallback::from_fields(&fields).map_err(|e| {
        warn!("💳️ Callback rejected: {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let payload =
        serde_json::to_string(&fields).map_err(|e| ServerError::Unspecified(e.to_string()))?;
    let txn = GatewayTransaction::new(callback.transaction_id.clone(), callback.total_amount, payload);
    let order_ref = &callback.client_unique_id;
    match callback.transaction_status {
        TransactionStatus::Approved => {
            debug!("💳️ APPROVED callback for {order_ref} (txn [{}])", txn.txn_id);
            let outcome = api.confirm_payment(order_ref, &txn).await?;
            info!(
                "💳️ Order {order_ref} settled: {} tickets ({})",
                outcome.tickets.len(),
                if outcome.newly_paid { "new" } else { "duplicate delivery" }
            );
        },
        TransactionStatus::Declined | TransactionStatus::Error => {
            debug!(
                "💳️ {} callback for {order_ref} (txn [{}])",
                callback.transaction_status, txn.txn_id
            );
            api.fail_payment(order_ref, &txn).await?;
        },
    }
    Ok(HttpResponse::Ok().body("OK"))
}
