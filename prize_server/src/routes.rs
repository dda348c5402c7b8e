//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g.
//! I/O, database operations, etc.) should be expressed as futures or asynchronous functions; async handlers get
//! executed concurrently by worker threads and thus don't block execution.

use std::str::FromStr;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use prize_engine::{
    db_types::{CompetitionStatus, NewCompetition, NewOrder, OrderRef, OrderStatusType},
    order_objects::OrderQueryFilter,
    traits::{CompetitionManagement, MaintenanceOperations, PaymentGatewayDatabase, WalletManagement},
    CartApi,
    CompetitionApi,
    MaintenanceApi,
    OrderFlowApi,
    WalletApi,
};

use crate::{
    config::ServerOptions,
    data_objects::{
        CartValidationRequest,
        CheckoutRequest,
        OrderSearchParams,
        ReferralRequest,
        RegisterFileRequest,
        SeedPrizesRequest,
        StatusUpdateRequest,
        WithdrawalRequest,
    },
    errors::ServerError,
    helpers::require_customer_id,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Storefront ----------------------------------------------------

route!(competitions => Get "/competitions" impl CompetitionManagement);
pub async fn competitions<B: CompetitionManagement>(
    api: web::Data<CompetitionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET competitions");
    let listing = api.active_competitions().await?;
    Ok(HttpResponse::Ok().json(listing))
}

route!(competition_by_slug => Get "/competitions/{slug}" impl CompetitionManagement);
pub async fn competition_by_slug<B: CompetitionManagement>(
    path: web::Path<String>,
    api: web::Data<CompetitionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let slug = path.into_inner();
    debug!("💻️ GET competition {slug}");
    let competition = api
        .competition_by_slug(&slug)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No competition '{slug}'")))?;
    Ok(HttpResponse::Ok().json(competition))
}

route!(validate_cart => Post "/cart/validate" impl CompetitionManagement);
pub async fn validate_cart<B: CompetitionManagement>(
    body: web::Json<CartValidationRequest>,
    api: web::Data<CartApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST validate cart with {} lines", request.lines.len());
    let validation = api.validate_cart(&request.lines, options.price_tolerance).await?;
    Ok(HttpResponse::Ok().json(validation))
}

route!(checkout => Post "/checkout" impl PaymentGatewayDatabase);
pub async fn checkout<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = require_customer_id(&req, &options)?;
    let request = body.into_inner();
    debug!("💻️ POST checkout {} for customer {customer_id}", request.order_ref);
    let mut order = NewOrder::new(OrderRef(request.order_ref), customer_id);
    order.items = request.lines;
    let outcome = api.checkout(order, request.credit).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(order_by_ref => Get "/orders/{order_ref}" impl PaymentGatewayDatabase);
pub async fn order_by_ref<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = require_customer_id(&req, &options)?;
    let order_ref = OrderRef(path.into_inner());
    debug!("💻️ GET order {order_ref} for customer {customer_id}");
    let summary = api
        .order_summary(&order_ref, Some(&customer_id))
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No order {order_ref}")))?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(reveal_ticket => Post "/tickets/{id}/reveal" impl PaymentGatewayDatabase);
pub async fn reveal_ticket<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = require_customer_id(&req, &options)?;
    let ticket_id = path.into_inner();
    debug!("💻️ POST reveal ticket {ticket_id} for customer {customer_id}");
    let outcome = api.reveal_ticket(ticket_id, &customer_id, options.prize_credit_validity).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------    Wallet   ----------------------------------------------------

route!(my_wallet => Get "/wallet" impl WalletManagement);
pub async fn my_wallet<B: WalletManagement>(
    req: HttpRequest,
    api: web::Data<WalletApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = require_customer_id(&req, &options)?;
    debug!("💻️ GET wallet for {customer_id}");
    let summary = api.wallet(&customer_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(request_withdrawal => Post "/wallet/withdrawals" impl WalletManagement);
pub async fn request_withdrawal<B: WalletManagement>(
    req: HttpRequest,
    body: web::Json<WithdrawalRequest>,
    api: web::Data<WalletApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = require_customer_id(&req, &options)?;
    let amount = body.into_inner().amount;
    debug!("💻️ POST withdrawal of {amount} for {customer_id}");
    let withdrawal = api.request_withdrawal(&customer_id, amount).await?;
    Ok(HttpResponse::Ok().json(withdrawal))
}

route!(attribute_referral => Post "/referral" impl WalletManagement);
pub async fn attribute_referral<B: WalletManagement>(
    req: HttpRequest,
    body: web::Json<ReferralRequest>,
    api: web::Data<WalletApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = require_customer_id(&req, &options)?;
    let code = body.into_inner().code;
    debug!("💻️ POST referral attribution '{code}' for {customer_id}");
    let attribution = api.attribute_referral(&customer_id, &code, options.referral_validity).await?;
    Ok(HttpResponse::Ok().json(attribution))
}

//----------------------------------------------     Admin   ----------------------------------------------------

route!(create_competition => Post "/competitions" impl CompetitionManagement);
pub async fn create_competition<B: CompetitionManagement>(
    body: web::Json<NewCompetition>,
    api: web::Data<CompetitionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let competition = body.into_inner();
    debug!("💻️ POST create competition '{}'", competition.slug);
    let created = api.create_competition(competition).await?;
    Ok(HttpResponse::Ok().json(created))
}

route!(set_competition_status => Post "/competitions/{id}/status" impl CompetitionManagement);
pub async fn set_competition_status<B: CompetitionManagement>(
    path: web::Path<i64>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<CompetitionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let status = CompetitionStatus::from_str(&body.into_inner().status)
        .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    debug!("💻️ POST set competition {id} status to {status}");
    let competition = api.set_status(id, status).await?;
    Ok(HttpResponse::Ok().json(competition))
}

route!(seed_prizes => Post "/competitions/{id}/prizes" impl CompetitionManagement);
pub async fn seed_prizes<B: CompetitionManagement>(
    path: web::Path<i64>,
    body: web::Json<SeedPrizesRequest>,
    api: web::Data<CompetitionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let prizes = body.into_inner().prizes;
    debug!("💻️ POST seed {} instant prizes for competition {id}", prizes.len());
    let seeded = api.seed_instant_prizes(id, prizes).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "seeded": seeded })))
}

route!(execute_draw => Post "/competitions/{id}/draw" impl MaintenanceOperations);
pub async fn execute_draw<B: MaintenanceOperations>(
    path: web::Path<i64>,
    api: web::Data<MaintenanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ POST execute draw for competition {id}");
    let draw = api.execute_draw(id).await?;
    Ok(HttpResponse::Ok().json(draw))
}

route!(verify_draw => Get "/competitions/{id}/draw/verify" impl MaintenanceOperations);
pub async fn verify_draw<B: MaintenanceOperations>(
    path: web::Path<i64>,
    api: web::Data<MaintenanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET verify draw for competition {id}");
    let verification = api.verify_draw(id).await?;
    Ok(HttpResponse::Ok().json(verification))
}

route!(run_payouts => Post "/payouts/run" impl MaintenanceOperations);
pub async fn run_payouts<B: MaintenanceOperations>(
    api: web::Data<MaintenanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ POST payout run");
    let result = api.process_pending_payouts().await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(register_file => Post "/files" impl MaintenanceOperations);
pub async fn register_file<B: MaintenanceOperations>(
    body: web::Json<RegisterFileRequest>,
    api: web::Data<MaintenanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let path = body.into_inner().path;
    debug!("💻️ POST register file '{path}'");
    let file = api.register_file(&path).await?;
    Ok(HttpResponse::Ok().json(file))
}

route!(file_usage => Get "/files/usage" impl MaintenanceOperations);
pub async fn file_usage<B: MaintenanceOperations>(
    api: web::Data<MaintenanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET file usage");
    let unused = api.check_file_usage().await?;
    Ok(HttpResponse::Ok().json(unused))
}

route!(cancel_order => Post "/orders/{order_ref}/cancel" impl PaymentGatewayDatabase);
pub async fn cancel_order<B: PaymentGatewayDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_ref = OrderRef(path.into_inner());
    info!("💻️ POST cancel order {order_ref}");
    let order = api.cancel_order(&order_ref).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(search_orders => Get "/orders" impl PaymentGatewayDatabase);
pub async fn search_orders<B: PaymentGatewayDatabase>(
    params: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let mut filter = OrderQueryFilter::default();
    if let Some(cid) = params.customer_id {
        filter = filter.with_customer_id(cid);
    }
    if let Some(statuses) = params.status {
        for status in statuses.split(',').filter(|s| !s.trim().is_empty()) {
            let status = OrderStatusType::from_str(status.trim())
                .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
            filter = filter.with_status(status);
        }
    }
    debug!("💻️ GET order search");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}
