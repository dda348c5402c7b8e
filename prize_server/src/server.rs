use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use prize_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderPaidEvent},
    CartApi,
    CompetitionApi,
    MaintenanceApi,
    OrderFlowApi,
    SqliteDatabase,
    WalletApi,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    g2pay_routes::G2payCallbackRoute,
    middleware::ApiKeyMiddlewareFactory,
    routes::{
        health,
        AttributeReferralRoute,
        CancelOrderRoute,
        CheckoutRoute,
        CompetitionBySlugRoute,
        CompetitionsRoute,
        CreateCompetitionRoute,
        ExecuteDrawRoute,
        FileUsageRoute,
        MyWalletRoute,
        OrderByRefRoute,
        RegisterFileRoute,
        RequestWithdrawalRoute,
        RevealTicketRoute,
        RunPayoutsRoute,
        SearchOrdersRoute,
        SeedPrizesRoute,
        SetCompetitionStatusRoute,
        ValidateCartRoute,
        VerifyDrawRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev: OrderPaidEvent| {
        Box::pin(async move {
            info!("🎉️ Order {} paid. {} tickets allocated.", ev.order.order_ref, ev.tickets.len());
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    start_expiry_worker(db.clone(), producers.clone(), config.unpaid_order_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let cart_api = CartApi::new(db.clone());
        let competition_api = CompetitionApi::new(db.clone());
        let wallet_api = WalletApi::new(db.clone());
        let maintenance_api = MaintenanceApi::new(db.clone());
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pcs::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(competition_api))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(maintenance_api))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(config.g2pay.clone()));
        let api_scope = web::scope("/api")
            .service(CompetitionsRoute::<SqliteDatabase>::new())
            .service(CompetitionBySlugRoute::<SqliteDatabase>::new())
            .service(ValidateCartRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(OrderByRefRoute::<SqliteDatabase>::new())
            .service(RevealTicketRoute::<SqliteDatabase>::new())
            .service(MyWalletRoute::<SqliteDatabase>::new())
            .service(RequestWithdrawalRoute::<SqliteDatabase>::new())
            .service(AttributeReferralRoute::<SqliteDatabase>::new());
        let admin_scope = web::scope("/admin")
            .wrap(ApiKeyMiddlewareFactory::new(config.admin_api_key.clone()))
            .service(CreateCompetitionRoute::<SqliteDatabase>::new())
            .service(SetCompetitionStatusRoute::<SqliteDatabase>::new())
            .service(SeedPrizesRoute::<SqliteDatabase>::new())
            .service(ExecuteDrawRoute::<SqliteDatabase>::new())
            .service(VerifyDrawRoute::<SqliteDatabase>::new())
            .service(RunPayoutsRoute::<SqliteDatabase>::new())
            .service(FileUsageRoute::<SqliteDatabase>::new())
            .service(RegisterFileRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new());
        let g2pay_scope = web::scope("/g2pay").service(G2payCallbackRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(admin_scope).service(g2pay_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
