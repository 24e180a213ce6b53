use std::time::Duration;

use actix_cors::Cors;
use actix_web::{
    dev::Server,
    http::{header, KeepAlive},
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use farmstand_engine::{InventoryApi, OrderFlowApi, OrdersApi, SqliteDatabase};
use log::*;

use crate::{
    auth::TokenVerifier,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::AuthenticationMiddlewareFactory,
    routes::{
        health,
        CreateProductRoute,
        CustomerOrdersRoute,
        FarmerOrdersRoute,
        LegacyPlaceOrderRoute,
        MyFarmerOrdersRoute,
        MyOrdersRoute,
        OwnerProductsRoute,
        PlaceOrderRoute,
        ProductsRoute,
        UpdateOrderStatusRoute,
        UpdateProductRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        info!("🚀️ Database migrations are up to date");
    }
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(ServerError::from)
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let verifier = TokenVerifier::new(&config.auth);
    let cors_origins = config.cors_origins.clone();
    let srv = HttpServer::new(move || {
        let checkout_api = OrderFlowApi::new(db.clone()).with_max_attempts(options.checkout_attempts);
        let orders_api = OrdersApi::new(db.clone()).with_strict_transitions(options.strict_status_transitions);
        let inventory_api = InventoryApi::new(db.clone());
        let app = App::new()
            .wrap(cors_policy(&cors_origins))
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fsm::access_log"))
            .app_data(json_config())
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(inventory_api));
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(AuthenticationMiddlewareFactory::new(verifier.clone()))
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(LegacyPlaceOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyFarmerOrdersRoute::<SqliteDatabase>::new())
            .service(CustomerOrdersRoute::<SqliteDatabase>::new())
            .service(FarmerOrdersRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new());
        // The public catalogue must be registered ahead of the authenticated scope
        app.service(health)
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(OwnerProductsRoute::<SqliteDatabase>::new())
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// The storefront runs in browsers on other origins. Preflight requests are answered here, ahead of authentication.
/// An empty list, or one containing `*`, allows any origin.
pub fn cors_policy(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PATCH"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_any_origin()
    } else {
        origins.iter().fold(cors, |cors, origin| cors.allowed_origin(origin))
    }
}

/// Malformed or non-conforming JSON bodies are reported as 400s in the standard error format.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        debug!("💻️ Rejected request body for {}. {err}", req.path());
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}
