use actix_web::{
    body::to_bytes,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::Duration;
use farmstand_engine::db_types::{Role, UserId};
use log::debug;

use crate::{
    auth::{TokenIssuer, TokenVerifier},
    config::AuthConfig,
    middleware::AuthenticationMiddlewareFactory,
    server::json_config,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("endpoint-tests-only-secret-value")
}

pub fn issue_token(id: i64, role: Role) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(UserId(id), role, Duration::days(1)).expect("Failed to sign token")
}

pub fn issue_expired_token(id: i64, role: Role) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(UserId(id), role, Duration::hours(-2)).expect("Failed to sign token")
}

/// Sends `req` to an app that mounts the routes registered by `configure` under an authenticated `/api` scope, the
/// same way the server does. Errors raised by middleware are rendered into responses, so the caller always gets a
/// status and a body.
pub async fn api_request<F>(req: TestRequest, token: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = req;
    if !token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    let verifier = TokenVerifier::new(&get_auth_config());
    let app = App::new()
        .app_data(json_config())
        .service(web::scope("/api").wrap(AuthenticationMiddlewareFactory::new(verifier)).configure(configure));
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1.map_into_boxed_body(),
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    (status, body)
}

/// Sends `req` to an app with the routes registered by `configure` and no authentication at all.
pub async fn public_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(json_config()).configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    (status, body)
}

pub fn error_kind(body: &str) -> String {
    let json: serde_json::Value = serde_json::from_str(body).unwrap_or_else(|e| panic!("Not JSON: {body}. {e}"));
    json["error"].as_str().unwrap_or_default().to_string()
}
