//! Browser preflight and cross-origin headers.
use actix_web::{
    http::{header, header::HeaderMap, Method, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use farmstand_engine::{db_types::Role, OrdersApi};

use super::{
    helpers::{get_auth_config, issue_token},
    mocks::MockOrderManager,
};
use crate::{
    auth::TokenVerifier,
    middleware::AuthenticationMiddlewareFactory,
    routes::MyOrdersRoute,
    server::{cors_policy, json_config},
};

const STOREFRONT: &str = "https://shop.farmstand.in";

async fn send(req: TestRequest, origins: &[&str], db: MockOrderManager) -> (StatusCode, HeaderMap) {
    let origins = origins.iter().map(|o| o.to_string()).collect::<Vec<_>>();
    let verifier = TokenVerifier::new(&get_auth_config());
    let app = App::new().wrap(cors_policy(&origins)).app_data(json_config()).service(
        web::scope("/api")
            .wrap(AuthenticationMiddlewareFactory::new(verifier))
            .service(MyOrdersRoute::<MockOrderManager>::new())
            .app_data(web::Data::new(OrdersApi::new(db))),
    );
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => (res.status(), res.headers().clone()),
        Err(e) => (e.as_response_error().status_code(), HeaderMap::new()),
    }
}

fn preflight(origin: &str) -> TestRequest {
    TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/orders")
        .insert_header((header::ORIGIN, origin))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization, content-type"))
}

#[actix_web::test]
async fn preflight_from_an_allowed_origin_needs_no_token() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_customer().never();
    let (status, headers) = send(preflight(STOREFRONT), &[STOREFRONT], db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), STOREFRONT);
    let methods = headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap().to_str().unwrap();
    assert!(methods.contains("POST"), "{methods}");
}

#[actix_web::test]
async fn preflight_from_an_unknown_origin_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_customer().never();
    let (_, headers) = send(preflight("https://elsewhere.example"), &[STOREFRONT], db).await;
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[actix_web::test]
async fn any_origin_is_allowed_by_default() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_customer().never();
    let (status, headers) = send(preflight("http://localhost:3000"), &[], db).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_some());
}

#[actix_web::test]
async fn api_responses_carry_the_allowed_origin() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_customer().times(1).returning(|_| Ok(vec![]));
    db.expect_fetch_customer_summaries().returning(|_| Ok(vec![]));
    db.expect_fetch_product_summaries().returning(|_| Ok(vec![]));
    let token = issue_token(11, Role::Customer);
    let req = TestRequest::get()
        .uri("/api/orders")
        .insert_header((header::ORIGIN, STOREFRONT))
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")));
    let (status, headers) = send(req, &[STOREFRONT], db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), STOREFRONT);
}
