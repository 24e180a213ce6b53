//! Checkout requests against a real SQLite backend.
use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use farmstand_engine::{
    db_types::Role,
    test_utils::{
        fixtures::{seed_product, seed_user},
        prepare_env::{prepare_test_env, random_db_path, remove_database},
    },
    traits::InventoryManagement,
    OrderFlowApi,
    SqliteDatabase,
};
use serde_json::{json, Value};

use super::helpers::{api_request, error_kind, issue_token};
use crate::routes::{LegacyPlaceOrderRoute, PlaceOrderRoute};

#[actix_web::test]
async fn checkout_reserves_stock_and_prices_the_order() {
    let db = prepare_test_env(&random_db_path()).await;
    let asha = seed_user(&db, "Asha", Role::Customer).await;
    let ravi = seed_user(&db, "Ravi", Role::Farmer).await;
    let mangoes = seed_product(&db, &ravi, "Mangoes", 250, 5).await;
    let okra = seed_product(&db, &ravi, "Okra", 40, 20).await;

    let token = issue_token(asha.id.value(), Role::Customer);
    let cart = json!({
        "items": [{"productId": mangoes.id, "quantity": 2}, {"productId": okra.id, "quantity": 3}],
        "totalPrice": 1,
        "paymentMethod": "upi",
        "deliveryAddress": "4 Station Rd, Pune"
    });
    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "Order placed successfully");
    assert_eq!(json["order"]["totalPrice"], 62_000);
    assert_eq!(json["order"]["status"], "pending");
    assert_eq!(json["order"]["paymentMethod"], "upi");
    assert_eq!(json["order"]["customer"]["name"], "Asha");
    assert_eq!(json["order"]["items"][0]["product"]["name"], "Mangoes");

    let mangoes = db.fetch_product(mangoes.id).await.unwrap().unwrap();
    assert_eq!(mangoes.stock, 3);
    assert_eq!(mangoes.buyers_count, 1);
    let okra = db.fetch_product(okra.id).await.unwrap().unwrap();
    assert_eq!(okra.stock, 17);
    remove_database(db).await;
}

#[actix_web::test]
async fn decimal_rupee_totals_are_accepted() {
    let db = prepare_test_env(&random_db_path()).await;
    let asha = seed_user(&db, "Asha", Role::Customer).await;
    let ravi = seed_user(&db, "Ravi", Role::Farmer).await;
    let tomatoes = seed_product(&db, &ravi, "Tomatoes", 45, 10).await;

    let token = issue_token(asha.id.value(), Role::Customer);
    let cart = json!({
        "items": [{"productId": tomatoes.id, "quantity": 3}],
        "totalPrice": 270.5,
        "deliveryAddress": "4 Station Rd, Pune"
    });
    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    // The stored total comes from the product prices, not the client's figure
    assert_eq!(json["order"]["totalPrice"], 13_500);
    assert_eq!(db.fetch_product(tomatoes.id).await.unwrap().unwrap().stock, 7);
    remove_database(db).await;
}

#[actix_web::test]
async fn checkout_beyond_stock_changes_nothing() {
    let db = prepare_test_env(&random_db_path()).await;
    let asha = seed_user(&db, "Asha", Role::Customer).await;
    let ravi = seed_user(&db, "Ravi", Role::Farmer).await;
    let mangoes = seed_product(&db, &ravi, "Mangoes", 250, 5).await;
    let okra = seed_product(&db, &ravi, "Okra", 40, 2).await;

    let token = issue_token(asha.id.value(), Role::Customer);
    let cart = json!({
        "items": [{"productId": mangoes.id, "quantity": 2}, {"productId": okra.id, "quantity": 3}],
        "deliveryAddress": "4 Station Rd, Pune"
    });
    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_kind(&body), "InsufficientStock");
    assert!(body.contains("Okra"), "{body}");

    assert_eq!(db.fetch_product(mangoes.id).await.unwrap().unwrap().stock, 5);
    assert_eq!(db.fetch_product(okra.id).await.unwrap().unwrap().stock, 2);
    remove_database(db).await;
}

#[actix_web::test]
async fn legacy_checkout_path() {
    let db = prepare_test_env(&random_db_path()).await;
    let asha = seed_user(&db, "Asha", Role::Customer).await;
    let ravi = seed_user(&db, "Ravi", Role::Farmer).await;
    let mangoes = seed_product(&db, &ravi, "Mangoes", 250, 5).await;

    let token = issue_token(asha.id.value(), Role::Customer);
    let cart = json!({"items": [{"productId": mangoes.id, "quantity": 5}], "deliveryAddress": "4 Station Rd"});
    let req = TestRequest::post().uri("/api/products/order").set_json(cart);
    let (status, _) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(db.fetch_product(mangoes.id).await.unwrap().unwrap().stock, 0);

    let cart = json!({"items": [{"productId": mangoes.id, "quantity": 1}], "deliveryAddress": "4 Station Rd"});
    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_kind(&body), "InsufficientStock");
    remove_database(db).await;
}

#[actix_web::test]
async fn legacy_carts_may_carry_a_buyer_id() {
    let db = prepare_test_env(&random_db_path()).await;
    let asha = seed_user(&db, "Asha", Role::Customer).await;
    let ravi = seed_user(&db, "Ravi", Role::Farmer).await;
    let mangoes = seed_product(&db, &ravi, "Mangoes", 250, 5).await;

    let token = issue_token(asha.id.value(), Role::Customer);
    let cart = json!({
        "buyerId": "64f1c2a9e4b0",
        "items": [{"productId": mangoes.id, "quantity": 1}],
        "totalPrice": 250.0,
        "deliveryAddress": "4 Station Rd"
    });
    let req = TestRequest::post().uri("/api/products/order").set_json(cart.clone());
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    // The customer is always the token holder
    assert_eq!(json["order"]["customer"]["name"], "Asha");

    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "ValidationError");
    assert_eq!(db.fetch_product(mangoes.id).await.unwrap().unwrap().stock, 4);
    remove_database(db).await;
}

#[actix_web::test]
async fn unknown_products_are_not_found() {
    let db = prepare_test_env(&random_db_path()).await;
    let asha = seed_user(&db, "Asha", Role::Customer).await;
    let token = issue_token(asha.id.value(), Role::Customer);
    let cart = json!({"items": [{"productId": 999, "quantity": 1}], "deliveryAddress": "4 Station Rd"});
    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "NotFound");
    remove_database(db).await;
}

#[actix_web::test]
async fn malformed_carts_are_rejected() {
    let db = prepare_test_env(&random_db_path()).await;
    let asha = seed_user(&db, "Asha", Role::Customer).await;
    let token = issue_token(asha.id.value(), Role::Customer);

    let cart = json!({"items": [], "deliveryAddress": "4 Station Rd"});
    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "ValidationError");

    let cart = json!({"items": [{"productId": 1, "quantity": 1}], "deliveryAddress": "4 Station Rd", "customerId": 2});
    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, body) = api_request(req, &token, checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "ValidationError");
    remove_database(db).await;
}

#[actix_web::test]
async fn checkout_needs_a_token() {
    let db = prepare_test_env(&random_db_path()).await;
    let cart = json!({"items": [{"productId": 1, "quantity": 1}], "deliveryAddress": "4 Station Rd"});
    let req = TestRequest::post().uri("/api/orders").set_json(cart);
    let (status, _) = api_request(req, "", checkout_routes(db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    remove_database(db).await;
}

fn checkout_routes(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(LegacyPlaceOrderRoute::<SqliteDatabase>::new())
            .app_data(web::Data::new(OrderFlowApi::new(db)));
    }
}
