use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use farmstand_engine::{
    db_types::{
        CustomerSummary,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Paise,
        PaymentMethod,
        ProductId,
        ProductSummary,
        Role,
        UserId,
    },
    order_objects::OrderView,
    traits::MarketplaceError,
    OrdersApi,
};
use mockall::Sequence;
use serde_json::Value;

use super::{
    helpers::{api_request, error_kind, issue_token},
    mocks::MockOrderManager,
};
use crate::routes::{CustomerOrdersRoute, FarmerOrdersRoute, MyFarmerOrdersRoute, MyOrdersRoute, UpdateOrderStatusRoute};

const CUSTOMER: i64 = 11;
const FARMER: i64 = 21;
const OTHER_FARMER: i64 = 22;
const ADMIN: i64 = 1;

#[actix_web::test]
async fn fetch_my_orders_without_token() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_customer().never();
    let (status, body) = api_request(TestRequest::get().uri("/api/orders"), "", configure_with(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_kind(&body), "Unauthorized");
}

#[actix_web::test]
async fn fetch_my_orders_as_customer() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(CUSTOMER, Role::Customer);
    let (status, body) = api_request(TestRequest::get().uri("/api/orders"), &token, configure).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<OrderView> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, OrderId(2));
    let customer = orders[0].customer.as_ref().expect("customer summary should be joined");
    assert_eq!(customer.name, "Asha");
    let product = orders[0].items[0].product.as_ref().expect("product summary should be joined");
    assert_eq!(product.name, "Alphonso mangoes");
    assert_eq!(product.owner_id, UserId(FARMER));
}

#[actix_web::test]
async fn fetch_my_orders_as_farmer_lists_sales() {
    let _ = env_logger::try_init().ok();
    let mut db = base_mock();
    db.expect_fetch_orders_for_customer().never();
    db.expect_fetch_orders_for_seller().withf(|id| *id == UserId(FARMER)).times(1).returning(|_| Ok(orders()));
    let token = issue_token(FARMER, Role::Farmer);
    let (status, body) = api_request(TestRequest::get().uri("/api/orders"), &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
}

#[actix_web::test]
async fn customer_cannot_list_another_customers_orders() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_customer().never();
    let token = issue_token(CUSTOMER + 1, Role::Customer);
    let uri = format!("/api/orders/customer/{CUSTOMER}");
    let (status, body) = api_request(TestRequest::get().uri(&uri), &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_kind(&body), "Forbidden");
}

#[actix_web::test]
async fn customer_can_list_own_orders_by_id() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(CUSTOMER, Role::Customer);
    let uri = format!("/api/orders/customer/{CUSTOMER}");
    let (status, body) = api_request(TestRequest::get().uri(&uri), &token, configure).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1]["totalPrice"], 15000);
}

#[actix_web::test]
async fn admin_can_list_anyones_orders() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(ADMIN, Role::Admin);
    let uri = format!("/api/orders/customer/{CUSTOMER}");
    let (status, _) = api_request(TestRequest::get().uri(&uri), &token, configure).await;
    assert_eq!(status, StatusCode::OK);
    let uri = format!("/api/orders/farmer/{FARMER}");
    let (status, _) = api_request(TestRequest::get().uri(&uri), &token, configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn farmer_cannot_list_another_farmers_sales() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_seller().never();
    let token = issue_token(OTHER_FARMER, Role::Farmer);
    let uri = format!("/api/orders/farmer/{FARMER}");
    let (status, _) = api_request(TestRequest::get().uri(&uri), &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn my_farmer_orders_requires_a_seller_role() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(CUSTOMER, Role::Customer);
    let (status, body) = api_request(TestRequest::get().uri("/api/orders/farmer"), &token, configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_kind(&body), "Forbidden");

    let token = issue_token(FARMER, Role::Farmer);
    let (status, _) = api_request(TestRequest::get().uri("/api/orders/farmer"), &token, configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn malformed_ids_are_rejected() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(ADMIN, Role::Admin);
    let (status, body) = api_request(TestRequest::get().uri("/api/orders/customer/abc"), &token, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "ValidationError");
}

#[actix_web::test]
async fn zero_and_negative_ids_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_customer().never();
    db.expect_fetch_orders_for_seller().never();
    db.expect_fetch_order().never();
    let token = issue_token(ADMIN, Role::Admin);
    let (status, body) = api_request(TestRequest::get().uri("/api/orders/customer/0"), &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "ValidationError");

    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_seller().never();
    let (status, body) = api_request(TestRequest::get().uri("/api/orders/farmer/-3"), &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "ValidationError");

    let mut db = MockOrderManager::new();
    db.expect_fetch_order().never();
    db.expect_update_order_status().never();
    let req = TestRequest::patch().uri("/api/orders/-4").set_json(serde_json::json!({"status": "confirmed"}));
    let (status, body) = api_request(req, &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "ValidationError");
}

#[actix_web::test]
async fn seller_updates_status() {
    let _ = env_logger::try_init().ok();
    let mut db = base_mock();
    db.expect_fetch_order().returning(|_| Ok(Some(order(1, 50_000))));
    db.expect_fetch_seller_ids_for_order().returning(|_| Ok(vec![UserId(FARMER)]));
    db.expect_update_order_status()
        .withf(|id, status, expected| *id == OrderId(1) && *status == OrderStatusType::Confirmed && expected.is_none())
        .times(1)
        .returning(|_, status, _| {
            let mut order = order(1, 50_000);
            order.status = status;
            Ok(Some(order))
        });
    let token = issue_token(FARMER, Role::Farmer);
    let req = TestRequest::patch().uri("/api/orders/1").set_json(serde_json::json!({"status": "confirmed"}));
    let (status, body) = api_request(req, &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "Order status updated");
    assert_eq!(json["order"]["status"], "confirmed");
}

#[actix_web::test]
async fn strict_update_loses_to_a_concurrent_change() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    let mut seq = Sequence::new();
    db.expect_fetch_order().times(1).in_sequence(&mut seq).returning(|_| Ok(Some(order(1, 50_000))));
    db.expect_update_order_status()
        .withf(|_, status, expected| {
            *status == OrderStatusType::Confirmed && *expected == Some(OrderStatusType::Pending)
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(None));
    db.expect_fetch_order().times(1).in_sequence(&mut seq).returning(|_| {
        let mut order = order(1, 50_000);
        order.status = OrderStatusType::Cancelled;
        Ok(Some(order))
    });
    let token = issue_token(ADMIN, Role::Admin);
    let req = TestRequest::patch().uri("/api/orders/1").set_json(serde_json::json!({"status": "confirmed"}));
    let (status, body) = api_request(req, &token, configure_strict(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_kind(&body), "InvalidStatusTransition");
    assert!(body.contains("cancelled"), "{body}");
}

#[actix_web::test]
async fn non_owner_cannot_update_status() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(1, 50_000))));
    db.expect_fetch_seller_ids_for_order().returning(|_| Ok(vec![UserId(FARMER)]));
    db.expect_update_order_status().never();
    let token = issue_token(OTHER_FARMER, Role::Farmer);
    let req = TestRequest::patch().uri("/api/orders/1").set_json(serde_json::json!({"status": "cancelled"}));
    let (status, body) = api_request(req, &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_kind(&body), "Forbidden");
}

#[actix_web::test]
async fn status_update_for_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    db.expect_update_order_status().never();
    let token = issue_token(ADMIN, Role::Admin);
    let req = TestRequest::patch().uri("/api/orders/404").set_json(serde_json::json!({"status": "delivered"}));
    let (status, body) = api_request(req, &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "NotFound");
}

#[actix_web::test]
async fn status_update_body_is_strict() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().never();
    let token = issue_token(ADMIN, Role::Admin);
    let req = TestRequest::patch()
        .uri("/api/orders/1")
        .set_json(serde_json::json!({"status": "delivered", "totalPrice": 1}));
    let (status, body) = api_request(req, &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "ValidationError");
}

#[actix_web::test]
async fn store_conflicts_ask_clients_to_retry() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_customer()
        .returning(|_| Err(MarketplaceError::TransientStoreError("database is locked".into())));
    let token = issue_token(CUSTOMER, Role::Customer);
    let (status, body) = api_request(TestRequest::get().uri("/api/orders"), &token, configure_with(db)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_kind(&body), "TransientStoreError");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = base_mock();
    db.expect_fetch_orders_for_customer().returning(|_| Ok(orders()));
    db.expect_fetch_orders_for_seller().returning(|_| Ok(orders()));
    configure_with(db)(cfg)
}

fn configure_with(db: MockOrderManager) -> impl FnOnce(&mut ServiceConfig) {
    routes_for(OrdersApi::new(db))
}

fn configure_strict(db: MockOrderManager) -> impl FnOnce(&mut ServiceConfig) {
    routes_for(OrdersApi::new(db).with_strict_transitions(true))
}

fn routes_for(api: OrdersApi<MockOrderManager>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(MyOrdersRoute::<MockOrderManager>::new())
            .service(MyFarmerOrdersRoute::<MockOrderManager>::new())
            .service(CustomerOrdersRoute::<MockOrderManager>::new())
            .service(FarmerOrdersRoute::<MockOrderManager>::new())
            .service(UpdateOrderStatusRoute::<MockOrderManager>::new())
            .app_data(web::Data::new(api));
    }
}

// A mock that can answer the display joins
fn base_mock() -> MockOrderManager {
    let mut db = MockOrderManager::new();
    db.expect_fetch_customer_summaries().returning(|_| {
        Ok(vec![CustomerSummary {
            id: UserId(CUSTOMER),
            name: "Asha".into(),
            email: "asha@farmstand.test".into(),
            phone: None,
            location: "Pune".into(),
        }])
    });
    db.expect_fetch_product_summaries().returning(|_| {
        Ok(vec![ProductSummary {
            id: ProductId(5),
            name: "Alphonso mangoes".into(),
            price: Paise::from_rupees(250),
            unit: "dozen".into(),
            owner_id: UserId(FARMER),
        }])
    });
    db
}

fn orders() -> Vec<Order> {
    vec![order(2, 50_000), order(1, 15_000)]
}

fn order(id: i64, total: i64) -> Order {
    Order {
        id: OrderId(id),
        customer_id: UserId(CUSTOMER),
        items: vec![OrderItem::new(ProductId(5), 2)],
        total_price: Paise::from(total),
        payment_method: PaymentMethod::Cod,
        delivery_address: "4 Station Rd, Pune".into(),
        contact_name: None,
        contact_phone: None,
        status: OrderStatusType::Pending,
        created_at: Utc.with_ymd_and_hms(2024, 4, 15, 9, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 4, 15, 9, 0, 0).unwrap(),
    }
}
