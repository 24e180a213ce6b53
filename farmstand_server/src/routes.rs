//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into the engine's APIs. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
use std::{fmt::Display, str::FromStr};

use actix_web::{get, web, HttpResponse, Responder};
use farmstand_engine::{
    db_types::{OrderId, ProductId, Role, UserId},
    order_objects::{Cart, LegacyCart},
    product_objects::{NewProductRequest, ProductUpdate},
    traits::{InventoryManagement, MarketplaceDatabase, OrderManagement},
    InventoryApi,
    OrderFlowApi,
    OrdersApi,
};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{OrderResponse, StatusUpdateRequest},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
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

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(place_order => Post "/orders" impl MarketplaceDatabase);
/// Route handler for the checkout endpoint
///
/// The customer is always the caller identified by the access token. The cart's `totalPrice`, if present, is
/// informational only: the stored total is computed from the product prices at the time of purchase.
///
/// Responds with `201 Created` and `{message, order}`, where `order` carries the customer and product details.
pub async fn place_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    cart: web::Json<Cart>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order for customer {}", claims.id);
    checkout(claims, cart.into_inner(), api.as_ref()).await
}

route!(legacy_place_order => Post "/products/order" impl MarketplaceDatabase);
/// Older clients post their carts here. They also send a `buyerId`, which is ignored. Otherwise the behaviour is
/// identical to `POST /api/orders`.
pub async fn legacy_place_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    cart: web::Json<LegacyCart>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST products/order for customer {}", claims.id);
    checkout(claims, cart.into_inner().into(), api.as_ref()).await
}

async fn checkout<B: MarketplaceDatabase>(
    claims: JwtClaims,
    cart: Cart,
    api: &OrderFlowApi<B>,
) -> Result<HttpResponse, ServerError> {
    let order = api.place_order(claims.id, cart).await.map_err(|e| {
        debug!("💻️ Checkout for customer {} failed. {e}", claims.id);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Created().json(OrderResponse::new("Order placed successfully", order)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement);
/// Farmers and retailers get the orders placed against their products. Everyone else gets the orders they placed.
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {} ({})", claims.id, claims.role);
    let orders = api.orders_for_requester(claims.requester()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(customer_orders => Get "/orders/customer/{id}" impl OrderManagement);
/// Customers can list their own orders. Admins can list anyone's.
pub async fn customer_orders<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = parse_id::<UserId>(&path)?;
    debug!("💻️ GET orders for customer {customer_id} by {}", claims.id);
    let orders = api.list_orders_for_customer(customer_id, claims.requester()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(farmer_orders => Get "/orders/farmer/{id}" impl OrderManagement);
/// The orders that contain at least one product owned by the given seller. Sellers can list their own. Admins can
/// list anyone's.
pub async fn farmer_orders<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let seller_id = parse_id::<UserId>(&path)?;
    debug!("💻️ GET orders for seller {seller_id} by {}", claims.id);
    let orders = api.list_orders_for_seller(seller_id, claims.requester()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_farmer_orders => Get "/orders/farmer" impl OrderManagement where requires [Role::Farmer, Role::Retailer, Role::Admin]);
pub async fn my_farmer_orders<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET seller orders for {}", claims.id);
    let orders = api.list_orders_for_seller(claims.id, claims.requester()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_order_status => Patch "/orders/{order_id}" impl OrderManagement);
/// Route handler for order status changes
///
/// The caller must own at least one of the products in the order, or be an admin. The body is `{"status": <status>}`
/// and nothing else.
pub async fn update_order_status<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_id::<OrderId>(&path)?;
    let status = body.into_inner().status;
    info!("💻️ PATCH order {order_id} to {status} by {}", claims.id);
    let order = api.update_status(order_id, status, claims.requester()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::new("Order status updated", order)))
}

//----------------------------------------------   Products  ----------------------------------------------------
route!(products => Get "/api/products" impl InventoryManagement);
/// The public catalogue: every visible product, newest first.
pub async fn products<B: InventoryManagement>(api: web::Data<InventoryApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products");
    let products = api.visible_products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(owner_products => Get "/api/products/farmer/{id}" impl InventoryManagement);
pub async fn owner_products<B: InventoryManagement>(
    path: web::Path<String>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner_id = parse_id::<UserId>(&path)?;
    trace!("💻️ GET products for {owner_id}");
    let products = api.products_for_owner(owner_id).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(create_product => Post "/products" impl InventoryManagement where requires [Role::Farmer, Role::Retailer, Role::Admin]);
/// Lists a new product. The caller becomes its owner.
pub async fn create_product<B: InventoryManagement>(
    claims: JwtClaims,
    body: web::Json<NewProductRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST product for {}", claims.id);
    let product = api.create_product(body.into_inner(), claims.requester()).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_product => Patch "/products/{id}" impl InventoryManagement);
/// Applies a partial update to a product. Only the owner or an admin may do this. Unknown fields are rejected.
pub async fn update_product<B: InventoryManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<ProductUpdate>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = parse_id::<ProductId>(&path)?;
    debug!("💻️ PATCH product {product_id} by {}", claims.id);
    let product = api.update_product(product_id, body.into_inner(), claims.requester()).await?;
    Ok(HttpResponse::Ok().json(product))
}

/// Path ids are assigned by the database, so anything that is not a positive integer is a bad path.
fn parse_id<T>(raw: &str) -> Result<T, ServerError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}
