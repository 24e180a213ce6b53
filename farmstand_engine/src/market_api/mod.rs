//! # Marketplace engine public API
//!
//! The `market_api` module exposes the programmatic API for the marketplace engine.
//! The API is modular, so that clients of the API can pick and choose the functionality they want.
//!
//! * [`order_flow_api`] turns a customer's cart into a committed order, atomically.
//! * [`orders_api`] lists orders for customers and sellers, and manages order status.
//! * [`inventory_api`] manages the product catalogue.
//!
//! The other submodules in this module are the request and response objects used by the APIs.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! ```rust,ignore
//! use farmstand_engine::{order_objects::Cart, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements MarketplaceDatabase
//! let api = OrderFlowApi::new(db);
//! let cart = Cart::new("12 Mill Road").with_item(ProductId(1), 2);
//! let order = api.place_order(customer_id, cart).await?;
//! ```
pub mod inventory_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod orders_api;
pub mod product_objects;
