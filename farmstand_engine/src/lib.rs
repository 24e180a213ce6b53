//! Farmstand marketplace engine
//!
//! The engine holds the core logic of a small farm-to-consumer marketplace: farmers and retailers list products, and
//! customers check out carts. Checking out a cart validates it against live inventory, decrements stock, records
//! buyer history and stores the order, all in a single atomic unit. It never oversells and never leaves a partial
//! write behind.
//!
//! The library is divided into three main sections:
//! 1. The storage contracts ([`mod@traits`]) and their SQLite implementation ([`SqliteDatabase`]). You should never
//!    need to access the database directly. Instead, use the public API provided by the engine. The exception is the
//!    data types used in the database. These are defined in the `db_types` module and are public.
//! 2. The engine public API. This provides checkout ([`OrderFlowApi`]), order queries and status
//!    management ([`OrdersApi`]), and the product catalogue ([`InventoryApi`]).
//! 3. Test utilities, behind the `test_utils` feature.
pub mod db_types;
mod market_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use market_api::{
    inventory_api::InventoryApi,
    order_flow_api::{OrderFlowApi, DEFAULT_CHECKOUT_ATTEMPTS},
    order_objects,
    orders_api::OrdersApi,
    product_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, DEFAULT_DATABASE_URL};
pub use traits::{InventoryManagement, MarketplaceDatabase, MarketplaceError, OrderManagement, UserManagement};
