use std::collections::HashMap;

use cucumber::World;
use farmstand_engine::{
    db_types::{OrderId, Product, User},
    order_objects::OrderView,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    InventoryApi,
    MarketplaceError,
    OrderFlowApi,
    OrdersApi,
    SqliteDatabase,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
    pub users: HashMap<String, User>,
    pub products: HashMap<String, Product>,
    pub strict_transitions: bool,
    pub last_order: Option<OrderId>,
    pub last_checkout: Option<Result<OrderView, MarketplaceError>>,
    pub last_listing: Option<Result<Vec<OrderView>, MarketplaceError>>,
    pub last_update: Option<Result<OrderView, MarketplaceError>>,
}

#[derive(Debug)]
pub struct MarketSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub checkout: OrderFlowApi<SqliteDatabase>,
    pub inventory: InventoryApi<SqliteDatabase>,
}

impl MarketWorld {
    pub fn system(&self) -> &MarketSystem {
        self.system.as_ref().expect("Marketplace not initialised")
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }

    /// A fresh `OrdersApi`, honouring the transition policy of the scenario.
    pub fn orders_api(&self) -> OrdersApi<SqliteDatabase> {
        OrdersApi::new(self.db().clone()).with_strict_transitions(self.strict_transitions)
    }

    pub fn user(&self, name: &str) -> &User {
        self.users.get(name).unwrap_or_else(|| panic!("User {name} has not been created"))
    }

    pub fn product(&self, name: &str) -> &Product {
        self.products.get(name).unwrap_or_else(|| panic!("Product {name} has not been listed"))
    }
}

impl MarketSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        debug!("🚀️ Created database: {url}");
        let checkout = OrderFlowApi::new(db.clone());
        let inventory = InventoryApi::new(db.clone());
        Self { db_path: url, db, checkout, inventory }
    }
}
