//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{db_url, new_pool, orders, products, users};
use crate::{
    db_types::{
        CustomerSummary,
        NewOrder,
        NewProduct,
        NewUser,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Paise,
        Product,
        ProductId,
        ProductSummary,
        User,
        UserId,
    },
    market_api::product_objects::ProductUpdate,
    traits::{InventoryManagement, MarketplaceDatabase, MarketplaceError, OrderManagement, UserManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn place_order(&self, order: NewOrder) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut total = Paise::default();
        for item in &order.items {
            let product = match products::reserve_stock(item.product_id, item.quantity, now, &mut tx).await? {
                Some(product) => product,
                None => return Err(explain_failed_reservation(item, &mut tx).await),
            };
            trace!("🗃️ Reserved {} x {} ({} left)", item.quantity, product.name, product.stock);
            products::record_buyer(product.id, order.customer_id, &mut tx).await?;
            total = product.price.checked_mul(item.quantity).and_then(|line| total.checked_add(line)).ok_or_else(
                || MarketplaceError::ValidationError("The order total is too large to be processed".to_string()),
            )?;
        }
        if let Some(client_total) = order.client_total {
            if client_total != total {
                warn!(
                    "🗃️ Customer {} submitted an order total of {client_total}, but the order is worth {total}. The \
                     submitted total is ignored.",
                    order.customer_id
                );
            }
        }
        let order = orders::insert_order(order, total, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} for {total} committed for customer {}", order.id, order.customer_id);
        Ok(order)
    }
}

/// A conditional decrement matched no row. Works out whether the product is missing or just short of stock.
async fn explain_failed_reservation(item: &OrderItem, conn: &mut SqliteConnection) -> MarketplaceError {
    match products::fetch_product(item.product_id, conn).await {
        Ok(None) => MarketplaceError::ProductNotFound(item.product_id),
        Ok(Some(product)) => {
            debug!(
                "🗃️ Insufficient stock for {}: {} requested, {} available",
                product.name, item.quantity, product.stock
            );
            MarketplaceError::InsufficientStock { product: product.name, available: product.stock }
        },
        Err(e) => MarketplaceError::from(e),
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_visible_products(&self) -> Result<Vec<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_visible_products(&mut conn).await?;
        Ok(products)
    }

    async fn fetch_products_for_owner(&self, owner_id: UserId) -> Result<Vec<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_products_for_owner(owner_id, &mut conn).await?;
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Option<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::update_product(id, update, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_buyers(&self, id: ProductId) -> Result<Vec<UserId>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let buyers = products::fetch_buyers(id, &mut conn).await?;
        Ok(buyers)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_customer(&self, customer_id: UserId) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_customer(customer_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_orders_for_seller(&self, seller_id: UserId) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_seller(seller_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_seller_ids_for_order(&self, id: OrderId) -> Result<Vec<UserId>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let ids = orders::fetch_seller_ids_for_order(id, &mut conn).await?;
        Ok(ids)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatusType,
        expected: Option<OrderStatusType>,
    ) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_order_status(id, status, expected, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_customer_summaries(&self, ids: &[UserId]) -> Result<Vec<CustomerSummary>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let summaries = users::fetch_customer_summaries(ids, &mut conn).await?;
        Ok(summaries)
    }

    async fn fetch_product_summaries(&self, ids: &[ProductId]) -> Result<Vec<ProductSummary>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let summaries = products::fetch_product_summaries(ids, &mut conn).await?;
        Ok(summaries)
    }
}

impl UserManagement for SqliteDatabase {
    async fn insert_user(&self, user: NewUser) -> Result<User, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(user, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_user(&self, id: UserId) -> Result<Option<User>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(id, &mut conn).await?;
        Ok(user)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `FSM_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date with the embedded migrations.
    pub async fn migrate(&self) -> Result<(), MarketplaceError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MarketplaceError::DatabaseError(format!("Migration failed: {e}")))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
