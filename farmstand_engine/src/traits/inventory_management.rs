use crate::{
    db_types::{NewProduct, Product, ProductId, UserId},
    market_api::product_objects::ProductUpdate,
    traits::MarketplaceError,
};

/// The `InventoryManagement` trait defines behaviour for reading and maintaining the product catalogue.
///
/// Stock levels and buyer history are *not* modified through this trait, apart from a seller explicitly restocking
/// a product. Checkout-related stock changes go through [`crate::traits::MarketplaceDatabase::place_order`].
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Stores a new product and returns the stored record.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketplaceError>;

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, MarketplaceError>;

    /// All visible products, newest first.
    async fn fetch_visible_products(&self) -> Result<Vec<Product>, MarketplaceError>;

    /// All products (visible or not) belonging to `owner_id`, newest first.
    async fn fetch_products_for_owner(&self, owner_id: UserId) -> Result<Vec<Product>, MarketplaceError>;

    /// Applies a partial update. Returns `None` if the product does not exist.
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Option<Product>, MarketplaceError>;

    /// The distinct set of customers who have ordered the product.
    async fn fetch_buyers(&self, id: ProductId) -> Result<Vec<UserId>, MarketplaceError>;
}
