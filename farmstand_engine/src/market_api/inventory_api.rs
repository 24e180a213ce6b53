use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Product, ProductId, UserId},
    market_api::{
        order_objects::Requester,
        product_objects::{NewProductRequest, ProductUpdate},
    },
    traits::{InventoryManagement, MarketplaceError},
};

/// `InventoryApi` manages the product catalogue on behalf of sellers, and serves it to everyone else.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    /// Lists a new product. The requester becomes the owner, and must be a farmer, a retailer or an admin.
    pub async fn create_product(
        &self,
        request: NewProductRequest,
        requester: Requester,
    ) -> Result<Product, MarketplaceError> {
        if !(requester.role.is_seller() || requester.is_admin()) {
            return Err(MarketplaceError::Forbidden);
        }
        let product = request.into_new_product(requester.id)?;
        let product = self.db.insert_product(product).await?;
        info!("🔄️🥕️ Product {} ({}) listed by {}", product.id, product.name, requester.id);
        Ok(product)
    }

    pub async fn visible_products(&self) -> Result<Vec<Product>, MarketplaceError> {
        self.db.fetch_visible_products().await
    }

    pub async fn products_for_owner(&self, owner_id: UserId) -> Result<Vec<Product>, MarketplaceError> {
        self.db.fetch_products_for_owner(owner_id).await
    }

    pub async fn product(&self, id: ProductId) -> Result<Product, MarketplaceError> {
        self.db.fetch_product(id).await?.ok_or(MarketplaceError::ProductNotFound(id))
    }

    /// Applies a partial update to a product. Only the owner or an admin may do this.
    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
        requester: Requester,
    ) -> Result<Product, MarketplaceError> {
        update.validate()?;
        let product = self.product(id).await?;
        if !requester.acts_for(product.owner_id) {
            debug!("🔄️🥕️ User {} may not edit product {id}, which belongs to {}", requester.id, product.owner_id);
            return Err(MarketplaceError::Forbidden);
        }
        let updated = self.db.update_product(id, update).await?.ok_or(MarketplaceError::ProductNotFound(id))?;
        info!("🔄️🥕️ Product {id} updated by {}", requester.id);
        Ok(updated)
    }

    /// The distinct customers who have bought the product.
    pub async fn buyers(&self, id: ProductId) -> Result<Vec<UserId>, MarketplaceError> {
        self.db.fetch_buyers(id).await
    }
}
