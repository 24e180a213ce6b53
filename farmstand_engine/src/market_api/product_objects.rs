use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewProduct, Paise, UserId},
    traits::MarketplaceError,
};

/// The body of a product creation request. The owner is never part of the body; it is taken from the caller's
/// credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Paise,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}

impl NewProductRequest {
    pub fn validate(&self) -> Result<(), MarketplaceError> {
        if self.name.trim().is_empty() {
            return Err(MarketplaceError::ValidationError("Product name cannot be empty".into()));
        }
        validate_price_and_stock(Some(self.price), Some(self.stock))
    }

    /// Validates the request and converts it into a [`NewProduct`] owned by `owner_id`.
    pub fn into_new_product(self, owner_id: UserId) -> Result<NewProduct, MarketplaceError> {
        self.validate()?;
        let mut product = NewProduct::new(owner_id, self.name.trim(), self.price, self.stock);
        if let Some(unit) = self.unit.filter(|u| !u.trim().is_empty()) {
            product = product.with_unit(unit.trim());
        }
        product.description = self.description;
        product.image_url = self.image_url;
        product.video_url = self.video_url;
        product.visible = self.visible.unwrap_or(true);
        Ok(product)
    }
}

/// A partial product update. Only the fields that are present are changed. The owner, buyer history and timestamps
/// cannot be changed through this object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Paise>,
    pub unit: Option<String>,
    pub stock: Option<i64>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub visible: Option<bool>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = Some(stock);
        self
    }

    pub fn with_price(mut self, price: Paise) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn validate(&self) -> Result<(), MarketplaceError> {
        if self.name.as_ref().map(|n| n.trim().is_empty()).unwrap_or(false) {
            return Err(MarketplaceError::ValidationError("Product name cannot be empty".into()));
        }
        validate_price_and_stock(self.price, self.stock)
    }
}

fn validate_price_and_stock(price: Option<Paise>, stock: Option<i64>) -> Result<(), MarketplaceError> {
    if let Some(price) = price {
        if !price.is_positive() {
            return Err(MarketplaceError::ValidationError(format!("Price must be positive, not {price}")));
        }
    }
    if let Some(stock) = stock {
        if stock < 0 {
            return Err(MarketplaceError::ValidationError(format!("Stock cannot be negative, not {stock}")));
        }
    }
    Ok(())
}
