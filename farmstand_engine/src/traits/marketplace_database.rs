use log::warn;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, ProductId},
    traits::{InventoryManagement, OrderManagement},
};

/// SQLite primary result codes that indicate lock contention (`SQLITE_BUSY` and `SQLITE_LOCKED`). Extended codes
/// such as `SQLITE_BUSY_SNAPSHOT` (517) share the same low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("You are not allowed to perform this action")]
    Forbidden,
    #[error("Insufficient stock for {product}. Only {available} available.")]
    InsufficientStock { product: String, available: i64 },
    #[error("Order status cannot change from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("The store could not complete the operation. Retry the whole request. {0}")]
    TransientStoreError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl MarketplaceError {
    /// Transient errors leave no trace in the store, so the whole operation can safely be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStoreError(_))
    }

    /// A short, stable, machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "ValidationError",
            Self::ProductNotFound(_) | Self::OrderNotFound(_) => "NotFound",
            Self::Forbidden => "Forbidden",
            Self::InsufficientStock { .. } => "InsufficientStock",
            Self::InvalidStatusTransition { .. } => "InvalidStatusTransition",
            Self::TransientStoreError(_) => "TransientStoreError",
            Self::DatabaseError(_) => "DatabaseError",
        }
    }
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        if is_lock_conflict(&e) {
            warn!("🗃️ Store conflict: {e}");
            return Self::TransientStoreError(e.to_string());
        }
        Self::DatabaseError(e.to_string())
    }
}

fn is_lock_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// This trait defines the highest level of behaviour for backends supporting the marketplace engine.
///
/// Beyond the read/write access provided by [`InventoryManagement`] and [`OrderManagement`], a backend must be able to
/// place an order atomically.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + InventoryManagement + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Takes a validated order, and in a single atomic transaction,
    /// * for every line item, in order, decrements the product's stock by the requested quantity, provided there is
    ///   enough stock. The check and decrement must be a single conditional write so that concurrent placements can
    ///   never oversell.
    /// * increments the product's buyer count (once per line) and records the customer as a buyer (once per
    ///   product).
    /// * calculates the order total from the product prices read inside the transaction.
    /// * stores the order with status `Pending`, along with its line items.
    ///
    /// If any step fails, nothing is written. Lock conflicts are reported as
    /// [`MarketplaceError::TransientStoreError`] and the caller may retry the whole call.
    ///
    /// Returns the newly created order.
    async fn place_order(&self, order: NewOrder) -> Result<Order, MarketplaceError>;
}
