use crate::{
    db_types::{CustomerSummary, Order, OrderId, OrderStatusType, ProductId, ProductSummary, UserId},
    traits::MarketplaceError,
};

/// The `OrderManagement` trait provides read access to orders, and the single write that is allowed on an existing
/// order: changing its status.
///
/// Orders returned from these methods always have their line items loaded. Lists are sorted newest first.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MarketplaceError>;

    /// Orders placed by `customer_id`.
    async fn fetch_orders_for_customer(&self, customer_id: UserId) -> Result<Vec<Order>, MarketplaceError>;

    /// Orders that contain at least one product owned by `seller_id`.
    async fn fetch_orders_for_seller(&self, seller_id: UserId) -> Result<Vec<Order>, MarketplaceError>;

    /// The distinct owners of the products referenced in the order. An unknown order yields an empty list.
    async fn fetch_seller_ids_for_order(&self, id: OrderId) -> Result<Vec<UserId>, MarketplaceError>;

    /// Sets the status of the order. When `expected` is given, the write only happens if the order still has that
    /// status. Returns `None` if no order matched.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatusType,
        expected: Option<OrderStatusType>,
    ) -> Result<Option<Order>, MarketplaceError>;

    /// Display summaries for the given users. Unknown ids are skipped.
    async fn fetch_customer_summaries(&self, ids: &[UserId]) -> Result<Vec<CustomerSummary>, MarketplaceError>;

    /// Display summaries for the given products. Unknown ids are skipped.
    async fn fetch_product_summaries(&self, ids: &[ProductId]) -> Result<Vec<ProductSummary>, MarketplaceError>;
}
