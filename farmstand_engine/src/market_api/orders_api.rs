use std::{collections::HashMap, fmt::Debug};

use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, ProductId, UserId},
    market_api::order_objects::{OrderView, Requester},
    traits::{MarketplaceError, OrderManagement},
};

/// `OrdersApi` answers "which orders can I see?" and lets sellers move an order through its lifecycle.
///
/// Every call takes the [`Requester`] on whose behalf it is made, and enforces the ownership rules:
/// * customers see the orders they placed,
/// * sellers see the orders that contain at least one of their products, and may change their status,
/// * admins may do all of the above for anyone.
pub struct OrdersApi<B> {
    db: B,
    strict_transitions: bool,
}

impl<B> Debug for OrdersApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrdersApi (strict_transitions: {})", self.strict_transitions)
    }
}

impl<B> OrdersApi<B> {
    /// Creates an API with permissive status transitions: any status may replace any other.
    pub fn new(db: B) -> Self {
        Self { db, strict_transitions: false }
    }

    /// When `strict` is true, status updates must follow [`OrderStatusType::can_transition_to`].
    pub fn with_strict_transitions(mut self, strict: bool) -> Self {
        self.strict_transitions = strict;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrdersApi<B>
where B: OrderManagement
{
    pub async fn list_orders_for_customer(
        &self,
        customer_id: UserId,
        requester: Requester,
    ) -> Result<Vec<OrderView>, MarketplaceError> {
        if !requester.acts_for(customer_id) {
            debug!("🔄️ User {} may not list the orders of customer {customer_id}", requester.id);
            return Err(MarketplaceError::Forbidden);
        }
        let orders = self.db.fetch_orders_for_customer(customer_id).await?;
        enrich_orders(&self.db, orders).await
    }

    pub async fn list_orders_for_seller(
        &self,
        seller_id: UserId,
        requester: Requester,
    ) -> Result<Vec<OrderView>, MarketplaceError> {
        if !requester.acts_for(seller_id) {
            debug!("🔄️ User {} may not list the orders of seller {seller_id}", requester.id);
            return Err(MarketplaceError::Forbidden);
        }
        let orders = self.db.fetch_orders_for_seller(seller_id).await?;
        enrich_orders(&self.db, orders).await
    }

    /// Farmers and retailers get the orders placed against their products. Everyone else gets the orders they placed.
    pub async fn orders_for_requester(&self, requester: Requester) -> Result<Vec<OrderView>, MarketplaceError> {
        if requester.role.is_seller() {
            self.list_orders_for_seller(requester.id, requester).await
        } else {
            self.list_orders_for_customer(requester.id, requester).await
        }
    }

    /// Changes the status of an order.
    ///
    /// The requester must own at least one of the products in the order, or be an admin. The ownership check comes
    /// after the existence check, so an unknown order is reported as such to everyone.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatusType,
        requester: Requester,
    ) -> Result<OrderView, MarketplaceError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if !requester.is_admin() {
            let sellers = self.db.fetch_seller_ids_for_order(order_id).await?;
            if !sellers.contains(&requester.id) {
                info!("🔄️ User {} may not change the status of order {order_id}", requester.id);
                return Err(MarketplaceError::Forbidden);
            }
        }
        let updated = if self.strict_transitions {
            if !order.status.can_transition_to(status) {
                return Err(MarketplaceError::InvalidStatusTransition { from: order.status, to: status });
            }
            match self.db.update_order_status(order_id, status, Some(order.status)).await? {
                Some(updated) => updated,
                None => {
                    // Someone else moved the order after we read it
                    let current =
                        self.db.fetch_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
                    warn!("🔄️ Order {order_id} changed to {} while moving it to {status}", current.status);
                    return Err(MarketplaceError::InvalidStatusTransition { from: current.status, to: status });
                },
            }
        } else {
            self.db
                .update_order_status(order_id, status, None)
                .await?
                .ok_or(MarketplaceError::OrderNotFound(order_id))?
        };
        info!("🔄️ Order {order_id} moved from {} to {status} by user {}", order.status, requester.id);
        let mut views = enrich_orders(&self.db, vec![updated]).await?;
        views.pop().ok_or(MarketplaceError::OrderNotFound(order_id))
    }
}

/// Joins the customer and product summaries into each order, using one lookup per table for the whole batch.
/// Records that cannot be found are left empty in the views.
pub(crate) async fn enrich_orders<B: OrderManagement>(
    db: &B,
    orders: Vec<Order>,
) -> Result<Vec<OrderView>, MarketplaceError> {
    let mut customer_ids = orders.iter().map(|o| o.customer_id).collect::<Vec<_>>();
    customer_ids.sort();
    customer_ids.dedup();
    let mut product_ids = orders.iter().flat_map(|o| o.product_ids()).collect::<Vec<ProductId>>();
    product_ids.sort();
    product_ids.dedup();
    let customers = db
        .fetch_customer_summaries(&customer_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect::<HashMap<UserId, _>>();
    let products = db
        .fetch_product_summaries(&product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect::<HashMap<ProductId, _>>();
    Ok(orders.into_iter().map(|o| OrderView::assemble(o, &customers, &products)).collect())
}
