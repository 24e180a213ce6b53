use std::{fmt::Debug, time::Duration};

use log::*;
use rand::Rng;

use crate::{
    db_types::{NewOrder, Order, UserId},
    market_api::{
        order_objects::{Cart, OrderView},
        orders_api::enrich_orders,
    },
    traits::{MarketplaceDatabase, MarketplaceError},
};

pub const DEFAULT_CHECKOUT_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 20;
const MAX_JITTER_MS: u64 = 20;

/// `OrderFlowApi` is the checkout API. It turns a customer's cart into a committed order.
///
/// Placement is all-or-nothing. If the store reports a transient conflict, the whole placement is retried from
/// scratch, up to `max_attempts` times in total.
pub struct OrderFlowApi<B> {
    db: B,
    max_attempts: u32,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi (max_attempts: {})", self.max_attempts)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, max_attempts: DEFAULT_CHECKOUT_ATTEMPTS }
    }

    /// Sets the total number of placement attempts. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Validates the cart, places the order on behalf of `customer_id` and returns the order with customer and product
    /// details joined in.
    ///
    /// Nothing is written if the cart is invalid, if any product is missing, or if any product is short of stock.
    pub async fn place_order(&self, customer_id: UserId, cart: Cart) -> Result<OrderView, MarketplaceError> {
        let order = cart.into_new_order(customer_id)?;
        let order = self.place_with_retries(order).await?;
        info!(
            "🔄️📦️ Order {} placed by customer {customer_id}. {} items, total {}",
            order.id,
            order.items.len(),
            order.total_price
        );
        let view = match enrich_orders(&self.db, vec![order.clone()]).await {
            Ok(mut views) => views.pop().unwrap_or_else(|| OrderView::bare(order)),
            Err(e) => {
                warn!("🔄️📦️ Order {} was placed, but its details could not be loaded. {e}", order.id);
                OrderView::bare(order)
            },
        };
        Ok(view)
    }

    async fn place_with_retries(&self, order: NewOrder) -> Result<Order, MarketplaceError> {
        let mut attempt = 1;
        loop {
            match self.db.place_order(order.clone()).await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = backoff(attempt);
                    warn!(
                        "🔄️📦️ Attempt {attempt}/{} to place an order for customer {} hit a store conflict. Retrying \
                         in {}ms. {e}",
                        self.max_attempts,
                        order.customer_id,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                result => return result,
            }
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    let exponential = BASE_BACKOFF_MS << (attempt - 1).min(6);
    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
    Duration::from_millis(exponential + jitter)
}
