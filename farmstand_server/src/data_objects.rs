use std::fmt::Display;

use farmstand_engine::{db_types::OrderStatusType, order_objects::OrderView};
use serde::{Deserialize, Serialize};

/// The body returned after an order is placed or its status changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub message: String,
    pub order: OrderView,
}

impl OrderResponse {
    pub fn new<S: Display>(message: S, order: OrderView) -> Self {
        Self { message: message.to_string(), order }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
}
