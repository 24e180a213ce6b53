//! #  Storage backend contracts.
//!
//! This module defines the behaviour that storage backends need to expose in order to be supported by the
//! marketplace engine.
//!
//! * [`MarketplaceDatabase`] defines the highest level of behaviour, most importantly the atomic order placement.
//! * [`InventoryManagement`] reads and maintains the product catalogue.
//! * [`OrderManagement`] reads orders and updates their status.
//! * [`UserManagement`] stores the user profiles used for display.
//!
//! All backends report failures with [`MarketplaceError`].
mod inventory_management;
mod marketplace_database;
mod order_management;
mod user_management;

pub use inventory_management::InventoryManagement;
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use order_management::OrderManagement;
pub use user_management::UserManagement;
