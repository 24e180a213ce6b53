//! # Farmstand server
//! The HTTP front end of the Farmstand marketplace. It is responsible for:
//! * Verifying the access tokens issued by the marketplace's authentication service.
//! * Checkout: turning a customer's cart into an order, atomically reserving stock for every item.
//! * Order queries for customers, sellers and admins, and order status updates.
//! * The product catalogue.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html). Everything under `/api` needs a bearer token, except the public catalogue at
//! `GET /api/products` and `GET /api/products/farmer/{id}`.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;
