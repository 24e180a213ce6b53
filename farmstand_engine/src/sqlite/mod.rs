//! SQLite backend for the marketplace engine.
mod sqlite_impl;

pub mod db;
pub use db::DEFAULT_DATABASE_URL;
pub use sqlite_impl::SqliteDatabase;
