//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Post lifecycle and status derivation
//! - Owner-scoped listing queries

mod database;
mod lifecycle;
mod models;
pub mod query;

pub use database::Database;
pub use lifecycle::{derive_aggregate_status, initial_platform_status};
pub use models::*;
pub use query::{DateRange, ListQuery, Page, PageRequest, Pagination, Table};
