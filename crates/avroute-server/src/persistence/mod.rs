//! Persistence layer for the route server.
//!
//! SQLite-backed storage for forecast locations and their daily
//! avalanche forecasts.

pub mod db;
pub mod forecasts;

pub use db::{init_database, Database};
