//! Shared library surface for the route server binaries and tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod path_service;
pub mod persistence;
pub mod state;
