//! Avroute CLI - command line tools for the route planner.
//!
//! Binaries:
//! - find_path: plans a route locally against ASCII-grid rasters
//! - request_path: asks a running avroute server for a route
//! - show_forecasts: prints the forecast a server holds for a location

pub mod args;
pub mod client;
pub mod local;

pub use client::{PathReply, RouteClient};
pub use local::LocalTerrain;

/// Logs go to stderr so stdout stays clean JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
