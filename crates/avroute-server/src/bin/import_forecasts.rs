//! Loads forecast bulletins from a JSON file into the forecast database.

use anyhow::{Context, Result};
use avroute_core::load_bulletins;
use avroute_server::config::Config;
use avroute_server::persistence::{self, forecasts};
use clap::Parser;
use std::path::PathBuf;

/// Import avalanche forecast bulletins
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON array of { location, url, date, boundaries, compass_rose }
    input: PathBuf,

    /// Database file (defaults to AVROUTE_DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    let db_path = args.database.unwrap_or(config.database_path);
    let db = persistence::init_database(&db_path, 1).await?;

    let bulletins = load_bulletins(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let mut stored = 0usize;
    for bulletin in &bulletins {
        let records = bulletin
            .records()
            .with_context(|| format!("decoding {} {}", bulletin.location, bulletin.date))?;

        let location_id = match forecasts::select_location_by_name(db.pool(), &bulletin.location).await? {
            Some(id) => id,
            None => {
                let url = bulletin.url.as_deref().with_context(|| {
                    format!("new location {} needs a forecast url", bulletin.location)
                })?;
                forecasts::add_location(db.pool(), &bulletin.location, url).await?
            }
        };

        for record in &records {
            forecasts::add_forecast(db.pool(), location_id, record).await?;
        }
        stored += records.len();
        tracing::info!(location = %bulletin.location, date = %bulletin.date, "imported forecast");
    }

    println!("Imported {} bulletins ({} records) into {}", bulletins.len(), stored, db_path);
    Ok(())
}
