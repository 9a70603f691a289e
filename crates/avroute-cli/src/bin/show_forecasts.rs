//! Prints the newest forecast records a running avroute server holds for
//! one location.

use anyhow::Result;
use avroute_cli::args::ShowForecastsArgs;
use avroute_cli::{init_tracing, RouteClient};
use clap::Parser;

fn main() -> Result<()> {
    init_tracing();
    let args = ShowForecastsArgs::parse();

    let client = RouteClient::new(&args.url);
    let forecasts = client.forecasts(&args.location)?;

    let out = if args.pretty {
        serde_json::to_string_pretty(&forecasts)?
    } else {
        serde_json::to_string(&forecasts)?
    };
    println!("{out}");
    Ok(())
}
