//! Requests a route from a running avroute server and prints the reply.

use anyhow::Result;
use avroute_cli::args::RequestPathArgs;
use avroute_cli::{init_tracing, RouteClient};
use clap::Parser;

fn main() -> Result<()> {
    init_tracing();
    let args = RequestPathArgs::parse();

    eprintln!("Requesting path from {}...", args.url);
    let client = RouteClient::new(&args.url);
    let reply = client.find_path(
        args.route.from,
        args.route.to,
        args.route.risk_weight,
        args.route.time_budget,
    )?;

    let out = if args.pretty {
        serde_json::to_string_pretty(&reply)?
    } else {
        serde_json::to_string(&reply)?
    };
    println!("{out}");

    if !reply.ok {
        eprintln!("{}", reply.errors.join("; "));
        std::process::exit(1);
    }
    Ok(())
}
