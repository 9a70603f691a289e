//! Plans an avalanche-aware route from local terrain grids and prints it
//! as JSON.

use anyhow::Result;
use avroute_cli::args::FindPathArgs;
use avroute_cli::{init_tracing, LocalTerrain, PathReply};
use avroute_core::{PathRequest, PlannerConfig};
use clap::Parser;

fn main() -> Result<()> {
    init_tracing();
    let args = FindPathArgs::parse();

    let mut terrain = LocalTerrain::load(&args.elevation, &args.risk)?;
    if let (Some(aspect), Some(forecasts)) = (&args.aspect, &args.forecasts) {
        terrain = terrain.load_forecast_inputs(aspect, forecasts)?;
    }

    let mut config = PlannerConfig::default();
    if let Some(max_extent) = args.max_extent {
        config.max_mean_extent = max_extent;
    }

    let request = PathRequest {
        from: args.route.from,
        to: args.route.to,
        risk_weight: args.route.risk_weight,
        time_budget_s: args.route.time_budget,
    };

    let reply = match terrain.plan(config, &request) {
        Ok(plan) => PathReply {
            ok: true,
            waypoints: plan.waypoints,
            message: plan.message,
            errors: Vec::new(),
            kind: None,
            stats: Some(plan.stats),
        },
        Err(err) => PathReply {
            ok: false,
            waypoints: Vec::new(),
            message: "No path found.".to_string(),
            errors: vec![err.to_string()],
            kind: Some(err.kind()),
            stats: None,
        },
    };

    let out = if args.pretty {
        serde_json::to_string_pretty(&reply)?
    } else {
        serde_json::to_string(&reply)?
    };
    println!("{out}");

    if !reply.ok {
        std::process::exit(1);
    }
    Ok(())
}
