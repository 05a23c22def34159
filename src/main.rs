//! orderlens: renders the order dashboard as a text or JSON report plus PNG charts

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use orderlens::{generate_dashboard_charts, load_orders, Args, Dashboard, OutputFormat};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs go to stderr; stdout carries the report
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("ORDERLENS_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let start_time = Instant::now();

    let table = load_orders(&args.input)
        .with_context(|| format!("failed to load orders from {}", args.input.display()))?;
    debug!(elapsed_ms = start_time.elapsed().as_millis() as u64, "data loaded");

    let dashboard = Dashboard::build(&table, &args.options()).context("failed to build dashboard")?;

    match args.format {
        OutputFormat::Text => print!("{dashboard}"),
        OutputFormat::Json => println!("{}", dashboard.to_json()?),
    }

    if !args.no_charts {
        let written = generate_dashboard_charts(&dashboard, &args.output_dir).with_context(|| {
            format!("failed to write charts to {}", args.output_dir.display())
        })?;
        info!(charts = written.len(), dir = %args.output_dir.display(), "charts generated");
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "dashboard complete"
    );
    Ok(())
}
