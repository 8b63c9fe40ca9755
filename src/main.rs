//! BasketForge: market-basket analysis CLI
//!
//! Loads the item catalog and the transaction log, then reports the
//! best-selling items and the strongest association rules among them.

use std::time::Instant;

use anyhow::Result;
use basketforge::{load_catalog, load_transactions, logging, report, run_analysis, Args};
use clap::Parser;
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose)?;

    let config = args.to_config()?;
    let start_time = Instant::now();

    let catalog = load_catalog(&args.items)?;
    let records = load_transactions(&args.transactions)?;
    info!(
        items = catalog.len(),
        records = records.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "input loaded"
    );

    let analysis = run_analysis(records, &catalog, &config)?;
    report::print_report(&analysis);

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "analysis complete"
    );
    Ok(())
}
