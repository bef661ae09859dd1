//! 🚀 bulkx-cli loads the config, wires up logging, runs the pipeline, prints the tally.
//!
//! ```text
//! bulkx-cli [CONFIG] [--dry-run]
//! ```
//!
//! `CONFIG` defaults to `bulkx.toml`, and is simply skipped if it isn't there: environment
//! variables (`BULKX_*`) and defaults carry the day. Log verbosity comes from `RUST_LOG`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bulkx::RunReport;
use clap::Parser;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bulkx-cli", version, about = "📦 Batch structured log records into _bulk requests")]
struct Args {
    /// TOML config file. Optional; env vars and defaults fill in the rest.
    #[arg(default_value = "bulkx.toml", env = "BULKX_CONFIG")]
    config: PathBuf,

    /// Keep batches in memory instead of sending them anywhere.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_file = args
        .config
        .try_exists()
        .with_context(|| {
            format!(
                "💀 couldn't even check whether '{}' exists. Permissions, probably.",
                args.config.display()
            )
        })?
        .then_some(args.config.as_path());

    let mut app_config = bulkx::app_config::load_config(config_file)
        .context("💀 bulkx-cli couldn't load its config. Check the TOML and any BULKX_* variables.")?;
    if args.dry_run {
        app_config.output.server = "memory://".to_string();
    }

    match bulkx::run(app_config).await {
        Ok(report) => {
            info!("✅ all done");
            println!("{}", summary(&report));
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 one layer at a time
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
            }
            std::process::exit(1);
        }
    }
}

fn summary(report: &RunReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["📊", "count"]);

    let rows: [(&str, u64); 9] = [
        ("lines read", report.source.lines_read),
        ("lines rejected", report.source.lines_rejected),
        ("records sent", report.source.records_sent),
        ("records batched", report.pipeline.records_batched),
        ("records dropped", report.pipeline.records_dropped),
        ("batches handed off", report.pipeline.flushes),
        ("batches delivered", report.pipeline.batches_delivered),
        ("batches failed", report.pipeline.batches_failed),
        ("bytes delivered", report.pipeline.bytes_delivered),
    ];
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
