//! 🚚 bulkx: structured log records in, `_bulk` requests out.
//!
//! Records are rendered one at a time into bulk actions (a coordinates header line, then a
//! document line), buffered, and shipped by a separate committer task while the next batch
//! fills up. See [`pipeline`] for the handoff, [`formatters`] for what documents look like,
//! and [`indexers`] for where they go.

pub mod app_config;
pub mod common;
pub mod coordinates;
pub mod error;
pub mod escape;
pub mod formatters;
pub mod indexers;
pub mod interpolate;
pub mod layout;
pub mod pipeline;
pub mod sources;

use anyhow::{Context, Result};

use crate::app_config::AppConfig;
use crate::pipeline::{Pipeline, PipelineReport};
use crate::sources::{NdjsonSource, SourceReport};

/// 📊 Everything that happened during one run, source side and pipeline side.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub source: SourceReport,
    pub pipeline: PipelineReport,
}

/// 🚀 Read the configured source to the end and ship everything in it.
///
/// Config problems (a server URL we can't use, a file that won't open) fail here, before a
/// single record is read. After that, bad records and failed batches are logged and counted,
/// never fatal.
pub async fn run(app_config: AppConfig) -> Result<RunReport> {
    let pipeline = Pipeline::new(&app_config.output)
        .context("💀 the output config does not describe anywhere we can send documents")?;
    let source = NdjsonSource::open(&app_config.source).await?;

    let (tx, rx) = async_channel::bounded(app_config.runtime.queue_capacity.max(1));
    let source_task = tokio::spawn(source.pump(tx));

    let pipeline = pipeline.run(rx).await?;
    let source = source_task
        .await
        .context("💀 the source task fell over")??;
    Ok(RunReport { source, pipeline })
}
