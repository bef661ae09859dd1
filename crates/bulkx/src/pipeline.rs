//! 🚂 The pipeline: two tasks, two buffers, one batch in flight.
//!
//! ```text
//!  records ──▶ Producer ──handoff (cap 1)──▶ Committer ──▶ BulkIndexer
//!                 ▲                              │
//!                 └──────── returned (cap 1) ◀───┘
//! ```
//!
//! The producer fills one buffer while the committer ships the other. When the producer wants to
//! flush it hands its buffer over and blocks until the committer gives the previous one back,
//! emptied. The committer seeds the return side with one buffer at startup, so exactly two ever
//! exist. A slow store therefore slows the producer, which slows whoever is feeding records in.
//!
//! End of input: whatever is buffered gets handed off, the handoff closes, the committer drains
//! it and exits. Nothing buffered is ever thrown away on a clean shutdown.

use std::time::Duration;

use anyhow::{Context, Result};
use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::info;

use crate::app_config::OutputConfig;
use crate::common::Record;
use crate::coordinates::CoordinateTemplate;
use crate::error::ConfigError;
use crate::formatters::FormatterBackend;
use crate::indexers::{BulkIndexer, IndexerBackend};
use crate::layout::TimeLayout;

mod committer;
mod producer;

use committer::{Committer, CommitterReport};
use producer::{Producer, ProducerReport};

/// 📦 Starting capacity of each of the two batch buffers. They grow if they have to.
pub(crate) const BATCH_CAPACITY: usize = 10_000;

/// A background task that reports back when it is done.
pub(crate) trait Worker {
    type Report;
    fn start(self) -> JoinHandle<Result<Self::Report>>;
}

/// 📊 What happened, once the pipeline has run dry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// Records that made it into a batch.
    pub records_batched: u64,
    /// Records the formatter refused.
    pub records_dropped: u64,
    /// Batches handed to the committer.
    pub flushes: u64,
    pub batches_delivered: u64,
    pub batches_failed: u64,
    pub bytes_delivered: u64,
}

impl PipelineReport {
    fn merge(produced: ProducerReport, committed: CommitterReport) -> Self {
        Self {
            records_batched: produced.records_batched,
            records_dropped: produced.records_dropped,
            flushes: produced.flushes,
            batches_delivered: committed.batches_delivered,
            batches_failed: committed.batches_failed,
            bytes_delivered: committed.bytes_delivered,
        }
    }
}

/// 🚂 A configured, not yet running, pipeline.
#[derive(Debug)]
pub struct Pipeline {
    cluster: String,
    formatter: FormatterBackend,
    coordinates: CoordinateTemplate,
    indexer: IndexerBackend,
    flush_interval: Option<Duration>,
}

impl Pipeline {
    /// 🔧 Everything the output config describes, indexer included.
    pub fn new(config: &OutputConfig) -> Result<Self, ConfigError> {
        let indexer = IndexerBackend::from_server(
            &config.server,
            config.flush_policy(),
            config.http_timeout(),
        )?;
        Ok(Self::with_indexer(config, indexer))
    }

    /// Same as [`Pipeline::new`] but with an indexer you built yourself.
    pub fn with_indexer(config: &OutputConfig, indexer: IndexerBackend) -> Self {
        Self {
            cluster: config.cluster.clone(),
            formatter: FormatterBackend::from_name(
                &config.format,
                &config.fields,
                &config.timestamp,
                &config.raw_bytes_fields,
            ),
            coordinates: CoordinateTemplate {
                index: config.index.clone(),
                type_name: config.type_name.clone(),
                id: config.id.clone(),
                timestamp_layout: Some(TimeLayout::parse(&config.timestamp)),
                index_from_timestamp: config.index_from_timestamp,
            },
            indexer,
            flush_interval: config.flush_interval(),
        }
    }

    /// 🚀 Run until `input` is closed and every buffered batch has been offered to the store.
    pub async fn run(self, input: Receiver<Record>) -> Result<PipelineReport> {
        let policy = self.indexer.flush_policy();
        info!(
            "🚂 cluster '{}': {} documents, flush every {} actions or {:?}",
            self.cluster,
            self.formatter.name(),
            policy.max_count,
            self.flush_interval
        );

        let (handoff_tx, handoff_rx) = async_channel::bounded(1);
        let (returned_tx, returned_rx) = async_channel::bounded(1);

        let committer = Committer::new(handoff_rx, returned_tx, self.indexer).start();
        let producer = Producer {
            input,
            handoff: handoff_tx,
            returned: returned_rx,
            formatter: self.formatter,
            coordinates: self.coordinates,
            policy,
            flush_interval: self.flush_interval,
        }
        .start();

        let (produced, committed) = futures::future::join(producer, committer).await;
        let produced = produced.context("💀 the producer task fell over")??;
        let committed = committed.context("💀 the committer task fell over")??;

        let report = PipelineReport::merge(produced, committed);
        info!(
            "🏁 cluster '{}': {} records batched, {} dropped, {}/{} batches delivered",
            self.cluster,
            report.records_batched,
            report.records_dropped,
            report.batches_delivered,
            report.flushes
        );
        Ok(report)
    }
}
