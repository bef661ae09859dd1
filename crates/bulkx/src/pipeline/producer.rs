//! 📝 The producer: records in, bulk actions appended, full buffers handed off.
//!
//! 🎬 *[a record arrives. it is formatted. it is stamped with coordinates.]*
//! *[the buffer grows. the clock ticks. somewhere, a committer is mid-POST.]*
//!
//! It owns exactly one buffer at a time. When the count says "enough" or the timer says
//! "it's been a while", the buffer goes to the committer and the producer waits for the
//! other one to come back empty. If the store is slow, the wait is slow, and so is
//! everyone upstream. That is the backpressure. 🦆

use std::time::Duration;

use anyhow::{Context, Result};
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, trace};

use super::{BATCH_CAPACITY, Worker};
use crate::common::Record;
use crate::coordinates::CoordinateTemplate;
use crate::error::FormatError;
use crate::formatters::{Formatter, FormatterBackend};
use crate::indexers::FlushPolicy;

/// 📊 What the producer did with its life.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProducerReport {
    pub(crate) records_batched: u64,
    pub(crate) records_dropped: u64,
    pub(crate) flushes: u64,
}

/// 📝 Fills buffers. Hands them off. Waits for them to come back. Repeat until the input dries up.
#[derive(Debug)]
pub(crate) struct Producer {
    pub(super) input: Receiver<Record>,
    pub(super) handoff: Sender<Vec<u8>>,
    pub(super) returned: Receiver<Vec<u8>>,
    pub(super) formatter: FormatterBackend,
    pub(super) coordinates: CoordinateTemplate,
    pub(super) policy: FlushPolicy,
    /// `None` turns the timer off, only the count flushes.
    pub(super) flush_interval: Option<Duration>,
}

impl Worker for Producer {
    type Report = ProducerReport;

    fn start(self) -> JoinHandle<Result<ProducerReport>> {
        tokio::spawn(self.run())
    }
}

impl Producer {
    async fn run(self) -> Result<ProducerReport> {
        let Self {
            input,
            handoff,
            returned,
            formatter,
            coordinates,
            policy,
            flush_interval,
        } = self;
        // 🔧 taken apart up front so `select!` can borrow the pieces separately

        // ⏰ first tick one full period in, not at startup
        let mut ticker = flush_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut report = ProducerReport::default();
        // 🪣 buffer number one. The committer brings number two.
        let mut batch: Vec<u8> = Vec::with_capacity(BATCH_CAPACITY);
        // -- actions in `batch`, not records seen. rejected records never get a seat.
        let mut count = 0usize;

        debug!("📝 producer started");
        loop {
            tokio::select! {
                received = input.recv() => {
                    // 🏁 closed and empty: the source is done talking
                    let Ok(record) = received else {
                        break;
                    };
                    if let Err(err) = append_action(&formatter, &coordinates, &record, &mut batch) {
                        error!("💀 Error in message conversion to {} format: {}", formatter.name(), err);
                        // 🗑️ this one doesn't make the batch. the next one might.
                        report.records_dropped += 1;
                        continue;
                    }
                    report.records_batched += 1;
                    count += 1;
                    if policy.check_flush(count, batch.len()) {
                        trace!("📦 {} actions buffered, handing off", count);
                        batch = hand_off(&handoff, &returned, batch).await?;
                        report.flushes += 1;
                        count = 0;
                    }
                }
                _ = next_tick(&mut ticker) => {
                    // -- an empty buffer is not worth a round trip
                    if !batch.is_empty() {
                        trace!("⏰ timer flush with {} actions buffered", count);
                        batch = hand_off(&handoff, &returned, batch).await?;
                        report.flushes += 1;
                        count = 0;
                    }
                }
            }
        }

        // 🏁 input closed and drained. Nobody will ask for a buffer back again.
        drop(returned);
        if !batch.is_empty() {
            debug!("🏁 flushing the last {} actions", count);
            handoff
                .send(batch)
                .await
                .context("💀 the committer left before the final batch")?;
            report.flushes += 1;
        }
        // 📪 closing the handoff is how the committer learns it can go home
        handoff.close();
        debug!("📝 producer done");
        Ok(report)
    }
}

/// Appends `<header>\n<document>\n`. A document that fails to format leaves `batch` untouched.
fn append_action(
    formatter: &FormatterBackend,
    coordinates: &CoordinateTemplate,
    record: &Record,
    batch: &mut Vec<u8>,
) -> Result<(), FormatError> {
    // 📄 document first, so a rejected record never leaves a lonely header behind
    let document = formatter.format(record)?;
    coordinates.for_record(record).write_to(batch, record);
    batch.push(b'\n');
    batch.extend_from_slice(&document);
    batch.push(b'\n');
    Ok(())
}

/// 🔄 Give the committer this buffer, wait for the previous one to come back empty.
async fn hand_off(
    handoff: &Sender<Vec<u8>>,
    returned: &Receiver<Vec<u8>>,
    batch: Vec<u8>,
) -> Result<Vec<u8>> {
    handoff
        .send(batch)
        .await
        .context("💀 the committer hung up before taking the batch")?;
    returned
        .recv()
        .await
        .context("💀 the committer never gave the buffer back")
}

/// ⏰ The next timer tick, or never when the timer is off.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        // 😴 no timer, no ticks. `select!` just never picks this branch.
        None => std::future::pending::<()>().await,
    }
}
