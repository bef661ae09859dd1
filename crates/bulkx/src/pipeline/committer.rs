//! 📡 The committer: takes a batch, ships it, gives the emptied buffer back.
//!
//! It never fails. A batch the store refused is logged, counted, and its buffer goes back into
//! rotation like nothing happened. No retries, no dead letters. 🦆
//!
//! 🎬 *[the handoff channel creaks open. a batch slides through.]*
//! *[the committer does not read it. the committer does not need to read it.]*
//! *[it simply POSTs.]*

use anyhow::Result;
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use super::{BATCH_CAPACITY, Worker};
use crate::indexers::{BulkIndexer, IndexerBackend};

/// 📊 The committer's scorecard. Failures count too. Nobody is judging. (we are judging a little)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CommitterReport {
    pub(crate) batches_delivered: u64,
    pub(crate) batches_failed: u64,
    pub(crate) bytes_delivered: u64,
}

/// 📡 Ships what it is handed, returns what it shipped, empty.
#[derive(Debug)]
pub(crate) struct Committer {
    handoff: Receiver<Vec<u8>>,
    returned: Sender<Vec<u8>>,
    indexer: IndexerBackend,
}

impl Committer {
    pub(crate) fn new(
        handoff: Receiver<Vec<u8>>,
        returned: Sender<Vec<u8>>,
        indexer: IndexerBackend,
    ) -> Self {
        // 🔧 three fields, one job, the borrow checker signed off
        Self {
            handoff,
            returned,
            indexer,
        }
    }
}

impl Worker for Committer {
    type Report = CommitterReport;

    fn start(mut self) -> JoinHandle<Result<CommitterReport>> {
        tokio::spawn(async move {
            let mut report = CommitterReport::default();

            // -- the second of the two buffers. The producer already holds the first.
            if self.returned.send(Vec::with_capacity(BATCH_CAPACITY)).await.is_err() {
                debug!("🏁 the producer finished before it ever needed a spare buffer");
            }

            // 🔁 `recv` only errors once the producer closed the handoff and it is empty
            while let Ok(mut batch) = self.handoff.recv().await {
                match self.indexer.index(&batch).await {
                    Ok(()) => {
                        trace!("✅ {} bytes indexed", batch.len());
                        report.batches_delivered += 1;
                        report.bytes_delivered += batch.len() as u64;
                    }
                    Err(err) => {
                        // 💀 the batch is gone. the buffer is not. back into rotation it goes.
                        error!("💀 {}", err);
                        report.batches_failed += 1;
                    }
                }
                // -- keeps the capacity, drops the bytes
                batch.clear();
                if self.returned.send(batch).await.is_err() {
                    trace!("🗑️ the producer is wrapping up, buffer not needed");
                }
            }

            debug!("🏁 committer drained the handoff, shutting down");
            Ok(report)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexers::{FlushPolicy, InMemoryIndexer};

    #[tokio::test]
    async fn the_one_where_the_buffer_comes_back_empty_but_roomy() -> anyhow::Result<()> {
        let (handoff_tx, handoff_rx) = async_channel::bounded(1);
        let (returned_tx, returned_rx) = async_channel::bounded(1);
        let peek = InMemoryIndexer::new(FlushPolicy::by_count(1));
        let committer =
            Committer::new(handoff_rx, returned_tx, IndexerBackend::InMemory(peek.clone())).start();

        let seed = returned_rx.recv().await?;
        assert!(seed.is_empty());
        assert!(seed.capacity() >= BATCH_CAPACITY);

        let mut batch = Vec::with_capacity(4096);
        batch.extend_from_slice(b"{\"index\":{}}\n{}\n");
        handoff_tx.send(batch).await?;
        let back = returned_rx.recv().await?;
        assert!(back.is_empty());
        assert!(back.capacity() >= 4096);

        handoff_tx.close();
        let report = committer.await??;
        assert_eq!(report.batches_delivered, 1);
        assert_eq!(report.bytes_delivered, 16);
        assert_eq!(peek.batches().await, vec![b"{\"index\":{}}\n{}\n".to_vec()]);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_queued_batches_outlive_the_close() -> anyhow::Result<()> {
        let (handoff_tx, handoff_rx) = async_channel::bounded(1);
        let (returned_tx, returned_rx) = async_channel::bounded::<Vec<u8>>(1);
        let peek = InMemoryIndexer::new(FlushPolicy::by_count(1));

        // -- the producer's farewell: last batch in, return side dropped, handoff closed
        handoff_tx.send(b"last\n".to_vec()).await?;
        drop(returned_rx);
        handoff_tx.close();

        let report =
            Committer::new(handoff_rx, returned_tx, IndexerBackend::InMemory(peek.clone()))
                .start()
                .await??;
        assert_eq!(report.batches_delivered, 1);
        assert_eq!(peek.batches().await, vec![b"last\n".to_vec()]);
        Ok(())
    }
}
