use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::debug;

use super::{BulkIndexer, FlushPolicy};
use crate::error::IndexError;

/// 🧠 An indexer that never leaves the process.
///
/// Every successful batch is kept, byte for byte, in a shared Vec. Clone it before handing it
/// to a pipeline and you can look inside afterwards. `memory://` servers get one of these, so a
/// dry run exercises everything except the network.
///
/// `answering_with` makes it play a store that is having a bad day: every batch is refused
/// with that status and nothing is kept.
#[derive(Debug, Clone)]
pub struct InMemoryIndexer {
    pub(crate) received: Arc<Mutex<Vec<Vec<u8>>>>,
    policy: FlushPolicy,
    refusal: Option<StatusCode>,
}

impl InMemoryIndexer {
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
            policy,
            refusal: None,
        }
    }

    pub fn answering_with(mut self, status: StatusCode) -> Self {
        self.refusal = Some(status);
        self
    }

    /// 📦 Everything accepted so far, oldest first.
    pub async fn batches(&self) -> Vec<Vec<u8>> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl BulkIndexer for InMemoryIndexer {
    fn flush_policy(&self) -> FlushPolicy {
        self.policy
    }

    async fn index(&mut self, body: &[u8]) -> Result<(), IndexError> {
        if let Some(status) = self.refusal {
            return Err(IndexError::StoreResponse {
                status,
                body: String::new(),
            });
        }
        debug!("🧠 kept a {} byte batch", body.len());
        self.received.lock().await.push(body.to_vec());
        Ok(())
    }
}
