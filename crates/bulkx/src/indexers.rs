//! 🔌 Where batches leave the building.
//!
//! An indexer takes one fully rendered bulk body (`{"index":{...}}\n{...}\n` repeated) and
//! gets it into the store in one request. It also owns the flush policy, since it is the one
//! that knows how big a request the store is happy to swallow.
//!
//! | variant    | what it does                                        |
//! |------------|-----------------------------------------------------|
//! | `Http`     | POSTs to `<scheme>://<host>/_bulk`, one connection  |
//! | `InMemory` | keeps every batch in a Vec, for tests and dry runs  |
//!
//! 🔄 Nobody here retries. A failed batch is reported and gone.

use async_trait::async_trait;
use tracing::info;

use crate::error::{ConfigError, IndexError};

pub mod http;
pub mod in_mem;

pub use http::HttpBulkIndexer;
pub use in_mem::InMemoryIndexer;

/// 🚦 When to hand the batch off.
///
/// The default policy only counts actions. `max_bytes` is there for stores that care about
/// request size; nothing turns it on unless asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    pub max_count: usize,
    pub max_bytes: Option<usize>,
}

impl FlushPolicy {
    pub fn by_count(max_count: usize) -> Self {
        Self {
            max_count,
            max_bytes: None,
        }
    }

    pub fn check_flush(&self, count: usize, byte_len: usize) -> bool {
        count >= self.max_count || self.max_bytes.is_some_and(|max| byte_len >= max)
    }
}

/// 📡 Sends batches somewhere, and says when a batch is big enough to send.
#[async_trait]
pub trait BulkIndexer: std::fmt::Debug + Send {
    fn flush_policy(&self) -> FlushPolicy;

    /// `true` once `count` actions (or `byte_len` bytes, if the policy says so) are buffered.
    fn check_flush(&self, count: usize, byte_len: usize) -> bool {
        self.flush_policy().check_flush(count, byte_len)
    }

    /// Ship one bulk body. `Ok` means the store accepted the request.
    async fn index(&mut self, body: &[u8]) -> Result<(), IndexError>;
}

/// 🎭 The indexer the committer actually holds.
#[derive(Debug)]
pub enum IndexerBackend {
    Http(HttpBulkIndexer),
    InMemory(InMemoryIndexer),
}

impl IndexerBackend {
    /// 🔧 `memory://` (any host) gets the in-memory indexer, anything else is parsed as an
    /// HTTP endpoint. A server we cannot parse is a startup failure.
    pub fn from_server(
        server: &str,
        policy: FlushPolicy,
        timeout: Option<std::time::Duration>,
    ) -> Result<Self, ConfigError> {
        if server.to_ascii_lowercase().starts_with("memory://") {
            info!("🧠 dry run: batches will stay in memory");
            return Ok(Self::InMemory(InMemoryIndexer::new(policy)));
        }
        Ok(Self::Http(HttpBulkIndexer::new(server, policy, timeout)?))
    }
}

#[async_trait]
impl BulkIndexer for IndexerBackend {
    fn flush_policy(&self) -> FlushPolicy {
        match self {
            Self::Http(indexer) => indexer.flush_policy(),
            Self::InMemory(indexer) => indexer.flush_policy(),
        }
    }

    async fn index(&mut self, body: &[u8]) -> Result<(), IndexError> {
        match self {
            Self::Http(indexer) => indexer.index(body).await,
            Self::InMemory(indexer) => indexer.index(body).await,
        }
    }
}
