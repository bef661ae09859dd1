//! 📥 Where records come from before the pipeline gets them.
//!
//! One record per line, serialized the way [`Record`] deserializes. A line that isn't a record
//! is logged and skipped. End of file (or end of stdin) closes the pipeline's input, which is
//! what makes the pipeline flush and finish.

use anyhow::{Context, Result};
use async_channel::Sender;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::common::Record;

/// 📥 Where to read records from. Stdin unless told otherwise.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub enum SourceConfig {
    #[serde(alias = "file")]
    File(FileSourceConfig),
    #[default]
    #[serde(alias = "stdin")]
    Stdin,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FileSourceConfig {
    pub file_name: String,
}

/// 📊 Line accounting for one source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceReport {
    pub lines_read: u64,
    pub records_sent: u64,
    pub lines_rejected: u64,
}

/// 📄 Reads newline-delimited records and feeds them to a channel.
pub struct NdjsonSource {
    name: String,
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
}

impl std::fmt::Debug for NdjsonSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdjsonSource").field("name", &self.name).finish()
    }
}

impl NdjsonSource {
    pub fn new(name: impl Into<String>, reader: Box<dyn AsyncBufRead + Unpin + Send>) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }

    /// 🚪 Open whatever the config points at. A missing file is fatal, right here.
    pub async fn open(config: &SourceConfig) -> Result<Self> {
        match config {
            SourceConfig::File(file_config) => {
                let file = File::open(&file_config.file_name).await.with_context(|| {
                    format!(
                        "💀 '{}' would not open. It may not exist, or it may just not like us.",
                        file_config.file_name
                    )
                })?;
                Ok(Self::new(
                    file_config.file_name.clone(),
                    Box::new(io::BufReader::new(file)),
                ))
            }
            SourceConfig::Stdin => Ok(Self::new("stdin", Box::new(io::BufReader::new(io::stdin())))),
        }
    }

    /// 🚰 Read to the end, sending each record. Dropping `tx` on return is the end-of-input signal.
    pub async fn pump(mut self, tx: Sender<Record>) -> Result<SourceReport> {
        info!("📥 reading records from {}", self.name);
        let mut report = SourceReport::default();
        let mut line = Vec::with_capacity(1024);

        loop {
            line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut line)
                .await
                .with_context(|| format!("💀 reading {} fell apart mid-line", self.name))?;
            if read == 0 {
                break;
            }
            report.lines_read += 1;

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record: Record = match serde_json::from_slice(&line) {
                Ok(record) => record,
                Err(err) => {
                    warn!("⚠️ {} line {} is not a record: {}", self.name, report.lines_read, err);
                    report.lines_rejected += 1;
                    continue;
                }
            };
            if tx.send(record).await.is_err() {
                warn!("⚠️ the pipeline stopped listening, {} left unread", self.name);
                break;
            }
            report.records_sent += 1;
        }

        debug!(
            "🏁 {} done: {} lines, {} records, {} rejected",
            self.name, report.lines_read, report.records_sent, report.lines_rejected
        );
        Ok(report)
    }
}
