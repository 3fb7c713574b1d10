//! Inbound record sources.
//!
//! The transport contract: per-symbol FIFO delivery, at-least-once. The
//! guard absorbs duplicates; the pipeline reports failed record ids back so
//! only those are redelivered.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::mpsc;

/// One inbound stream record: an opaque transport id plus the raw body.
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub record_id: String,
    pub body: String,
}

/// The inbound seam. `None` means the source is drained and the service
/// should shut down cleanly.
#[async_trait]
pub trait RecordSource: Send {
    async fn next_batch(&mut self) -> Result<Option<Vec<InboundRecord>>>;
}

/// In-process source over a bounded channel; the form tests and embedded
/// deployments feed the dispatcher with.
pub struct ChannelSource {
    rx: mpsc::Receiver<InboundRecord>,
    max_batch: usize,
}

/// Build a channel source plus the sender side that feeds it.
pub fn channel(capacity: usize, max_batch: usize) -> (mpsc::Sender<InboundRecord>, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ChannelSource { rx, max_batch })
}

#[async_trait]
impl RecordSource for ChannelSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<InboundRecord>>> {
        let first = match self.rx.recv().await {
            Some(record) => record,
            None => return Ok(None),
        };
        let mut records = vec![first];
        while records.len() < self.max_batch {
            match self.rx.try_recv() {
                Ok(record) => records.push(record),
                Err(_) => break,
            }
        }
        Ok(Some(records))
    }
}

/// NDJSON reader over stdin or a file; the binary's local mode. One record
/// per line, record ids synthesized from the line number.
pub struct NdjsonSource {
    lines: Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>,
    line_no: u64,
}

impl NdjsonSource {
    pub fn stdin() -> Self {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(tokio::io::stdin());
        Self {
            lines: BufReader::new(reader).lines(),
            line_no: 0,
        }
    }

    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("opening order stream {}", path.display()))?;
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(file);
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            line_no: 0,
        })
    }
}

#[async_trait]
impl RecordSource for NdjsonSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<InboundRecord>>> {
        loop {
            let line = match self.lines.next_line().await.context("reading order stream")? {
                Some(line) => line,
                None => return Ok(None),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(vec![InboundRecord {
                record_id: format!("line-{}", self.line_no),
                body: line,
            }]));
        }
    }
}
