//! # Chunked Writer
//!
//! Printer links accept only small writes (32 bytes on the reference BLE
//! module), so a rendered job is cut into contiguous chunks and issued in
//! order. [`PendingWrite`] tracks one job until it completes:
//!
//! - **Unacknowledged** links complete once every chunk is issued.
//! - **Acknowledged** links complete once every chunk is confirmed. An
//!   error confirmation, or more confirmations than issued chunks, fails the
//!   job. Failed chunks are not retried.
//!
//! A job that ends early (rejected, failed or cancelled) stops issuing at the
//! next chunk boundary. Confirmations the peer still owes for its issued
//! chunks are reported by [`PendingWrite::outstanding`] so the session can
//! discard them instead of crediting the next job.

use std::slice::Chunks;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{BonprintError, Result};
use crate::transport::{LinkKind, Transport};

/// Splits byte streams into chunks no larger than the link limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedWriter {
    limit: usize,
}

impl ChunkedWriter {
    /// A zero limit is treated as 1.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// `ceil(len / limit)` contiguous slices covering `bytes`.
    pub fn chunks<'a>(&self, bytes: &'a [u8]) -> Chunks<'a, u8> {
        bytes.chunks(self.limit)
    }

    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.limit)
    }

    /// Write every chunk in order. Returns the number of chunks written.
    pub fn issue(&self, transport: &mut dyn Transport, bytes: &[u8]) -> Result<usize> {
        self.issue_with(transport, bytes, |_| true)
    }

    /// Like [`issue`](Self::issue), calling `before_each(index)` ahead of
    /// every chunk so confirmations can never outrun the sent counter.
    /// Returning `false` stops the write before that chunk.
    pub fn issue_with(
        &self,
        transport: &mut dyn Transport,
        bytes: &[u8],
        mut before_each: impl FnMut(usize) -> bool,
    ) -> Result<usize> {
        let mut issued = 0;
        for (index, chunk) in self.chunks(bytes).enumerate() {
            if !before_each(index) {
                debug!(chunks = issued, "write abandoned");
                return Ok(issued);
            }
            transport.write_chunk(chunk)?;
            issued += 1;
        }
        debug!(chunks = issued, bytes = bytes.len(), "write issued");
        Ok(issued)
    }
}

/// Where a [`PendingWrite`] stands after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteProgress {
    InFlight,
    Complete,
    Failed(String),
}

/// An outstanding write and the channel its result goes out on.
#[derive(Debug)]
pub struct PendingWrite {
    job: u64,
    kind: LinkKind,
    expected: usize,
    sent: usize,
    acknowledged: usize,
    completion: oneshot::Sender<Result<()>>,
}

impl PendingWrite {
    pub fn new(
        job: u64,
        kind: LinkKind,
        expected: usize,
    ) -> (Self, oneshot::Receiver<Result<()>>) {
        let (completion, receiver) = oneshot::channel();
        let pending = Self {
            job,
            kind,
            expected,
            sent: 0,
            acknowledged: 0,
            completion,
        };
        (pending, receiver)
    }

    pub fn job(&self) -> u64 {
        self.job
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn acknowledged(&self) -> usize {
        self.acknowledged
    }

    /// A chunk is about to be written.
    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    /// The last chunk counted by [`record_sent`](Self::record_sent) failed
    /// to write and will never be confirmed.
    pub fn record_unsent(&mut self) {
        self.sent = self.sent.saturating_sub(1);
    }

    /// Confirmations still owed by the peer for chunks already sent.
    pub fn outstanding(&self) -> usize {
        match self.kind {
            LinkKind::Unacknowledged => 0,
            LinkKind::Acknowledged => self.sent.saturating_sub(self.acknowledged),
        }
    }

    /// Every chunk was handed to the transport without error.
    pub fn record_issued(&mut self) -> WriteProgress {
        match self.kind {
            LinkKind::Unacknowledged => WriteProgress::Complete,
            LinkKind::Acknowledged => WriteProgress::InFlight,
        }
    }

    /// The peer confirmed (or rejected) one chunk.
    pub fn record_ack(&mut self, ok: bool) -> WriteProgress {
        if self.kind == LinkKind::Unacknowledged {
            return WriteProgress::InFlight;
        }
        if self.acknowledged == self.sent {
            warn!(
                job = self.job,
                sent = self.sent,
                "acknowledgment without a sent chunk"
            );
            return WriteProgress::Failed(format!(
                "{} acknowledgments for {} sent chunks",
                self.acknowledged + 1,
                self.sent
            ));
        }
        self.acknowledged += 1;
        if !ok {
            return WriteProgress::Failed("printer rejected a chunk".into());
        }
        if self.acknowledged == self.expected {
            WriteProgress::Complete
        } else {
            WriteProgress::InFlight
        }
    }

    /// Resolve the job's future. A dropped receiver is not an error.
    pub fn finish(self, result: Result<()>) {
        let _ = self.completion.send(result);
    }

    /// Resolve the job's future with a transport fault.
    pub fn fail(self, description: impl Into<String>) {
        self.finish(Err(BonprintError::transport(description)));
    }
}
