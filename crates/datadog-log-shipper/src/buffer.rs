// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Chunk accumulation and flush eligibility.
//!
//! # Layout
//!
//! ```text
//!   append ──> ┌────────┐  full / oversize   ┌─────────────────┐  flush   ┌──────────┐
//!              │ active │ ─────────────────> │ pending (FIFO)  │ ───────> │ in flight│ ──> Ingester
//!              └────────┘                    └─────────────────┘          └──────────┘
//!                                                    ^                          │
//!                                                    └──────── send failed ─────┘
//! ```
//!
//! # Flush policy
//!
//! - **Forced**: the active chunk is sealed and every chunk is shipped.
//! - **Periodic**: sealed chunks are shipped, and the active chunk is sealed
//!   and shipped once it reaches `chunk_initial_size` or is older than
//!   `chunk_retention_time`. Either trigger is enough.
//!
//! Chunks are shipped oldest first. The first failure stops the pass and
//! puts the failed chunk back, ahead of anything still pending, so nothing
//! is dropped and the next flush retries it.
//!
//! # Backpressure
//!
//! Bytes in the active, pending and in-flight chunks all count toward
//! `chunk_retention_size`. An append that would cross it is refused with
//! [`Error::BufferFull`]. A record larger than `chunk_retention_size` can
//! never be taken and is refused with [`Error::RecordTooLarge`]; empty
//! records are refused with [`Error::EmptyRecord`].

use crate::chunk::Chunk;
use crate::config::BufferConfig;
use crate::error::Error;
use crate::ingester::Ingester;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Counters kept over the buffer's lifetime.
#[derive(Debug, Default)]
pub struct BufferStats {
    appended_bytes: AtomicU64,
    appended_records: AtomicU64,
    flushed_bytes: AtomicU64,
    flushed_chunks: AtomicU64,
    abandoned_bytes: AtomicU64,
    abandoned_records: AtomicU64,
    failed_flushes: AtomicU64,
}

/// Point-in-time copy of [`BufferStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStatsSnapshot {
    pub appended_bytes: u64,
    pub appended_records: u64,
    pub flushed_bytes: u64,
    pub flushed_chunks: u64,
    /// Bytes that will never be shipped: dropped mid-send by a forced
    /// shutdown, or still buffered when the buffer was released.
    pub abandoned_bytes: u64,
    pub abandoned_records: u64,
    pub failed_flushes: u64,
}

impl BufferStats {
    #[must_use]
    pub fn snapshot(&self) -> BufferStatsSnapshot {
        BufferStatsSnapshot {
            appended_bytes: self.appended_bytes.load(Ordering::Relaxed),
            appended_records: self.appended_records.load(Ordering::Relaxed),
            flushed_bytes: self.flushed_bytes.load(Ordering::Relaxed),
            flushed_chunks: self.flushed_chunks.load(Ordering::Relaxed),
            abandoned_bytes: self.abandoned_bytes.load(Ordering::Relaxed),
            abandoned_records: self.abandoned_records.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
        }
    }

    fn record_abandoned(&self, bytes: usize, records: usize) {
        self.abandoned_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.abandoned_records
            .fetch_add(records as u64, Ordering::Relaxed);
    }
}

/// Result of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub chunks: usize,
    pub bytes: usize,
    pub records: usize,
}

#[derive(Debug, Default)]
struct BufferState {
    active: Option<Chunk>,
    pending: VecDeque<Chunk>,
    /// Sum of active and pending chunk sizes.
    queued_bytes: usize,
    in_flight_bytes: usize,
    closed: bool,
}

impl BufferState {
    fn buffered_bytes(&self) -> usize {
        self.queued_bytes + self.in_flight_bytes
    }

    fn seal_active(&mut self) {
        if let Some(mut chunk) = self.active.take() {
            if chunk.is_empty() {
                return;
            }
            chunk.seal();
            self.pending.push_back(chunk);
        }
    }
}

pub struct Buffer {
    config: BufferConfig,
    state: Mutex<BufferState>,
    /// Serialises flush passes.
    flush_gate: tokio::sync::Mutex<()>,
    stats: BufferStats,
}

impl Buffer {
    #[must_use]
    pub fn new(config: BufferConfig) -> Self {
        Buffer {
            config,
            state: Mutex::new(BufferState::default()),
            flush_gate: tokio::sync::Mutex::new(()),
            stats: BufferStats::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    fn lock_state(&self) -> MutexGuard<'_, BufferState> {
        // A panic while holding the lock leaves the chunk bookkeeping intact:
        // every mutation below completes before anything can unwind.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Appends one encoded record.
    pub fn append(&self, record: &[u8]) -> Result<(), Error> {
        let len = record.len();
        let initial_size = self.config.chunk_initial_size;
        let mut state = self.lock_state();

        if state.closed {
            return Err(Error::Closed);
        }
        if len == 0 {
            return Err(Error::EmptyRecord);
        }
        if len > self.config.chunk_retention_size {
            return Err(Error::RecordTooLarge {
                size: len,
                limit: self.config.chunk_retention_size,
            });
        }

        let buffered = state.buffered_bytes();
        if buffered + len > self.config.chunk_retention_size {
            return Err(Error::BufferFull {
                buffered,
                limit: self.config.chunk_retention_size,
            });
        }

        if len > initial_size {
            // Oversized records travel alone in a chunk of their own.
            debug!(
                "SHIPPER | Record of {} bytes exceeds chunk size {}, shipping it alone",
                len, initial_size
            );
            state.seal_active();
            let mut chunk = Chunk::new(len);
            chunk.push(record);
            chunk.seal();
            state.pending.push_back(chunk);
        } else {
            let fits = state
                .active
                .as_ref()
                .map_or(true, |chunk| chunk.len() + len <= initial_size);
            if !fits {
                state.seal_active();
            }
            state
                .active
                .get_or_insert_with(|| Chunk::new(initial_size))
                .push(record);
        }
        state.queued_bytes += len;
        drop(state);

        self.stats
            .appended_bytes
            .fetch_add(len as u64, Ordering::Relaxed);
        self.stats.appended_records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Hands every chunk that meets the flush policy to `ingester`.
    ///
    /// With `force` set, every chunk is shipped regardless of size or age.
    /// Retrying a failed send is the ingester's job; on failure the chunk
    /// stays buffered and the error is returned.
    pub async fn flush(&self, ingester: &dyn Ingester, force: bool) -> Result<FlushSummary, Error> {
        let _gate = self.flush_gate.lock().await;

        let mut in_flight = InFlight::new(self, self.take_eligible(force));
        let mut summary = FlushSummary::default();

        loop {
            let Some(chunk) = in_flight.chunks.front() else {
                break;
            };
            let result = ingester.ingest(chunk).await;
            match result {
                Ok(()) => {
                    if let Some(chunk) = in_flight.complete_front() {
                        summary.chunks += 1;
                        summary.bytes += chunk.len();
                        summary.records += chunk.records();
                    }
                }
                Err(e) => {
                    self.stats.failed_flushes.fetch_add(1, Ordering::Relaxed);
                    in_flight.requeue();
                    return Err(e);
                }
            }
        }

        if summary.chunks > 0 {
            debug!(
                "SHIPPER | Flushed {} chunks ({} bytes, {} records), force={}",
                summary.chunks, summary.bytes, summary.records, force
            );
        }
        Ok(summary)
    }

    /// Moves the chunks eligible for this pass from the queue to in-flight.
    fn take_eligible(&self, force: bool) -> VecDeque<Chunk> {
        let mut state = self.lock_state();

        let active_ready = state.active.as_ref().is_some_and(|chunk| {
            force
                || chunk.len() >= self.config.chunk_initial_size
                || chunk.age() >= self.config.chunk_retention_time
        });
        if active_ready {
            state.seal_active();
        }

        let chunks = std::mem::take(&mut state.pending);
        let bytes: usize = chunks.iter().map(Chunk::len).sum();
        state.queued_bytes -= bytes;
        state.in_flight_bytes += bytes;
        chunks
    }

    /// Whether total buffered bytes reached `chunk_retention_size`.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.lock_state().buffered_bytes() >= self.config.chunk_retention_size
    }

    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.lock_state().buffered_bytes()
    }

    /// Number of sealed chunks waiting for a flush.
    #[must_use]
    pub fn pending_chunks(&self) -> usize {
        self.lock_state().pending.len()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    #[must_use]
    pub fn stats(&self) -> BufferStatsSnapshot {
        self.stats.snapshot()
    }

    /// Releases the buffer. Further appends fail with [`Error::Closed`];
    /// anything still buffered is dropped and counted as abandoned.
    pub fn close(&self) {
        let mut state = self.lock_state();
        if state.closed {
            return;
        }
        state.closed = true;
        state.seal_active();

        let chunks = std::mem::take(&mut state.pending);
        state.queued_bytes = 0;
        drop(state);

        let bytes: usize = chunks.iter().map(Chunk::len).sum();
        let records: usize = chunks.iter().map(Chunk::records).sum();
        if bytes > 0 {
            warn!(
                "SHIPPER | Buffer released with {} unsent bytes ({} records) in {} chunks",
                bytes,
                records,
                chunks.len()
            );
            self.stats.record_abandoned(bytes, records);
        }
        debug!("SHIPPER | Buffer closed");
    }
}

/// Chunks taken out of the queue for one flush pass.
///
/// Dropping this while chunks remain (the flush future was cancelled
/// mid-send) accounts for them as abandoned.
struct InFlight<'a> {
    buffer: &'a Buffer,
    chunks: VecDeque<Chunk>,
}

impl<'a> InFlight<'a> {
    fn new(buffer: &'a Buffer, chunks: VecDeque<Chunk>) -> Self {
        InFlight { buffer, chunks }
    }

    fn complete_front(&mut self) -> Option<Chunk> {
        let chunk = self.chunks.pop_front()?;
        let mut state = self.buffer.lock_state();
        state.in_flight_bytes -= chunk.len();
        drop(state);

        let stats = &self.buffer.stats;
        stats
            .flushed_bytes
            .fetch_add(chunk.len() as u64, Ordering::Relaxed);
        stats.flushed_chunks.fetch_add(1, Ordering::Relaxed);
        Some(chunk)
    }

    /// Returns what is left to the head of the pending queue, in order.
    fn requeue(&mut self) {
        let chunks = std::mem::take(&mut self.chunks);
        let bytes: usize = chunks.iter().map(Chunk::len).sum();

        let mut state = self.buffer.lock_state();
        state.in_flight_bytes -= bytes;
        if state.closed {
            drop(state);
            self.buffer
                .stats
                .record_abandoned(bytes, chunks.iter().map(Chunk::records).sum());
            return;
        }
        state.queued_bytes += bytes;
        for chunk in chunks.into_iter().rev() {
            state.pending.push_front(chunk);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.chunks.is_empty() {
            return;
        }
        let chunks = std::mem::take(&mut self.chunks);
        let bytes: usize = chunks.iter().map(Chunk::len).sum();
        let records: usize = chunks.iter().map(Chunk::records).sum();

        self.buffer.lock_state().in_flight_bytes -= bytes;
        self.buffer.stats.record_abandoned(bytes, records);
        warn!(
            "SHIPPER | Abandoned {} in-flight chunks ({} bytes, {} records) on cancelled flush",
            chunks.len(),
            bytes,
            records
        );
    }
}
