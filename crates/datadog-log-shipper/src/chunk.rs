// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// A bounded accumulation of encoded records awaiting transmission.
///
/// A chunk is open while the buffer appends to it and becomes immutable once
/// sealed. Only sealed chunks are handed to an ingester.
#[derive(Debug, Clone)]
pub struct Chunk {
    data: Vec<u8>,
    records: usize,
    created_at: Instant,
    created_at_unix_millis: u64,
    sealed: bool,
}

impl Chunk {
    pub(crate) fn new(capacity: usize) -> Self {
        let created_at_unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Chunk {
            data: Vec::with_capacity(capacity),
            records: 0,
            created_at: Instant::now(),
            created_at_unix_millis,
            sealed: false,
        }
    }

    pub(crate) fn push(&mut self, record: &[u8]) {
        debug_assert!(!self.sealed, "push into a sealed chunk");
        self.data.extend_from_slice(record);
        self.records += 1;
    }

    /// Makes the chunk immutable and releases the unused part of its
    /// allocation, so a sealed chunk costs what it holds.
    pub(crate) fn seal(&mut self) {
        self.data.shrink_to_fit();
        self.sealed = true;
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Wall-clock creation time, used for object naming.
    #[must_use]
    pub fn created_at_unix_millis(&self) -> u64 {
        self.created_at_unix_millis
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_tracks_size_and_records() {
        let mut chunk = Chunk::new(16);
        chunk.push(b"abc\n");
        chunk.push(b"de\n");

        assert_eq!(chunk.len(), 7);
        assert_eq!(chunk.records(), 2);
        assert_eq!(chunk.data(), b"abc\nde\n");
        assert!(!chunk.is_sealed());

        chunk.seal();
        assert!(chunk.is_sealed());
    }

    #[test]
    fn test_seal_releases_unused_capacity() {
        let mut chunk = Chunk::new(4 * 1024 * 1024);
        chunk.push(b"x");
        assert!(chunk.data.capacity() >= 4 * 1024 * 1024);

        chunk.seal();
        assert_eq!(chunk.data(), b"x");
        assert!(chunk.data.capacity() < 1024);
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_follows_clock() {
        let chunk = Chunk::new(0);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(chunk.age() >= Duration::from_secs(5));
        assert!(chunk.created_at_unix_millis() > 0);
    }
}
