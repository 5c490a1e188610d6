// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Default limits and timings.
//!
//! # Buffer sizing
//!
//! - **Chunk initial size**: a chunk is closed once it holds this many bytes
//! - **Chunk retention size**: ceiling for all buffered bytes, the
//!   backpressure threshold
//! - **Chunk retention time**: maximum age of a chunk before it is shipped
//!   even when under-size
//!
//! # Retry
//!
//! Send retries use capped exponential backoff: the first wait is
//! [`DEFAULT_RETRY_INTERVAL`], each following wait grows by
//! [`DEFAULT_RETRY_FACTOR`] and never exceeds [`DEFAULT_MAX_RETRY_INTERVAL`].

use std::time::Duration;

/// Target size of a chunk: 4MB.
pub const DEFAULT_CHUNK_INITIAL_SIZE: usize = 4 * 1_024 * 1_024;

/// Maximum bytes held across all chunks: 64MB.
///
/// Appends that would cross this limit are refused with
/// [`crate::Error::BufferFull`].
pub const DEFAULT_CHUNK_RETENTION_SIZE: usize = 64 * 1_024 * 1_024;

/// Maximum age of a chunk before it becomes eligible for flushing: 30s.
pub const DEFAULT_CHUNK_RETENTION_TIME: Duration = Duration::from_secs(30);

/// Idle wait of the background worker between periodic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(600);

/// Grace period granted to the worker on close before it is cancelled.
pub const DEFAULT_WAIT_AFTER_CLOSE: Duration = Duration::from_secs(10);

/// Total attempts per send, including the first one.
pub const DEFAULT_RETRY_MAX: u32 = 10;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_MAX_RETRY_INTERVAL: Duration = Duration::from_secs(30);

pub const DEFAULT_RETRY_FACTOR: f64 = 2.0;

/// Scratch window used while compressing a chunk: 8KB.
pub const DEFAULT_WORK_BUF_SIZE: usize = 8 * 1_024;

/// Per-request timeout of the HTTP transport.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_GZIP_LEVEL: u32 = 6;

pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Prefix of every environment variable read by [`crate::config::ShipperConfig::from_env`].
pub const ENV_PREFIX: &str = "DD_LOG_SHIPPER_";
