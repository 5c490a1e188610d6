// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Errors surfaced by the shipper's public API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backpressure: the buffer already holds `buffered` bytes and cannot
    /// take the record without crossing `limit`.
    #[error("Buffer full: {buffered} bytes buffered, limit is {limit} bytes")]
    BufferFull { buffered: usize, limit: usize },

    /// The record can never fit, whatever the buffer holds.
    #[error("Record of {size} bytes exceeds the buffer limit of {limit} bytes")]
    RecordTooLarge { size: usize, limit: usize },

    #[error("Record is empty")]
    EmptyRecord,

    #[error("Buffer is closed")]
    Closed,

    #[error("No Tokio runtime available to spawn the flush worker")]
    NoRuntime,

    #[error("Failed to format record: {0}")]
    Format(String),

    #[error("Failed to compress chunk: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Failed to send {key} after {attempts} attempts: {cause}")]
    SendFailed {
        key: String,
        attempts: u32,
        #[source]
        cause: TransportError,
    },
}

/// Outcome of a single transmission attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Payload rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether another attempt could succeed. 4xx responses and rejected
    /// payloads are permanent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_) | TransportError::Timeout(_) | TransportError::Server { .. }
        )
    }

    /// Maps a non-success HTTP status to the matching error class.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        if (400..500).contains(&status) {
            TransportError::Client { status, message }
        } else {
            TransportError::Server { status, message }
        }
    }
}
