// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of sealed chunks: object naming and compression in front of a
//! [`Sender`].

use crate::chunk::Chunk;
use crate::constants;
use crate::error::Error;
use crate::sender::Sender;
use async_trait::async_trait;
use flate2::write::GzEncoder;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transmission target of a buffer flush.
#[async_trait]
pub trait Ingester: Send + Sync {
    async fn ingest(&self, chunk: &Chunk) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip { level: u32 },
    Zstd { level: i32 },
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Gzip {
            level: constants::DEFAULT_GZIP_LEVEL,
        }
    }
}

impl Compression {
    /// File extension appended to object keys, including the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip { .. } => ".gz",
            Compression::Zstd { .. } => ".zst",
        }
    }

    #[must_use]
    pub fn content_encoding(&self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip { .. } => Some("gzip"),
            Compression::Zstd { .. } => Some("zstd"),
        }
    }

    /// Compresses `data`, feeding the encoder `window` bytes at a time.
    pub fn encode(&self, data: &[u8], window: usize) -> Result<Vec<u8>, Error> {
        match *self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip { level } => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::new(level));
                write_windowed(&mut encoder, data, window)?;
                Ok(encoder.finish()?)
            }
            Compression::Zstd { level } => {
                let mut encoder = zstd::stream::write::Encoder::new(Vec::new(), level)?;
                write_windowed(&mut encoder, data, window)?;
                Ok(encoder.finish()?)
            }
        }
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip {
                level: constants::DEFAULT_GZIP_LEVEL,
            }),
            "zstd" | "zst" => Ok(Compression::Zstd {
                level: constants::DEFAULT_ZSTD_LEVEL,
            }),
            other => Err(Error::InvalidConfig(format!(
                "Unexpected compression: {other}"
            ))),
        }
    }
}

fn write_windowed<W: Write>(writer: &mut W, data: &[u8], window: usize) -> std::io::Result<()> {
    for piece in data.chunks(window.max(1)) {
        writer.write_all(piece)?;
    }
    Ok(())
}

/// Names each chunk as an object and ships it compressed.
///
/// Keys look like `{prefix}{created_unix_millis}-{sequence:08}{suffix}`.
/// The suffix defaults to `.{format}` plus the compression extension,
/// e.g. `.jsonl.gz`.
pub struct ObjectIngester {
    sender: Sender,
    key_prefix: String,
    key_suffix: String,
    compression: Compression,
    work_buf_size: usize,
    sequence: AtomicU64,
}

impl ObjectIngester {
    #[must_use]
    pub fn new(
        sender: Sender,
        format_name: &str,
        key_prefix: String,
        key_suffix: Option<String>,
        compression: Compression,
        work_buf_size: usize,
    ) -> Self {
        let key_suffix = key_suffix
            .unwrap_or_else(|| default_key_suffix(format_name, compression));
        ObjectIngester {
            sender,
            key_prefix,
            key_suffix,
            compression,
            work_buf_size,
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn key_suffix(&self) -> &str {
        &self.key_suffix
    }

    fn next_key(&self, chunk: &Chunk) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}{}-{:08}{}",
            self.key_prefix,
            chunk.created_at_unix_millis(),
            sequence,
            self.key_suffix
        )
    }
}

#[must_use]
pub fn default_key_suffix(format_name: &str, compression: Compression) -> String {
    format!(".{}{}", format_name, compression.extension())
}

#[async_trait]
impl Ingester for ObjectIngester {
    async fn ingest(&self, chunk: &Chunk) -> Result<(), Error> {
        let key = self.next_key(chunk);
        let payload = self.compression.encode(chunk.data(), self.work_buf_size)?;
        self.sender.send(&key, &payload).await
    }
}
