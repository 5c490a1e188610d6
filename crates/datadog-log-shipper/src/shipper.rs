// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::buffer::{Buffer, BufferStatsSnapshot};
use crate::config::ShipperConfig;
use crate::error::Error;
use crate::flusher::{self, Flusher, FlusherState};
use crate::format::{Record, RecordFormatter};
use crate::ingester::ObjectIngester;
use crate::logger;
use crate::sender::{ErrorHandler, HttpTransport, Sender, Transport};
use std::sync::Arc;
use tracing::{debug, error};

/// Entry point: encodes records, buffers them and ships them in the
/// background.
///
/// ```no_run
/// # async fn run() -> Result<(), datadog_log_shipper::Error> {
/// use datadog_log_shipper::{Record, Shipper, ShipperConfig};
///
/// let shipper = Shipper::from_config(ShipperConfig::from_env()?)?;
/// // or, installing the diagnostics logger at `DD_LOG_SHIPPER_LOG_LEVEL`:
/// // let shipper = Shipper::from_env()?;
/// let mut record = Record::new();
/// record.insert("message".to_string(), "hello".into());
/// shipper.emit(&record).await?;
/// shipper.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Shipper {
    formatter: Arc<dyn RecordFormatter>,
    buffer: Arc<Buffer>,
    flusher: Box<dyn Flusher>,
}

impl Shipper {
    /// Builds a shipper sending through `transport`.
    ///
    /// With the async flush mode this must be called from within a Tokio
    /// runtime.
    pub fn new(
        config: ShipperConfig,
        transport: Arc<dyn Transport>,
        error_handler: Option<Arc<dyn ErrorHandler>>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let formatter = config
            .format
            .format_type
            .build(&config.format.csv_columns)?;
        let buffer = Arc::new(Buffer::new(config.buffer));

        let sender_config = config.sender;
        let sender = Sender::new(transport, sender_config.retry, error_handler);
        let ingester = Arc::new(ObjectIngester::new(
            sender,
            formatter.format_name(),
            sender_config.key_prefix,
            sender_config.key_suffix,
            sender_config.compression,
            sender_config.work_buf_size,
        ));
        debug!(
            "SHIPPER | Shipping {} chunks with key suffix {}",
            formatter.format_name(),
            ingester.key_suffix()
        );

        let flusher = flusher::start(&config.flusher, Arc::clone(&buffer), ingester)?;

        Ok(Shipper {
            formatter,
            buffer,
            flusher,
        })
    }

    /// Builds a shipper uploading over HTTP to `config.sender.destination`.
    pub fn from_config(config: ShipperConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(&config.sender.destination, config.sender.compression)?;
        Self::new(config, Arc::new(transport), None)
    }

    /// Reads [`ShipperConfig::from_env`], installs the diagnostics logger at
    /// `config.log_level` and builds an HTTP shipper.
    ///
    /// A global subscriber installed earlier by the application is kept.
    pub fn from_env() -> Result<Self, Error> {
        let config = ShipperConfig::from_env()?;
        if tracing::dispatcher::has_been_set() {
            debug!(
                "SHIPPER | Global subscriber already set, ignoring log level {}",
                config.log_level
            );
        } else {
            logger::init(&config.log_level)?;
        }
        Self::from_config(config)
    }

    /// Encodes and buffers one record.
    ///
    /// Returns [`Error::BufferFull`] under backpressure, [`Error::RecordTooLarge`]
    /// for a record that can never fit and [`Error::Closed`] once the shipper
    /// is closing. Delivery failures are never returned
    /// here; they go to the error handler.
    pub async fn emit(&self, record: &Record) -> Result<(), Error> {
        if self.flusher.state() != FlusherState::Running {
            return Err(Error::Closed);
        }
        let encoded = self.formatter.encode(record)?;
        self.buffer.append(&encoded)?;

        if let Err(e) = self.flusher.on_update().await {
            error!("SHIPPER | Flush after append failed: {}", e);
        }
        Ok(())
    }

    /// Requests a forced flush of everything buffered.
    pub async fn flush(&self) -> Result<(), Error> {
        self.flusher.flush().await
    }

    /// Flushes what is left and releases the buffer, within the configured
    /// `wait_after_close` for the async mode.
    pub async fn close(&self) {
        self.flusher.close().await;
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.flusher.is_terminated()
    }

    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.buffered_bytes()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    #[must_use]
    pub fn stats(&self) -> BufferStatsSnapshot {
        self.buffer.stats()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{BufferConfig, FormatConfig};
    use crate::error::TransportError;
    use crate::flusher::FlushMode;
    use crate::format::FormatType;
    use crate::ingester::Compression;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryTransport {
        objects: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, key: &str, payload: &[u8]) -> Result<(), TransportError> {
            self.objects
                .lock()
                .unwrap()
                .push((key.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    fn record(message: &str) -> Record {
        json!({ "message": message }).as_object().unwrap().clone()
    }

    fn config(mode: FlushMode) -> ShipperConfig {
        let mut config = ShipperConfig::default();
        config.flusher.mode = mode;
        config.sender.compression = Compression::None;
        config.sender.key_prefix = "app/".to_string();
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_and_close_ships_jsonl() {
        let transport = Arc::new(MemoryTransport::default());
        let shipper = Shipper::new(config(FlushMode::Async), transport.clone(), None).unwrap();

        shipper.emit(&record("a")).await.unwrap();
        shipper.emit(&record("b")).await.unwrap();
        shipper.close().await;

        let objects = transport.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].0.starts_with("app/"));
        assert!(objects[0].0.ends_with(".jsonl"));
        assert_eq!(
            objects[0].1,
            b"{\"message\":\"a\"}\n{\"message\":\"b\"}\n".to_vec()
        );
        assert!(shipper.is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_after_close_is_rejected() {
        let transport = Arc::new(MemoryTransport::default());
        let shipper = Shipper::new(config(FlushMode::Sync), transport, None).unwrap();

        shipper.close().await;
        assert!(matches!(
            shipper.emit(&record("late")).await,
            Err(Error::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backpressure_surfaces_from_emit() {
        let transport = Arc::new(MemoryTransport::default());
        let mut config = config(FlushMode::Sync);
        config.buffer = BufferConfig {
            chunk_initial_size: 16,
            chunk_retention_size: 32,
            ..Default::default()
        };
        let shipper = Shipper::new(config, transport, None).unwrap();

        // Each record encodes to 16 bytes: {"message":"x"}\n
        shipper.emit(&record("x")).await.unwrap();
        shipper.emit(&record("y")).await.unwrap();
        assert!(shipper.is_full());
        assert!(matches!(
            shipper.emit(&record("z")).await,
            Err(Error::BufferFull { .. })
        ));

        shipper.flush().await.unwrap();
        assert!(!shipper.is_full());
        shipper.emit(&record("z")).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_too_large_is_not_backpressure() {
        let transport = Arc::new(MemoryTransport::default());
        let mut config = config(FlushMode::Sync);
        config.buffer = BufferConfig {
            chunk_initial_size: 16,
            chunk_retention_size: 32,
            ..Default::default()
        };
        let shipper = Shipper::new(config, transport, None).unwrap();

        let big = record(&"x".repeat(64));
        assert!(matches!(
            shipper.emit(&big).await,
            Err(Error::RecordTooLarge { limit: 32, .. })
        ));
        assert!(!shipper.is_full());
        assert_eq!(shipper.buffered_bytes(), 0);
        shipper.emit(&record("x")).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_csv_shipper() {
        let transport = Arc::new(MemoryTransport::default());
        let mut config = config(FlushMode::Sync);
        config.format = FormatConfig {
            format_type: FormatType::Csv,
            csv_columns: vec!["level".to_string(), "message".to_string()],
        };
        let shipper = Shipper::new(config, transport.clone(), None).unwrap();

        let mut entry = record("hello, world");
        entry.insert("level".to_string(), json!("info"));
        shipper.emit(&entry).await.unwrap();
        shipper.close().await;

        let objects = transport.objects.lock().unwrap();
        assert!(objects[0].0.ends_with(".csv"));
        assert_eq!(objects[0].1, b"info,\"hello, world\"\n".to_vec());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = config(FlushMode::Async);
        config.sender.work_buf_size = 0;
        let result = Shipper::new(config, Arc::new(MemoryTransport::default()), None);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
