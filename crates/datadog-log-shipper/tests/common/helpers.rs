// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use datadog_log_shipper::{Compression, FlushMode, Record, ShipperConfig};
use serde_json::json;
use std::io::Read;
use std::time::Duration;

pub const FLUSH_INTERVAL: Duration = Duration::from_millis(600);

/// A shipper configuration with small, test-friendly limits.
#[allow(dead_code)]
pub fn test_config(mode: FlushMode, compression: Compression) -> ShipperConfig {
    let mut config = ShipperConfig::default();
    config.flusher.mode = mode;
    config.flusher.flush_interval = FLUSH_INTERVAL;
    config.flusher.wait_after_close = Duration::from_secs(5);
    config.buffer.chunk_initial_size = 1024;
    config.buffer.chunk_retention_size = 1024 * 1024;
    config.sender.compression = compression;
    config.sender.key_prefix = "logs/".to_string();
    config.sender.retry.retry_max = 3;
    config.sender.retry.retry_interval = Duration::from_millis(100);
    config.sender.retry.max_retry_interval = Duration::from_millis(800);
    config
}

#[allow(dead_code)]
pub fn record(producer: usize, sequence: usize) -> Record {
    json!({
        "producer": producer,
        "sequence": sequence,
        "message": format!("record {sequence} from producer {producer}"),
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

#[allow(dead_code)]
pub fn gunzip(payload: &[u8]) -> Vec<u8> {
    let mut decoder = flate2::read::GzDecoder::new(payload);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .unwrap_or_else(|e| panic!("payload is not gzip: {e}"));
    out
}
