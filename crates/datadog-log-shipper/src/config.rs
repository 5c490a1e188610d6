// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants;
use crate::error::Error;
use crate::flusher::FlushMode;
use crate::format::FormatType;
use crate::ingester::Compression;
use crate::sender::RetryPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Chunk sizing and retention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Size at which a chunk is sealed
    pub chunk_initial_size: usize,
    /// Maximum bytes buffered across all chunks
    pub chunk_retention_size: usize,
    /// Age at which a chunk is shipped even when under-size
    pub chunk_retention_time: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            chunk_initial_size: constants::DEFAULT_CHUNK_INITIAL_SIZE,
            chunk_retention_size: constants::DEFAULT_CHUNK_RETENTION_SIZE,
            chunk_retention_time: constants::DEFAULT_CHUNK_RETENTION_TIME,
        }
    }
}

impl BufferConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunk_initial_size == 0 {
            return Err(Error::InvalidConfig(
                "chunk_initial_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_retention_size < self.chunk_initial_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_retention_size ({}) must not be smaller than chunk_initial_size ({})",
                self.chunk_retention_size, self.chunk_initial_size
            )));
        }
        if self.chunk_retention_time.is_zero() {
            return Err(Error::InvalidConfig(
                "chunk_retention_time must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlusherConfig {
    pub mode: FlushMode,
    /// Idle wait of the worker between periodic flushes
    pub flush_interval: Duration,
    /// How long `close` waits for the worker before cancelling it
    pub wait_after_close: Duration,
}

impl Default for FlusherConfig {
    fn default() -> Self {
        Self {
            mode: FlushMode::default(),
            flush_interval: constants::DEFAULT_FLUSH_INTERVAL,
            wait_after_close: constants::DEFAULT_WAIT_AFTER_CLOSE,
        }
    }
}

impl FlusherConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.flush_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "flush_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the HTTP transport uploads objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    /// Base URL; object keys are appended as path
    pub endpoint: String,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    pub request_timeout: Duration,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: None,
            access_key_id: None,
            secret_access_key: None,
            https_proxy: None,
            request_timeout: constants::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SenderConfig {
    pub retry: RetryPolicy,
    /// Scratch window used while compressing a chunk
    pub work_buf_size: usize,
    pub key_prefix: String,
    /// Overrides the `.{format}{compression}` default
    pub key_suffix: Option<String>,
    pub compression: Compression,
    pub destination: DestinationConfig,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            work_buf_size: constants::DEFAULT_WORK_BUF_SIZE,
            key_prefix: String::new(),
            key_suffix: None,
            compression: Compression::default(),
            destination: DestinationConfig::default(),
        }
    }
}

impl SenderConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.retry.validate()?;
        if self.work_buf_size == 0 {
            return Err(Error::InvalidConfig(
                "work_buf_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatConfig {
    pub format_type: FormatType,
    /// Column order, only used by the CSV format
    pub csv_columns: Vec<String>,
}

impl FormatConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.format_type == FormatType::Csv && self.csv_columns.is_empty() {
            return Err(Error::InvalidConfig(
                "csv format requires at least one column".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for a [`crate::Shipper`]
#[derive(Debug, Clone, PartialEq)]
pub struct ShipperConfig {
    pub buffer: BufferConfig,
    pub flusher: FlusherConfig,
    pub sender: SenderConfig,
    pub format: FormatConfig,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            flusher: FlusherConfig::default(),
            sender: SenderConfig::default(),
            format: FormatConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ShipperConfig {
    /// Create configuration from `DD_LOG_SHIPPER_*` environment variables
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ShipperConfig::from_env`], reading variables through
    /// `lookup`. Keys are full variable names, e.g. `DD_LOG_SHIPPER_ENDPOINT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{name}", constants::ENV_PREFIX))
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };
        let mut config = Self::default();

        let buffer = &mut config.buffer;
        parse_into(&var, "CHUNK_INITIAL_SIZE", &mut buffer.chunk_initial_size);
        parse_into(&var, "CHUNK_RETENTION_SIZE", &mut buffer.chunk_retention_size);
        parse_secs_into(&var, "CHUNK_RETENTION_TIME_SECS", &mut buffer.chunk_retention_time);

        let flusher = &mut config.flusher;
        parse_into(&var, "FLUSH_MODE", &mut flusher.mode);
        parse_millis_into(&var, "FLUSH_INTERVAL_MS", &mut flusher.flush_interval);
        parse_secs_into(&var, "WAIT_AFTER_CLOSE_SECS", &mut flusher.wait_after_close);

        let sender = &mut config.sender;
        parse_into(&var, "RETRY_MAX", &mut sender.retry.retry_max);
        parse_millis_into(&var, "RETRY_INTERVAL_MS", &mut sender.retry.retry_interval);
        parse_millis_into(
            &var,
            "MAX_RETRY_INTERVAL_MS",
            &mut sender.retry.max_retry_interval,
        );
        parse_into(&var, "RETRY_FACTOR", &mut sender.retry.retry_factor);
        parse_into(&var, "WORK_BUF_SIZE", &mut sender.work_buf_size);
        parse_into(&var, "COMPRESSION", &mut sender.compression);
        if let Some(prefix) = var("KEY_PREFIX") {
            sender.key_prefix = prefix;
        }
        sender.key_suffix = var("KEY_SUFFIX");

        let destination = &mut sender.destination;
        if let Some(endpoint) = var("ENDPOINT") {
            destination.endpoint = endpoint;
        }
        destination.region = var("REGION");
        destination.access_key_id = var("ACCESS_KEY_ID");
        destination.secret_access_key = var("SECRET_ACCESS_KEY");
        destination.https_proxy = var("HTTPS_PROXY").or_else(|| lookup("HTTPS_PROXY"));
        parse_secs_into(&var, "REQUEST_TIMEOUT_SECS", &mut destination.request_timeout);

        parse_into(&var, "FORMAT", &mut config.format.format_type);
        if let Some(columns) = var("CSV_COLUMNS") {
            config.format.csv_columns = columns
                .split(',')
                .map(str::trim)
                .filter(|column| !column.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(level) = var("LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        self.buffer.validate()?;
        self.flusher.validate()?;
        self.sender.validate()?;
        self.format.validate()?;

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// Overwrites `target` when the variable is set and parses; otherwise the
/// default stays.
fn parse_into<T, V>(var: &V, name: &str, target: &mut T)
where
    T: FromStr,
    V: Fn(&str) -> Option<String>,
{
    if let Some(value) = parse_var(var, name) {
        *target = value;
    }
}

fn parse_var<T, V>(var: &V, name: &str) -> Option<T>
where
    T: FromStr,
    V: Fn(&str) -> Option<String>,
{
    let raw = var(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(
                "SHIPPER | Ignoring unparseable {}{}={:?}, keeping default",
                constants::ENV_PREFIX,
                name,
                raw
            );
            None
        }
    }
}

fn parse_millis_into<V>(var: &V, name: &str, target: &mut Duration)
where
    V: Fn(&str) -> Option<String>,
{
    if let Some(millis) = parse_var::<u64, V>(var, name) {
        *target = Duration::from_millis(millis);
    }
}

fn parse_secs_into<V>(var: &V, name: &str, target: &mut Duration)
where
    V: Fn(&str) -> Option<String>,
{
    if let Some(secs) = parse_var::<u64, V>(var, name) {
        *target = Duration::from_secs(secs);
    }
}
