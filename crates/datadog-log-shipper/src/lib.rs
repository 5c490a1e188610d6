// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Datadog Log Shipper
//!
//! Client-side shipping of structured records: producers append records,
//! which are accumulated into size and age bounded chunks and sent to a
//! remote sink in the background, with retry and backoff on failure and a
//! bounded shutdown.
//!
//! ## Architecture
//!
//! ```text
//!   emit(record)
//!       │ RecordFormatter::encode
//!       v
//!   ┌────────┐  Buffer::flush(force)  ┌──────────────┐  send(key, bytes)  ┌───────────┐
//!   │ Buffer │ ─────────────────────> │ObjectIngester│ ─────────────────> │  Sender   │ ──> Transport
//!   └────────┘                        └──────────────┘  naming, compress  └───────────┘
//!       ^                                                                 retry/backoff,
//!       │ when to flush                                                   error handler
//!   ┌─────────┐
//!   │ Flusher │  async: background task on a timer + force signals
//!   └─────────┘  sync:  inline in the caller
//! ```
//!
//! - [`buffer`]: chunk accumulation, flush eligibility, backpressure
//! - [`flusher`]: flush scheduling and the close protocol
//! - [`sender`]: transport abstraction, retry policy, HTTP transport
//! - [`ingester`]: object naming and compression
//! - [`format`]: record encoders (JSON lines, MessagePack, CSV)
//! - [`shipper`]: the facade wiring it all together

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod error;
pub mod flusher;
pub mod format;
pub mod ingester;
pub mod logger;
pub mod sender;
pub mod shipper;

pub use buffer::{Buffer, BufferStatsSnapshot, FlushSummary};
pub use chunk::Chunk;
pub use config::{
    BufferConfig, DestinationConfig, FlusherConfig, FormatConfig, SenderConfig, ShipperConfig,
};
pub use error::{Error, TransportError};
pub use flusher::{AsyncFlusher, FlushMode, Flusher, FlusherState, SyncFlusher};
pub use format::{FormatType, Record, RecordFormatter};
pub use ingester::{Compression, Ingester, ObjectIngester};
pub use sender::{
    ErrorHandler, FailureKind, HttpTransport, RetryPolicy, SendFailure, Sender, Transport,
};
pub use shipper::Shipper;
