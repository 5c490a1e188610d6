// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Flush scheduling.
//!
//! A flusher owns the [`Buffer`] and the [`Ingester`] it ships to, and
//! decides when [`Buffer::flush`] runs. Two disciplines exist:
//!
//! - [`AsyncFlusher`]: a background task flushes on a timer and on forced
//!   flush signals. Callers never wait on the network.
//! - [`SyncFlusher`]: flushes run inline in the calling task.
//!
//! Both move through the same lifecycle:
//!
//! ```text
//!   Running ──close()──> Closing ──final flush, buffer released──> Terminated
//! ```

mod async_flusher;
mod sync_flusher;

pub use async_flusher::AsyncFlusher;
pub use sync_flusher::SyncFlusher;

use crate::buffer::Buffer;
use crate::config::FlusherConfig;
use crate::error::Error;
use crate::ingester::Ingester;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlushMode {
    Sync,
    #[default]
    Async,
}

impl FromStr for FlushMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" => Ok(FlushMode::Sync),
            "async" => Ok(FlushMode::Async),
            other => Err(Error::InvalidConfig(format!("Unexpected flush mode: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FlusherState {
    Running = 0,
    Closing = 1,
    Terminated = 2,
}

/// Atomic holder of a [`FlusherState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        StateCell(AtomicU8::new(FlusherState::Running as u8))
    }

    pub(crate) fn get(&self) -> FlusherState {
        match self.0.load(Ordering::Acquire) {
            0 => FlusherState::Running,
            1 => FlusherState::Closing,
            _ => FlusherState::Terminated,
        }
    }

    pub(crate) fn set(&self, state: FlusherState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves from `from` to `to`. Returns false if the current state was not `from`.
    pub(crate) fn transition(&self, from: FlusherState, to: FlusherState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[async_trait]
pub trait Flusher: Send + Sync {
    /// Requests a forced flush of everything buffered.
    async fn flush(&self) -> Result<(), Error>;

    /// Called after every successful append.
    async fn on_update(&self) -> Result<(), Error>;

    /// Runs the close protocol. Calling it again is a no-op.
    async fn close(&self);

    fn state(&self) -> FlusherState;

    fn is_terminated(&self) -> bool {
        self.state() == FlusherState::Terminated
    }
}

/// Builds the flusher selected by `config.mode`.
pub fn start(
    config: &FlusherConfig,
    buffer: Arc<Buffer>,
    ingester: Arc<dyn Ingester>,
) -> Result<Box<dyn Flusher>, Error> {
    Ok(match config.mode {
        FlushMode::Async => Box::new(AsyncFlusher::new(config, buffer, ingester)?),
        FlushMode::Sync => Box::new(SyncFlusher::new(config, buffer, ingester)),
    })
}
