// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{Flusher, FlusherState, StateCell};
use crate::buffer::Buffer;
use crate::config::FlusherConfig;
use crate::error::Error;
use crate::ingester::Ingester;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

/// Flushes inline, in the task that appended.
///
/// Each update runs a periodic flush once `flush_interval` has passed since
/// the previous one.
pub struct SyncFlusher {
    buffer: Arc<Buffer>,
    ingester: Arc<dyn Ingester>,
    flush_interval: Duration,
    last_flush: Mutex<Instant>,
    state: StateCell,
}

impl SyncFlusher {
    #[must_use]
    pub fn new(config: &FlusherConfig, buffer: Arc<Buffer>, ingester: Arc<dyn Ingester>) -> Self {
        SyncFlusher {
            buffer,
            ingester,
            flush_interval: config.flush_interval,
            last_flush: Mutex::new(Instant::now()),
            state: StateCell::new(),
        }
    }

    /// Marks a flush as started now if the interval has elapsed.
    fn claim_periodic_flush(&self) -> bool {
        let mut last_flush = self
            .last_flush
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if last_flush.elapsed() < self.flush_interval {
            return false;
        }
        *last_flush = Instant::now();
        true
    }

    fn reset_timer(&self) {
        *self
            .last_flush
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Instant::now();
    }
}

#[async_trait]
impl Flusher for SyncFlusher {
    async fn flush(&self) -> Result<(), Error> {
        if self.state.get() != FlusherState::Running {
            return Err(Error::Closed);
        }
        self.reset_timer();
        self.buffer.flush(self.ingester.as_ref(), true).await?;
        Ok(())
    }

    async fn on_update(&self) -> Result<(), Error> {
        if self.state.get() != FlusherState::Running || !self.claim_periodic_flush() {
            return Ok(());
        }
        self.buffer.flush(self.ingester.as_ref(), false).await?;
        Ok(())
    }

    async fn close(&self) {
        if !self
            .state
            .transition(FlusherState::Running, FlusherState::Closing)
        {
            return;
        }
        if let Err(e) = self.buffer.flush(self.ingester.as_ref(), true).await {
            error!("SHIPPER | Final flush failed: {}", e);
        }
        self.buffer.close();
        self.state.set(FlusherState::Terminated);
        debug!("SHIPPER | Flusher closed");
    }

    fn state(&self) -> FlusherState {
        self.state.get()
    }
}
