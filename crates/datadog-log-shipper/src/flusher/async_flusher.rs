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
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Flushes from a dedicated background task.
///
/// The task waits up to `flush_interval` for a force signal. A timeout runs
/// a periodic flush, a signal runs a forced one. Flush failures are logged
/// and the loop keeps going.
///
/// [`Flusher::close`] enqueues a last signal, stops the loop and waits up to
/// `wait_after_close` for the task. A task still running after that is
/// aborted, abandoning whatever it was sending.
pub struct AsyncFlusher {
    buffer: Arc<Buffer>,
    signal_tx: mpsc::UnboundedSender<()>,
    cancel_token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    state: Arc<StateCell>,
    wait_after_close: Duration,
}

impl AsyncFlusher {
    /// Spawns the worker on the current Tokio runtime.
    pub fn new(
        config: &FlusherConfig,
        buffer: Arc<Buffer>,
        ingester: Arc<dyn Ingester>,
    ) -> Result<Self, Error> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let state = Arc::new(StateCell::new());

        let worker = Worker {
            buffer: Arc::clone(&buffer),
            ingester,
            signal_rx,
            cancel_token: cancel_token.clone(),
            state: Arc::clone(&state),
            flush_interval: config.flush_interval,
        };
        let handle = runtime.spawn(worker.run());
        debug!(
            "SHIPPER | Flush worker started, interval {} ms",
            config.flush_interval.as_millis()
        );

        Ok(AsyncFlusher {
            buffer,
            signal_tx,
            cancel_token,
            worker: Mutex::new(Some(handle)),
            state,
            wait_after_close: config.wait_after_close,
        })
    }

    fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl Flusher for AsyncFlusher {
    async fn flush(&self) -> Result<(), Error> {
        if self.state.get() != FlusherState::Running {
            return Err(Error::Closed);
        }
        self.signal_tx.send(()).map_err(|_| Error::Closed)
    }

    async fn on_update(&self) -> Result<(), Error> {
        // Full chunks are picked up by the next periodic flush.
        Ok(())
    }

    async fn close(&self) {
        if !self
            .state
            .transition(FlusherState::Running, FlusherState::Closing)
        {
            return;
        }
        let started = Instant::now();

        if self.signal_tx.send(()).is_err() {
            debug!("SHIPPER | Flush worker already gone on close");
        }
        self.cancel_token.cancel();

        if let Some(mut handle) = self.take_worker() {
            match timeout(self.wait_after_close, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("SHIPPER | Flush worker failed: {}", e),
                Err(_) => {
                    warn!(
                        "SHIPPER | Flush worker still running after {} ms, cancelling it",
                        self.wait_after_close.as_millis()
                    );
                    handle.abort();
                    if let Err(e) = handle.await {
                        if !e.is_cancelled() {
                            error!("SHIPPER | Flush worker failed: {}", e);
                        }
                    }
                }
            }
        }

        // No-op when the worker got as far as releasing the buffer itself.
        self.buffer.close();
        self.state.set(FlusherState::Terminated);
        debug!(
            "SHIPPER | Flusher closed in {} ms",
            started.elapsed().as_millis()
        );
    }

    fn state(&self) -> FlusherState {
        self.state.get()
    }
}

impl Drop for AsyncFlusher {
    fn drop(&mut self) {
        if self.state.get() == FlusherState::Running {
            warn!("SHIPPER | Flusher dropped without close, the worker finishes in the background");
            self.cancel_token.cancel();
        }
    }
}

struct Worker {
    buffer: Arc<Buffer>,
    ingester: Arc<dyn Ingester>,
    signal_rx: mpsc::UnboundedReceiver<()>,
    cancel_token: CancellationToken,
    state: Arc<StateCell>,
    flush_interval: Duration,
}

impl Worker {
    async fn run(mut self) {
        let mut last_forced_ok = false;

        while !self.cancel_token.is_cancelled() {
            let force = match timeout(self.flush_interval, self.signal_rx.recv()).await {
                Ok(Some(())) => {
                    // Signals queued meanwhile are served by this flush.
                    while self.signal_rx.try_recv().is_ok() {}
                    true
                }
                Ok(None) => break,
                Err(_) => false,
            };

            let result = self.buffer.flush(self.ingester.as_ref(), force).await;
            last_forced_ok = force && result.is_ok();
            if let Err(e) = result {
                error!("SHIPPER | Flush failed, force={}: {}", force, e);
            }
        }

        // Anything appended after the last successful forced flush, or a loop
        // that ended on a periodic flush, still needs shipping.
        if !last_forced_ok || self.buffer.buffered_bytes() > 0 {
            if let Err(e) = self.buffer.flush(self.ingester.as_ref(), true).await {
                error!("SHIPPER | Final flush failed: {}", e);
            }
        }

        self.buffer.close();
        self.state.set(FlusherState::Terminated);
        debug!("SHIPPER | Flush worker stopped");
    }
}
