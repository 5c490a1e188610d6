// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock transports and error handlers for testing

use async_trait::async_trait;
use datadog_log_shipper::{ErrorHandler, SendFailure, Transport, TransportError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Stores every object it receives
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryTransport {
    objects: Mutex<Vec<(String, Vec<u8>)>>,
}

#[allow(dead_code)]
impl MemoryTransport {
    pub fn objects(&self) -> Vec<(String, Vec<u8>)> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.objects().into_iter().map(|(_, payload)| payload).collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((key.to_string(), payload.to_vec()));
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Fails the first `failures` attempts, then stores objects like
/// [`MemoryTransport`]. Records when each attempt happened.
#[allow(dead_code)]
pub struct FlakyTransport {
    failures: u32,
    error: TransportError,
    attempts: AtomicU32,
    attempt_times: Mutex<Vec<Instant>>,
    pub inner: MemoryTransport,
}

#[allow(dead_code)]
impl FlakyTransport {
    pub fn new(failures: u32, error: TransportError) -> Self {
        FlakyTransport {
            failures,
            error,
            attempts: AtomicU32::new(0),
            attempt_times: Mutex::new(Vec::new()),
            inner: MemoryTransport::default(),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Milliseconds waited between consecutive attempts.
    pub fn waits_ms(&self) -> Vec<u128> {
        let times = self
            .attempt_times
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        times
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_millis())
            .collect()
    }
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn send(&self, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.attempt_times
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Instant::now());
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(self.error.clone());
        }
        self.inner.send(key, payload).await
    }
}

/// Never answers
#[allow(dead_code)]
pub struct HangingTransport;

#[async_trait]
impl Transport for HangingTransport {
    async fn send(&self, _key: &str, _payload: &[u8]) -> Result<(), TransportError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Error handler collecting every failure it is given
#[allow(dead_code)]
pub fn collecting_handler() -> (Arc<dyn ErrorHandler>, Arc<Mutex<Vec<SendFailure>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let handler: Arc<dyn ErrorHandler> = Arc::new(move |failure: &SendFailure| {
        seen_clone
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(failure.clone());
    });
    (handler, seen)
}
