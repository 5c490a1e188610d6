// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Payload transmission with retry and backoff.
//!
//! A [`Transport`] makes exactly one attempt. The [`Sender`] wraps it with
//! the retry policy:
//!
//! ```text
//!   send(key, payload)
//!        │
//!        v
//!   ┌───────────┐   ok
//!   │  attempt  │ ───────> done
//!   └─────┬─────┘
//!         │ error
//!         v
//!   retryable and attempts < retry_max ?
//!     yes: sleep(backoff), attempt again
//!     no:  report to the error handler, return SendFailed
//! ```

mod error_handler;
mod http;
mod retry;

pub use error_handler::{ErrorHandler, FailureKind, SendFailure};
pub use http::HttpTransport;
pub use retry::RetryPolicy;

use crate::error::{Error, TransportError};
use async_trait::async_trait;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// One transmission attempt to a destination.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, key: &str, payload: &[u8]) -> Result<(), TransportError>;

    fn name(&self) -> &str {
        "transport"
    }
}

#[derive(Clone)]
pub struct Sender {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl Sender {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        error_handler: Option<Arc<dyn ErrorHandler>>,
    ) -> Self {
        Sender {
            transport,
            policy,
            error_handler,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends `payload` under `key`, retrying transient failures.
    ///
    /// Once the sender gives up, the failure goes to the error handler and
    /// [`Error::SendFailed`] is returned so the caller keeps the data.
    pub async fn send(&self, key: &str, payload: &[u8]) -> Result<(), Error> {
        let mut attempts: u32 = 0;

        loop {
            let time = Instant::now();
            attempts += 1;
            let result = self.transport.send(key, payload).await;
            let elapsed = time.elapsed();

            let cause = match result {
                Ok(()) => {
                    debug!(
                        "SHIPPER | Sent {} ({} bytes) via {} in {} ms, attempt {}",
                        key,
                        payload.len(),
                        self.transport.name(),
                        elapsed.as_millis(),
                        attempts
                    );
                    return Ok(());
                }
                Err(e) => e,
            };

            let retryable = cause.is_retryable();
            if !retryable || attempts >= self.policy.retry_max {
                error!(
                    "SHIPPER | Failed to send {} after {} ms and {} attempts: {}",
                    key,
                    elapsed.as_millis(),
                    attempts,
                    cause
                );
                let failure = SendFailure {
                    kind: if retryable {
                        FailureKind::RetriesExhausted
                    } else {
                        FailureKind::Permanent
                    },
                    key: key.to_string(),
                    payload_len: payload.len(),
                    attempts,
                    cause: cause.clone(),
                };
                self.report(&failure);
                return Err(Error::SendFailed {
                    key: key.to_string(),
                    attempts,
                    cause,
                });
            }

            let delay = self.policy.delay(attempts - 1);
            warn!(
                "SHIPPER | Attempt {} for {} failed: {}, retrying in {} ms",
                attempts,
                key,
                cause,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn report(&self, failure: &SendFailure) {
        let Some(handler) = &self.error_handler else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| handler.handle(failure))).is_err() {
            error!("SHIPPER | Error handler panicked while handling: {}", failure);
        }
    }
}
