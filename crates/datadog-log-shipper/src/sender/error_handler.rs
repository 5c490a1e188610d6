// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::TransportError;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Every attempt allowed by the retry policy failed.
    RetriesExhausted,
    /// The destination refused the payload; retrying would not help.
    Permanent,
}

/// A send that will not be retried by the sender.
///
/// The chunk behind it stays buffered and is offered again on the next flush.
#[derive(Clone, Debug)]
pub struct SendFailure {
    pub kind: FailureKind,
    pub key: String,
    pub payload_len: usize,
    pub attempts: u32,
    pub cause: TransportError,
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} sending {} ({} bytes) after {} attempts: {}",
            self.kind, self.key, self.payload_len, self.attempts, self.cause
        )
    }
}

/// Sink for terminal send failures, invoked from the flushing task.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, failure: &SendFailure);
}

impl<F> ErrorHandler for F
where
    F: Fn(&SendFailure) + Send + Sync,
{
    fn handle(&self, failure: &SendFailure) {
        self(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_closure_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let handler: Arc<dyn ErrorHandler> = Arc::new(move |failure: &SendFailure| {
            assert_eq!(failure.attempts, 2);
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        handler.handle(&SendFailure {
            kind: FailureKind::RetriesExhausted,
            key: "k".to_string(),
            payload_len: 3,
            attempts: 2,
            cause: TransportError::Network("down".into()),
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_display() {
        let failure = SendFailure {
            kind: FailureKind::Permanent,
            key: "logs/1.jsonl.gz".to_string(),
            payload_len: 42,
            attempts: 1,
            cause: TransportError::from_status(403, "forbidden".into()),
        };
        let text = failure.to_string();
        assert!(text.starts_with("Permanent sending logs/1.jsonl.gz (42 bytes)"));
        assert!(text.contains("403"));
    }
}
