// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants;
use crate::error::Error;
use std::time::Duration;

/// Capped exponential backoff.
///
/// The wait before attempt `n + 2` (the `n`-th retry, zero based) is
/// `min(retry_interval * retry_factor^n, max_retry_interval)`. No jitter is
/// applied, so the schedule is deterministic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub retry_max: u32,
    pub retry_interval: Duration,
    pub max_retry_interval: Duration,
    pub retry_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retry_max: constants::DEFAULT_RETRY_MAX,
            retry_interval: constants::DEFAULT_RETRY_INTERVAL,
            max_retry_interval: constants::DEFAULT_MAX_RETRY_INTERVAL,
            retry_factor: constants::DEFAULT_RETRY_FACTOR,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let scaled = self.retry_interval.as_nanos() as f64 * self.retry_factor.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_retry_interval.as_nanos() as f64 {
            return self.max_retry_interval;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_nanos(scaled as u64)
    }

    /// The waits between consecutive attempts: `retry_max - 1` of them.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.retry_max.saturating_sub(1)).map(|retry| self.delay(retry))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.retry_max == 0 {
            return Err(Error::InvalidConfig(
                "retry_max must be at least 1".to_string(),
            ));
        }
        if !self.retry_factor.is_finite() || self.retry_factor < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "retry_factor must be >= 1.0, got {}",
                self.retry_factor
            )));
        }
        if self.max_retry_interval < self.retry_interval {
            return Err(Error::InvalidConfig(format!(
                "max_retry_interval ({:?}) must not be smaller than retry_interval ({:?})",
                self.max_retry_interval, self.retry_interval
            )));
        }
        Ok(())
    }
}
