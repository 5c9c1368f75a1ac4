// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Enforcement Dispatcher
//!
//! Issues planned tag writes through a [`TagWriter`] with:
//! - a semaphore bounding writes in flight,
//! - a timeout on every call,
//! - exponential backoff with jitter, retrying throttled calls only,
//! - a cancellation token checked before each call.
//!
//! A failed resource never stops the others. The returned report means that
//! every attempt has finished, not that every write succeeded.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** The only concurrent part of the engine

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::enforcement::{EnforcementAction, TagWriteError, TagWriter};
use crate::domain::events::{EngineEvent, EventSink};
use crate::domain::manager_config::EnforcementConfig;
use crate::domain::resource::ResourceKey;

/// Backoff policy for throttled writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&EnforcementConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &EnforcementConfig) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_backoff_ms: settings.base_backoff_ms,
            max_backoff_ms: settings.max_backoff_ms,
            jitter: settings.jitter,
        }
    }

    /// Backoff ceiling before the retry following `attempt` (0-indexed).
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.min(30);
        self.base_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms)
    }

    /// Delay to sleep; with jitter it falls in the upper half of the ceiling.
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let ceiling = self.backoff_ms(attempt);
        if !self.jitter || ceiling == 0 {
            return ceiling;
        }
        let floor = ceiling / 2;
        rand::rng().random_range(floor..=ceiling)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub succeeded: Vec<ResourceKey>,
    pub failed: Vec<(ResourceKey, String)>,
    pub cancelled: Vec<ResourceKey>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }
}

enum Outcome {
    Succeeded,
    Failed(String),
    Cancelled,
}

pub struct EnforcementDispatcher {
    writer: Arc<dyn TagWriter>,
    limiter: Arc<Semaphore>,
    call_timeout: Duration,
    retry: RetryPolicy,
    events: Arc<dyn EventSink>,
}

impl EnforcementDispatcher {
    pub fn new(
        writer: Arc<dyn TagWriter>,
        settings: &EnforcementConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            writer,
            limiter: Arc::new(Semaphore::new(settings.max_in_flight.max(1))),
            call_timeout: Duration::from_secs(settings.call_timeout_seconds),
            retry: RetryPolicy::from_settings(settings),
            events,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub async fn dispatch(
        &self,
        actions: Vec<EnforcementAction>,
        cancel: CancellationToken,
    ) -> DispatchReport {
        info!(count = actions.len(), "Dispatching tag writes");

        let outcomes = join_all(actions.iter().map(|action| self.run_one(action, &cancel))).await;

        let mut report = DispatchReport::default();
        for (action, outcome) in actions.iter().zip(outcomes) {
            match outcome {
                Outcome::Succeeded => report.succeeded.push(action.key()),
                Outcome::Failed(error) => report.failed.push((action.key(), error)),
                Outcome::Cancelled => report.cancelled.push(action.key()),
            }
        }

        if !report.cancelled.is_empty() {
            self.events.emit(EngineEvent::DispatchCancelled {
                remaining: report.cancelled.len(),
            });
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled.len(),
            "Dispatch finished"
        );
        report
    }

    async fn run_one(&self, action: &EnforcementAction, cancel: &CancellationToken) -> Outcome {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Cancelled,
            permit = self.limiter.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return Outcome::Cancelled,
            },
        };

        let resource = action.key();
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }

            match self.write_once(action).await {
                Ok(()) => {
                    self.events.emit(EngineEvent::WriteSucceeded {
                        resource,
                        tag_count: action.tags_to_write.len(),
                    });
                    return Outcome::Succeeded;
                }
                Err(error) if error.is_retryable() && attempt < self.retry.max_retries => {
                    let delay_ms = self.retry.delay_ms(attempt);
                    attempt += 1;
                    self.events.emit(EngineEvent::WriteRetried {
                        resource: resource.clone(),
                        attempt,
                        delay_ms,
                        error: error.to_string(),
                    });
                    tokio::select! {
                        _ = cancel.cancelled() => return Outcome::Cancelled,
                        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                    }
                }
                Err(error) => {
                    let message = error.to_string();
                    self.events.emit(EngineEvent::WriteFailed {
                        resource,
                        error: message.clone(),
                    });
                    return Outcome::Failed(message);
                }
            }
        }
    }

    async fn write_once(&self, action: &EnforcementAction) -> Result<(), TagWriteError> {
        match tokio::time::timeout(self.call_timeout, self.writer.write_tags(action)).await {
            Ok(result) => result,
            Err(_) => Err(TagWriteError::Timeout(
                u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_backoff_ms: 100,
            max_backoff_ms: 1_000,
            jitter: false,
        };
        assert_eq!(policy.delay_ms(0), 100);
        assert_eq!(policy.delay_ms(1), 200);
        assert_eq!(policy.delay_ms(3), 800);
        assert_eq!(policy.delay_ms(4), 1_000);
        assert_eq!(policy.delay_ms(40), 1_000);
    }

    #[test]
    fn test_jitter_stays_in_upper_half() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_backoff_ms: 400,
            max_backoff_ms: 10_000,
            jitter: true,
        };
        for _ in 0..50 {
            let delay = policy.delay_ms(1);
            assert!((400..=800).contains(&delay));
        }
    }
}
