//! Per-file retry policy with exponential backoff and jitter
//!
//! Each file moves through a small state machine:
//! `Pending -> Uploading -> Succeeded | Uploading (retry) | Failed`.
//! [`RetryPolicy::transition`] is pure, so the policy can be tested without
//! any storage backend.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::time::Duration;

use crate::config::RetryConfig;

/// Upload state of a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    /// `attempt` is 1-based
    Uploading { attempt: u32, attempts_remaining: u32 },
    Succeeded { attempts: u32 },
    Failed { attempts: u32 },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded { .. } | TaskState::Failed { .. })
    }
}

/// Result of one transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// Decides whether a failed attempt is retried and how long to wait first
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// First attempt of a pending task
    pub fn begin(&self) -> TaskState {
        TaskState::Uploading {
            attempt: 1,
            attempts_remaining: self.config.retry_count,
        }
    }

    /// Next state after an attempt finished with `outcome`
    ///
    /// `Pending` starts the first attempt; terminal states are returned as is.
    pub fn transition(&self, state: TaskState, outcome: AttemptOutcome) -> TaskState {
        match state {
            TaskState::Pending => self.begin(),
            TaskState::Uploading {
                attempt,
                attempts_remaining,
            } => match outcome {
                AttemptOutcome::Success => TaskState::Succeeded { attempts: attempt },
                AttemptOutcome::Failure if attempts_remaining > 0 => TaskState::Uploading {
                    attempt: attempt + 1,
                    attempts_remaining: attempts_remaining - 1,
                },
                AttemptOutcome::Failure => TaskState::Failed { attempts: attempt },
            },
            terminal => terminal,
        }
    }

    /// Delay before attempt `attempt + 1`, given that `attempt` just failed
    pub fn backoff(&self, attempt: u32) -> Duration {
        retry_delay(&self.config, attempt)
    }
}

/// `initial * 2^(attempt - 1)` plus up to as much again in jitter
///
/// The total never exceeds `max_backoff_ms`. A zero initial delay disables
/// waiting altogether.
fn retry_delay(config: &RetryConfig, attempt: u32) -> Duration {
    if config.initial_backoff_ms == 0 {
        return Duration::ZERO;
    }

    let doublings = attempt.saturating_sub(1);
    let step_ms = config
        .initial_backoff_ms
        .saturating_mul(2u64.saturating_pow(doublings));
    let delay_ms = step_ms
        .saturating_add(jitter_below(step_ms, attempt))
        .min(config.max_backoff_ms);

    Duration::from_millis(delay_ms)
}

/// Value in `0..bound`, seeded from a fresh `RandomState` on every call
fn jitter_below(bound: u64, salt: u32) -> u64 {
    if bound == 0 {
        return 0;
    }
    RandomState::new().hash_one(salt) % bound
}
