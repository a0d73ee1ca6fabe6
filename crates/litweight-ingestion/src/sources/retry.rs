//! Bounded exponential backoff with jitter for literature API calls.

use std::future::Future;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use litweight_common::{LitweightError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_initial_secs")]
    pub initial_secs: f64,
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: f64,
    /// Give up (with `Unavailable`) once this much time has been spent retrying.
    #[serde(default = "default_max_elapsed_secs")]
    pub max_elapsed_secs: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_randomization")]
    pub randomization_factor: f64,
}

fn default_initial_secs()      -> f64 { 2.0 }
fn default_max_interval_secs() -> f64 { 60.0 }
fn default_max_elapsed_secs()  -> f64 { 600.0 }
fn default_multiplier()        -> f64 { 2.0 }
fn default_randomization()     -> f64 { 0.5 }

impl Default for RetryPolicy {
    /// Record fetches and author searches.
    fn default() -> Self {
        Self {
            initial_secs: default_initial_secs(),
            max_interval_secs: default_max_interval_secs(),
            max_elapsed_secs: default_max_elapsed_secs(),
            multiplier: default_multiplier(),
            randomization_factor: default_randomization(),
        }
    }
}

impl RetryPolicy {
    /// Forward-citation lookups, which NCBI throttles harder.
    pub fn citations() -> Self {
        Self {
            initial_secs: 5.0,
            max_interval_secs: 120.0,
            max_elapsed_secs: 1200.0,
            ..Self::default()
        }
    }

    /// Durations must be finite and non-negative, and the multiplier at least 1.
    pub fn validate(&self, name: &str) -> Result<()> {
        let durations = [
            ("initial_secs", self.initial_secs),
            ("max_interval_secs", self.max_interval_secs),
            ("max_elapsed_secs", self.max_elapsed_secs),
        ];
        for (field, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(LitweightError::Config(format!(
                    "retry.{}.{} must be a finite number of seconds, got {}",
                    name, field, value
                )));
            }
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(LitweightError::Config(format!(
                "retry.{}.multiplier must be at least 1, got {}",
                name, self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(LitweightError::Config(format!(
                "retry.{}.randomization_factor must be within [0, 1], got {}",
                name, self.randomization_factor
            )));
        }
        Ok(())
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs_f64(self.initial_secs.max(0.0)))
            .with_max_interval(Duration::from_secs_f64(self.max_interval_secs.max(0.0)))
            .with_max_elapsed_time(Some(Duration::from_secs_f64(self.max_elapsed_secs.max(0.0))))
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.randomization_factor)
            .build()
    }
}

/// Run `call` until it succeeds, fails permanently, or the policy's time budget
/// runs out. Transient failures that exhaust the budget become `Unavailable`.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let result = backoff::future::retry_notify(
        policy.backoff(),
        || {
            let attempt = call();
            async move {
                attempt.await.map_err(|e| {
                    if e.is_transient() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        },
        |err: LitweightError, delay: Duration| {
            warn!(operation, error = %err, retry_in = ?delay, "Literature API call failed; retrying");
        },
    )
    .await;

    result.map_err(|e| {
        if e.is_transient() {
            LitweightError::Unavailable {
                operation: operation.to_string(),
                reason: e.to_string(),
            }
        } else {
            e
        }
    })
}
