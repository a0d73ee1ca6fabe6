//! Request budget for the Entrez API.
//!
//! NCBI allows a fixed number of requests per rolling window per caller. The
//! budget blocks callers until a request slot is free; it never drops calls.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use litweight_common::{LitweightError, Result};

pub struct RequestBudget {
    limiter: DefaultDirectRateLimiter,
}

impl RequestBudget {
    pub fn new(max_calls: u32, window: Duration) -> Result<Self> {
        let quota = window_quota(max_calls, window)?;
        Ok(Self { limiter: RateLimiter::direct(quota) })
    }

    /// Wait until a request slot is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

/// GCRA admits `burst + window / period` cells in any window, so half the
/// budget goes to the burst and the other half to the refill rate.
fn window_quota(max_calls: u32, window: Duration) -> Result<Quota> {
    if max_calls < 2 {
        return Err(LitweightError::Config(format!(
            "request budget needs at least 2 calls per window, got {}",
            max_calls
        )));
    }
    let burst = max_calls / 2;
    let refill = max_calls - burst;
    let period = window / refill;

    let quota = Quota::with_period(period).ok_or_else(|| {
        LitweightError::Config("request budget window must be longer than zero".to_string())
    })?;
    let burst = NonZeroU32::new(burst)
        .ok_or_else(|| LitweightError::Config("request burst must be non-zero".to_string()))?;
    Ok(quota.allow_burst(burst))
}
