//! Rate-limit handling for OCR jobs
//!
//! The vendor signals overload with HTTP 429 and a `Retry-After` header in
//! seconds. We wait the advertised value plus one second and resend the same
//! request. Each job carries a [`JobBudget`] so neither 429 storms nor a job
//! that never leaves `running` can hold the run forever.

use crate::config::OcrConfig;
use crate::error::{Error, Result};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::header::HeaderValue;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Ceilings and delays for one recognition job
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 429 responses tolerated within one job
    pub max_rate_limit_retries: u32,
    /// Wall-clock ceiling for submit + poll
    pub max_job_duration: Duration,
    /// Idle delay between status polls
    pub poll_interval: Duration,
    /// Stand-in for a missing or unparsable `Retry-After`
    pub default_retry_after: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            max_rate_limit_retries: config.max_rate_limit_retries,
            max_job_duration: config.max_job_duration(),
            poll_interval: config.poll_interval(),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
        }
    }

    /// Wait before resending after a 429: the advertised delay plus one second
    pub fn rate_limit_wait(&self, retry_after: Option<&HeaderValue>) -> Duration {
        let advertised = retry_after
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_retry_after);
        advertised + Duration::from_secs(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&OcrConfig::default())
    }
}

/// Per-job retry bookkeeping
#[derive(Debug)]
pub struct JobBudget<'a> {
    policy: &'a RetryPolicy,
    started: Instant,
    rate_limited: u32,
}

impl<'a> JobBudget<'a> {
    pub fn start(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            started: Instant::now(),
            rate_limited: 0,
        }
    }

    /// Fail once the job has run past its wall-clock ceiling
    pub fn check_deadline(&self) -> Result<()> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.policy.max_job_duration {
            return Err(Error::Timeout(format!(
                "recognition job exceeded {}s",
                self.policy.max_job_duration.as_secs_f64()
            )));
        }
        Ok(())
    }

    /// Account for a 429 that asks us to wait `wait`
    pub fn record_rate_limit(&mut self, wait: Duration) -> Result<()> {
        self.rate_limited += 1;
        if self.rate_limited > self.policy.max_rate_limit_retries {
            return Err(Error::Timeout(format!(
                "still rate limited after {} retries",
                self.policy.max_rate_limit_retries
            )));
        }
        if self.started.elapsed() + wait > self.policy.max_job_duration {
            return Err(Error::Timeout(format!(
                "rate limit wait of {}s would exceed the {}s job ceiling",
                wait.as_secs(),
                self.policy.max_job_duration.as_secs_f64()
            )));
        }
        Ok(())
    }

    pub fn rate_limited(&self) -> u32 {
        self.rate_limited
    }
}

/// Client-side pacing of OCR requests
pub struct RequestPacer {
    limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl RequestPacer {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(nonzero!(1u32));
        Self {
            limiter: RateLimiter::direct(Quota::per_minute(rpm)),
        }
    }

    /// Wait until the next request is allowed
    pub async fn ready(&self) {
        self.limiter.until_ready().await;
        trace!("OCR request slot acquired");
    }
}
