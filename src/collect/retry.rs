//! Retry with exponential backoff and a per-attempt timeout for upstream requests.
//!
//! Requests run through a [`seatbelt`] retry layer. Every attempt, including retries, first
//! passes through the source's [`RateLimiter`], so retrying can never push a source past its
//! request budget, and only then starts its timeout. Only `ProviderResult::Error` outcomes and
//! timeouts are retried; `NotFound` is an answer, not a failure.

use super::ProviderResult;
use super::rate_limiter::RateLimiter;
use core::time::Duration;
use layered::{Execute, Service, Stack};
use ohno::app_err;
use seatbelt::retry::{Backoff, Retry};
use seatbelt::timeout::Timeout;
use seatbelt::{RecoveryInfo, ResilienceContext};
use std::sync::Arc;
use tick::Clock;

const LOG_TARGET: &str = "     retry";

/// Timeout used by [`RetryPolicy::none`] and the default policy.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of one attempt; `Err` means the attempt timed out.
type Attempt<T> = crate::Result<ProviderResult<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retry attempts (on top of the original request).
    pub max_retry_attempts: u32,

    /// Base delay for exponential backoff between retries.
    pub base_delay: Duration,

    /// Limit on a single attempt, not counting the wait for the rate limiter.
    pub timeout: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retry_attempts: u32, base_delay: Duration, timeout: Duration) -> Self {
        Self {
            max_retry_attempts,
            base_delay,
            timeout,
        }
    }

    /// A policy that makes a single attempt.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Run `op` on `input` until it yields something other than an error or the attempts run out.
    ///
    /// `what` names the operation in logs and timeout errors.
    pub async fn run<In, T, F, Fut>(&self, what: &'static str, limiter: &Arc<RateLimiter>, input: In, op: F) -> ProviderResult<T>
    where
        In: Clone + Send + Sync + 'static,
        T: Send + 'static,
        Fut: Future<Output = ProviderResult<T>> + Send,
        F: Fn(In) -> Fut + Send + Sync + Clone + 'static,
    {
        let clock = limiter.clock().clone();
        let context = ResilienceContext::new(&clock).name(what);
        let timeout = self.timeout;
        let limiter = Arc::clone(limiter);

        let service = (
            Retry::layer("retry", &context)
                .clone_input()
                .recovery_with(|result: &Attempt<T>, _| match result {
                    Ok(ProviderResult::Error(_)) | Err(_) => RecoveryInfo::retry(),
                    Ok(_) => RecoveryInfo::never(),
                })
                .max_retry_attempts(self.max_retry_attempts)
                .base_delay(self.base_delay)
                .backoff(Backoff::Exponential)
                .on_retry(move |_output, args| {
                    log::debug!(
                        target: LOG_TARGET,
                        "retrying {what} (attempt {}, delay {}ms)",
                        args.attempt().index() + 1,
                        args.retry_delay().as_millis(),
                    );
                }),
            Execute::new(move |input: In| {
                let limiter = Arc::clone(&limiter);
                let op = op.clone();
                async move {
                    limiter.acquire().await;
                    attempt(what, limiter.clock(), timeout, input, op).await
                }
            }),
        )
            .into_service();

        match service.execute(input).await {
            Ok(outcome) => outcome,
            Err(e) => ProviderResult::Error(Arc::new(e)),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1), DEFAULT_REQUEST_TIMEOUT)
    }
}

/// A single attempt of `op`, bounded by `timeout`.
async fn attempt<In, T, F, Fut>(what: &'static str, clock: &Clock, timeout: Duration, input: In, op: F) -> Attempt<T>
where
    In: Clone + Send + Sync + 'static,
    T: Send + 'static,
    Fut: Future<Output = ProviderResult<T>> + Send,
    F: Fn(In) -> Fut + Send + Sync + Clone + 'static,
{
    let context = ResilienceContext::new(clock).name(what);

    let service = (
        Timeout::layer("timeout", &context)
            .timeout_error(move |_| app_err!("{what} timed out after {}s", timeout.as_secs()))
            .timeout(timeout),
        Execute::new(move |input: In| {
            let op = op.clone();
            async move { Ok(op(input).await) }
        }),
    )
        .into_service();

    service.execute(input).await
}
