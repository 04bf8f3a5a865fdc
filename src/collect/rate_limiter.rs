use core::time::Duration;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;
use tick::Clock;

const LOG_TARGET: &str = " ratelimit";

/// Admits at most `max_requests` calls in any rolling `window`.
///
/// Call [`RateLimiter::acquire`] before each request. When the budget for the current
/// window is spent, the caller is suspended on the limiter's clock until the oldest
/// admission falls out of the window. Only the last `max_requests` admission times are
/// remembered, so the limiter's state stays bounded however long it runs.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    max_requests: usize,
    window: Duration,
    clock: Clock,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window`. A budget of zero is treated as one.
    #[must_use]
    pub fn new(name: &'static str, max_requests: usize, window: Duration, clock: Clock) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            name,
            max_requests,
            window,
            clock,
            admitted: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub const fn max_requests(&self) -> usize {
        self.max_requests
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Requests admitted within the current window.
    #[must_use]
    pub fn admitted_in_window(&self) -> usize {
        let now = self.clock.instant();
        let admitted = self.admitted.lock().expect("lock not poisoned");
        admitted.iter().filter(|t| now.duration_since(**t) < self.window).count()
    }

    /// Wait until the budget admits one more request, then record it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let now = self.clock.instant();
                let mut admitted = self.admitted.lock().expect("lock not poisoned");

                while admitted.front().is_some_and(|t| now.duration_since(*t) >= self.window) {
                    let _ = admitted.pop_front();
                }

                if admitted.len() < self.max_requests {
                    admitted.push_back(now);
                    return;
                }

                // the budget frees up when the oldest admission leaves the window
                admitted
                    .front()
                    .map_or(Duration::ZERO, |oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            };

            log::debug!(target: LOG_TARGET, "{} budget of {} per {:?} exhausted, waiting {}ms", self.name, self.max_requests, self.window, wait.as_millis());
            self.clock.delay(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tick::ClockControl;

    fn auto_advancing() -> Clock {
        ClockControl::new().auto_advance_timers(true).to_clock()
    }

    #[tokio::test]
    async fn admits_budget_without_waiting() {
        let clock = auto_advancing();
        let start = clock.instant();
        let limiter = RateLimiter::new("test", 3, Duration::from_secs(60), clock.clone());

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(clock.instant() - start, Duration::ZERO);
        assert_eq!(limiter.admitted_in_window(), 3);
    }

    #[tokio::test]
    async fn suspends_until_window_rolls() {
        let clock = auto_advancing();
        let start = clock.instant();
        let limiter = RateLimiter::new("test", 2, Duration::from_secs(60), clock.clone());

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert_eq!(clock.instant() - start, Duration::from_secs(60));
        assert_eq!(limiter.admitted_in_window(), 1);
    }

    #[tokio::test]
    async fn window_is_rolling() {
        let control = ClockControl::new().auto_advance_timers(true);
        let clock = control.to_clock();
        let start = clock.instant();
        let limiter = RateLimiter::new("test", 2, Duration::from_secs(60), clock.clone());

        limiter.acquire().await;
        control.advance(Duration::from_secs(30));
        limiter.acquire().await;

        // the first admission expires at t=60, not a full window after the second
        limiter.acquire().await;
        assert_eq!(clock.instant() - start, Duration::from_secs(60));

        // the second admission expires at t=90
        limiter.acquire().await;
        assert_eq!(clock.instant() - start, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn never_exceeds_budget_in_any_window() {
        let control = ClockControl::new().auto_advance_timers(true);
        let clock = control.to_clock();
        let start = clock.instant();
        let limiter = RateLimiter::new("test", 120, Duration::from_secs(60), clock.clone());
        let mut admissions = Vec::new();

        for _ in 0..500 {
            limiter.acquire().await;
            admissions.push(clock.instant() - start);
            control.advance(Duration::from_millis(100));
        }

        for (i, first) in admissions.iter().enumerate() {
            let in_window = admissions[i..].iter().take_while(|t| **t - *first < Duration::from_secs(60)).count();
            assert!(in_window <= 120, "{in_window} admissions in one window");
        }
    }

    #[test]
    fn zero_budget_is_clamped() {
        let limiter = RateLimiter::new("test", 0, Duration::from_secs(60), ClockControl::new().to_clock());
        assert_eq!(limiter.max_requests(), 1);
    }

    #[tokio::test]
    async fn tokio_clock_admits_immediately() {
        let limiter = RateLimiter::new("test", 5, Duration::from_secs(60), Clock::new_tokio());
        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
