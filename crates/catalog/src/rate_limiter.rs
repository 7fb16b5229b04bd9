//! Client-side rate limiting for catalog requests.
//!
//! Jikan allows a few requests per second and a bounded number per minute;
//! both limits are enforced before every request.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::time::sleep;

const WINDOW: Duration = Duration::from_secs(60);

/// Minimum spacing between requests plus a rolling one-minute window
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    max_per_minute: usize,
    /// Start times of requests in the current window, oldest first
    window: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_per_second: f64, max_per_minute: u32) -> Self {
        // Rates too small to express as an interval wait indefinitely
        let min_interval = if max_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / max_per_second).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };

        Self {
            min_interval,
            max_per_minute: max_per_minute.max(1) as usize,
            window: VecDeque::new(),
        }
    }

    /// Drop requests that left the window at `now`
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.window.front() {
            if now.duration_since(oldest) >= WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// How long the next request has to wait, measured at `now`
    fn delay_at(&mut self, now: Instant) -> Duration {
        self.prune(now);

        let minute_wait = if self.window.len() >= self.max_per_minute {
            self.window
                .front()
                .map(|&oldest| WINDOW.saturating_sub(now.duration_since(oldest)))
                .unwrap_or_default()
        } else {
            Duration::ZERO
        };

        let second_wait = self
            .window
            .back()
            .map(|&last| self.min_interval.saturating_sub(now.duration_since(last)))
            .unwrap_or_default();

        minute_wait.max(second_wait)
    }

    /// Wait until a request may be sent, then record it
    pub async fn acquire(&mut self) {
        let delay = self.delay_at(Instant::now());
        if !delay.is_zero() {
            tracing::debug!(wait_ms = delay.as_millis(), "Rate limit: waiting");
            sleep(delay).await;
        }

        self.window.push_back(Instant::now());
    }
}
