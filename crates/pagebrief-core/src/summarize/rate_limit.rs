use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Sliding-window limiter for outbound requests: at most `limit` admissions
/// within the trailing `window`. Process-wide, shared by all callers of the
/// primary backend.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `limit` and `window` must be non-zero; configuration validation
    /// rejects anything else before a limiter is built.
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a slot is free in the trailing window, then admit the call.
    /// The sleep happens with the lock released so other callers can queue;
    /// admission order follows the fair FIFO queueing of the mutex.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();

                while admitted
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    admitted.pop_front();
                }

                if admitted.len() < self.limit {
                    admitted.push_back(now);
                    return;
                }

                // Full window: the oldest stamp ages out first.
                let oldest = *admitted.front().expect("window is full, front exists");
                let wait = self.window.saturating_sub(now.duration_since(oldest));
                tracing::debug!("Rate limit reached, waiting {:?} before next request", wait);
                wait
            };

            sleep(wait).await;
        }
    }
}
