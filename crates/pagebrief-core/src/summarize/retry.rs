use std::future::Future;

use tokio::time::{sleep, Duration};

use crate::error::BackendError;

/// Classified failure of a single backend attempt.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// The backend signaled throttling; retried with backoff.
    RateLimited(String),
    /// Generic backend or network failure; retried with backoff.
    Transient(String),
    /// Not worth retrying; surfaced immediately.
    Fatal(String),
}

impl AttemptError {
    fn message(&self) -> &str {
        match self {
            AttemptError::RateLimited(m) | AttemptError::Transient(m) | AttemptError::Fatal(m) => m,
        }
    }
}

/// Delay before retrying the zero-based `attempt`: base * 2^attempt
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt)
}

/// Run `operation` up to `max_attempts` times with exponential backoff
/// between retryable failures. The terminal error keeps the classification
/// of the last failure and the number of attempts made; fatal failures
/// short-circuit without further attempts.
pub(crate) async fn run_with_backoff<F, Fut, T>(
    backend: &'static str,
    max_attempts: u32,
    base_delay: Duration,
    operation: F,
) -> std::result::Result<T, BackendError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let mut last = None;

    for attempt in 0..max_attempts {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(message)) => {
                tracing::error!("{} attempt {} failed fatally: {}", backend, attempt + 1, message);
                return Err(BackendError::Api {
                    attempts: attempt + 1,
                    message,
                });
            }
            Err(err) => {
                tracing::warn!(
                    "{} attempt {}/{} failed: {}",
                    backend,
                    attempt + 1,
                    max_attempts,
                    err.message()
                );

                if attempt + 1 < max_attempts {
                    let delay = backoff_delay(base_delay, attempt);
                    tracing::debug!("{} retrying in {:?}", backend, delay);
                    sleep(delay).await;
                }
                last = Some(err);
            }
        }
    }

    Err(match last.expect("at least one attempt was made") {
        AttemptError::RateLimited(message) => BackendError::RateLimited {
            attempts: max_attempts,
            message,
        },
        AttemptError::Transient(message) | AttemptError::Fatal(message) => BackendError::Api {
            attempts: max_attempts,
            message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[test]
    fn test_backoff_delay_doubles() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttling_exhausts_all_attempts() {
        let attempt_times = Mutex::new(Vec::new());

        let result: Result<(), _> =
            run_with_backoff("test", 3, Duration::from_secs(1), |_attempt| {
                attempt_times.lock().unwrap().push(Instant::now());
                async { Err(AttemptError::RateLimited("throttled".to_string())) }
            })
            .await;

        let times = attempt_times.lock().unwrap();
        assert_eq!(times.len(), 3);
        // Delay sequence is base, 2*base
        assert_eq!(times[1] - times[0], Duration::from_secs(1));
        assert_eq!(times[2] - times[1], Duration::from_secs(2));

        match result {
            Err(BackendError::RateLimited { attempts: 3, message }) => {
                assert_eq!(message, "throttled");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_surface_as_api_error() {
        let result: Result<(), _> =
            run_with_backoff("test", 2, Duration::from_secs(1), |_attempt| async {
                Err(AttemptError::Transient("connection reset".to_string()))
            })
            .await;

        assert!(matches!(
            result,
            Err(BackendError::Api { attempts: 2, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failure() {
        let calls = AtomicU32::new(0);

        let result = run_with_backoff("test", 3, Duration::from_secs(1), |_attempt| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AttemptError::Transient("flaky".to_string()))
                } else {
                    Ok("summary".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "summary");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_failure_short_circuits() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = run_with_backoff("test", 5, Duration::from_secs(1), |_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::Fatal("bad request".to_string())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(10));
        assert!(matches!(result, Err(BackendError::Api { attempts: 1, .. })));
    }
}
