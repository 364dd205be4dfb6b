use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;

/// Result of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    /// Done, stop retrying
    Ready(T),
    /// Not there yet, wait `interval`
    Pending,
    /// Transient failure, wait `error_backoff`
    Failed(String),
    /// Failure that another attempt cannot fix
    Fatal(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Ready { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: Option<String> },
}

impl<T> RetryOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            RetryOutcome::Ready { value, .. } => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }
}

/// Bounded retry loop shared by the balance pollers, the LP burn wait and
/// disposal submission.
///
/// Every attempt consumes budget whether it came back pending or failed, so the
/// total suspension is at most `max_attempts * max(interval, error_backoff)`.
/// No sleep follows the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub error_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration, error_backoff: Duration) -> Self {
        Self { max_attempts, interval, error_backoff }
    }

    /// Same delay after pending and failed attempts
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self::new(max_attempts, interval, interval)
    }

    pub fn max_total_wait(&self) -> Duration {
        self.interval.max(self.error_backoff) * self.max_attempts.saturating_sub(1)
    }

    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        self.run_with_wake(label, None, op).await
    }

    /// Like `run`, but a notification on `wake` cuts the current wait short
    pub async fn run_with_wake<T, F, Fut>(&self, label: &str, wake: Option<&Notify>, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            let delay = match op(attempt).await {
                Attempt::Ready(value) => {
                    debug!("✅ [{}] ready after {} attempt(s)", label, attempt);
                    return RetryOutcome::Ready { value, attempts: attempt };
                }
                Attempt::Pending => {
                    debug!("⏳ [{}] attempt {}/{} pending", label, attempt, self.max_attempts);
                    self.interval
                }
                Attempt::Failed(error) => {
                    warn!("⚠️ [{}] attempt {}/{} failed: {}", label, attempt, self.max_attempts, error);
                    last_error = Some(error);
                    self.error_backoff
                }
                Attempt::Fatal(error) => {
                    warn!("❌ [{}] attempt {}/{} failed permanently: {}", label, attempt, self.max_attempts, error);
                    return RetryOutcome::Exhausted { attempts: attempt, last_error: Some(error) };
                }
            };

            if attempt == self.max_attempts {
                break;
            }

            match wake {
                Some(notify) => {
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = notify.notified() => {
                            debug!("🔔 [{}] woken early", label);
                        }
                    }
                }
                None => sleep(delay).await,
            }
        }

        RetryOutcome::Exhausted { attempts: self.max_attempts, last_error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(11, Duration::from_millis(1000), Duration::from_millis(500))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_kth_attempt() {
        let outcome = policy()
            .run("test", |attempt| async move {
                if attempt == 4 { Attempt::Ready(attempt) } else { Attempt::Pending }
            })
            .await;
        assert_eq!(outcome, RetryOutcome::Ready { value: 4, attempts: 4 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_budget_and_bounds_wall_clock() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = Arc::clone(&calls);
        let outcome: RetryOutcome<()> = policy()
            .run("test", move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Attempt::Pending
                }
            })
            .await;

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 11, last_error: None });
        assert_eq!(calls.load(Ordering::SeqCst), 11);
        // ten sleeps, none after the last attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_millis(10_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_share_the_budget_and_back_off_faster() {
        let start = Instant::now();
        let outcome: RetryOutcome<()> = RetryPolicy::new(3, Duration::from_millis(1000), Duration::from_millis(500))
            .run("test", |attempt| async move { Attempt::Failed(format!("rpc down #{}", attempt)) })
            .await;

        assert_eq!(
            outcome,
            RetryOutcome::Exhausted { attempts: 3, last_error: Some("rpc down #3".to_string()) }
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000) && elapsed < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_stops_immediately() {
        let outcome: RetryOutcome<()> = policy()
            .run("test", |_| async { Attempt::Fatal("invalid params".to_string()) })
            .await;
        assert_eq!(
            outcome,
            RetryOutcome::Exhausted { attempts: 1, last_error: Some("invalid params".to_string()) }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_cuts_the_wait_short() {
        let notify = Notify::new();
        notify.notify_one();
        let start = Instant::now();

        let outcome = RetryPolicy::fixed(3, Duration::from_secs(60))
            .run_with_wake("test", Some(&notify), |attempt| async move {
                if attempt == 2 { Attempt::Ready(()) } else { Attempt::Pending }
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Ready { attempts: 2, .. }));
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
