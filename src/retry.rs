use std::{fmt::Display, future::Future, time::Duration};

use tokio_retry::{strategy::FixedInterval, Retry};

use crate::config::Config;

/// Fixed-count retry with a constant pause. Every failure is treated the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.retry_delay,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum RetryOutcome<T, E> {
    Succeeded { attempts: u32, value: T },
    Exhausted { attempts: u32, last_error: E },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Calls `action` (with the 1-based attempt number) until it succeeds or the
/// policy runs out of attempts.
pub async fn run<T, E, F, Fut>(policy: RetryPolicy, mut action: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max = policy.max_attempts.max(1);
    let strategy = FixedInterval::new(policy.delay).take(max as usize - 1);
    let mut attempts = 0;

    let result = Retry::start(strategy, || {
        attempts += 1;
        let n = attempts;
        if n > 1 {
            println!("Retry {}/{}", n, max);
        }

        let fut = action(n);
        async move {
            let result = fut.await;
            if let Err(e) = &result {
                println!("Attempt {}/{} failed: {}", n, max, e);
                if n < max {
                    println!(
                        "Waiting {} seconds before retrying...",
                        policy.delay.as_secs_f32()
                    );
                }
            }
            result
        }
    })
    .await;

    match result {
        Ok(value) => RetryOutcome::Succeeded { attempts, value },
        Err(last_error) => RetryOutcome::Exhausted {
            attempts,
            last_error,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }

    async fn fail_times(policy: RetryPolicy, failures: u32) -> (RetryOutcome<u32, String>, u32) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome = run(policy, |n| {
            let counter = counter.clone();
            async move {
                let seen = counter.fetch_add(1, Ordering::SeqCst);
                if seen < failures {
                    Err(format!("failure {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        (outcome, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn invocations_are_capped() {
        for failures in 0..6 {
            let (outcome, calls) = fail_times(policy(), failures).await;
            assert_eq!(calls, (1 + failures).min(3), "failures={failures}");
            assert_eq!(outcome.attempts(), calls);
            assert_eq!(
                matches!(outcome, RetryOutcome::Succeeded { .. }),
                failures < 3
            );
        }
    }

    #[tokio::test]
    async fn exhausted_keeps_last_error() {
        let (outcome, _) = fail_times(policy(), 10).await;
        assert_eq!(
            outcome,
            RetryOutcome::Exhausted {
                attempts: 3,
                last_error: "failure 3".to_string()
            }
        );
    }

    #[tokio::test]
    async fn success_reports_attempt_number() {
        let (outcome, _) = fail_times(policy(), 1).await;
        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                attempts: 2,
                value: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_failures_only() {
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(3),
        };

        let start = tokio::time::Instant::now();
        let (outcome, calls) = fail_times(policy, 10).await;
        assert_eq!(calls, 3);
        assert!(matches!(outcome, RetryOutcome::Exhausted { .. }));
        // Two pauses: none before the first attempt, none after the last.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(9), "{elapsed:?}");
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        let (_, calls) = fail_times(policy, 10).await;
        assert_eq!(calls, 1);
    }
}
