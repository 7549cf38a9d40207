use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CacheError, CacheResult};

/// How long a lookup keeps re-reading the cache while its payload is still empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(2),
        }
    }
}

impl PollPolicy {
    /// Re-run `fetch` until `is_ready` accepts its value or the timeout elapses.
    ///
    /// Any error from `fetch` ends the loop immediately. On timeout the last
    /// fetched value is returned as-is. Cancelling `cancel` while waiting
    /// drops the pending timer and yields [`CacheError::Cancelled`].
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        is_ready: impl Fn(&T) -> bool,
        mut fetch: F,
    ) -> CacheResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        let started = Instant::now();
        let mut attempt = 1u32;

        loop {
            let value = fetch().await?;

            if is_ready(&value) {
                return Ok(value);
            }
            if started.elapsed() >= self.timeout {
                log::warn!(
                    "Poll: still empty after {} attempts ({:?}), giving up",
                    attempt,
                    started.elapsed()
                );
                return Ok(value);
            }

            log::debug!("Poll: attempt {} empty, retrying in {:?}", attempt, self.interval);
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Poll: cancelled after {} attempts", attempt);
                    return Err(CacheError::Cancelled);
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_ready_value() {
        let calls = Cell::new(0);
        let policy = PollPolicy::default();
        let started = Instant::now();

        let value = policy
            .run(&CancellationToken::new(), |v: &u32| *v > 0, || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Ok(if n >= 3 { n } else { 0 }) }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.get(), 3);
        assert!(started.elapsed() >= Duration::from_secs(4));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_timeout() {
        let calls = Cell::new(0);
        let policy = PollPolicy::default();
        let started = Instant::now();

        let value = policy
            .run(&CancellationToken::new(), |v: &String| !v.is_empty(), || {
                calls.set(calls.get() + 1);
                async { Ok(String::new()) }
            })
            .await
            .unwrap();

        assert!(value.is_empty());
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(62));
        assert_eq!(calls.get(), 31);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_aborts_without_waiting() {
        let calls = Cell::new(0);
        let started = Instant::now();

        let err = PollPolicy::default()
            .run(&CancellationToken::new(), |_: &()| false, || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(CacheError::NotFound("gone".to_string())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::NotFound(ref id) if id == "gone"));
        assert_eq!(calls.get(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_waiting() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });
        let started = Instant::now();

        let err = PollPolicy::default()
            .run(&cancel, |v: &u32| *v > 0, || async { Ok(0) })
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::Cancelled));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy() {
        let policy = PollPolicy {
            timeout: Duration::from_secs(3),
            interval: Duration::from_secs(1),
        };
        let calls = Cell::new(0);

        policy
            .run(&CancellationToken::new(), |_: &()| false, || {
                calls.set(calls.get() + 1);
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert_eq!(calls.get(), 4);
    }
}
