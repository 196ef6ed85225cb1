//! Bounded retry for transiently rate-limited requests.
//!
//! The forum rejects bursts with `[[error:too-many-<what>]]` messages that
//! mean "wait and try again". This module is the single retry policy shared
//! by the channel request wrapper and by higher-level send paths (chat
//! message sends report exhaustion the same way): 5 attempts total with a
//! fixed caller-supplied delay between them. Any other error fails
//! immediately, and exhausting the cap fails with the last attempt's error.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::RequestResult;

/// Total attempts made for a rate-limited operation (first try included).
pub const RATE_LIMIT_ATTEMPTS: u32 = 5;

/// Runs `attempt` until it succeeds, fails with a non-rate-limit error, or
/// exhausts [`RATE_LIMIT_ATTEMPTS`] attempts.
pub async fn retry_rate_limited<T, F, Fut>(delay: Duration, mut attempt: F) -> RequestResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RequestResult<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() && tries < RATE_LIMIT_ATTEMPTS => {
                debug!(
                    attempt = tries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Rate limited, retrying"
                );
                tokio::time::sleep(delay).await;
                tries += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    const DELAY: Duration = Duration::from_millis(1);

    fn rate_limited() -> RequestError {
        RequestError::remote("[[error:too-many-x]]")
    }

    #[tokio::test]
    async fn resolves_without_retry_on_success() {
        let calls = AtomicU32::new(0);
        let result = retry_rate_limited(DELAY, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Value::from(42)) }
        })
        .await;
        assert_eq!(result.unwrap(), Value::from(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_rate_limited(DELAY, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(rate_limited())
                } else {
                    Ok(Value::from("ok"))
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_five_attempts() {
        let calls = AtomicU32::new(0);
        let result: RequestResult<Value> = retry_rate_limited(DELAY, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "[[error:too-many-x]]");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn other_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let result: RequestResult<Value> = retry_rate_limited(DELAY, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RequestError::remote("bad bad!")) }
        })
        .await;
        assert_eq!(result.unwrap_err().to_string(), "bad bad!");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
