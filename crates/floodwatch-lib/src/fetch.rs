//! Deadline-bounded downstream calls.
//!
//! Every outbound request goes through [`with_timeout`]. Call sites that must
//! not fail use [`or_fallback`], which logs the failure and substitutes a
//! value so the handler can still answer.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Run `future` with a deadline, mapping expiry to [`Error::Timeout`].
pub async fn with_timeout<T, F>(service: &str, timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            service: service.to_string(),
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Run `future` with a deadline and resolve any failure to `fallback(&err)`.
pub async fn or_fallback<T, F, G>(service: &str, timeout: Duration, future: F, fallback: G) -> T
where
    F: Future<Output = Result<T>>,
    G: FnOnce(&Error) -> T,
{
    match with_timeout(service, timeout, future).await {
        Ok(value) => value,
        Err(err) => {
            warn!(service = service, error = %err, "downstream call failed, using fallback");
            fallback(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_fast_results() {
        let value = with_timeout("test", Duration::from_millis(100), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let err = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        match err {
            Error::Timeout { service, after_ms } => {
                assert_eq!(service, "slow");
                assert_eq!(after_ms, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_receives_the_error() {
        let value = or_fallback(
            "broken",
            Duration::from_millis(100),
            async { Err::<String, _>(Error::upstream("broken", "HTTP 502")) },
            |err| format!("fallback: {err}"),
        )
        .await;
        assert_eq!(value, "fallback: broken request failed: HTTP 502");
    }

    #[tokio::test]
    async fn fallback_covers_expired_deadlines() {
        let value = or_fallback(
            "slow",
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            },
            |err| match err {
                Error::Timeout { .. } => -1,
                _ => 0,
            },
        )
        .await;
        assert_eq!(value, -1);
    }
}
