//! Retry with exponential back-off and jitter for catalog requests.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, timeouts, 429, 5xx). Everything else
//! is returned immediately: a validation or uniqueness error will not change
//! on a second attempt.
//!
//! A non-idempotent request (a create) may already have been applied when a
//! timeout or 5xx comes back, so it is only retried when the catalog cannot
//! have seen it: a refused connection or a 429.

use std::future::Future;
use std::time::Duration;

use crate::error::CatalogError;

/// Longest single back-off sleep.
const MAX_DELAY_MS: u64 = 30_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection refused or reset.
/// - [`CatalogError::RateLimited`]: HTTP 429.
/// - HTTP 5xx responses.
///
/// **Not retriable:** conflicts, 404s, other 4xx, malformed bodies, and the
/// pagination guard.
///
/// With `idempotent == false` only connection failures and 429 qualify.
pub(crate) fn is_retriable(err: &CatalogError, idempotent: bool) -> bool {
    if !idempotent {
        return match err {
            CatalogError::Http(e) => e.is_connect(),
            CatalogError::RateLimited { .. } => true,
            _ => false,
        };
    }
    match err {
        CatalogError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.is_request()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        CatalogError::RateLimited { .. } => true,
        CatalogError::UnexpectedStatus { status, .. } => *status >= 500,
        CatalogError::Deserialize { .. }
        | CatalogError::NotFound { .. }
        | CatalogError::Conflict { .. }
        | CatalogError::PaginationLimit { .. }
        | CatalogError::InvalidBaseUrl { .. } => false,
    }
}

/// Back-off before retry number `attempt` (1-based), before jitter.
pub(crate) fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32) -> u64 {
    backoff_base_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(10))
        .min(MAX_DELAY_MS)
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Attempt | Sleep before next attempt      |
/// |---------|--------------------------------|
/// | 1       | 500 ms × 2⁰ ± 25 % jitter      |
/// | 2       | 500 ms × 2¹ ± 25 % jitter      |
/// | 3       | 500 ms × 2² ± 25 % jitter      |
///
/// Delay is capped at 30 s. Non-retriable errors are returned immediately.
/// `idempotent` narrows what counts as retriable; see [`is_retriable`].
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    idempotent: bool,
    mut operation: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err, idempotent) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = backoff_delay_ms(backoff_base_ms, attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient catalog error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> CatalogError {
        CatalogError::UnexpectedStatus {
            status: 503,
            url: "http://catalog.test/api/brands".to_owned(),
            message: "unavailable".to_owned(),
        }
    }

    fn rate_limited() -> CatalogError {
        CatalogError::RateLimited {
            collection: "models".to_owned(),
            retry_after_secs: 1,
        }
    }

    #[test]
    fn conflict_is_not_retriable() {
        assert!(!is_retriable(
            &CatalogError::Conflict {
                collection: "brands".to_owned(),
                message: "This attribute must be unique".to_owned(),
            },
            true
        ));
    }

    #[test]
    fn client_error_is_not_retriable() {
        assert!(!is_retriable(
            &CatalogError::UnexpectedStatus {
                status: 400,
                url: "http://catalog.test/api/brands".to_owned(),
                message: "ValidationError".to_owned(),
            },
            true
        ));
    }

    #[test]
    fn server_error_and_rate_limit_are_retriable() {
        assert!(is_retriable(&server_error(), true));
        assert!(is_retriable(&rate_limited(), true));
    }

    #[test]
    fn create_is_only_retried_on_rate_limit() {
        assert!(!is_retriable(&server_error(), false));
        assert!(is_retriable(&rate_limited(), false));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 2), 1_000);
        assert_eq!(backoff_delay_ms(500, 3), 2_000);
        assert_eq!(backoff_delay_ms(500, 12), MAX_DELAY_MS);
        assert_eq!(backoff_delay_ms(0, 3), 0);
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, true, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, CatalogError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, true, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok::<u32, CatalogError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_last_error_after_exhausting_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, true, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, CatalogError>(server_error())
            }
        })
        .await;
        // max_retries=2 → 3 total attempts
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(CatalogError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn does_not_retry_conflict() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, true, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(CatalogError::Conflict {
                    collection: "brands".to_owned(),
                    message: "duplicate".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "conflicts must not be retried");
        assert!(matches!(result, Err(CatalogError::Conflict { .. })));
    }

    #[tokio::test]
    async fn non_idempotent_server_error_is_attempted_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, false, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, CatalogError>(server_error())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(CatalogError::UnexpectedStatus { status: 503, .. })
        ));
    }
}
