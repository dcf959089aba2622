//! Every remote call goes through [`CallContext`]: it is bounded by a
//! per-attempt timeout, aborted by cancellation and retried with exponential
//! backoff while the provider reports a retryable error.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use backon::Retryable;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{RetryPolicy, TraceConfig};
use crate::providers::{Page, ProviderError};

/// Upper bound on pages drained from one listing.
pub const MAX_PAGES: usize = 10_000;

#[derive(Debug, Clone)]
pub struct CallContext {
    cancel: CancellationToken,
    timeout: Duration,
    retry: RetryPolicy,
}

impl CallContext {
    pub fn new(config: &TraceConfig, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            timeout: config.call_timeout,
            retry: config.retry,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs `f` until it succeeds, fails permanently or retries run out.
    pub async fn call<T, F, Fut>(&self, operation: &'static str, mut f: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        (move || self.attempt(operation, f()))
            .retry(self.retry.backoff())
            .when(|e| e.is_retryable() && !self.cancel.is_cancelled())
            .notify(|e, delay| {
                warn!(
                    operation,
                    delay = ?delay,
                    error = %e,
                    "Retryable provider error, backing off..."
                );
            })
            .await
    }

    /// Calls `fetch` with successive continuation tokens until the provider
    /// reports no more pages.
    pub async fn drain_pages<T, F, Fut>(
        &self,
        operation: &'static str,
        mut fetch: F,
    ) -> Result<Vec<T>, ProviderError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ProviderError>>,
    {
        let mut all_results = Vec::new();
        let mut token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        for _ in 0..MAX_PAGES {
            let page = self.call(operation, || fetch(token.clone())).await?;
            all_results.extend(page.items);

            match page.next_token {
                None => return Ok(all_results),
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    return Err(ProviderError::Pagination {
                        operation,
                        message: format!("token '{next}' returned twice"),
                    });
                }
                Some(next) => token = Some(next),
            }
        }

        Err(ProviderError::Pagination {
            operation,
            message: format!("more than {MAX_PAGES} pages"),
        })
    }

    async fn attempt<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T, ProviderError>
    where
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ProviderError::Cancelled { operation }),
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(ProviderError::Timeout {
                    operation,
                    after: self.timeout,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context(timeout: Duration, retries: usize) -> CallContext {
        let config = TraceConfig {
            call_timeout: timeout,
            retry: RetryPolicy::immediate(retries),
            ..Default::default()
        };
        CallContext::new(&config, CancellationToken::new())
    }

    fn throttled() -> ProviderError {
        ProviderError::Throttled {
            operation: "Test",
            message: "Rate exceeded".to_string(),
        }
    }

    #[tokio::test]
    async fn test_call_retries_throttling_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let ctx = context(Duration::from_secs(5), 3);

        let result = ctx
            .call("Test", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(throttled())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_call_gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let ctx = context(Duration::from_secs(5), 2);

        let result: Result<(), _> = ctx
            .call("Test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(throttled())
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Throttled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_call_does_not_retry_service_errors() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let ctx = context(Duration::from_secs(5), 5);

        let result: Result<(), _> = ctx
            .call("Test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Service {
                    operation: "Test",
                    code: "AccessDenied".to_string(),
                    message: "nope".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Service { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let ctx = context(Duration::from_millis(20), 0);

        let result: Result<(), _> = ctx
            .call("Slow", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        match result {
            Err(ProviderError::Timeout { operation, after }) => {
                assert_eq!(operation, "Slow");
                assert_eq!(after, Duration::from_millis(20));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_call_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let ctx = context(Duration::from_secs(5), 5);
        ctx.cancellation().cancel();

        let result: Result<(), _> = ctx
            .call("Test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Cancelled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drain_pages_follows_tokens() {
        let ctx = context(Duration::from_secs(5), 0);

        let result = ctx
            .drain_pages("List", |token| async move {
                Ok(match token.as_deref() {
                    None => Page::new(vec![1, 2], Some("p2".to_string())),
                    Some("p2") => Page::new(vec![3], Some("p3".to_string())),
                    _ => Page::last(vec![4]),
                })
            })
            .await
            .unwrap();

        assert_eq!(result, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_drain_pages_detects_repeated_token() {
        let ctx = context(Duration::from_secs(5), 0);

        let result: Result<Vec<u8>, _> = ctx
            .drain_pages("List", |_token| async move {
                Ok(Page::new(vec![1], Some("same".to_string())))
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Pagination { .. })));
    }

    #[tokio::test]
    async fn test_drain_pages_surfaces_page_failure() {
        let ctx = context(Duration::from_secs(5), 0);

        let result: Result<Vec<u8>, _> = ctx
            .drain_pages("List", |token| async move {
                match token {
                    None => Ok(Page::new(vec![1], Some("p2".to_string()))),
                    Some(_) => Err(ProviderError::Service {
                        operation: "List",
                        code: "InternalFailure".to_string(),
                        message: "boom".to_string(),
                    }),
                }
            })
            .await;

        assert!(result.is_err());
    }
}
