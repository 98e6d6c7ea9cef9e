use super::error::ServiceError;
use anyhow::anyhow;
use std::time::Duration;
use tracing::warn;

/// Runs a blocking store call on the blocking pool, giving up after `timeout`.
///
/// On timeout the caller gets `ServiceError::Timeout` right away while the
/// blocking call itself runs to completion in the background.
pub async fn run_store_call<T, F>(timeout: Duration, call: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ServiceError::Internal(anyhow!(
            "Store call panicked or was cancelled: {}",
            join_err
        ))),
        Err(_) => {
            warn!("Store call did not complete within {:?}", timeout);
            Err(ServiceError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_call_result() {
        let result = run_store_call(Duration::from_secs(1), || Ok(42)).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn times_out_slow_calls() {
        let result = run_store_call(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));
    }
}
