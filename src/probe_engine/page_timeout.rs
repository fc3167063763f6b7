//! Timeout utilities for page operations
//!
//! Provides async timeout wrappers to prevent indefinite hangs during
//! page reset, navigation and other driver operations.

use std::future::Future;
use std::time::Duration;

use crate::driver::DriverError;

/// Wrap a driver operation with an explicit timeout
///
/// Returns the operation's own error unchanged, or `DriverError::Timeout`
/// naming `operation_name` when the deadline is reached first.
///
/// # Arguments
/// * `operation` - The async Future to execute with a timeout
/// * `timeout` - How long to wait
/// * `operation_name` - Human-readable name for error messages
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout {
            operation: operation_name.to_string(),
            after: timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let value = with_page_timeout(async { Ok(7) }, Duration::from_millis(50), "noop").await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_times_out_with_operation_name() {
        let result: Result<(), DriverError> = with_page_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Duration::from_millis(20),
            "Page reset",
        )
        .await;

        match result {
            Err(DriverError::Timeout { operation, after }) => {
                assert_eq!(operation, "Page reset");
                assert_eq!(after, Duration::from_millis(20));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
