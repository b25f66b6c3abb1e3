//! Per-call deadlines for outbound backend calls.

use cortex_core::Result as CoreResult;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Result, RoutingError};

/// Awaits a backend call, failing with [`RoutingError::Timeout`] once `deadline` passes.
///
/// # Errors
///
/// Returns the call's own error, or `Timeout` when the deadline expires first.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T>
where
    F: Future<Output = CoreResult<T>>,
{
    match timeout(deadline, call).await {
        Ok(outcome) => outcome.map_err(RoutingError::from),
        Err(_) => Err(RoutingError::Timeout(deadline.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::Error as CoreError;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let slow = async {
            sleep(Duration::from_millis(200)).await;
            Ok::<_, CoreError>(1)
        };
        let outcome = with_deadline(Duration::from_millis(10), slow).await;
        assert!(matches!(outcome, Err(RoutingError::Timeout(10))));
    }

    #[tokio::test]
    async fn test_backend_error_is_wrapped() {
        let failing = async { Err::<u8, _>(CoreError::Provider("down".to_owned())) };
        let outcome = with_deadline(Duration::from_secs(1), failing).await;
        assert!(matches!(outcome, Err(RoutingError::Core(_))));
    }
}
