use std::future::Future;
use std::time::{Duration, Instant};

use tracing::Instrument;

/// Default upper bound for a single tracker API call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Performs a single attempt of an asynchronous operation, bounded by `timeout`.
///
/// The operation is not retried. The duration of the attempt is logged using tracing.
pub async fn perform_with_timeout<T, Fut>(
    operation_name: &str,
    timeout: Duration,
    operation: Fut,
) -> anyhow::Result<T>
where
    Fut: Future<Output = anyhow::Result<T>>,
{
    let span = tracing::trace_span!("Tracker op", operation = operation_name);
    let start = Instant::now();
    span.in_scope(|| {
        tracing::trace!("Starting");
    });

    let result = tokio::time::timeout(timeout, operation)
        .instrument(span.clone())
        .await;
    let duration = start.elapsed();

    match result {
        Ok(result) => {
            span.in_scope(|| {
                tracing::trace!(
                    duration = format!("{:.2}ms", duration.as_secs_f64() * 1000.0),
                    success = result.is_ok(),
                    "Completed"
                );
            });
            result
        }
        Err(_) => {
            span.in_scope(|| {
                tracing::trace!(
                    duration = format!("{:.2}ms", duration.as_secs_f64() * 1000.0),
                    "Timeouted"
                );
            });
            Err(anyhow::anyhow!(
                "Operation `{operation_name}` timed out after {}s",
                timeout.as_secs_f64()
            ))
        }
    }
}
