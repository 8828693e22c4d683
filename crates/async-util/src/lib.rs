use std::time::Duration;

use futures::Future;

/// Runs `op` until it succeeds or has been attempted `times` times, sleeping
/// for `spacing` between attempts. Returns the last result.
pub async fn retry_async<F: FnMut() -> Fut, Fut: Future<Output = Result<T, E>>, T, E>(
    times: usize,
    spacing: Option<Duration>,
    mut op: F,
) -> Result<T, E> {
    let mut result = op().await;
    let mut tries = 1;

    while tries < times && result.is_err() {
        if let Some(spacing) = spacing {
            tokio::time::sleep(spacing).await;
        }

        result = op().await;
        tries += 1;
    }

    result
}
