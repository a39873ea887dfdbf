use crate::errors::ErrorKind;
use crate::{ASCOMError, ASCOMResult};
use std::future::Future;
use std::time::Duration;

/// The one error kind treated as "not ready yet": `InvalidOperation`.
pub fn is_not_ready(err: &ASCOMError) -> bool {
    err.kind() == ErrorKind::InvalidOperation
}

/// Run `operation`, retrying after `retry_delay` while it fails with a transient error.
///
/// At most `max_retries` retries are made, so the operation is attempted at most
/// `max_retries + 1` times. Non-transient errors, and the last transient one,
/// are returned unchanged.
pub async fn read_with_retry<T, F, Fut>(
    mut operation: F,
    is_transient: impl Fn(&ASCOMError) -> bool + Send,
    max_retries: u32,
    retry_delay: Duration,
) -> ASCOMResult<T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ASCOMResult<T>> + Send,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Err(err) if retries < max_retries && is_transient(&err) => {
                retries += 1;
                tracing::debug!(%err, retries, max_retries, "Transient failure, retrying");
                tokio::time::sleep(retry_delay).await;
            }
            result => return result,
        }
    }
}
