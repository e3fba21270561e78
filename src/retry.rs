use crate::error::StoreError;
use crossbeam_utils::Backoff;
use std::thread;
use std::time::Duration;

const SLEEP_AFTER_BACKOFF: Duration = Duration::from_millis(1);

/// Run `attempt` until it returns anything but a transient error.
///
/// Each attempt must be a complete transaction: it is re-run from the start
/// on [`StoreError::Busy`] and [`StoreError::UniqueConstraintViolated`].
/// Every other error is returned on first occurrence. There is no retry
/// limit.
pub fn with_retry<T>(
    operation: &'static str,
    mut attempt: impl FnMut() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let backoff = Backoff::new();
    let mut retries: u64 = 0;

    loop {
        match attempt() {
            Ok(v) => {
                if retries > 0 {
                    tracing::debug!(operation, retries, "store operation succeeded after retry");
                }
                return Ok(v);
            }
            Err(e) if e.is_transient() => {
                retries += 1;
                tracing::trace!(operation, retries, error = %e, "transient store error, retrying");
                if backoff.is_completed() {
                    thread::sleep(SLEEP_AFTER_BACKOFF);
                } else {
                    backoff.snooze();
                }
            }
            Err(e) => return Err(e),
        }
    }
}
