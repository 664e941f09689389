//! Retry for write transactions that lose a lock race
//!
//! Under WAL a transaction that read before another writer committed cannot
//! upgrade to a write lock; SQLite reports `SQLITE_BUSY` at once instead of
//! waiting out the busy timeout. Rerunning the whole transaction starts from
//! a fresh snapshot, which is how concurrent judges get last-write-wins.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::{Result, ScoringError};

/// Total time a save keeps retrying before the lock error is returned
pub const MAX_LOCK_WAIT_MS: u64 = 10_000;

const INITIAL_BACKOFF_MS: u64 = 5;
const MAX_BACKOFF_MS: u64 = 250;

/// True for `SQLITE_BUSY` / `SQLITE_LOCKED` and their extended codes
pub(crate) fn is_lock_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let primary = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);
            matches!(primary, Some(5) | Some(6))
                || db_err.message().contains("database is locked")
        }
        _ => false,
    }
}

/// Run `operation` until it succeeds, fails with a non-lock error, or
/// `max_wait_ms` has elapsed
///
/// The operation must be a complete transaction so a retry never sees a
/// half-applied attempt.
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let max_wait = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if err.is_lock_contention() => {
                let elapsed = start.elapsed();
                if elapsed >= max_wait {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        "Database still locked, giving up"
                    );
                    return Err(err);
                }

                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    "Database locked, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
            Err(err) => return Err(err),
        }
    }
}
