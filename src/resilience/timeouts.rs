//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every collaborator call with a deadline
//! - Map an elapsed deadline to the caller's own error type
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct variants (`ProbeError::Timeout`, ...)
//! - The timed-out future is dropped; no retry is attempted

use std::future::Future;
use std::time::Duration;

use tokio::time;

/// Run `fut` with a deadline of `secs` seconds.
///
/// On expiry the future is dropped and `on_timeout(secs)` is returned.
pub async fn with_deadline<F, T, E>(secs: u64, fut: F, on_timeout: impl FnOnce(u64) -> E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match time::timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(secs)),
    }
}
