//! Readiness polling for asynchronously rendered text layers.
//!
//! The renderer may not have produced any fragments yet when a search starts.
//! [`await_fragments`] re-reads the surface on a fixed backoff schedule until
//! it sees a non-empty fragment list, the schedule runs out, or the caller
//! cancels.

use crate::config::PollSchedule;
use crate::interface::{FragmentSurface, TextFragment};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Text layer still empty after {attempts} attempts")]
    NotReady { attempts: u32 },
    #[error("Poll cancelled")]
    Cancelled,
}

pub type PollResult<T> = Result<T, PollError>;

/// Wait for `surface` to yield fragments.
///
/// Attempt `n` sleeps `schedule.delay_before(n)` and then reads the surface.
/// Cancellation is observed during every sleep and before every read.
pub async fn await_fragments<S: FragmentSurface + ?Sized>(
    surface: &S,
    schedule: &PollSchedule,
    token: &CancellationToken,
) -> PollResult<Vec<TextFragment>> {
    for attempt in 1..=schedule.attempts {
        let delay = schedule.delay_before(attempt);
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PollError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        if token.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        let fragments = surface.fragments();
        if !fragments.is_empty() {
            tracing::debug!(attempt, fragments = fragments.len(), "text_layer_ready");
            return Ok(fragments);
        }
        tracing::trace!(attempt, delay_ms = delay.as_millis() as u64, "text_layer_empty");
    }

    tracing::debug!(attempts = schedule.attempts, "text_layer_not_ready");
    Err(PollError::NotReady { attempts: schedule.attempts })
}
