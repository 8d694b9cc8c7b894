//! Consecutive-failure streak

use crate::job::{JobHistoryWindow, JobStatus};

/// Count failed jobs from the most recent one backward.
///
/// Cancelled jobs and jobs still in flight are skipped without breaking the
/// streak. Any other final status ends it.
#[must_use]
pub fn consecutive_failures(window: &JobHistoryWindow) -> u32 {
    let mut count = 0;
    for status in window.iter() {
        match status {
            JobStatus::Failed => count += 1,
            s if s.is_terminal() && s != JobStatus::Cancelled => break,
            _ => {}
        }
    }
    count
}
