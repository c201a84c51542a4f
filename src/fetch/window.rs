//! Backward pagination cursor over a comment thread.
//!
//! The cursor starts at the end of the collection period with no sequence
//! bound. After each batch it moves down to the oldest posting time and the
//! lowest comment number seen, so the next window only returns older
//! comments.
//!
//! A window that returns comments but keeps none ends pagination only when
//! one of them predates the period. Otherwise the server is repeating
//! comments already collected, the cursor cannot move without skipping
//! comments, and the window counts as stalled.

use crate::nico::{WindowBatch, WindowFilter};

/// Consecutive windows without cursor movement before pagination is abandoned.
pub const MAX_STALLED_WINDOWS: u32 = 3;

/// Why pagination finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// The server returned no comments.
    EmptyBatch,
    /// Nothing was kept and at least one comment predates the period.
    ReachedStart,
    /// Comment number 1 has been collected.
    FirstComment,
}

/// What to do after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Request the next window.
    Continue,
    /// Pagination is complete.
    Done(Finish),
    /// The cursor has not moved for this many consecutive windows.
    Stalled(u32),
}

/// Cursor of the backward pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    upper_time_bound: i64,
    lower_sequence_bound: Option<i64>,
    stalled: u32,
}

impl PaginationWindow {
    /// Creates a cursor positioned at `end` (unix seconds).
    #[must_use]
    pub fn new(end: i64) -> Self {
        Self {
            upper_time_bound: end,
            lower_sequence_bound: None,
            stalled: 0,
        }
    }

    /// Oldest posting time seen so far (initially the period end).
    #[must_use]
    pub fn upper_time_bound(&self) -> i64 {
        self.upper_time_bound
    }

    /// Lowest comment number seen so far.
    #[must_use]
    pub fn lower_sequence_bound(&self) -> Option<i64> {
        self.lower_sequence_bound
    }

    /// `when` parameter of the next query.
    #[must_use]
    pub fn when(&self) -> i64 {
        self.upper_time_bound.saturating_add(1)
    }

    /// Filter for the next window within the period `[start, end]`.
    #[must_use]
    pub fn filter(&self, start: i64, end: i64) -> WindowFilter {
        WindowFilter {
            start,
            end,
            below_sequence: self.lower_sequence_bound,
        }
    }

    /// Moves the cursor past `batch`.
    pub fn advance(&mut self, batch: &WindowBatch) -> Step {
        let kept = &batch.kept;
        let (Some(oldest), Some(lowest)) = (
            kept.iter().map(|c| c.posted_at).min(),
            kept.iter().map(|c| c.sequence_no).min(),
        ) else {
            return self.advance_without_comments(batch);
        };

        self.upper_time_bound = self.upper_time_bound.min(oldest);
        self.lower_sequence_bound = Some(
            self.lower_sequence_bound
                .map_or(lowest, |bound| bound.min(lowest)),
        );
        self.stalled = 0;

        if lowest <= 1 {
            Step::Done(Finish::FirstComment)
        } else {
            Step::Continue
        }
    }

    fn advance_without_comments(&mut self, batch: &WindowBatch) -> Step {
        if batch.received == 0 {
            return Step::Done(Finish::EmptyBatch);
        }
        if batch.before_start > 0 {
            return Step::Done(Finish::ReachedStart);
        }
        self.stalled += 1;
        if self.stalled >= MAX_STALLED_WINDOWS {
            Step::Stalled(self.stalled)
        } else {
            Step::Continue
        }
    }
}
