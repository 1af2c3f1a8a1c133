use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use exam_core::model::QuestionId;

use crate::error::TrackerError;

/// Attributes wall-clock time to whichever question is currently on screen.
///
/// At most one interval is open at a time; the session controller closes the
/// interval on the question being left and opens one on the question being
/// entered as a single logical step. Accumulated durations only ever grow,
/// and a question never visited reports zero.
#[derive(Debug, Clone, Default)]
pub struct TimeTracker {
    accumulated: BTreeMap<QuestionId, Duration>,
    open: Option<(QuestionId, DateTime<Utc>)>,
}

impl TimeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts timing the given question.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::IntervalAlreadyOpen` if the previous interval
    /// was never closed.
    pub fn open_interval(
        &mut self,
        question_id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        if let Some((open, _)) = self.open {
            return Err(TrackerError::IntervalAlreadyOpen { open });
        }
        self.open = Some((question_id, now));
        Ok(())
    }

    /// Stops timing the open question, adding the elapsed time to its total.
    ///
    /// Negative elapsed time (clock skew) counts as zero rather than shrinking
    /// the accumulated total.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NoOpenInterval` if nothing is being timed.
    pub fn close_interval(&mut self, now: DateTime<Utc>) -> Result<(), TrackerError> {
        let Some((question_id, opened_at)) = self.open.take() else {
            return Err(TrackerError::NoOpenInterval);
        };
        let elapsed = (now - opened_at).max(Duration::zero());
        let total = self.accumulated.entry(question_id).or_insert(Duration::zero());
        *total += elapsed;
        Ok(())
    }

    /// Question currently being timed, if any.
    #[must_use]
    pub fn open_question(&self) -> Option<QuestionId> {
        self.open.map(|(id, _)| id)
    }

    /// Accumulated whole seconds for the given question (zero if never visited).
    #[must_use]
    pub fn seconds_for(&self, question_id: QuestionId) -> i64 {
        self.accumulated
            .get(&question_id)
            .map_or(0, |d| d.num_seconds())
    }

    /// Iterates over every question that has closed time recorded.
    pub fn recorded(&self) -> impl Iterator<Item = (QuestionId, i64)> + '_ {
        self.accumulated
            .iter()
            .map(|(id, duration)| (*id, duration.num_seconds()))
    }

    /// Sum of all accumulated time in seconds.
    #[must_use]
    pub fn total_seconds(&self) -> i64 {
        self.accumulated.values().map(Duration::num_seconds).sum()
    }
}
