use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use exam_core::model::{AnswerMap, AnswerRecord, OptionLetter, Question, QuestionId};

use super::progress::SessionProgress;
use crate::error::SessionError;
use crate::time_tracker::TimeTracker;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────

/// Lifecycle of a test-taking session. Transitions are forward-only:
/// `NotStarted → InProgress → Submitted → Analyzed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Submitted,
    Analyzed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────

/// In-memory state machine for one timed practice exam.
///
/// Owns navigation, answer capture and the per-question time attribution;
/// the caller owns the value and its lifetime, there is no ambient shared
/// state. Timestamps come in from the services-layer clock so behavior is
/// deterministic under test.
pub struct ExamSession {
    questions: Vec<Question>,
    current: usize,
    selections: BTreeMap<QuestionId, OptionLetter>,
    tracker: TimeTracker,
    status: SessionStatus,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Creates a session over the given bank in the `NotStarted` state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the bank has no questions.
    pub fn new(questions: Vec<Question>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self {
            questions,
            current: 0,
            selections: BTreeMap::new(),
            tracker: TimeTracker::new(),
            status: SessionStatus::NotStarted,
            started_at: None,
            submitted_at: None,
        })
    }

    /// Starts the exam: records the start timestamp and opens the timing
    /// interval on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` when called more than once.
    pub fn begin(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.tracker.open_interval(self.questions[0].id(), now)?;
        self.started_at = Some(now);
        self.status = SessionStatus::InProgress;
        Ok(())
    }

    /// Records (or overwrites) the selection for the current question.
    ///
    /// Does not advance; the last write wins on repeated calls.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error unless the session is `InProgress`.
    pub fn select_answer(&mut self, option: OptionLetter) -> Result<(), SessionError> {
        self.require_in_progress()?;
        let qid = self.questions[self.current].id();
        self.selections.insert(qid, option);
        Ok(())
    }

    /// Moves to the next question. Past the last question this is a no-op,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error unless the session is `InProgress`.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require_in_progress()?;
        let target = (self.current + 1).min(self.questions.len() - 1);
        self.move_to(target, now)
    }

    /// Moves to the previous question. Before the first question this is a
    /// no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error unless the session is `InProgress`.
    pub fn retreat(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require_in_progress()?;
        let target = self.current.saturating_sub(1);
        self.move_to(target, now)
    }

    // Close-then-open is one logical step: either both intervals move or the
    // session is left untouched with the old interval still open.
    fn move_to(&mut self, target: usize, now: DateTime<Utc>) -> Result<(), SessionError> {
        if target == self.current {
            return Ok(());
        }
        self.tracker.close_interval(now)?;
        self.tracker.open_interval(self.questions[target].id(), now)?;
        self.current = target;
        Ok(())
    }

    /// Finalizes the session: closes the open interval and freezes all state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` on a second call; the session
    /// itself stays `Submitted`.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::NotStarted => return Err(SessionError::NotStarted),
            SessionStatus::Submitted | SessionStatus::Analyzed => {
                return Err(SessionError::AlreadySubmitted);
            }
            SessionStatus::InProgress => {}
        }
        self.tracker.close_interval(now)?;
        self.submitted_at = Some(now);
        self.status = SessionStatus::Submitted;
        Ok(())
    }

    /// Marks the terminal transition once score and report have been derived.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` before submit and
    /// `SessionError::AlreadyAnalyzed` on a second call.
    pub fn mark_analyzed(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Submitted => {
                self.status = SessionStatus::Analyzed;
                Ok(())
            }
            SessionStatus::Analyzed => Err(SessionError::AlreadyAnalyzed),
            SessionStatus::NotStarted | SessionStatus::InProgress => {
                Err(SessionError::NotSubmitted)
            }
        }
    }

    fn require_in_progress(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::NotStarted => Err(SessionError::NotStarted),
            SessionStatus::Submitted | SessionStatus::Analyzed => {
                Err(SessionError::AlreadySubmitted)
            }
        }
    }

    //
    // ─── READ-ONLY VIEW ────────────────────────────────────────────────────────

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    /// Selection for the current question, if one was recorded.
    #[must_use]
    pub fn current_selection(&self) -> Option<OptionLetter> {
        self.selections.get(&self.current_question().id()).copied()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.selections.len(),
            unanswered: self.questions.len() - self.selections.len(),
            current_index: self.current,
            status: self.status,
        }
    }

    /// Sparse answer map: an entry per visited or answered question, merging
    /// the recorded selection with the tracker's accumulated time.
    #[must_use]
    pub fn answers(&self) -> AnswerMap {
        let mut map = AnswerMap::new();
        for (qid, secs) in self.tracker.recorded() {
            map.insert(
                qid,
                AnswerRecord::new(qid, self.selections.get(&qid).copied(), secs),
            );
        }
        for (&qid, &selected) in &self.selections {
            map.entry(qid).or_insert_with(|| {
                AnswerRecord::new(qid, Some(selected), self.tracker.seconds_for(qid))
            });
        }
        map
    }

    /// Total recorded time across all questions, in seconds.
    #[must_use]
    pub fn total_time_secs(&self) -> i64 {
        self.tracker.total_seconds()
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("selections_len", &self.selections.len())
            .field("status", &self.status)
            .field("started_at", &self.started_at)
            .field("submitted_at", &self.submitted_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
