use exam_core::analytics::{self, AnalyticsConfig, AnalyticsReport};
use exam_core::model::{OptionLetter, Question};
use exam_core::scoring::{self, Score};
use exam_core::Clock;

use super::service::ExamSession;
use crate::error::SessionError;

/// Everything derived from a submitted session: the score and the full
/// analytics report, both serializable for the presentation layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExamOutcome {
    pub score: Score,
    pub report: AnalyticsReport,
}

/// Orchestrates exam start, navigation and post-submit analysis.
///
/// Holds the injected clock so session timestamps stay deterministic under
/// test; all state lives in the `ExamSession` value owned by the caller.
#[derive(Debug, Clone)]
pub struct ExamLoopService {
    clock: Clock,
    analytics_config: AnalyticsConfig,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            analytics_config: AnalyticsConfig::default(),
        }
    }

    #[must_use]
    pub fn with_analytics_config(mut self, config: AnalyticsConfig) -> Self {
        self.analytics_config = config;
        self
    }

    /// Start a new exam over the given bank.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for an empty bank.
    pub fn start_exam(&self, questions: Vec<Question>) -> Result<ExamSession, SessionError> {
        let mut session = ExamSession::new(questions)?;
        session.begin(self.clock.now())?;
        Ok(session)
    }

    /// Record a selection on the current question.
    ///
    /// # Errors
    ///
    /// Propagates session lifecycle errors.
    pub fn select_answer(
        &self,
        session: &mut ExamSession,
        option: OptionLetter,
    ) -> Result<(), SessionError> {
        session.select_answer(option)
    }

    /// Move to the next question, clamped at the end of the paper.
    ///
    /// # Errors
    ///
    /// Propagates session lifecycle errors.
    pub fn advance(&self, session: &mut ExamSession) -> Result<(), SessionError> {
        session.advance(self.clock.now())
    }

    /// Move to the previous question, clamped at the start of the paper.
    ///
    /// # Errors
    ///
    /// Propagates session lifecycle errors.
    pub fn retreat(&self, session: &mut ExamSession) -> Result<(), SessionError> {
        session.retreat(self.clock.now())
    }

    /// Submit the session, then derive score and analytics in one pass and
    /// take the terminal `Analyzed` transition.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` on a repeated submit.
    pub fn submit_and_analyze(
        &self,
        session: &mut ExamSession,
    ) -> Result<ExamOutcome, SessionError> {
        session.submit(self.clock.now())?;
        let outcome = self.analyze(session)?;
        Ok(outcome)
    }

    /// Derive score and analytics for an already-submitted session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` if the session is still running.
    pub fn analyze(&self, session: &mut ExamSession) -> Result<ExamOutcome, SessionError> {
        let answers = session.answers();
        let score = scoring::score(session.questions(), &answers);
        let report = analytics::analyze(session.questions(), &answers, &self.analytics_config);
        match session.mark_analyzed() {
            // re-running analytics over a frozen session is fine; the
            // transition itself only happens once
            Ok(()) | Err(SessionError::AlreadyAnalyzed) => Ok(ExamOutcome { score, report }),
            Err(err) => Err(err),
        }
    }
}
