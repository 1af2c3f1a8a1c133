use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{OptionLetter, QuestionId};

/// Sparse answer map for a session: only visited questions have an entry.
///
/// `BTreeMap` keeps iteration order stable so downstream aggregation is
/// deterministic.
pub type AnswerMap = BTreeMap<QuestionId, AnswerRecord>;

/// What happened on a single question: which option was picked (if any) and
/// how much accumulated time the test-taker spent viewing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    /// `None` means the question was visited but never answered.
    pub selected: Option<OptionLetter>,
    /// Accumulated viewing time in whole seconds, additive across revisits.
    pub time_taken_secs: i64,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(question_id: QuestionId, selected: Option<OptionLetter>, time_taken_secs: i64) -> Self {
        Self {
            question_id,
            selected,
            time_taken_secs,
        }
    }

    /// True when an option was actually picked.
    #[must_use]
    pub fn is_attempted(&self) -> bool {
        self.selected.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempted_tracks_selection() {
        let qid = QuestionId::new(1);
        assert!(AnswerRecord::new(qid, Some(OptionLetter::B), 10).is_attempted());
        assert!(!AnswerRecord::new(qid, None, 10).is_attempted());
    }
}
