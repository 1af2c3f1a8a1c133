use serde::{Deserialize, Serialize};

use crate::model::{AnswerMap, Question};

/// Points awarded for a correct answer.
pub const POINTS_CORRECT: i32 = 4;
/// Points deducted for an attempted wrong answer.
pub const POINTS_INCORRECT: i32 = -1;

//
// ─── SCORE ────────────────────────────────────────────────────────────────────

/// Outcome of marking a completed session against the question bank.
///
/// `correct + incorrect + unattempted` always equals the bank size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub incorrect: u32,
    pub unattempted: u32,
    pub total_points: i32,
}

//
// ─── SCORING ──────────────────────────────────────────────────────────────────

/// Canonical correctness predicate: the question was attempted and the picked
/// option matches the answer key. Analytics reuses this for every per-group
/// accuracy figure.
#[must_use]
pub fn is_correct(question: &Question, answers: &AnswerMap) -> bool {
    answers
        .get(&question.id())
        .and_then(|record| record.selected)
        .is_some_and(|picked| picked == question.correct())
}

/// Marks the session in a single pass: +4 per correct answer, -1 per
/// attempted wrong answer, 0 for unattempted questions.
///
/// Pure and idempotent; safe to call any number of times on the same inputs.
#[must_use]
pub fn score(questions: &[Question], answers: &AnswerMap) -> Score {
    let mut correct = 0_u32;
    let mut incorrect = 0_u32;
    let mut unattempted = 0_u32;

    for question in questions {
        let selected = answers.get(&question.id()).and_then(|record| record.selected);
        match selected {
            Some(picked) if picked == question.correct() => correct += 1,
            Some(_) => incorrect += 1,
            None => unattempted += 1,
        }
    }

    let total_points =
        POINTS_CORRECT * i32::try_from(correct).unwrap_or(i32::MAX)
            + POINTS_INCORRECT * i32::try_from(incorrect).unwrap_or(i32::MAX);

    Score {
        correct,
        incorrect,
        unattempted,
        total_points,
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
