use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────

/// Validation failures for a single inbound question record.
///
/// Records failing validation are dropped at the ingestion boundary and
/// counted; they never reach a running session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,

    #[error("option {letter} is empty")]
    EmptyOption { letter: OptionLetter },

    #[error("correct answer must be one of A-D, got {provided:?}")]
    InvalidCorrectAnswer { provided: String },
}

//
// ─── OPTION LETTER ────────────────────────────────────────────────────────────

/// One of the four answer slots of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// Parses a letter, tolerating case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidCorrectAnswer` for anything outside A-D.
    pub fn parse(value: &str) -> Result<Self, QuestionError> {
        match value.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            "D" | "d" => Ok(Self::D),
            other => Err(QuestionError::InvalidCorrectAnswer {
                provided: other.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }

    /// Index of this letter into a `[String; 4]` option array.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────

/// Unvalidated question fields as they arrive from the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub text: String,
    pub options: [String; 4],
    pub correct: OptionLetter,
    pub subject: String,
    pub topic: String,
    pub subtopic: String,
    pub difficulty: String,
    pub bloom_level: String,
    pub ideal_time_secs: u32,
    pub priority: Option<String>,
    pub key_concept: Option<String>,
    pub pitfalls: Option<String>,
}

impl QuestionDraft {
    /// Checks the question invariants and produces a `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` or `QuestionError::EmptyOption`
    /// when a required field is blank.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        for letter in OptionLetter::ALL {
            if self.options[letter.index()].trim().is_empty() {
                return Err(QuestionError::EmptyOption { letter });
            }
        }

        Ok(Question {
            id: self.id,
            text: self.text,
            options: self.options,
            correct: self.correct,
            subject: self.subject,
            topic: self.topic,
            subtopic: self.subtopic,
            difficulty: self.difficulty,
            bloom_level: self.bloom_level,
            ideal_time_secs: self.ideal_time_secs,
            priority: self.priority,
            key_concept: self.key_concept,
            pitfalls: self.pitfalls,
        })
    }
}

/// A validated multiple-choice question.
///
/// Invariants (upheld by `QuestionDraft::validate`): question text and all
/// four options are non-empty, and `correct` always indexes an existing
/// option slot by construction of `OptionLetter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: [String; 4],
    correct: OptionLetter,
    subject: String,
    topic: String,
    subtopic: String,
    difficulty: String,
    bloom_level: String,
    ideal_time_secs: u32,
    priority: Option<String>,
    key_concept: Option<String>,
    pitfalls: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; 4] {
        &self.options
    }

    /// Option text for the given letter.
    #[must_use]
    pub fn option(&self, letter: OptionLetter) -> &str {
        &self.options[letter.index()]
    }

    #[must_use]
    pub fn correct(&self) -> OptionLetter {
        self.correct
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn subtopic(&self) -> &str {
        &self.subtopic
    }

    #[must_use]
    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    #[must_use]
    pub fn bloom_level(&self) -> &str {
        &self.bloom_level
    }

    /// Recommended solving time in seconds; zero means "not rated".
    #[must_use]
    pub fn ideal_time_secs(&self) -> u32 {
        self.ideal_time_secs
    }

    #[must_use]
    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    #[must_use]
    pub fn key_concept(&self) -> Option<&str> {
        self.key_concept.as_deref()
    }

    #[must_use]
    pub fn pitfalls(&self) -> Option<&str> {
        self.pitfalls.as_deref()
    }
}
