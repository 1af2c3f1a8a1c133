//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::QuestionError;

/// Errors emitted by `TimeTracker`.
///
/// Both variants signal a broken internal invariant of the session
/// controller, never a user-facing race.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("an interval is already open for question {open}")]
    IntervalAlreadyOpen { open: exam_core::model::QuestionId },

    #[error("no interval is open")]
    NoOpenInterval,
}

/// Errors emitted by the exam session controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("question bank is empty")]
    Empty,

    #[error("session has not been started")]
    NotStarted,

    #[error("session has already been started")]
    AlreadyStarted,

    #[error("session has already been submitted")]
    AlreadySubmitted,

    #[error("session has not been submitted yet")]
    NotSubmitted,

    #[error("session has already been analyzed")]
    AlreadyAnalyzed,

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Errors emitted while normalizing and parsing inbound rows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    #[error("missing required column {column:?}")]
    MissingColumn { column: &'static str },

    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error("invalid question number {provided:?}")]
    InvalidQuestionNumber { provided: String },

    #[error("duplicate question number {number}")]
    DuplicateQuestionNumber { number: u32 },
}

/// Errors emitted by the spreadsheet fetch collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("sheet request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("csv payload could not be parsed: {0}")]
    Csv(#[from] csv::Error),
}
