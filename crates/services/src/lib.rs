#![forbid(unsafe_code)]

pub mod error;
pub mod ingest;
pub mod sessions;
pub mod sheet_source;
pub mod time_tracker;

pub use exam_core::Clock;

pub use error::{FetchError, IngestError, SessionError, TrackerError};
pub use time_tracker::TimeTracker;

pub use sessions::{ExamLoopService, ExamOutcome, ExamSession, SessionProgress, SessionStatus};
