mod answer;
mod ids;
mod question;

pub use answer::{AnswerMap, AnswerRecord};
pub use ids::{ParseIdError, QuestionId};
pub use question::{OptionLetter, Question, QuestionDraft, QuestionError};
