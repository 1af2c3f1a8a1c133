//! Schema normalization for inbound question rows.
//!
//! Raw tabular rows (spreadsheet exports) arrive with free-form column
//! names. A fixed alias table resolves them once, here at the boundary, into
//! the canonical field set the core consumes; the core never sees raw column
//! names. Rows that fail validation are dropped and counted, never fatal.

use std::collections::{BTreeMap, BTreeSet};

use exam_core::model::{OptionLetter, Question, QuestionDraft, QuestionId};

use crate::error::IngestError;

/// A single raw row: column name to cell text.
pub type RawRow = BTreeMap<String, String>;

/// Fallback ideal solving time when the column is missing or unparseable.
pub const DEFAULT_TIME_TO_SOLVE_SECS: u32 = 60;

//
// ─── CANONICAL FIELDS ─────────────────────────────────────────────────────────

pub const QUESTION_NUMBER: &str = "question_number";
pub const QUESTION_TEXT: &str = "question_text";
pub const OPTION_A: &str = "option_a";
pub const OPTION_B: &str = "option_b";
pub const OPTION_C: &str = "option_c";
pub const OPTION_D: &str = "option_d";
pub const CORRECT_ANSWER: &str = "correct_answer";
pub const SUBJECT: &str = "subject";
pub const TOPIC: &str = "topic";
pub const SUBTOPIC: &str = "subtopic";
pub const DIFFICULTY_LEVEL: &str = "difficulty_level";
pub const BLOOMS_TAXONOMY: &str = "blooms_taxonomy";
pub const TIME_TO_SOLVE: &str = "time_to_solve";
pub const PRIORITY_LEVEL: &str = "priority_level";
pub const KEY_CONCEPT_TESTED: &str = "key_concept_tested";
pub const COMMON_PITFALLS: &str = "common_pitfalls";

/// Alias table, keyed by pre-normalized header text. Canonical names map to
/// themselves so already-clean exports resolve too.
const ALIASES: &[(&str, &str)] = &[
    ("questionnumber", QUESTION_NUMBER),
    ("qno", QUESTION_NUMBER),
    ("number", QUESTION_NUMBER),
    ("questionno", QUESTION_NUMBER),
    ("sno", QUESTION_NUMBER),
    ("questiontext", QUESTION_TEXT),
    ("question", QUESTION_TEXT),
    ("optiona", OPTION_A),
    ("opta", OPTION_A),
    ("optionb", OPTION_B),
    ("optb", OPTION_B),
    ("optionc", OPTION_C),
    ("optc", OPTION_C),
    ("optiond", OPTION_D),
    ("optd", OPTION_D),
    ("correctanswer", CORRECT_ANSWER),
    ("correctoption", CORRECT_ANSWER),
    ("answer", CORRECT_ANSWER),
    ("answerkey", CORRECT_ANSWER),
    ("subject", SUBJECT),
    ("topic", TOPIC),
    ("chapter", TOPIC),
    ("subtopic", SUBTOPIC),
    ("difficultylevel", DIFFICULTY_LEVEL),
    ("difficulty", DIFFICULTY_LEVEL),
    ("bloomstaxonomy", BLOOMS_TAXONOMY),
    ("blooms", BLOOMS_TAXONOMY),
    ("bloomslevel", BLOOMS_TAXONOMY),
    ("bloomlevel", BLOOMS_TAXONOMY),
    ("timetosolve", TIME_TO_SOLVE),
    ("timetosolveseconds", TIME_TO_SOLVE),
    ("idealtime", TIME_TO_SOLVE),
    ("idealtimeseconds", TIME_TO_SOLVE),
    ("prioritylevel", PRIORITY_LEVEL),
    ("priority", PRIORITY_LEVEL),
    ("keyconcepttested", KEY_CONCEPT_TESTED),
    ("keyconcept", KEY_CONCEPT_TESTED),
    ("commonpitfalls", COMMON_PITFALLS),
    ("pitfalls", COMMON_PITFALLS),
];

//
// ─── HEADER NORMALIZATION ─────────────────────────────────────────────────────

/// Collapses a raw header for alias lookup: lowercase, diacritics folded,
/// whitespace and punctuation removed. `"Time to Solve (seconds)"` and
/// `"TIME_TO_SOLVE_SECONDS"` normalize to the same key.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(fold_diacritic)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Resolves a single row's columns to canonical field names. Unmapped
/// columns pass through under their original name.
#[must_use]
pub fn normalize_row(row: &RawRow) -> RawRow {
    let mut normalized = RawRow::new();
    for (raw_key, value) in row {
        let lookup = normalize_header(raw_key);
        let key = ALIASES
            .iter()
            .find(|(alias, _)| *alias == lookup)
            .map_or_else(|| raw_key.clone(), |(_, canonical)| (*canonical).to_string());
        normalized.entry(key).or_insert_with(|| value.clone());
    }
    normalized
}

//
// ─── ROW → QUESTION ───────────────────────────────────────────────────────────

fn required<'a>(row: &'a RawRow, column: &'static str) -> Result<&'a str, IngestError> {
    row.get(column)
        .map(String::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(IngestError::MissingColumn { column })
}

fn optional(row: &RawRow, column: &str) -> Option<String> {
    row.get(column)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builds a validated `Question` from a canonical row.
///
/// # Errors
///
/// Returns `IngestError` when a required field is missing or malformed; the
/// caller drops the row and reports the count upward.
pub fn question_from_row(row: &RawRow) -> Result<Question, IngestError> {
    let number = required(row, QUESTION_NUMBER)?;
    let id: QuestionId = number
        .parse()
        .map_err(|_| IngestError::InvalidQuestionNumber {
            provided: number.to_string(),
        })?;

    let correct = OptionLetter::parse(required(row, CORRECT_ANSWER)?)?;

    let ideal_time_secs = row
        .get(TIME_TO_SOLVE)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map_or(DEFAULT_TIME_TO_SOLVE_SECS, |v| v.round() as u32);

    let draft = QuestionDraft {
        id,
        text: required(row, QUESTION_TEXT)?.to_string(),
        options: [
            required(row, OPTION_A)?.to_string(),
            required(row, OPTION_B)?.to_string(),
            required(row, OPTION_C)?.to_string(),
            required(row, OPTION_D)?.to_string(),
        ],
        correct,
        subject: required(row, SUBJECT)?.to_string(),
        topic: required(row, TOPIC)?.to_string(),
        subtopic: required(row, SUBTOPIC)?.to_string(),
        difficulty: required(row, DIFFICULTY_LEVEL)?.to_string(),
        bloom_level: required(row, BLOOMS_TAXONOMY)?.to_string(),
        ideal_time_secs,
        priority: optional(row, PRIORITY_LEVEL),
        key_concept: optional(row, KEY_CONCEPT_TESTED),
        pitfalls: optional(row, COMMON_PITFALLS),
    };

    Ok(draft.validate()?)
}

//
// ─── BANK ASSEMBLY ────────────────────────────────────────────────────────────

/// A row rejected during ingestion, with its zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    pub row: usize,
    pub error: IngestError,
}

/// Result of turning raw rows into a question bank: the validated questions
/// in input order plus every dropped row.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub questions: Vec<Question>,
    pub dropped: Vec<DroppedRow>,
}

impl IngestReport {
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Normalizes every row and builds the question bank, dropping invalid rows
/// and duplicate question numbers.
#[must_use]
pub fn build_bank(rows: &[RawRow]) -> IngestReport {
    let mut report = IngestReport::default();
    let mut seen: BTreeSet<QuestionId> = BTreeSet::new();

    for (index, raw) in rows.iter().enumerate() {
        let row = normalize_row(raw);
        match question_from_row(&row) {
            Ok(question) if seen.contains(&question.id()) => {
                report.dropped.push(DroppedRow {
                    row: index,
                    error: IngestError::DuplicateQuestionNumber {
                        number: question.id().value(),
                    },
                });
            }
            Ok(question) => {
                seen.insert(question.id());
                report.questions.push(question);
            }
            Err(error) => report.dropped.push(DroppedRow { row: index, error }),
        }
    }

    report
}

/// Parses a CSV payload (headers in the first record) into raw rows.
///
/// # Errors
///
/// Returns the underlying `csv::Error` for a malformed payload.
pub fn rows_from_csv(payload: &str) -> Result<Vec<RawRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(payload.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), value.to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: &[(&str, &str)]) -> RawRow {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn full_row(number: &str) -> RawRow {
        row(&[
            ("Question Number", number),
            ("Question Text", "What is 2 + 2?"),
            ("Option A", "3"),
            ("Option B", "4"),
            ("Option C", "5"),
            ("Option D", "22"),
            ("Correct Answer", "B"),
            ("Subject", "Maths"),
            ("Topic", "Arithmetic"),
            ("Subtopic", "Addition"),
            ("Difficulty Level", "Easy"),
            ("Bloom's Taxonomy", "Remember"),
            ("Time to Solve (seconds)", "30"),
        ])
    }

    #[test]
    fn header_normalization_ignores_case_space_and_diacritics() {
        assert_eq!(normalize_header("Time to Solve (seconds)"), "timetosolveseconds");
        assert_eq!(normalize_header("  QNo. "), "qno");
        assert_eq!(normalize_header("Quéstion Têxt"), "questiontext");
    }

    #[test]
    fn aliases_resolve_to_canonical_names() {
        let normalized = normalize_row(&row(&[("QNo", "1"), ("Answer", "A")]));
        assert_eq!(normalized.get(QUESTION_NUMBER).unwrap(), "1");
        assert_eq!(normalized.get(CORRECT_ANSWER).unwrap(), "A");
    }

    #[test]
    fn unmapped_columns_pass_through() {
        let normalized = normalize_row(&row(&[("Examiner Notes", "tricky")]));
        assert_eq!(normalized.get("Examiner Notes").unwrap(), "tricky");
    }

    #[test]
    fn full_row_builds_question() {
        let report = build_bank(&[full_row("1")]);
        assert_eq!(report.dropped_count(), 0);
        let q = &report.questions[0];
        assert_eq!(q.id().value(), 1);
        assert_eq!(q.correct(), OptionLetter::B);
        assert_eq!(q.ideal_time_secs(), 30);
        assert_eq!(q.bloom_level(), "Remember");
    }

    #[test]
    fn missing_time_to_solve_gets_default() {
        let mut raw = full_row("1");
        raw.remove("Time to Solve (seconds)");
        let report = build_bank(&[raw]);
        assert_eq!(
            report.questions[0].ideal_time_secs(),
            DEFAULT_TIME_TO_SOLVE_SECS
        );
    }

    #[test]
    fn unparseable_time_to_solve_gets_default() {
        let mut raw = full_row("1");
        raw.insert("Time to Solve (seconds)".into(), "soonish".into());
        let report = build_bank(&[raw]);
        assert_eq!(
            report.questions[0].ideal_time_secs(),
            DEFAULT_TIME_TO_SOLVE_SECS
        );
    }

    #[test]
    fn invalid_rows_are_dropped_and_counted() {
        let mut bad_letter = full_row("2");
        bad_letter.insert("Correct Answer".into(), "E".into());
        let mut no_subject = full_row("3");
        no_subject.remove("Subject");

        let report = build_bank(&[full_row("1"), bad_letter, no_subject]);
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.dropped_count(), 2);
        assert_eq!(report.dropped[0].row, 1);
        assert!(matches!(
            report.dropped[1].error,
            IngestError::MissingColumn { column: SUBJECT }
        ));
    }

    #[test]
    fn duplicate_question_numbers_are_dropped() {
        let report = build_bank(&[full_row("1"), full_row("1")]);
        assert_eq!(report.questions.len(), 1);
        assert!(matches!(
            report.dropped[0].error,
            IngestError::DuplicateQuestionNumber { number: 1 }
        ));
    }

    #[test]
    fn csv_payload_round_trips_into_rows() {
        let payload =
            "QNo,Question,Option A,Option B,Option C,Option D,Answer,Subject,Topic,\
             Subtopic,Difficulty,Blooms\n\
             1,What is 2+2?,3,4,5,22,B,Maths,Arithmetic,Addition,Easy,Remember\n";
        let rows = rows_from_csv(payload).unwrap();
        assert_eq!(rows.len(), 1);

        let report = build_bank(&rows);
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.questions[0].subject(), "Maths");
        assert_eq!(report.questions[0].subtopic(), "Addition");
        // only the solving time may default when its column is absent
        assert_eq!(
            report.questions[0].ideal_time_secs(),
            DEFAULT_TIME_TO_SOLVE_SECS
        );
    }

    #[test]
    fn rows_missing_classification_columns_are_dropped() {
        // subtopic, difficulty and bloom level are part of the required
        // inbound set; an empty-labeled group must never reach analytics
        for column in ["Subtopic", "Difficulty Level", "Bloom's Taxonomy"] {
            let mut raw = full_row("1");
            raw.remove(column);
            let report = build_bank(&[raw]);
            assert_eq!(report.questions.len(), 0, "column {column} was optional");
            assert_eq!(report.dropped_count(), 1);
            assert!(matches!(
                report.dropped[0].error,
                IngestError::MissingColumn { .. }
            ));
        }

        let mut blank = full_row("2");
        blank.insert("Subtopic".into(), "   ".into());
        let report = build_bank(&[blank]);
        assert_eq!(report.dropped_count(), 1);
        assert!(matches!(
            report.dropped[0].error,
            IngestError::MissingColumn { column: SUBTOPIC }
        ));
    }
}
