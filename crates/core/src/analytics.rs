use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{AnswerMap, Question, QuestionId};
use crate::scoring;

/// Strict lower bound on efficiency below which a question counts as slow
/// (actual time beyond 150% of ideal).
pub const SLOW_EFFICIENCY_THRESHOLD: f64 = -0.5;
/// Strict upper bound on efficiency above which a question counts as quick
/// (actual time under 50% of ideal).
pub const QUICK_EFFICIENCY_THRESHOLD: f64 = 0.5;

//
// ─── CONFIG ───────────────────────────────────────────────────────────────────

/// Tunables for the aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Groups with accuracy strictly below this percentage are flagged weak.
    pub weak_area_threshold_pct: f64,
    /// Maximum number of weak areas returned, worst first.
    pub weak_area_limit: usize,
    /// Include difficulty level in the weak-area grouping key.
    pub weak_area_by_difficulty: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            weak_area_threshold_pct: 70.0,
            weak_area_limit: 5,
            weak_area_by_difficulty: false,
        }
    }
}

//
// ─── MASTERY ──────────────────────────────────────────────────────────────────

/// Readiness label derived from group accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasteryTier {
    Ready,
    OnThePath,
    NeedsImprovement,
}

impl MasteryTier {
    #[must_use]
    pub fn from_accuracy(accuracy_pct: f64) -> Self {
        if accuracy_pct >= 80.0 {
            Self::Ready
        } else if accuracy_pct >= 50.0 {
            Self::OnThePath
        } else {
            Self::NeedsImprovement
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::OnThePath => "On the Path",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

//
// ─── REPORT TYPES ─────────────────────────────────────────────────────────────

/// Accuracy and pace for one group of questions sharing a dimension value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub label: String,
    pub correct: u32,
    pub total: u32,
    /// Correct over the whole group, unattempted questions included in the
    /// denominator.
    pub accuracy_pct: f64,
    pub avg_time_secs: f64,
    pub mastery: MasteryTier,
}

/// A (subject, topic, subtopic) group whose accuracy fell below the
/// configured threshold, ranked for remediation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakArea {
    pub subject: String,
    pub topic: String,
    pub subtopic: String,
    pub difficulty: Option<String>,
    pub correct: u32,
    pub total: u32,
    pub accuracy_pct: f64,
}

/// Full multi-dimensional breakdown of a submitted session.
///
/// Every list is built in first-encounter order over the question bank, so
/// two calls over identical inputs produce identical reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub total_time_secs: i64,
    pub ideal_time_secs: i64,
    /// Actual minus ideal; positive when the test-taker ran over.
    pub time_difference_secs: i64,
    pub over_time: bool,
    pub by_subject: Vec<GroupStats>,
    pub by_topic: Vec<GroupStats>,
    pub by_subtopic: Vec<GroupStats>,
    pub by_difficulty: Vec<GroupStats>,
    pub by_bloom_level: Vec<GroupStats>,
    pub weak_areas: Vec<WeakArea>,
    pub slow_questions: Vec<QuestionId>,
    pub quick_questions: Vec<QuestionId>,
}

//
// ─── AGGREGATION ──────────────────────────────────────────────────────────────

/// Derives the full report from a validated bank and the sparse answer map.
///
/// Pure and idempotent: a single pass per dimension, no hidden state. The
/// bank is assumed validated upstream; an unvalidated bank is a contract
/// breach, not a recoverable error.
#[must_use]
pub fn analyze(
    questions: &[Question],
    answers: &AnswerMap,
    config: &AnalyticsConfig,
) -> AnalyticsReport {
    let total_time_secs: i64 = questions.iter().map(|q| time_taken(q, answers)).sum();
    let ideal_time_secs: i64 = questions
        .iter()
        .map(|q| i64::from(q.ideal_time_secs()))
        .sum();
    let time_difference_secs = total_time_secs - ideal_time_secs;

    let (slow_questions, quick_questions) = classify_pace(questions, answers);

    AnalyticsReport {
        total_time_secs,
        ideal_time_secs,
        time_difference_secs,
        over_time: time_difference_secs > 0,
        by_subject: group_stats(questions, answers, |q| q.subject()),
        by_topic: group_stats(questions, answers, |q| q.topic()),
        by_subtopic: group_stats(questions, answers, |q| q.subtopic()),
        by_difficulty: group_stats(questions, answers, |q| q.difficulty()),
        by_bloom_level: group_stats(questions, answers, |q| q.bloom_level()),
        weak_areas: weak_areas(questions, answers, config),
        slow_questions,
        quick_questions,
    }
}

/// Time-efficiency ratio for a single question: `(ideal - actual) / ideal`.
///
/// Returns `None` when the question has no ideal time, guarding the division.
#[must_use]
pub fn efficiency(question: &Question, answers: &AnswerMap) -> Option<f64> {
    if question.ideal_time_secs() == 0 {
        return None;
    }
    let ideal = f64::from(question.ideal_time_secs());
    let actual = time_taken(question, answers) as f64;
    Some((ideal - actual) / ideal)
}

fn time_taken(question: &Question, answers: &AnswerMap) -> i64 {
    answers
        .get(&question.id())
        .map_or(0, |record| record.time_taken_secs)
}

fn classify_pace(questions: &[Question], answers: &AnswerMap) -> (Vec<QuestionId>, Vec<QuestionId>) {
    let mut slow = Vec::new();
    let mut quick = Vec::new();
    for question in questions {
        let Some(ratio) = efficiency(question, answers) else {
            continue;
        };
        // thresholds are strict: exactly -0.5 / 0.5 stays unclassified
        if ratio < SLOW_EFFICIENCY_THRESHOLD {
            slow.push(question.id());
        } else if ratio > QUICK_EFFICIENCY_THRESHOLD {
            quick.push(question.id());
        }
    }
    (slow, quick)
}

struct GroupAcc {
    correct: u32,
    total: u32,
    time_secs: i64,
}

fn group_stats<'a, F>(questions: &'a [Question], answers: &AnswerMap, key: F) -> Vec<GroupStats>
where
    F: Fn(&'a Question) -> &'a str,
{
    let mut order: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut accs: Vec<GroupAcc> = Vec::new();

    for question in questions {
        let label = key(question);
        let slot = *index.entry(label.to_string()).or_insert_with(|| {
            order.push(label.to_string());
            accs.push(GroupAcc {
                correct: 0,
                total: 0,
                time_secs: 0,
            });
            accs.len() - 1
        });
        let acc = &mut accs[slot];
        acc.total += 1;
        if scoring::is_correct(question, answers) {
            acc.correct += 1;
        }
        acc.time_secs += time_taken(question, answers);
    }

    order
        .into_iter()
        .zip(accs)
        .map(|(label, acc)| {
            let accuracy_pct = accuracy(acc.correct, acc.total);
            GroupStats {
                label,
                correct: acc.correct,
                total: acc.total,
                accuracy_pct,
                avg_time_secs: acc.time_secs as f64 / f64::from(acc.total),
                mastery: MasteryTier::from_accuracy(accuracy_pct),
            }
        })
        .collect()
}

fn weak_areas(questions: &[Question], answers: &AnswerMap, config: &AnalyticsConfig) -> Vec<WeakArea> {
    type Key = (String, String, String, Option<String>);

    let mut order: Vec<Key> = Vec::new();
    let mut index: HashMap<Key, usize> = HashMap::new();
    let mut accs: Vec<(u32, u32)> = Vec::new();

    for question in questions {
        let key: Key = (
            question.subject().to_string(),
            question.topic().to_string(),
            question.subtopic().to_string(),
            config
                .weak_area_by_difficulty
                .then(|| question.difficulty().to_string()),
        );
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            accs.push((0, 0));
            accs.len() - 1
        });
        accs[slot].1 += 1;
        if scoring::is_correct(question, answers) {
            accs[slot].0 += 1;
        }
    }

    let mut areas: Vec<WeakArea> = order
        .into_iter()
        .zip(accs)
        .map(|((subject, topic, subtopic, difficulty), (correct, total))| WeakArea {
            subject,
            topic,
            subtopic,
            difficulty,
            correct,
            total,
            accuracy_pct: accuracy(correct, total),
        })
        .filter(|area| area.accuracy_pct < config.weak_area_threshold_pct)
        .collect();

    // stable sort keeps ties in bank encounter order
    areas.sort_by(|a, b| {
        a.accuracy_pct
            .partial_cmp(&b.accuracy_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    areas.truncate(config.weak_area_limit);
    areas
}

fn accuracy(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(correct) / f64::from(total) * 100.0
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerRecord, OptionLetter, QuestionDraft, QuestionId};

    struct Spec {
        subject: &'static str,
        topic: &'static str,
        subtopic: &'static str,
        ideal: u32,
    }

    fn question(id: u32, spec: &Spec) -> Question {
        QuestionDraft {
            id: QuestionId::new(id),
            text: format!("Q{id}"),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct: OptionLetter::A,
            subject: spec.subject.into(),
            topic: spec.topic.into(),
            subtopic: spec.subtopic.into(),
            difficulty: "Medium".into(),
            bloom_level: "Apply".into(),
            ideal_time_secs: spec.ideal,
            priority: None,
            key_concept: None,
            pitfalls: None,
        }
        .validate()
        .unwrap()
    }

    fn answered(id: u32, selected: Option<OptionLetter>, secs: i64) -> (QuestionId, AnswerRecord) {
        let qid = QuestionId::new(id);
        (qid, AnswerRecord::new(qid, selected, secs))
    }

    const PHY: Spec = Spec {
        subject: "Physics",
        topic: "Kinematics",
        subtopic: "Projectiles",
        ideal: 60,
    };
    const CHEM: Spec = Spec {
        subject: "Chemistry",
        topic: "Bonding",
        subtopic: "Hybridisation",
        ideal: 60,
    };

    #[test]
    fn time_totals_and_over_flag() {
        let questions = vec![question(1, &PHY), question(2, &CHEM)];
        let answers: AnswerMap = [
            answered(1, Some(OptionLetter::A), 100),
            answered(2, Some(OptionLetter::A), 50),
        ]
        .into();

        let report = analyze(&questions, &answers, &AnalyticsConfig::default());
        assert_eq!(report.total_time_secs, 150);
        assert_eq!(report.ideal_time_secs, 120);
        assert_eq!(report.time_difference_secs, 30);
        assert!(report.over_time);
    }

    #[test]
    fn efficiency_boundaries_are_strict() {
        let questions = vec![
            question(1, &PHY), // 30s of 60s: efficiency 0.5, unclassified
            question(2, &PHY), // 90s of 60s: efficiency -0.5, unclassified
            question(3, &PHY), // 29s of 60s: quick
            question(4, &PHY), // 91s of 60s: slow
        ];
        let answers: AnswerMap = [
            answered(1, Some(OptionLetter::A), 30),
            answered(2, Some(OptionLetter::A), 90),
            answered(3, Some(OptionLetter::A), 29),
            answered(4, Some(OptionLetter::A), 91),
        ]
        .into();

        let report = analyze(&questions, &answers, &AnalyticsConfig::default());
        assert_eq!(report.quick_questions, vec![QuestionId::new(3)]);
        assert_eq!(report.slow_questions, vec![QuestionId::new(4)]);
    }

    #[test]
    fn zero_ideal_time_is_excluded_from_pace() {
        let unrated = Spec { ideal: 0, ..PHY };
        let questions = vec![question(1, &unrated)];
        let answers: AnswerMap = [answered(1, Some(OptionLetter::A), 500)].into();

        assert_eq!(efficiency(&questions[0], &answers), None);
        let report = analyze(&questions, &answers, &AnalyticsConfig::default());
        assert!(report.slow_questions.is_empty());
        assert!(report.quick_questions.is_empty());
    }

    #[test]
    fn unattempted_questions_count_against_group_accuracy() {
        let questions = vec![question(1, &PHY), question(2, &PHY)];
        let answers: AnswerMap = [answered(1, Some(OptionLetter::A), 40)].into();

        let report = analyze(&questions, &answers, &AnalyticsConfig::default());
        let physics = &report.by_subject[0];
        assert_eq!(physics.correct, 1);
        assert_eq!(physics.total, 2);
        assert!((physics.accuracy_pct - 50.0).abs() < f64::EPSILON);
        assert_eq!(physics.mastery, MasteryTier::OnThePath);
    }

    #[test]
    fn mastery_tier_thresholds() {
        assert_eq!(MasteryTier::from_accuracy(80.0), MasteryTier::Ready);
        assert_eq!(MasteryTier::from_accuracy(79.9), MasteryTier::OnThePath);
        assert_eq!(MasteryTier::from_accuracy(50.0), MasteryTier::OnThePath);
        assert_eq!(
            MasteryTier::from_accuracy(49.9),
            MasteryTier::NeedsImprovement
        );
    }

    #[test]
    fn weak_areas_sorted_ascending_and_capped() {
        // seven subtopic groups of one question each, six answered wrong
        let questions: Vec<Question> = (1..=7)
            .map(|i| {
                QuestionDraft {
                    id: QuestionId::new(i),
                    text: format!("Q{i}"),
                    options: ["a".into(), "b".into(), "c".into(), "d".into()],
                    correct: OptionLetter::A,
                    subject: "Biology".into(),
                    topic: "Cell".into(),
                    subtopic: format!("Sub{i}"),
                    difficulty: "Medium".into(),
                    bloom_level: "Apply".into(),
                    ideal_time_secs: 60,
                    priority: None,
                    key_concept: None,
                    pitfalls: None,
                }
                .validate()
                .unwrap()
            })
            .collect();
        let answers: AnswerMap = (1..=7)
            .map(|i| {
                let pick = if i == 7 { OptionLetter::A } else { OptionLetter::B };
                answered(i, Some(pick), 30)
            })
            .collect();

        let report = analyze(&questions, &answers, &AnalyticsConfig::default());
        assert!(report.weak_areas.len() <= 5);
        for pair in report.weak_areas.windows(2) {
            assert!(pair[0].accuracy_pct <= pair[1].accuracy_pct);
        }
        // ties at 0% keep bank encounter order
        assert_eq!(report.weak_areas[0].subtopic, "Sub1");
        assert!(report
            .weak_areas
            .iter()
            .all(|area| area.accuracy_pct < 70.0));
    }

    #[test]
    fn analyze_is_idempotent() {
        let questions = vec![question(1, &PHY), question(2, &CHEM), question(3, &PHY)];
        let answers: AnswerMap = [
            answered(1, Some(OptionLetter::A), 45),
            answered(2, Some(OptionLetter::C), 80),
            answered(3, None, 12),
        ]
        .into();
        let config = AnalyticsConfig::default();

        let first = analyze(&questions, &answers, &config);
        let second = analyze(&questions, &answers, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn groups_follow_bank_encounter_order() {
        let questions = vec![question(1, &CHEM), question(2, &PHY), question(3, &CHEM)];
        let answers = AnswerMap::new();

        let report = analyze(&questions, &answers, &AnalyticsConfig::default());
        let labels: Vec<_> = report.by_subject.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Chemistry", "Physics"]);
        assert_eq!(report.by_subject[0].total, 2);
    }
}
