//! Weekly pair validator: structural checks on a finished `WeeklyBatch`.
//!
//! Validation is side-effect free and never errors: it reports violations and lets the
//! pipeline decide between retrying and falling back.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::models::{char_count, WeeklyBatch};

/// Below this many characters a slot is a generation failure, not a quality issue.
pub const SANITY_FLOOR: usize = 20;

/// `(quiz slot, answer slot)` pairs for categories with quiz semantics.
pub const QUIZ_PAIRS: [(usize, usize); 2] = [(0, 1), (2, 3)];

const QUIZ_MARKERS: &[&str] = &["クイズ", "quiz"];
const ANSWER_MARKERS: &[&str] = &["答え", "answer"];
const CORRECT_MARKERS: &[&str] = &["正解", "correct"];

/// Lettered or numbered choices: `A.`, `Ａ．`, `A)`, `A/B`, `①`, `(1)`, `1.` and similar.
static OPTION_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(?:[A-CＡ-Ｃ][\.．:：)）/／]|[①②③④]|[（(][1-4１-４A-CＡ-Ｃ][)）]|(?:^|\s)[1-4１-４][\.．)）])")
        .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairViolation {
    EmptyText { slot: usize },
    BelowSanityFloor { slot: usize, length: usize },
    MissingTag { slot: usize },
    MissingQuizMarker { slot: usize },
    MissingOptionList { slot: usize },
    MissingAnswerMarker { slot: usize },
    MissingCorrectMarker { slot: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub violations: Vec<PairViolation>,
}

/// True when the batch satisfies every slot and pairing rule.
pub fn validate(batch: &WeeklyBatch) -> bool {
    validate_report(batch).passed
}

/// Runs every check and collects all violations instead of stopping at the first.
pub fn validate_report(batch: &WeeklyBatch) -> ValidationReport {
    let category = batch.category();
    let posts = batch.posts();
    let mut violations = Vec::new();

    for (slot, post) in posts.iter().enumerate() {
        if post.text.trim().is_empty() {
            violations.push(PairViolation::EmptyText { slot });
            continue;
        }
        let length = char_count(&post.text);
        if length < SANITY_FLOOR {
            violations.push(PairViolation::BelowSanityFloor { slot, length });
        }
        if !post.text.contains(category.tag()) {
            violations.push(PairViolation::MissingTag { slot });
        }
    }

    if category.has_quiz_pairs() {
        for (quiz, answer) in QUIZ_PAIRS {
            if let Some(post) = posts.get(quiz) {
                if !contains_any(&post.text, QUIZ_MARKERS) {
                    violations.push(PairViolation::MissingQuizMarker { slot: quiz });
                }
                if !OPTION_LIST.is_match(&post.text) {
                    violations.push(PairViolation::MissingOptionList { slot: quiz });
                }
            }
            if let Some(post) = posts.get(answer) {
                if !contains_any(&post.text, ANSWER_MARKERS) {
                    violations.push(PairViolation::MissingAnswerMarker { slot: answer });
                }
                if !contains_any(&post.text, CORRECT_MARKERS) {
                    violations.push(PairViolation::MissingCorrectMarker { slot: answer });
                }
            }
        }
    }

    ValidationReport {
        passed: violations.is_empty(),
        violations,
    }
}

/// Whether cleaned text is long enough to count as a real generation.
pub fn is_plausible(text: &str) -> bool {
    char_count(text.trim()) >= SANITY_FLOOR
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    markers.iter().any(|m| lowered.contains(&m.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::content::models::Category;

    fn week_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 26).unwrap()
    }

    fn dog_batch(texts: [&str; 7]) -> WeeklyBatch {
        let tag = Category::Dog.tag();
        let slots = texts.map(|t| ("散歩".to_string(), format!("{t}\n\n{tag}")));
        WeeklyBatch::assemble(Category::Dog, week_of(), slots)
    }

    const GENERAL: &str = "愛犬の散歩は毎日の健康管理の基本になります。";
    const QUIZ: &str = "【散歩クイズ】散歩に最適な時間は？ A. 朝夕 B. 真昼 答えは明日！";
    const ANSWER: &str = "【昨日のクイズの答え】正解はA. 朝夕の涼しい時間です。";

    #[test]
    fn test_valid_dog_week_passes() {
        let batch = dog_batch([QUIZ, ANSWER, QUIZ, ANSWER, GENERAL, GENERAL, GENERAL]);
        let report = validate_report(&batch);
        assert!(report.passed, "{:?}", report.violations);
    }

    #[test]
    fn test_answer_without_markers_fails() {
        let batch = dog_batch([
            "quiz: A/B/C, answer tomorrow",
            "no answer content",
            QUIZ,
            ANSWER,
            GENERAL,
            GENERAL,
            GENERAL,
        ]);
        let report = validate_report(&batch);
        assert!(!report.passed);
        assert!(report
            .violations
            .contains(&PairViolation::MissingCorrectMarker { slot: 1 }));
    }

    #[test]
    fn test_quiz_without_options_fails() {
        let batch = dog_batch([
            "【散歩クイズ】散歩に最適な時間はいつでしょう？答えは明日！",
            ANSWER,
            QUIZ,
            ANSWER,
            GENERAL,
            GENERAL,
            GENERAL,
        ]);
        let report = validate_report(&batch);
        assert_eq!(report.violations, vec![PairViolation::MissingOptionList { slot: 0 }]);
    }

    #[test]
    fn test_circled_and_numbered_options_accepted() {
        for options in ["①朝夕 ②真昼", "(1) 朝夕 (2) 真昼", "\n1. 朝夕\n2. 真昼", "Ａ．朝夕 Ｂ．真昼"] {
            assert!(OPTION_LIST.is_match(options), "{options}");
        }
        assert!(!OPTION_LIST.is_match("朝夕と真昼、どちらでしょう"));
    }

    #[test]
    fn test_every_slot_needs_tag_and_floor() {
        let slots = std::array::from_fn(|i| {
            let text = if i == 6 { "短い".to_string() } else { GENERAL.to_string() };
            ("t".to_string(), text)
        });
        let batch = WeeklyBatch::assemble(Category::Cat, week_of(), slots);
        let report = validate_report(&batch);
        assert!(!report.passed);
        assert!(report.violations.contains(&PairViolation::MissingTag { slot: 0 }));
        assert!(report
            .violations
            .contains(&PairViolation::BelowSanityFloor { slot: 6, length: 2 }));
    }

    #[test]
    fn test_cat_week_has_no_pair_rules() {
        let tag = Category::Cat.tag();
        let slots = std::array::from_fn(|_| ("t".to_string(), format!("{GENERAL}\n\n{tag}")));
        let batch = WeeklyBatch::assemble(Category::Cat, week_of(), slots);
        assert!(validate(&batch));
    }

    #[test]
    fn test_plausibility_floor() {
        assert!(!is_plausible("  短すぎる  "));
        assert!(is_plausible(GENERAL));
    }
}
