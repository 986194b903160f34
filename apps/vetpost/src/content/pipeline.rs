//! Content pipeline: orchestrates weekly generation.
//!
//! Flow: select topics → one batched generation call → per slot clean → (fallback if
//!       implausible) → tag → normalize → per-category validation → retry/fallback.
//!
//! The pipeline never fails. Generation errors, malformed responses and failed
//! validation are retried within one shared attempt budget; whatever is still missing
//! afterwards is replaced by the deterministic fallback week.

use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::cleaner::clean;
use super::fallback::{fallback_batch, fallback_text};
use super::models::{
    week_start_of, Category, CategoryHistories, Post, RecentThemeHistory, SlotRole, WeeklyBatch,
    SLOTS_PER_WEEK, WEEK,
};
use super::normalizer::normalize;
use super::prompts::{batch_prompt, batch_system, single_prompt, single_system};
use super::themes::select;
use super::validator::{is_plausible, validate_report, QUIZ_PAIRS};
use crate::llm_client::{strip_json_fences, TextGenerator};

// ────────────────────────────────────────────────────────────────────────────
// Retry policy
// ────────────────────────────────────────────────────────────────────────────

/// Attempt budget shared by generation failures and validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed delay between attempts. Not applied before the first one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No delay between attempts.
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Expected shape of the batched generation response.
#[derive(Debug, Deserialize)]
struct RawWeek {
    cat: Vec<String>,
    dog: Vec<String>,
}

impl RawWeek {
    fn texts(&self, category: Category) -> &[String] {
        match category {
            Category::Cat => &self.cat,
            Category::Dog => &self.dog,
        }
    }
}

/// Result of one weekly run. Both batches always pass validation.
#[derive(Debug, Clone)]
pub struct WeeklyContent {
    pub week_of: NaiveDate,
    pub cat: WeeklyBatch,
    pub dog: WeeklyBatch,
    /// Generation attempts actually made (0 when none were needed).
    pub attempts: u32,
    /// Categories that ended up on the deterministic fallback week.
    pub fallback_categories: Vec<Category>,
}

impl WeeklyContent {
    pub fn batch(&self, category: Category) -> &WeeklyBatch {
        match category {
            Category::Cat => &self.cat,
            Category::Dog => &self.dog,
        }
    }

    /// All fourteen posts, cat week first.
    pub fn all_posts(&self) -> Vec<Post> {
        self.cat
            .posts()
            .iter()
            .chain(self.dog.posts())
            .cloned()
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct ContentPipeline<G: TextGenerator> {
    generator: G,
    retry: RetryPolicy,
}

impl<G: TextGenerator> ContentPipeline<G> {
    pub fn new(generator: G, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    /// Generates the week starting on the Monday of `week_of`.
    pub async fn run_week(&self, week_of: NaiveDate, histories: &CategoryHistories) -> WeeklyContent {
        let monday = week_start_of(week_of);
        let topics = [
            select(histories.for_category(Category::Cat), Category::Cat, monday.month()),
            select(histories.for_category(Category::Dog), Category::Dog, monday.month()),
        ];
        info!(
            "Generating week of {} (history: cat={}, dog={}): cat topics={:?}, dog topics={:?}",
            monday,
            histories.cat.len(),
            histories.dog.len(),
            topics[0],
            topics[1]
        );

        let prompt = batch_prompt(monday, &topics, histories);
        let system = batch_system();

        let mut accepted: [Option<WeeklyBatch>; 2] = [None, None];
        let mut attempts = 0;

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 && !self.retry.backoff.is_zero() {
                debug!("Backing off {}ms before attempt {attempt}", self.retry.backoff.as_millis());
                tokio::time::sleep(self.retry.backoff).await;
            }
            attempts = attempt;

            let raw = match self.generator.generate(&prompt, &system).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        "Generation attempt {attempt}/{} failed: {e}",
                        self.retry.max_attempts
                    );
                    continue;
                }
            };

            let week = match parse_week(&raw) {
                Ok(week) => week,
                Err(e) => {
                    warn!(
                        "Generation attempt {attempt}/{}: malformed response: {e:#}",
                        self.retry.max_attempts
                    );
                    continue;
                }
            };

            for (slot, category) in Category::ALL.into_iter().enumerate() {
                if accepted[slot].is_some() {
                    continue;
                }
                let texts = week.texts(category);
                let broken = broken_pair_slots(category, texts);
                if !broken.is_empty() {
                    warn!(
                        "Generation attempt {attempt}/{}: {category} quiz/answer slots {broken:?} below sanity floor",
                        self.retry.max_attempts
                    );
                    continue;
                }
                let batch = build_batch(category, monday, &topics[slot], texts);
                let report = validate_report(&batch);
                if report.passed {
                    accepted[slot] = Some(batch);
                } else {
                    warn!(
                        "Generation attempt {attempt}/{}: {category} week failed validation: {:?}",
                        self.retry.max_attempts, report.violations
                    );
                }
            }

            if accepted.iter().all(Option::is_some) {
                break;
            }
        }

        let mut fallback_categories = Vec::new();
        let [cat, dog] = accepted;
        let mut finish = |category: Category, batch: Option<WeeklyBatch>, topics: &[String; 7]| {
            batch.unwrap_or_else(|| {
                warn!(
                    "{category} week exhausted {} attempts; using fallback week",
                    self.retry.max_attempts
                );
                fallback_categories.push(category);
                fallback_batch(category, topics, monday)
            })
        };
        let cat = finish(Category::Cat, cat, &topics[0]);
        let dog = finish(Category::Dog, dog, &topics[1]);

        info!(
            "Week of {monday} ready after {attempts} attempt(s); fallback categories: {:?}",
            fallback_categories
        );

        WeeklyContent {
            week_of: monday,
            cat,
            dog,
            attempts,
            fallback_categories,
        }
    }

    /// Generates one post for `category` on `date`. Falls back instead of failing.
    pub async fn generate_single(
        &self,
        category: Category,
        date: NaiveDate,
        topic: &str,
        history: &RecentThemeHistory,
    ) -> Post {
        let role = category.slot_role(date.weekday());
        let prompt = single_prompt(category, date, topic, history);
        let system = single_system();

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 && !self.retry.backoff.is_zero() {
                tokio::time::sleep(self.retry.backoff).await;
            }
            match self.generator.generate(&prompt, &system).await {
                Ok(raw) => {
                    let cleaned = clean(&raw);
                    if is_plausible(&cleaned) {
                        let text = finish_slot(category, &cleaned);
                        return Post::new(date, category, topic, text);
                    }
                    warn!("Single post attempt {attempt}: implausibly short output");
                }
                Err(e) => warn!("Single post attempt {attempt} failed: {e}"),
            }
        }

        warn!("{category} post for {date} exhausted retries; using fallback");
        Post::new(date, category, topic, fallback_text(category, role, topic))
    }
}

/// Parses the batched response. Anything but two seven-item arrays is a structural failure.
fn parse_week(raw: &str) -> anyhow::Result<RawWeek> {
    let body = strip_json_fences(raw);
    let body = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => bail!("no JSON object in response"),
    };
    let week: RawWeek = serde_json::from_str(body).context("response is not the expected JSON")?;
    for category in Category::ALL {
        let count = week.texts(category).len();
        if count != SLOTS_PER_WEEK {
            bail!("expected {SLOTS_PER_WEEK} {} posts, got {count}", category.key());
        }
    }
    Ok(week)
}

fn build_batch(
    category: Category,
    monday: NaiveDate,
    topics: &[String; 7],
    texts: &[String],
) -> WeeklyBatch {
    let slots = std::array::from_fn(|i| {
        let role = category.slot_role(WEEK[i]);
        let topic = topics[i].clone();
        let raw = texts.get(i).map(String::as_str).unwrap_or_default();
        let text = prepare_slot(category, role, &topic, raw);
        (topic, text)
    });
    WeeklyBatch::assemble(category, monday, slots)
}

/// Slots of a quiz/answer pair whose generated text is implausible. A slot fallback there
/// would pair a template with a generated partner, so the whole category is rejected.
fn broken_pair_slots(category: Category, texts: &[String]) -> Vec<usize> {
    if !category.has_quiz_pairs() {
        return Vec::new();
    }
    QUIZ_PAIRS
        .iter()
        .filter(|&&(quiz, answer)| {
            [quiz, answer].iter().any(|&i| {
                let raw = texts.get(i).map(String::as_str).unwrap_or_default();
                !is_plausible(&clean(raw))
            })
        })
        .flat_map(|&(quiz, answer)| [quiz, answer])
        .collect()
}

fn prepare_slot(category: Category, role: SlotRole, topic: &str, raw: &str) -> String {
    let cleaned = clean(raw);
    if !is_plausible(&cleaned) {
        debug!("{category} {topic}: generated text below sanity floor; slot fallback");
        return fallback_text(category, role, topic);
    }
    finish_slot(category, &cleaned)
}

fn finish_slot(category: Category, cleaned: &str) -> String {
    let tagged = ensure_tag(cleaned, category.tag());
    normalize(&tagged, category.window(), category)
}

/// Appends the tag on its own paragraph when the text does not carry it anywhere.
fn ensure_tag(text: &str, tag: &str) -> String {
    if text.contains(tag) {
        text.to_string()
    } else {
        format!("{}\n\n{tag}", text.trim_end())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
