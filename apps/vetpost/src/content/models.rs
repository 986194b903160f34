//! Core content types: categories, slots, posts, weekly batches and topic history.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// The fixed weekday order of every weekly batch.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Number of slots in a weekly batch.
pub const SLOTS_PER_WEEK: usize = WEEK.len();

/// Character count as the platform measures it (Unicode scalar values).
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Display label for a weekday, as used in exports and prompts.
pub fn day_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "月曜",
        Weekday::Tue => "火曜",
        Weekday::Wed => "水曜",
        Weekday::Thu => "木曜",
        Weekday::Fri => "金曜",
        Weekday::Sat => "土曜",
        Weekday::Sun => "日曜",
    }
}

/// Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Monday of the week after `today`. A Monday yields the following Monday.
pub fn next_week_start(today: NaiveDate) -> NaiveDate {
    week_start_of(today) + Duration::days(7)
}

// ────────────────────────────────────────────────────────────────────────────
// Length window
// ────────────────────────────────────────────────────────────────────────────

/// Closed character-count interval `[min, max]` a post must land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthWindow {
    pub min: usize,
    pub max: usize,
}

impl LengthWindow {
    #[cfg(test)]
    pub fn new(min: usize, max: usize) -> Result<Self, AppError> {
        if min > max {
            return Err(AppError::Validation(format!(
                "length window min ({min}) exceeds max ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, length: usize) -> bool {
        (self.min..=self.max).contains(&length)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Category
// ────────────────────────────────────────────────────────────────────────────

/// One of the two subject domains. Each has its own tag, window and posting time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cat,
    Dog,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Cat, Category::Dog];

    /// Mandatory trailing tag every post in this category ends with.
    pub fn tag(self) -> &'static str {
        match self {
            Category::Cat => "#猫のあれこれ",
            Category::Dog => "#獣医が教える犬のはなし",
        }
    }

    pub fn window(self) -> LengthWindow {
        match self {
            Category::Cat => LengthWindow { min: 125, max: 140 },
            Category::Dog => LengthWindow { min: 125, max: 135 },
        }
    }

    /// Posting time label.
    pub fn scheduled_slot(self) -> &'static str {
        match self {
            Category::Cat => "07:00",
            Category::Dog => "18:00",
        }
    }

    /// Whether slots 0↔1 and 2↔3 form quiz/answer pairs.
    pub fn has_quiz_pairs(self) -> bool {
        matches!(self, Category::Dog)
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Cat => "猫",
            Category::Dog => "犬",
        }
    }

    /// Stable ASCII key used in JSON payloads and file names.
    pub fn key(self) -> &'static str {
        match self {
            Category::Cat => "cat",
            Category::Dog => "dog",
        }
    }

    /// The role a weekday plays in this category's weekly cycle.
    pub fn slot_role(self, day: Weekday) -> SlotRole {
        if !self.has_quiz_pairs() {
            return SlotRole::General;
        }
        match day {
            Weekday::Mon => SlotRole::Quiz,
            Weekday::Tue => SlotRole::Answer,
            Weekday::Wed => SlotRole::CaseQuiz,
            Weekday::Thu => SlotRole::CaseAnswer,
            Weekday::Fri => SlotRole::CallForStories,
            Weekday::Sat => SlotRole::Tips,
            Weekday::Sun => SlotRole::Column,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cat" | "猫" => Ok(Category::Cat),
            "dog" | "犬" => Ok(Category::Dog),
            other => Err(format!("unknown category '{other}' (expected cat|dog|猫|犬)")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Slot role
// ────────────────────────────────────────────────────────────────────────────

/// Post type for a weekday slot. Only the paired category uses roles other than `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    General,
    Quiz,
    Answer,
    CaseQuiz,
    CaseAnswer,
    CallForStories,
    Tips,
    Column,
}

impl SlotRole {
    pub fn is_quiz(self) -> bool {
        matches!(self, SlotRole::Quiz | SlotRole::CaseQuiz)
    }

    pub fn is_answer(self) -> bool {
        matches!(self, SlotRole::Answer | SlotRole::CaseAnswer)
    }

    pub fn label(self) -> &'static str {
        match self {
            SlotRole::General => "お役立ち情報",
            SlotRole::Quiz => "クイズ・質問編",
            SlotRole::Answer | SlotRole::CaseAnswer => "回答・解説編",
            SlotRole::CaseQuiz => "ケーススタディ・質問編",
            SlotRole::CallForStories => "体験談募集・質問募集",
            SlotRole::Tips => "お役立ちヒント・小ワザ",
            SlotRole::Column => "豆知識・コラム",
        }
    }

    /// Writing instruction for the generation prompt.
    pub fn instruction(self) -> &'static str {
        match self {
            SlotRole::General => "有益な情報を分かりやすく伝える。",
            SlotRole::Quiz => {
                "「クイズ」という語を含め、A/B/Cの選択肢形式で出題する。「答えは明日！」で締める。"
            }
            SlotRole::Answer => {
                "「昨日のクイズの答え」と明記し、「正解は○」の形で示したうえで、なぜその答えなのかを専門的に解説する。"
            }
            SlotRole::CaseQuiz => {
                "実際にありそうなシナリオを「クイズ」として提示し、A/B/Cの選択肢で判断を求める。「答えは明日！」で締める。"
            }
            SlotRole::CaseAnswer => {
                "「昨日のケースクイズの答え」と明記し、「正解は○」の形で示したうえで、判断の根拠を解説する。"
            }
            SlotRole::CallForStories => "「教えてください！」「皆さんはどうですか？」など参加を促す。",
            SlotRole::Tips => "すぐに実践できる具体的なコツや方法を紹介する。",
            SlotRole::Column => "興味深い生態や、獣医師ならではの知識を紹介する。",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Post & WeeklyBatch
// ────────────────────────────────────────────────────────────────────────────

/// A single scheduled post.
///
/// Construct through `Post::new` so that `length` always equals the character count of `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub date: NaiveDate,
    pub day: Weekday,
    pub category: Category,
    pub topic: String,
    pub text: String,
    pub length: usize,
    pub scheduled_slot: String,
}

impl Post {
    pub fn new(
        date: NaiveDate,
        category: Category,
        topic: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: Uuid::new_v4(),
            date,
            day: date.weekday(),
            category,
            topic: topic.into(),
            length: char_count(&text),
            text,
            scheduled_slot: category.scheduled_slot().to_string(),
        }
    }

    pub fn role(&self) -> SlotRole {
        self.category.slot_role(self.day)
    }
}

/// Exactly seven posts of one category, one per weekday in Mon..Sun order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyBatch {
    category: Category,
    posts: Vec<Post>,
}

impl WeeklyBatch {
    /// Validating constructor for posts that come from outside (e.g. a reloaded export).
    pub fn new(category: Category, posts: Vec<Post>) -> Result<Self, AppError> {
        if posts.len() != SLOTS_PER_WEEK {
            return Err(AppError::Validation(format!(
                "weekly batch needs {SLOTS_PER_WEEK} posts, got {}",
                posts.len()
            )));
        }
        for (slot, (post, expected_day)) in posts.iter().zip(WEEK).enumerate() {
            if post.category != category {
                return Err(AppError::Validation(format!(
                    "slot {slot} belongs to category {}, expected {category}",
                    post.category
                )));
            }
            if post.day != expected_day {
                return Err(AppError::Validation(format!(
                    "slot {slot} falls on {:?}, expected {expected_day:?}",
                    post.day
                )));
            }
        }
        Ok(Self { category, posts })
    }

    /// Builds a batch from seven `(topic, text)` slots starting at the Monday of `week_of`.
    /// Infallible: dates are derived from the week start so day order holds by construction.
    pub fn assemble(category: Category, week_of: NaiveDate, slots: [(String, String); 7]) -> Self {
        let monday = week_start_of(week_of);
        let posts = slots
            .into_iter()
            .enumerate()
            .map(|(offset, (topic, text))| {
                Post::new(monday + Duration::days(offset as i64), category, topic, text)
            })
            .collect();
        Self { category, posts }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Topic history
// ────────────────────────────────────────────────────────────────────────────

/// Topics observed in a trailing window of published posts. Read-only to the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentThemeHistory {
    topics: BTreeSet<String>,
}

impl RecentThemeHistory {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    /// True when `topic` appears as a substring of any history entry.
    pub fn mentions(&self, topic: &str) -> bool {
        self.topics.iter().any(|entry| entry.contains(topic))
    }
}

/// Per-category history pair handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct CategoryHistories {
    pub cat: RecentThemeHistory,
    pub dog: RecentThemeHistory,
}

impl CategoryHistories {
    pub fn for_category(&self, category: Category) -> &RecentThemeHistory {
        match category {
            Category::Cat => &self.cat,
            Category::Dog => &self.dog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_post_length_matches_char_count() {
        let post = Post::new(monday(), Category::Cat, "猫の睡眠", "【猫の睡眠】🐱 #猫のあれこれ");
        assert_eq!(post.length, char_count(&post.text));
        assert_eq!(post.length, 15);
        assert_eq!(post.day, Weekday::Mon);
        assert_eq!(post.scheduled_slot, "07:00");
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(LengthWindow::new(140, 125).is_err());
        let window = LengthWindow::new(125, 140).unwrap();
        assert!(window.contains(125));
        assert!(window.contains(140));
        assert!(!window.contains(141));
    }

    #[test]
    fn test_dog_roles_follow_weekly_cycle() {
        let roles: Vec<SlotRole> = WEEK.iter().map(|d| Category::Dog.slot_role(*d)).collect();
        assert!(roles[0].is_quiz() && roles[1].is_answer());
        assert!(roles[2].is_quiz() && roles[3].is_answer());
        assert!(roles[4..].iter().all(|r| !r.is_quiz() && !r.is_answer()));
        assert!(WEEK.iter().all(|d| Category::Cat.slot_role(*d) == SlotRole::General));
    }

    #[test]
    fn test_assemble_anchors_to_monday() {
        let wednesday = monday() + Duration::days(2);
        let slots = std::array::from_fn(|i| (format!("topic{i}"), format!("text{i}")));
        let batch = WeeklyBatch::assemble(Category::Dog, wednesday, slots);

        let days: Vec<Weekday> = batch.posts().iter().map(|p| p.day).collect();
        assert_eq!(days, WEEK.to_vec());
        assert_eq!(batch.posts()[0].date, monday());
    }

    #[test]
    fn test_new_batch_rejects_wrong_day_order() {
        let mut posts: Vec<Post> = (0..7)
            .map(|i| Post::new(monday() + Duration::days(i), Category::Cat, "t", "x"))
            .collect();
        posts.swap(0, 1);
        assert!(WeeklyBatch::new(Category::Cat, posts).is_err());
    }

    #[test]
    fn test_new_batch_rejects_short_week() {
        let posts = vec![Post::new(monday(), Category::Cat, "t", "x")];
        assert!(WeeklyBatch::new(Category::Cat, posts).is_err());
    }

    #[test]
    fn test_next_week_start_is_following_monday() {
        assert_eq!(next_week_start(monday()), monday() + Duration::days(7));
        let sunday = monday() + Duration::days(6);
        assert_eq!(next_week_start(sunday), monday() + Duration::days(7));
    }

    #[test]
    fn test_history_mentions_is_substring_match() {
        let history = RecentThemeHistory::new(["猫の歯のケアと口臭チェック"]);
        assert!(history.mentions("猫の歯のケア"));
        assert!(!history.mentions("猫の目のケア"));
    }

    #[test]
    fn test_category_parses_labels_and_keys() {
        assert_eq!("猫".parse::<Category>().unwrap(), Category::Cat);
        assert_eq!("DOG".parse::<Category>().unwrap(), Category::Dog);
        assert!("bird".parse::<Category>().is_err());
    }
}
