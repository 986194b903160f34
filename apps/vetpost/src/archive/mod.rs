//! Post archive loader: reads an exported `tweets.js` archive and derives topic history.
//!
//! The archive is a JavaScript assignment wrapping a JSON array
//! (`window.YTD.tweets.part0 = [ ... ]`). Posts are classified by category tag and the
//! 【title】 of each recent post becomes a history topic.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::content::models::{Category, CategoryHistories, RecentThemeHistory};
use crate::errors::AppError;

/// Trailing window, in months, that counts as "recent".
pub const RECENT_MONTHS: u32 = 3;

const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

static ARCHIVE_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"【(.+?)】").expect("valid regex"));

// ────────────────────────────────────────────────────────────────────────────
// Archive format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ArchiveItem {
    #[serde(default)]
    tweet: Option<RawTweet>,
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    #[serde(default)]
    id_str: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    full_text: String,
    #[serde(default)]
    entities: RawEntities,
}

#[derive(Debug, Default, Deserialize)]
struct RawEntities {
    #[serde(default)]
    hashtags: Vec<RawHashtag>,
}

#[derive(Debug, Deserialize)]
struct RawHashtag {
    text: String,
}

/// One post from the archive, classified by category.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedPost {
    pub id: String,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub text: String,
    pub category: Option<Category>,
}

impl ArchivedPost {
    /// The 【title】 of the post, if it has one.
    pub fn title(&self) -> Option<&str> {
        TITLE
            .captures(&self.text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

/// Topic breakdown of one category's recent posts.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryAnalysis {
    pub category: Category,
    /// Unique topics, sorted.
    pub themes: Vec<String>,
    /// Topics in archive order (newest first), duplicates kept.
    pub recent_topics: Vec<String>,
    /// Topics grouped by calendar month (1–12).
    pub monthly_topics: BTreeMap<u32, Vec<String>>,
    pub total_posts: usize,
}

impl HistoryAnalysis {
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            themes: Vec::new(),
            recent_topics: Vec::new(),
            monthly_topics: BTreeMap::new(),
            total_posts: 0,
        }
    }

    pub fn history(&self) -> RecentThemeHistory {
        RecentThemeHistory::new(self.themes.iter().cloned())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loading
// ────────────────────────────────────────────────────────────────────────────

/// Parses archive content. Posts are returned newest first; undated posts last.
pub fn parse_archive(content: &str) -> Result<Vec<ArchivedPost>, AppError> {
    let array = ARCHIVE_ARRAY
        .find(content)
        .ok_or_else(|| AppError::Archive("no JSON array found in archive".to_string()))?;
    let items: Vec<ArchiveItem> = serde_json::from_str(array.as_str())
        .map_err(|e| AppError::Archive(format!("archive JSON is malformed: {e}")))?;

    let mut posts: Vec<ArchivedPost> = items
        .into_iter()
        .filter_map(|item| item.tweet)
        .map(|tweet| {
            let created_at = DateTime::parse_from_str(&tweet.created_at, CREATED_AT_FORMAT).ok();
            let category = classify(&tweet);
            ArchivedPost {
                id: tweet.id_str,
                created_at,
                text: tweet.full_text,
                category,
            }
        })
        .collect();

    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

pub fn load_archive(path: &Path) -> Result<Vec<ArchivedPost>, AppError> {
    let content = std::fs::read_to_string(path)?;
    let posts = parse_archive(&content)?;
    info!("Loaded {} posts from archive {}", posts.len(), path.display());
    Ok(posts)
}

/// Hashtag entities carry the tag without its leading '#'; the text is checked as well.
fn classify(tweet: &RawTweet) -> Option<Category> {
    Category::ALL.into_iter().find(|category| {
        let tag = category.tag();
        let bare = tag.trim_start_matches('#');
        tweet.entities.hashtags.iter().any(|h| h.text == bare) || tweet.full_text.contains(tag)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Analysis
// ────────────────────────────────────────────────────────────────────────────

/// Topics of `category` posts dated within `months` months before `today`.
pub fn analyze_recent_themes(
    posts: &[ArchivedPost],
    category: Category,
    months: u32,
    today: NaiveDate,
) -> HistoryAnalysis {
    let cutoff = today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN);

    let mut analysis = HistoryAnalysis::empty(category);
    let mut unique = BTreeSet::new();

    for post in posts.iter().filter(|p| p.category == Some(category)) {
        let Some(created_at) = post.created_at else {
            continue;
        };
        if created_at.date_naive() < cutoff {
            continue;
        }
        analysis.total_posts += 1;

        if let Some(title) = post.title() {
            analysis.recent_topics.push(title.to_string());
            unique.insert(title.to_string());
            analysis
                .monthly_topics
                .entry(created_at.month())
                .or_default()
                .push(title.to_string());
        }
    }

    analysis.themes = unique.into_iter().collect();
    analysis
}

/// Recent-history provider. A missing or unreadable archive yields empty histories.
pub fn load_histories(path: &Path, today: NaiveDate) -> (CategoryHistories, [HistoryAnalysis; 2]) {
    let posts = match load_archive(path) {
        Ok(posts) => posts,
        Err(e) => {
            warn!(
                "Archive {} unavailable ({e}); continuing without topic history",
                path.display()
            );
            Vec::new()
        }
    };

    let analyses = Category::ALL.map(|c| analyze_recent_themes(&posts, c, RECENT_MONTHS, today));
    let histories = CategoryHistories {
        cat: analyses[0].history(),
        dog: analyses[1].history(),
    };
    (histories, analyses)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const ARCHIVE: &str = r##"window.YTD.tweets.part0 = [
  {
    "tweet": {
      "id_str": "1",
      "created_at": "Mon Oct 12 07:00:00 +0000 2026",
      "full_text": "【猫の睡眠】猫はよく眠ります #猫のあれこれ",
      "entities": {"hashtags": [{"text": "猫のあれこれ"}]},
      "retweet_count": "0"
    }
  },
  {
    "tweet": {
      "id_str": "2",
      "created_at": "Tue Sep 01 18:00:00 +0000 2026",
      "full_text": "【散歩クイズ】A. 朝 B. 昼 #獣医が教える犬のはなし",
      "entities": {"hashtags": []}
    }
  },
  {
    "tweet": {
      "id_str": "3",
      "created_at": "Wed Apr 01 07:00:00 +0000 2026",
      "full_text": "【猫の遊び】古い投稿 #猫のあれこれ",
      "entities": {"hashtags": [{"text": "猫のあれこれ"}]}
    }
  },
  {
    "tweet": {
      "id_str": "4",
      "created_at": "Thu Oct 15 12:00:00 +0000 2026",
      "full_text": "今日のお知らせ",
      "entities": {"hashtags": []}
    }
  },
  {
    "tweet": {
      "id_str": "5",
      "created_at": "Fri Oct 16 07:00:00 +0000 2026",
      "full_text": "【猫の睡眠】続編 #猫のあれこれ"
    }
  }
]"##;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_parse_classifies_and_sorts_newest_first() {
        let posts = parse_archive(ARCHIVE).unwrap();
        assert_eq!(posts.len(), 5);
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "4", "1", "2", "3"]);
        assert_eq!(posts[2].category, Some(Category::Cat));
        assert_eq!(posts[3].category, Some(Category::Dog));
        assert_eq!(posts[1].category, None);
    }

    #[test]
    fn test_recent_window_excludes_old_posts() {
        let posts = parse_archive(ARCHIVE).unwrap();
        let cat = analyze_recent_themes(&posts, Category::Cat, RECENT_MONTHS, today());
        assert_eq!(cat.total_posts, 2);
        assert_eq!(cat.themes, vec!["猫の睡眠".to_string()]);
        assert_eq!(cat.recent_topics.len(), 2);
        assert_eq!(cat.monthly_topics.get(&10).map(Vec::len), Some(2));

        let dog = analyze_recent_themes(&posts, Category::Dog, RECENT_MONTHS, today());
        assert_eq!(dog.themes, vec!["散歩クイズ".to_string()]);
    }

    #[test]
    fn test_malformed_archive_is_an_error() {
        assert!(matches!(parse_archive("window.x = {}"), Err(AppError::Archive(_))));
        assert!(matches!(parse_archive("[{\"tweet\": ]"), Err(AppError::Archive(_))));
    }

    #[test]
    fn test_missing_archive_yields_empty_histories() {
        let dir = tempfile::tempdir().unwrap();
        let (histories, analyses) = load_histories(&dir.path().join("tweets.js"), today());
        assert!(histories.cat.is_empty() && histories.dog.is_empty());
        assert_eq!(analyses[0].total_posts, 0);
    }

    #[test]
    fn test_load_histories_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ARCHIVE.as_bytes()).unwrap();

        let (histories, _) = load_histories(file.path(), today());
        assert!(histories.cat.mentions("猫の睡眠"));
        assert!(!histories.cat.mentions("猫の遊び"));
        assert!(histories.dog.mentions("散歩"));
    }
}
