//! CSV export sink.
//!
//! Every file is UTF-8 with a byte-order mark so spreadsheet tools open the Japanese
//! text correctly. Post files round-trip through `read_posts`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ExportSink;
use crate::archive::HistoryAnalysis;
use crate::content::models::day_label;
use crate::content::{Category, Post};
use crate::errors::AppError;
use crate::publish::PublishOutcome;

const BOM: &str = "\u{FEFF}";

/// Characters of post text shown in the schedule file.
const SCHEDULE_PREVIEW_CHARS: usize = 50;

/// Column order of post files, shared with the spreadsheet sink.
pub const POST_COLUMNS: [&str; 7] = [
    "date",
    "day",
    "animal_type",
    "theme",
    "post_text",
    "character_count",
    "scheduled_time",
];

// ────────────────────────────────────────────────────────────────────────────
// Row types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub date: String,
    pub day: String,
    pub animal_type: String,
    pub theme: String,
    pub post_text: String,
    pub character_count: usize,
    pub scheduled_time: String,
}

impl From<&Post> for PostRow {
    fn from(post: &Post) -> Self {
        Self {
            date: post.date.format("%Y-%m-%d").to_string(),
            day: day_label(post.day).to_string(),
            animal_type: post.category.label().to_string(),
            theme: post.topic.clone(),
            post_text: post.text.clone(),
            character_count: post.length,
            scheduled_time: post.scheduled_slot.clone(),
        }
    }
}

impl PostRow {
    /// Cell values in `POST_COLUMNS` order.
    pub fn values(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.day.clone(),
            self.animal_type.clone(),
            self.theme.clone(),
            self.post_text.clone(),
            self.character_count.to_string(),
            self.scheduled_time.clone(),
        ]
    }

    /// Rebuilds the post. The stored character count is ignored and recomputed.
    pub fn into_post(self) -> Result<Post, AppError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| AppError::Validation(format!("invalid date '{}': {e}", self.date)))?;
        let category: Category = self.animal_type.parse().map_err(AppError::Validation)?;
        Ok(Post::new(date, category, self.theme, self.post_text))
    }
}

#[derive(Debug, Serialize)]
struct ScheduleRow<'a> {
    #[serde(rename = "投稿日")]
    date: String,
    #[serde(rename = "曜日")]
    day: &'static str,
    #[serde(rename = "時刻")]
    time: &'a str,
    #[serde(rename = "動物種")]
    animal_type: &'static str,
    #[serde(rename = "テーマ")]
    theme: &'a str,
    #[serde(rename = "文字数")]
    character_count: usize,
    #[serde(rename = "投稿文(冒頭50文字)")]
    preview: String,
}

#[derive(Debug, Serialize)]
struct AnalysisRow {
    #[serde(rename = "分析項目")]
    item: String,
    #[serde(rename = "内容")]
    content: String,
    #[serde(rename = "動物種")]
    animal_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "投稿日時")]
    posted_at: String,
    #[serde(rename = "動物種")]
    animal_type: &'static str,
    #[serde(rename = "テーマ")]
    theme: &'a str,
    #[serde(rename = "投稿文")]
    text: &'a str,
    #[serde(rename = "文字数")]
    character_count: usize,
    #[serde(rename = "投稿ID")]
    remote_id: &'a str,
    #[serde(rename = "投稿結果")]
    result: &'static str,
    #[serde(rename = "エラー内容")]
    error: &'a str,
}

// ────────────────────────────────────────────────────────────────────────────
// Exporter
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    /// Creates the output directory if it does not exist yet.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `{prefix}_posts.csv`.
    pub fn export_posts(&self, posts: &[Post], prefix: &str) -> Result<PathBuf, AppError> {
        let rows = posts.iter().map(PostRow::from);
        let path = self.write_rows(&format!("{prefix}_posts.csv"), rows)?;
        info!("Exported {} posts to {}", posts.len(), path.display());
        Ok(path)
    }

    /// Both categories in one file, ordered by date (cat before dog on the same day).
    pub fn export_combined(
        &self,
        cat: &[Post],
        dog: &[Post],
        prefix: &str,
    ) -> Result<PathBuf, AppError> {
        let mut combined: Vec<Post> = cat.iter().chain(dog).cloned().collect();
        combined.sort_by_key(|p| (p.date, p.category));
        self.export_posts(&combined, prefix)
    }

    /// Writes `{prefix}_schedule.csv` with a short preview of each post.
    pub fn export_schedule(&self, posts: &[Post], prefix: &str) -> Result<PathBuf, AppError> {
        let rows = posts.iter().map(|post| ScheduleRow {
            date: post.date.format("%Y-%m-%d").to_string(),
            day: day_label(post.day),
            time: &post.scheduled_slot,
            animal_type: post.category.label(),
            theme: &post.topic,
            character_count: post.length,
            preview: preview(&post.text),
        });
        let path = self.write_rows(&format!("{prefix}_schedule.csv"), rows)?;
        info!("Exported posting schedule to {}", path.display());
        Ok(path)
    }

    /// Writes `{prefix}_{category}_analysis.csv`.
    pub fn export_analysis(
        &self,
        analysis: &HistoryAnalysis,
        prefix: &str,
    ) -> Result<PathBuf, AppError> {
        let animal_type = analysis.category.label();
        let mut rows: Vec<AnalysisRow> = analysis
            .themes
            .iter()
            .map(|theme| AnalysisRow {
                item: "最近のテーマ".to_string(),
                content: theme.clone(),
                animal_type,
            })
            .collect();
        for (month, topics) in &analysis.monthly_topics {
            rows.extend(topics.iter().map(|topic| AnalysisRow {
                item: format!("{month}月のテーマ"),
                content: topic.clone(),
                animal_type,
            }));
        }
        rows.push(AnalysisRow {
            item: "過去3ヶ月の投稿数".to_string(),
            content: analysis.total_posts.to_string(),
            animal_type,
        });

        let name = format!("{prefix}_{}_analysis.csv", analysis.category.key());
        let path = self.write_rows(&name, rows)?;
        info!("Exported {animal_type} analysis to {}", path.display());
        Ok(path)
    }

    /// Writes `{prefix}_posting_report.csv`, one row per publish outcome.
    pub fn export_publish_report(
        &self,
        posts: &[Post],
        outcomes: &[PublishOutcome],
        prefix: &str,
    ) -> Result<PathBuf, AppError> {
        let rows = outcomes.iter().filter_map(|outcome| {
            let post = posts.iter().find(|p| p.id == outcome.post_id)?;
            Some(ReportRow {
                posted_at: outcome.posted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                animal_type: post.category.label(),
                theme: &post.topic,
                text: &post.text,
                character_count: post.length,
                remote_id: outcome.remote_id.as_deref().unwrap_or_default(),
                result: if outcome.success { "成功" } else { "失敗" },
                error: outcome.error.as_deref().unwrap_or_default(),
            })
        });
        let path = self.write_rows(&format!("{prefix}_posting_report.csv"), rows)?;
        info!("Exported posting report to {}", path.display());
        Ok(path)
    }

    /// Reads a post file written by `export_posts`.
    pub fn read_posts(path: &Path) -> Result<Vec<Post>, AppError> {
        let content = fs::read_to_string(path)?;
        let content = content.strip_prefix(BOM).unwrap_or(&content);
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        reader
            .deserialize::<PostRow>()
            .map(|row| row?.into_post())
            .collect()
    }

    /// CSV files in the output directory, sorted by name. A missing directory is empty.
    pub fn list_output_files(&self) -> Result<Vec<PathBuf>, AppError> {
        if !self.output_dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.output_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_csv(path))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Deletes CSV files last modified more than `keep_days` days ago.
    pub fn cleanup_old_files(&self, keep_days: u64) -> Result<usize, AppError> {
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(keep_days * 24 * 60 * 60))
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.cleanup_older_than(cutoff)
    }

    fn cleanup_older_than(&self, cutoff: SystemTime) -> Result<usize, AppError> {
        let mut deleted = 0;
        for path in self.list_output_files()? {
            let modified = fs::metadata(&path)?.modified()?;
            if modified < cutoff {
                fs::remove_file(&path)?;
                info!("Deleted old output file {}", path.display());
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn write_rows<I, R>(&self, file_name: &str, rows: I) -> Result<PathBuf, AppError>
    where
        I: IntoIterator<Item = R>,
        R: Serialize,
    {
        let path = self.output_dir.join(file_name);
        let mut file = File::create(&path)?;
        file.write_all(BOM.as_bytes())?;

        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(path)
    }
}

#[async_trait]
impl ExportSink for CsvExporter {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn export(&self, posts: &[Post], label: &str) -> Result<String, AppError> {
        let path = self.export_posts(posts, label)?;
        Ok(path.display().to_string())
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > SCHEDULE_PREVIEW_CHARS {
        let head: String = text.chars().take(SCHEDULE_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "csv")
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::*;

    fn sample_posts() -> Vec<Post> {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();
        vec![
            Post::new(
                monday + ChronoDuration::days(1),
                Category::Dog,
                "犬の散歩",
                "【昨日のクイズの答え】正解はA,「朝夕」です。\n\n#獣医が教える犬のはなし",
            ),
            Post::new(monday, Category::Cat, "猫の睡眠", "【猫の睡眠】よく眠ります🐱\n\n#猫のあれこれ"),
            Post::new(monday, Category::Dog, "犬の散歩", "【散歩クイズ】A. 朝 B. 昼\n\n#獣医が教える犬のはなし"),
        ]
    }

    #[test]
    fn test_posts_file_has_bom_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let path = exporter.export_posts(&sample_posts(), "2026-10-26").unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM.as_bytes()));
        let text = String::from_utf8(bytes).unwrap();
        let header = text.trim_start_matches(BOM).lines().next().unwrap();
        assert_eq!(header, POST_COLUMNS.join(","));
        assert!(path.ends_with("2026-10-26_posts.csv"));
    }

    #[test]
    fn test_read_posts_restores_exported_posts() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let posts = sample_posts();
        let path = exporter.export_posts(&posts, "week").unwrap();

        let restored = CsvExporter::read_posts(&path).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored[0].text, posts[0].text);
        assert_eq!(restored[0].category, Category::Dog);
        assert_eq!(restored[0].length, posts[0].length);
        assert_eq!(restored[1].scheduled_slot, "07:00");
    }

    #[test]
    fn test_read_posts_rejects_unknown_category() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(
            &path,
            "date,day,animal_type,theme,post_text,character_count,scheduled_time\n\
             2026-10-26,月曜,鳥,t,text,4,07:00\n",
        )
        .unwrap();
        assert!(matches!(CsvExporter::read_posts(&path), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_combined_export_orders_by_date_then_category() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let posts = sample_posts();
        let (cat, dog): (Vec<Post>, Vec<Post>) =
            posts.into_iter().partition(|p| p.category == Category::Cat);

        let path = exporter.export_combined(&cat, &dog, "combined").unwrap();
        let restored = CsvExporter::read_posts(&path).unwrap();
        let order: Vec<(NaiveDate, Category)> = restored.iter().map(|p| (p.date, p.category)).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
        assert_eq!(restored[0].category, Category::Cat);
    }

    #[test]
    fn test_schedule_preview_is_truncated() {
        let long = "あ".repeat(60);
        assert_eq!(preview(&long), format!("{}...", "あ".repeat(50)));
        assert_eq!(preview("短い"), "短い");

        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let path = exporter.export_schedule(&sample_posts(), "week").unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("投稿日,曜日,時刻,動物種,テーマ,文字数,投稿文(冒頭50文字)"));
        assert!(text.contains("火曜"));
    }

    #[test]
    fn test_analysis_export_lists_themes_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let mut analysis = HistoryAnalysis::empty(Category::Cat);
        analysis.themes = vec!["猫の睡眠".to_string()];
        analysis.monthly_topics.insert(10, vec!["猫の睡眠".to_string()]);
        analysis.total_posts = 4;

        let path = exporter.export_analysis(&analysis, "2026-10-19").unwrap();
        assert!(path.ends_with("2026-10-19_cat_analysis.csv"));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("最近のテーマ,猫の睡眠,猫"));
        assert!(text.contains("10月のテーマ,猫の睡眠,猫"));
        assert!(text.contains("過去3ヶ月の投稿数,4,猫"));
    }

    #[test]
    fn test_publish_report_marks_results() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let posts = sample_posts();
        let posted_at = Utc.with_ymd_and_hms(2026, 10, 26, 7, 0, 0).unwrap();
        let outcomes = vec![
            PublishOutcome::succeeded(&posts[1], posted_at, "1234".to_string()),
            PublishOutcome::failed(&posts[2], posted_at, "rate limited".to_string()),
        ];

        let path = exporter.export_publish_report(&posts, &outcomes, "2026-10-26").unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("1234,成功,"));
        assert!(text.contains(",失敗,rate limited"));
    }

    #[test]
    fn test_listing_and_cleanup_only_touch_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        exporter.export_posts(&sample_posts(), "a").unwrap();
        exporter.export_schedule(&sample_posts(), "a").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(exporter.list_output_files().unwrap().len(), 2);
        assert_eq!(exporter.cleanup_older_than(SystemTime::UNIX_EPOCH).unwrap(), 0);
        assert_eq!(exporter.cleanup_old_files(30).unwrap(), 0);

        let future = SystemTime::now() + Duration::from_secs(3600);
        assert_eq!(exporter.cleanup_older_than(future).unwrap(), 2);
        assert!(exporter.list_output_files().unwrap().is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }
}
