//! Command handlers for the CLI. Each returns `Result<_, AppError>`; `main` maps errors
//! to exit codes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use tracing::{info, warn};

use crate::archive::load_histories;
use crate::config::Config;
use crate::content::models::{
    next_week_start, week_start_of, RecentThemeHistory, WeeklyBatch, SLOTS_PER_WEEK,
};
use crate::content::themes::select;
use crate::content::validator::validate;
use crate::content::{Category, ContentPipeline, Post, WeeklyContent};
use crate::errors::AppError;
use crate::export::{CsvExporter, ExportSink, SheetsSink};
use crate::llm_client::{LlmClient, TextGenerator};
use crate::publish::{publish_posts, XPublisher};
use crate::scheduler::{run_weekly, WeeklySchedule};

/// Pause between consecutive posts when publishing a file.
const PUBLISH_PAUSE: Duration = Duration::from_secs(5);

// ────────────────────────────────────────────────────────────────────────────
// generate
// ────────────────────────────────────────────────────────────────────────────

/// Generates next week's posts for both categories and exports them.
pub async fn run_generate(config: &Config) -> Result<(), AppError> {
    let llm = LlmClient::new(config.require_gemini_key()?.to_string())?;
    let today = Local::now().date_naive();
    generate_week(llm, config, today).await?;
    Ok(())
}

/// Runs the pipeline for the week after `today` and writes every export.
/// Returns the path of the combined posts file.
pub async fn generate_week<G: TextGenerator>(
    generator: G,
    config: &Config,
    today: NaiveDate,
) -> Result<PathBuf, AppError> {
    let (histories, analyses) = load_histories(&config.archive_path, today);
    let pipeline = ContentPipeline::new(generator, config.retry_policy());
    let content = pipeline.run_week(next_week_start(today), &histories).await;

    let exporter = CsvExporter::new(&config.output_dir)?;
    let prefix = week_prefix(&content);
    let posts_path = exporter.export_combined(
        content.batch(Category::Cat).posts(),
        content.batch(Category::Dog).posts(),
        &prefix,
    )?;

    let mut schedule = content.all_posts();
    schedule.sort_by_key(|p| (p.date, p.category));
    exporter.export_schedule(&schedule, &prefix)?;
    for analysis in &analyses {
        exporter.export_analysis(analysis, &prefix)?;
    }

    if let Some((spreadsheet_id, token)) = config.sheets_credentials() {
        let mut sink = SheetsSink::new(spreadsheet_id, token)?;
        if let Some(sheet_name) = &config.sheets_sheet_name {
            sink = sink.with_sheet_name(sheet_name);
        }
        sync_sheets(&sink, &schedule, &prefix).await;
    }

    match exporter.cleanup_old_files(config.output_retention_days) {
        Ok(0) => {}
        Ok(n) => info!("Removed {n} output files older than {} days", config.output_retention_days),
        Err(e) => warn!("Output cleanup failed: {e}"),
    }

    if !content.fallback_categories.is_empty() {
        warn!(
            "Week of {} used fallback content for {:?}",
            content.week_of, content.fallback_categories
        );
    }
    info!(
        "Week of {} exported to {} after {} generation attempt(s)",
        content.week_of,
        posts_path.display(),
        content.attempts
    );
    Ok(posts_path)
}

fn week_prefix(content: &WeeklyContent) -> String {
    format!("week_{}", content.week_of.format("%Y%m%d"))
}

/// Spreadsheet sync is best effort; the CSV files are the record.
async fn sync_sheets(sink: &dyn ExportSink, posts: &[Post], label: &str) {
    match sink.export(posts, label).await {
        Ok(location) => info!("Synced {} posts to {}", posts.len(), location),
        Err(e) => warn!(code = e.code(), "Spreadsheet sync via {} failed: {e}", sink.name()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// daily
// ────────────────────────────────────────────────────────────────────────────

/// Generates a single post for `category` on `date` (default: today).
pub async fn run_daily(
    config: &Config,
    category: Category,
    date: Option<NaiveDate>,
) -> Result<Post, AppError> {
    let llm = LlmClient::new(config.require_gemini_key()?.to_string())?;
    let today = Local::now().date_naive();
    daily_post(llm, config, category, date.unwrap_or(today), today).await
}

pub async fn daily_post<G: TextGenerator>(
    generator: G,
    config: &Config,
    category: Category,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<Post, AppError> {
    let (histories, _) = load_histories(&config.archive_path, today);
    let history = histories.for_category(category);

    let topic = daily_topic(history, category, date);

    let pipeline = ContentPipeline::new(generator, config.retry_policy());
    let post = pipeline.generate_single(category, date, &topic, history).await;

    let exporter = CsvExporter::new(&config.output_dir)?;
    let prefix = format!("daily_{}_{}", category.key(), date.format("%Y%m%d"));
    exporter.export_posts(std::slice::from_ref(&post), &prefix)?;

    println!("{} ({} chars)\n{}", post.topic, post.length, post.text);
    Ok(post)
}

/// The topic the weekly plan gives `date`. The plan is selected by its Monday's month.
fn daily_topic(history: &RecentThemeHistory, category: Category, date: NaiveDate) -> String {
    let topics = select(history, category, week_start_of(date).month());
    topics[date.weekday().num_days_from_monday() as usize].clone()
}

// ────────────────────────────────────────────────────────────────────────────
// analyze
// ────────────────────────────────────────────────────────────────────────────

/// Summarizes recent archive topics per category and exports the analysis.
pub fn run_analyze(config: &Config) -> Result<Vec<PathBuf>, AppError> {
    let today = Local::now().date_naive();
    let (_, analyses) = load_histories(&config.archive_path, today);

    let exporter = CsvExporter::new(&config.output_dir)?;
    let prefix = format!("analysis_{}", today.format("%Y%m%d"));
    let mut paths = Vec::with_capacity(analyses.len());
    for analysis in &analyses {
        println!(
            "{}: {} posts, {} distinct topics",
            analysis.category.label(),
            analysis.total_posts,
            analysis.themes.len()
        );
        for topic in analysis.recent_topics.iter().take(10) {
            println!("  - {topic}");
        }
        paths.push(exporter.export_analysis(analysis, &prefix)?);
    }
    Ok(paths)
}

// ────────────────────────────────────────────────────────────────────────────
// schedule
// ────────────────────────────────────────────────────────────────────────────

/// Runs `generate` every week at the configured time until interrupted.
pub async fn run_schedule(config: &Config) -> Result<(), AppError> {
    config.require_gemini_key()?;
    let schedule = WeeklySchedule::new(config.schedule_weekday, config.schedule_time);
    run_weekly(schedule, || run_generate(config)).await
}

// ────────────────────────────────────────────────────────────────────────────
// publish
// ────────────────────────────────────────────────────────────────────────────

/// Publishes the posts in `file` dated `date` (default: today).
pub async fn run_publish(
    config: &Config,
    file: &Path,
    date: Option<NaiveDate>,
    dry_run: bool,
) -> Result<(), AppError> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let all_posts = CsvExporter::read_posts(file)?;
    for warning in week_warnings(&all_posts) {
        warn!("{}: {warning}", file.display());
    }
    let posts = posts_on(all_posts, date);
    if posts.is_empty() {
        info!("No posts dated {date} in {}", file.display());
        return Ok(());
    }

    if dry_run {
        for post in &posts {
            println!(
                "[{} {} {}] {} ({} chars)\n{}\n",
                post.scheduled_slot,
                post.category,
                post.role().label(),
                post.topic,
                post.length,
                post.text
            );
        }
        info!("Dry run: {} posts not published", posts.len());
        return Ok(());
    }

    let token = config.x_access_token.as_deref().ok_or_else(|| {
        AppError::Config("Required environment variable 'X_ACCESS_TOKEN' is not set".to_string())
    })?;
    let publisher = XPublisher::new(token)?;
    let account = publisher.verify_credentials().await?;
    info!("Publishing {} posts as @{account}", posts.len());

    let outcomes = publish_posts(&publisher, &posts, PUBLISH_PAUSE).await;

    let exporter = CsvExporter::new(&config.output_dir)?;
    exporter.export_publish_report(&posts, &outcomes, &format!("publish_{}", date.format("%Y%m%d")))?;

    let failed = outcomes.iter().filter(|o| !o.success).count();
    if failed > 0 {
        return Err(AppError::Publish(format!("{failed} of {} posts failed", outcomes.len())));
    }
    Ok(())
}

fn posts_on(posts: Vec<Post>, date: NaiveDate) -> Vec<Post> {
    let mut posts: Vec<Post> = posts.into_iter().filter(|p| p.date == date).collect();
    posts.sort_by(|a, b| a.scheduled_slot.cmp(&b.scheduled_slot));
    posts
}

/// Re-validates every complete week in a posts file. Partial weeks (daily files) are skipped.
fn week_warnings(posts: &[Post]) -> Vec<String> {
    let mut weeks: BTreeMap<(Category, NaiveDate), Vec<Post>> = BTreeMap::new();
    for post in posts {
        weeks
            .entry((post.category, week_start_of(post.date)))
            .or_default()
            .push(post.clone());
    }

    let mut warnings = Vec::new();
    for ((category, monday), mut week) in weeks {
        if week.len() != SLOTS_PER_WEEK {
            continue;
        }
        week.sort_by_key(|p| p.date);
        match WeeklyBatch::new(category, week) {
            Ok(batch) if validate(&batch) => {}
            Ok(_) => warnings.push(format!("{category} week of {monday} fails quiz/answer checks")),
            Err(e) => warnings.push(format!("{category} week of {monday} is malformed: {e}")),
        }
    }
    warnings
}

// ────────────────────────────────────────────────────────────────────────────
// check
// ────────────────────────────────────────────────────────────────────────────

/// Reports which integrations are configured and whether the local paths are usable.
pub fn run_check(config: &Config) -> Result<(), AppError> {
    let missing = config.missing_integrations();
    if missing.is_empty() {
        println!("All integrations configured");
    } else {
        println!("Not configured: {}", missing.join(", "));
    }

    if config.archive_path.exists() {
        println!("Archive: {}", config.archive_path.display());
    } else {
        println!("Archive: {} (missing, history will be empty)", config.archive_path.display());
    }

    let exporter = CsvExporter::new(&config.output_dir)?;
    let files = exporter.list_output_files()?;
    println!("Output: {} ({} CSV files)", exporter.output_dir().display(), files.len());
    println!(
        "Schedule: every {} at {}",
        config.schedule_weekday,
        config.schedule_time.format("%H:%M")
    );

    config.require_gemini_key()?;
    Ok(())
}
