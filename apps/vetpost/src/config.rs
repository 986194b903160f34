use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};

use crate::content::pipeline::RetryPolicy;
use crate::errors::AppError;

/// Application configuration loaded from environment variables (and `.env` if present).
///
/// Only settings with a safe default are resolved eagerly. Credentials for external
/// services stay optional here and are demanded by the commands that need them.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub output_dir: PathBuf,
    pub archive_path: PathBuf,
    pub generation_max_attempts: u32,
    pub generation_backoff: Duration,
    pub schedule_weekday: Weekday,
    pub schedule_time: NaiveTime,
    pub output_retention_days: u64,
    pub sheets_spreadsheet_id: Option<String>,
    pub sheets_access_token: Option<String>,
    pub sheets_sheet_name: Option<String>,
    pub x_access_token: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let schedule_weekday = Weekday::from_str(&env_or("SCHEDULE_WEEKDAY", "sun"))
            .map_err(|_| anyhow::anyhow!("SCHEDULE_WEEKDAY must be a weekday name (e.g. 'sun')"))?;

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "output")),
            archive_path: PathBuf::from(env_or("TWEETS_ARCHIVE_PATH", "tweets.js")),
            generation_max_attempts: env_or("GENERATION_MAX_ATTEMPTS", "3")
                .parse::<u32>()
                .context("GENERATION_MAX_ATTEMPTS must be a positive integer")?
                .max(1),
            generation_backoff: Duration::from_secs(
                env_or("GENERATION_BACKOFF_SECS", "5")
                    .parse::<u64>()
                    .context("GENERATION_BACKOFF_SECS must be a whole number of seconds")?,
            ),
            schedule_weekday,
            schedule_time: NaiveTime::parse_from_str(&env_or("SCHEDULE_TIME", "20:00"), "%H:%M")
                .context("SCHEDULE_TIME must be formatted as HH:MM")?,
            output_retention_days: env_or("OUTPUT_RETENTION_DAYS", "30")
                .parse::<u64>()
                .context("OUTPUT_RETENTION_DAYS must be a whole number of days")?,
            sheets_spreadsheet_id: optional_env("GOOGLE_SHEETS_SPREADSHEET_ID"),
            sheets_access_token: optional_env("GOOGLE_SHEETS_ACCESS_TOKEN"),
            sheets_sheet_name: optional_env("GOOGLE_SHEETS_SHEET_NAME"),
            x_access_token: optional_env("X_ACCESS_TOKEN"),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Retry policy for the weekly generation pipeline.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.generation_max_attempts,
            backoff: self.generation_backoff,
        }
    }

    /// The Gemini key is only required by commands that call the generation service.
    pub fn require_gemini_key(&self) -> Result<&str, AppError> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            AppError::Config("Required environment variable 'GEMINI_API_KEY' is not set".to_string())
        })
    }

    /// Spreadsheet sync is enabled only when both the id and a token are present.
    pub fn sheets_credentials(&self) -> Option<(&str, &str)> {
        match (&self.sheets_spreadsheet_id, &self.sheets_access_token) {
            (Some(id), Some(token)) => Some((id.as_str(), token.as_str())),
            _ => None,
        }
    }

    /// Names of optional integrations that are not configured, for the `check` command.
    pub fn missing_integrations(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gemini_api_key.is_none() {
            missing.push("GEMINI_API_KEY");
        }
        if self.sheets_spreadsheet_id.is_none() {
            missing.push("GOOGLE_SHEETS_SPREADSHEET_ID");
        }
        if self.sheets_access_token.is_none() {
            missing.push("GOOGLE_SHEETS_ACCESS_TOKEN");
        }
        if self.x_access_token.is_none() {
            missing.push("X_ACCESS_TOKEN");
        }
        missing
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
