//! Spreadsheet export sink (Google Sheets values API).
//!
//! The sheet is cleared and rewritten on every export. Each post row gets the
//! bookkeeping columns an auto-posting workflow fills in later.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::csv_exporter::{PostRow, POST_COLUMNS};
use super::ExportSink;
use crate::content::Post;
use crate::errors::AppError;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_SHEET: &str = "Posts";

/// Bookkeeping columns appended after the post columns, with their initial values.
pub const AUTO_POST_COLUMNS: [(&str, &str); 6] = [
    ("投稿状況", "未投稿"),
    ("投稿日時", ""),
    ("投稿URL", ""),
    ("エラー情報", ""),
    ("手動確認", "要確認"),
    ("備考", ""),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    updated_cells: u64,
}

#[derive(Clone)]
pub struct SheetsSink {
    client: Client,
    spreadsheet_id: String,
    access_token: String,
    sheet_name: String,
}

impl SheetsSink {
    pub fn new(spreadsheet_id: &str, access_token: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
            sheet_name: DEFAULT_SHEET.to_string(),
        })
    }

    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }

    pub fn spreadsheet_url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}", self.spreadsheet_id)
    }

    /// Replaces the sheet contents with `posts`. Returns the number of updated cells.
    pub async fn upload(&self, posts: &[Post]) -> Result<u64, AppError> {
        let values = prepare_rows(posts);

        let clear_url = format!(
            "{SHEETS_API_BASE}/{}/values/{}!A:Z:clear",
            self.spreadsheet_id, self.sheet_name
        );
        let response = self
            .client
            .post(&clear_url)
            .bearer_auth(&self.access_token)
            .json(&json!({}))
            .send()
            .await?;
        check_status(response).await?;

        let update_url = format!(
            "{SHEETS_API_BASE}/{}/values/{}!A1",
            self.spreadsheet_id, self.sheet_name
        );
        let response = self
            .client
            .put(&update_url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": values }))
            .send()
            .await?;
        let updated: UpdateResponse = check_status(response).await?.json().await?;

        info!(
            "Uploaded {} rows to sheet '{}' ({} cells updated)",
            values.len().saturating_sub(1),
            self.sheet_name,
            updated.updated_cells
        );
        Ok(updated.updated_cells)
    }
}

#[async_trait]
impl ExportSink for SheetsSink {
    fn name(&self) -> &'static str {
        "sheets"
    }

    async fn export(&self, posts: &[Post], _label: &str) -> Result<String, AppError> {
        self.upload(posts).await?;
        Ok(self.spreadsheet_url())
    }
}

/// Header row plus one row per post, each extended with the bookkeeping columns.
pub fn prepare_rows(posts: &[Post]) -> Vec<Vec<String>> {
    let header = POST_COLUMNS
        .iter()
        .chain(AUTO_POST_COLUMNS.iter().map(|(name, _)| name))
        .map(|s| s.to_string())
        .collect();

    let mut rows = vec![header];
    rows.extend(posts.iter().map(|post| {
        let mut row = PostRow::from(post).values();
        row.extend(AUTO_POST_COLUMNS.iter().map(|(_, default)| default.to_string()));
        row
    }));
    rows
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Sheets(format!("status {status}: {body}")))
}
