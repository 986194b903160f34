//! Publishing service: posts finished texts to X (API v2).
//!
//! Publishing is outside the content core: the pipeline never depends on it, and a
//! failed publish is reported per post instead of aborting the run.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::content::models::char_count;
use crate::content::Post;
use crate::errors::AppError;

const X_API_BASE: &str = "https://api.x.com/2";

/// Platform limit on a single post, in characters.
pub const MAX_POST_CHARS: usize = 280;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `text` and returns the platform's id for the new post.
    async fn publish(&self, text: &str) -> Result<String, AppError>;
}

/// Result of publishing one post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishOutcome {
    pub post_id: Uuid,
    pub posted_at: DateTime<Utc>,
    pub success: bool,
    pub remote_id: Option<String>,
    pub error: Option<String>,
}

impl PublishOutcome {
    pub fn succeeded(post: &Post, posted_at: DateTime<Utc>, remote_id: String) -> Self {
        Self {
            post_id: post.id,
            posted_at,
            success: true,
            remote_id: Some(remote_id),
            error: None,
        }
    }

    pub fn failed(post: &Post, posted_at: DateTime<Utc>, error: String) -> Self {
        Self {
            post_id: post.id,
            posted_at,
            success: false,
            remote_id: None,
            error: Some(error),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// X client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    data: CreatedPost,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    data: MeData,
}

#[derive(Debug, Deserialize)]
struct MeData {
    username: String,
}

/// Posts through `POST /2/tweets` with an OAuth 2.0 user access token.
#[derive(Clone)]
pub struct XPublisher {
    client: Client,
    access_token: String,
}

impl XPublisher {
    pub fn new(access_token: &str) -> Result<Self, AppError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            access_token: access_token.to_string(),
        })
    }

    /// Checks the token by fetching the authenticated account. Returns its username.
    pub async fn verify_credentials(&self) -> Result<String, AppError> {
        let response = self
            .client
            .get(format!("{X_API_BASE}/users/me"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Publish(format!("credential check failed ({status}): {body}")));
        }
        let me: MeResponse = response.json().await?;
        Ok(me.data.username)
    }
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, text: &str) -> Result<String, AppError> {
        check_length(text)?;

        let response = self
            .client
            .post(format!("{X_API_BASE}/tweets"))
            .bearer_auth(&self.access_token)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Publish("rate limited; try again later".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Publish(format!("status {status}: {body}")));
        }

        let created: CreatePostResponse = response.json().await?;
        Ok(created.data.id)
    }
}

fn check_length(text: &str) -> Result<(), AppError> {
    let length = char_count(text);
    if length > MAX_POST_CHARS {
        return Err(AppError::Publish(format!(
            "post is {length} characters, limit is {MAX_POST_CHARS}"
        )));
    }
    Ok(())
}

/// Publishes `posts` in order, pausing `pause` between posts. Failures are recorded,
/// not propagated.
pub async fn publish_posts<P>(publisher: &P, posts: &[Post], pause: Duration) -> Vec<PublishOutcome>
where
    P: Publisher + ?Sized,
{
    let mut outcomes = Vec::with_capacity(posts.len());
    for (i, post) in posts.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let posted_at = Utc::now();
        let outcome = match publisher.publish(&post.text).await {
            Ok(remote_id) => {
                info!("Published {} post for {} as {remote_id}", post.category, post.date);
                PublishOutcome::succeeded(post, posted_at, remote_id)
            }
            Err(e) => {
                warn!("Publishing {} post for {} failed: {e}", post.category, post.date);
                PublishOutcome::failed(post, posted_at, e.to_string())
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;
    use crate::content::Category;

    /// Records published texts; fails any text containing "FAIL".
    struct RecordingPublisher {
        published: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, text: &str) -> Result<String, AppError> {
            check_length(text)?;
            if text.contains("FAIL") {
                return Err(AppError::Publish("forbidden".to_string()));
            }
            let mut published = self.published.lock().unwrap();
            published.push(text.to_string());
            Ok(format!("id-{}", published.len()))
        }
    }

    fn post(text: &str) -> Post {
        let date = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();
        Post::new(date, Category::Cat, "猫の睡眠", text)
    }

    #[test]
    fn test_length_limit_counts_characters() {
        assert!(check_length(&"猫".repeat(MAX_POST_CHARS)).is_ok());
        assert!(matches!(
            check_length(&"猫".repeat(MAX_POST_CHARS + 1)),
            Err(AppError::Publish(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_posts_records_each_outcome() {
        let publisher = RecordingPublisher {
            published: Mutex::new(Vec::new()),
        };
        let posts = vec![post("first"), post("FAIL here"), post(&"x".repeat(300)), post("last")];

        let outcomes = publish_posts(&publisher, &posts, Duration::ZERO).await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].remote_id.as_deref(), Some("id-1"));
        assert!(!outcomes[1].success);
        assert_eq!(outcomes[1].error.as_deref(), Some("Publish error: forbidden"));
        assert!(!outcomes[2].success);
        assert!(outcomes[3].success);
        assert_eq!(outcomes[3].post_id, posts[3].id);
        assert_eq!(publisher.published.lock().unwrap().len(), 2);
    }
}
