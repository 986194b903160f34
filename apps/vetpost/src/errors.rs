use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Every command handler returns `Result<T, AppError>`; `main` turns it into an exit code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet sync error: {0}")]
    Sheets(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, logged alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Archive(_) => "ARCHIVE_ERROR",
            AppError::Csv(_) => "CSV_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Sheets(_) => "SHEETS_ERROR",
            AppError::Publish(_) => "PUBLISH_ERROR",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Process exit code for the CLI. Usage/config problems are distinguished from runtime failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Validation(_) => 2,
            _ => 1,
        }
    }

    /// Logs the error at the appropriate level and returns the exit code.
    pub fn report(&self) -> i32 {
        match self {
            AppError::Config(msg) | AppError::Validation(msg) => {
                tracing::error!(code = self.code(), "{msg}");
            }
            AppError::Internal(e) => {
                tracing::error!(code = self.code(), "Internal error: {e:?}");
            }
            other => {
                tracing::error!(code = other.code(), "{other}");
            }
        }
        self.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_exit_with_usage_code() {
        assert_eq!(AppError::Config("missing key".into()).exit_code(), 2);
        assert_eq!(AppError::Validation("bad date".into()).exit_code(), 2);
    }

    #[test]
    fn test_runtime_errors_exit_with_failure_code() {
        assert_eq!(AppError::Publish("rate limited".into()).exit_code(), 1);
        assert_eq!(AppError::Llm(LlmError::EmptyContent).code(), "LLM_ERROR");
    }
}
