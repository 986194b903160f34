// Export sinks: finished posts leave the core through ExportSink.
// CsvExporter writes local files; SheetsSink mirrors the same rows to a spreadsheet.

pub mod csv_exporter;
pub mod sheets;

use async_trait::async_trait;

use crate::content::Post;
use crate::errors::AppError;

pub use csv_exporter::CsvExporter;
pub use sheets::SheetsSink;

/// Accepts a flat list of posts and persists it. Returns where the posts went
/// (a file path or a URL) for logging.
#[async_trait]
pub trait ExportSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// `label` distinguishes one export from another (e.g. the week's Monday).
    async fn export(&self, posts: &[Post], label: &str) -> Result<String, AppError>;
}
