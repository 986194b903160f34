// Content core: topic selection, cleaning, length normalization, pair validation,
// deterministic fallbacks and the weekly generation pipeline.
// All generation calls go through the TextGenerator seam in llm_client.

pub mod cleaner;
pub mod fallback;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod themes;
pub mod validator;

// Re-export the public API consumed by commands and export sinks.
pub use models::{Category, Post};
pub use pipeline::{ContentPipeline, WeeklyContent};
