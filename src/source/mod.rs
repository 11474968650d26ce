//! Caption data sources.
//!
//! A source turns a free-text video description into a timestamped caption
//! script. Every source returns structurally validated captions or fails as
//! a whole; there are no partial results.
//!
//! # Architecture
//!
//! - [`CaptionSource`]: async trait implemented by every backend
//! - [`GeminiSource`]: hosted LLM with a fixed prompt and JSON response schema
//! - [`FileSource`]: replays a caption JSON file from disk
//!
//! # Example
//!
//! ```rust,no_run
//! use rucap::source::{CaptionSource, GeminiSource};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let source = GeminiSource::new("my-api-key")?;
//! let captions = source.generate("A street food vlog in Lahore").await?;
//! println!("{} phrases", captions.len());
//! # Ok(())
//! # }
//! ```

mod gemini;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

pub use gemini::{GeminiSource, DEFAULT_API_BASE, DEFAULT_MODEL};

use crate::caption::{parse_captions, Caption};
use crate::error::SourceError;

/// Produces a caption script for a description.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Generate captions. One call per user action; no retries.
    async fn generate(&self, description: &str) -> Result<Vec<Caption>, SourceError>;
}

/// Reads captions from a JSON file instead of calling a generator.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CaptionSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn generate(&self, _description: &str) -> Result<Vec<Caption>, SourceError> {
        let json = tokio::fs::read_to_string(&self.path).await?;
        let captions = parse_captions(&json)?;
        info!(path = %self.path.display(), count = captions.len(), "captions loaded from file");
        Ok(captions)
    }
}
