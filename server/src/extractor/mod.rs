use crate::model::VideoMetadata;
use async_trait::async_trait;
use std::{error::Error, fmt};

pub mod ytdlp;

#[derive(Debug, Clone)]
pub enum ExtractError {
    /// The video is gone, private, or otherwise restricted.
    Unavailable(String),
    /// The extractor's knowledge of the platform is out of date
    /// (signature/extraction failures).
    Stale(String),
    /// The extractor binary is missing or could not be spawned.
    Tool(String),
    /// The extractor did not answer within the configured timeout.
    Timeout,
    /// The extractor produced output we could not parse.
    Parse(String),
    /// Everything else the extractor reported.
    Failed(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Unavailable(msg) => write!(f, "video unavailable: {}", msg),
            ExtractError::Stale(msg) => write!(f, "extraction failed: {}", msg),
            ExtractError::Tool(msg) => write!(f, "extractor tool: {}", msg),
            ExtractError::Timeout => write!(f, "extractor timed out"),
            ExtractError::Parse(msg) => write!(f, "extractor output: {}", msg),
            ExtractError::Failed(msg) => write!(f, "extractor failed: {}", msg),
        }
    }
}

impl Error for ExtractError {}

/// Boundary to the external extraction tooling. Everything behind this trait
/// depends on tracking the platform's undocumented behavior and is treated
/// as an opaque collaborator.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Name of the extractor, for logging.
    fn name(&self) -> &'static str;

    /// Fetch title, duration, thumbnail and the variant catalogue for a
    /// video URL.
    async fn fetch(&self, url: &str) -> Result<VideoMetadata, ExtractError>;
}

/// Classify an extractor's stderr into the failure taxonomy.
pub fn classify_stderr(stderr: &str) -> ExtractError {
    let lower = stderr.to_lowercase();

    if lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("has been removed")
        || lower.contains("this video is not available")
        || lower.contains("members-only")
    {
        return ExtractError::Unavailable(first_line(stderr));
    }

    // Signature and player extraction failures mean the platform changed
    // underneath the extractor.
    if lower.contains("unable to extract")
        || lower.contains("signature extraction failed")
        || lower.contains("nsig extraction failed")
        || lower.contains("player response")
    {
        return ExtractError::Stale(first_line(stderr));
    }

    if lower.contains("timed out") || lower.contains("timeout") {
        return ExtractError::Timeout;
    }

    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        return ExtractError::Unavailable(first_line(stderr));
    }

    ExtractError::Failed(first_line(stderr))
}

fn first_line(text: &str) -> String {
    text.lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("unknown error")
        .trim()
        .to_string()
}
