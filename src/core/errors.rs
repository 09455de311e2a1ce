// Custom error types for better error handling and debugging
//
// Using thiserror for ergonomic error definitions with:
// - Type-safe error matching
// - Automatic Display/Error trait implementations
// - Source error chaining

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API keys configured (set GEMINI_API_KEYS environment variable)")]
    NoApiKeys,

    #[error("max_batch_width must be >= 1, got {0}")]
    InvalidBatchWidth(usize),

    #[error("Unsupported resolution hint: {0} (expected 1K, 2K or 4K)")]
    InvalidResolutionHint(String),

    #[error("Invalid language setting: {0}")]
    InvalidLanguage(String),
}

/// Per-page source image errors
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Failed to decode page {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("Dimension probe task failed for page {index}: {reason}")]
    ProbeTask { index: usize, reason: String },
}

/// Remote transform call errors
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed API response: {0}")]
    InvalidResponse(String),

    #[error("No API keys available")]
    NoUsableKey,
}

/// Page-level failures as surfaced to the caller.
///
/// Colorize runs absorb these as skips; translate runs abort on the first
/// one encountered in a batch.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Page {index} could not be prepared: {source}")]
    Page {
        index: usize,
        #[source]
        source: PageError,
    },

    #[error("Transform call for page {index} failed: {source}")]
    Transform {
        index: usize,
        #[source]
        source: TransformError,
    },

    #[error("Service returned no image for page {index}")]
    EmptyResult { index: usize },
}

// Convenience type aliases for Results
pub type TransformResult<T> = Result<T, TransformError>;
pub type RunResult<T> = Result<T, RunError>;
