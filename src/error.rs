use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Fatal errors of a filter run
///
/// Record-level anomalies (odd `properties`, `route_ids` or id values) are
/// never reported here; they simply make a feature non-matching.
#[derive(Debug, Error)]
pub enum FilterError {
    // Configuration errors
    #[error("No valid numeric IDs provided in --ids.")]
    NoValidIds,

    #[error("Streaming mode is not available in this build (compiled without the `streaming` feature)")]
    StreamingUnavailable,

    // Input errors
    #[error("Input is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("Malformed GeoJSON input: {0}")]
    Json(serde_json::Error),

    #[error("Unexpected document shape: {0}")]
    Shape(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FilterError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoValidIds | Self::StreamingUnavailable => 2,
            Self::Utf8(_) | Self::Json(_) | Self::Shape(_) => 3,
            Self::Io(_) => 1,
        }
    }
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json wraps reader failures; keep those classified as I/O
        if err.is_io() {
            FilterError::Io(err.into())
        } else {
            FilterError::Json(err)
        }
    }
}
