// Error types shared by the library modules. The binary and the UI layer
// wrap these in `anyhow` for plumbing; the session catches them and turns
// them into user-facing messages.

use reqwest::StatusCode;
use thiserror::Error;

/// Any failure while talking to the remote inference queue.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Request could not be sent or the response could not be read.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error(
        "fal returned HTTP {} {}: {}",
        .status.as_u16(),
        .status.canonical_reason().unwrap_or(""),
        .body
    )]
    Http { status: StatusCode, body: String },

    /// The request reached a terminal state with an error attached.
    #[error("generation failed: {0}")]
    Remote(String),

    /// A response was missing fields we rely on.
    #[error("invalid response from fal: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RemoteError {
    /// HTTP status when the failure came from a non-success response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RemoteError::Http { status, .. } => Some(*status),
            RemoteError::Network { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Failure to retrieve, decode or store the produced image. Kept apart from
/// `RemoteError`: the generation itself succeeded when one of these occurs.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed downloading image ({url}): {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("image download failed ({url}): HTTP {status}")]
    Http { url: String, status: StatusCode },

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("could not write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid value handed to the parameter collector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("unknown image size '{0}' (expected one of: landscape_4_3, landscape_16_9, portrait_4_3, portrait_16_9, square, square_hd)")]
    UnknownImageSize(String),
}
