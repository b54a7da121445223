use std::time::Duration;

use thiserror::Error;

/// Errors raised while turning an uploaded file into prompt content.
///
/// Both variants are request-scoped: the HTTP layer reports them in-band on
/// the response stream instead of failing the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// The declared MIME type is not one the adapter knows how to read.
    #[error("Unsupported file type: {mime_type}")]
    UnsupportedFileType { mime_type: String },

    /// The payload matched a supported type but could not be decoded
    /// (corrupt PDF, undecodable image, invalid UTF-8, ...).
    #[error("Error processing file '{filename}': {cause}")]
    FileProcessing { filename: String, cause: String },
}

/// Errors raised while talking to the generative API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Building or sending the HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The SSE transport broke mid-stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// An SSE payload was not the JSON shape we expect.
    #[error("invalid upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The API reported an error inside the stream.
    #[error("upstream API error: {0}")]
    Api(String),

    /// Nothing arrived from the API within the idle window.
    #[error("no response from upstream within {0:?}")]
    IdleTimeout(Duration),
}
