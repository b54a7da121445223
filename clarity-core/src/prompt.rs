//! File-to-Prompt adapter.
//!
//! Converts an optional uploaded file plus the user's message into the
//! [`PromptContent`] sent to the generative API for a single turn:
//!
//! | declared MIME type      | result                                            |
//! |-------------------------|---------------------------------------------------|
//! | `application/pdf`       | page text folded into the "Based on this PDF" template |
//! | `image/jpeg`, `image/png` | `[message, image]` composite                    |
//! | `text/*` and code types | UTF-8 text folded into the "Based on this file" template |
//! | anything else           | [`PromptError::UnsupportedFileType`]              |

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::PromptError;

/// Application types that carry plain text even though they are not `text/*`.
const TEXT_LIKE_APPLICATION_TYPES: &[&str] = &[
    "application/json",
    "application/javascript",
    "application/x-javascript",
    "application/x-python",
    "application/x-python-code",
    "application/x-sh",
    "application/xml",
    "application/x-yaml",
    "application/yaml",
    "application/toml",
    "application/sql",
];

/// A file uploaded alongside a chat message. Lives for one request.
#[derive(Debug, Clone)]
pub struct AttachedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// A decoded image that travels to the API as its own content part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    /// MIME type of the payload as detected from its magic bytes.
    pub mime_type: String,
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

/// The fully assembled input for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptContent {
    Text(String),
    Composite { text: String, image: ImagePart },
}

impl PromptContent {
    /// The text portion of the prompt.
    pub fn text(&self) -> &str {
        match self {
            PromptContent::Text(text) => text,
            PromptContent::Composite { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Image,
    Text,
}

/// Strip MIME parameters (`; charset=...`) and normalise case.
fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn classify(mime_type: &str) -> Option<FileKind> {
    let essence = mime_essence(mime_type);
    match essence.as_str() {
        "application/pdf" => Some(FileKind::Pdf),
        "image/jpeg" | "image/jpg" | "image/pjpeg" | "image/png" => Some(FileKind::Image),
        e if e.starts_with("text/") => Some(FileKind::Text),
        e if TEXT_LIKE_APPLICATION_TYPES.contains(&e) => Some(FileKind::Text),
        _ => None,
    }
}

/// Build the prompt for `message`, folding in `file` when one is attached.
///
/// With no file the message passes through unchanged.
pub fn build_prompt(message: String, file: Option<&AttachedFile>) -> Result<PromptContent, PromptError> {
    let Some(file) = file else {
        return Ok(PromptContent::Text(message));
    };

    let kind = classify(&file.mime_type).ok_or_else(|| PromptError::UnsupportedFileType {
        mime_type: file.mime_type.clone(),
    })?;

    debug!(
        file_name = %file.name,
        mime_type = %file.mime_type,
        size_bytes = file.bytes.len(),
        ?kind,
        "adapting attached file"
    );

    match kind {
        FileKind::Pdf => {
            let text = extract_pdf_text(&file.bytes).map_err(|cause| processing_error(file, cause))?;
            Ok(PromptContent::Text(format!(
                "Based on this PDF named '{}':\n\n{}\n\n...Answer this question: {}",
                file.name, text, message
            )))
        }
        FileKind::Image => {
            let image = decode_image(&file.bytes).map_err(|cause| processing_error(file, cause))?;
            Ok(PromptContent::Composite { text: message, image })
        }
        FileKind::Text => {
            let text = std::str::from_utf8(&file.bytes)
                .map_err(|e| processing_error(file, e.to_string()))?;
            Ok(PromptContent::Text(format!(
                "Based on this file named '{}':\n\n{}\n\n...Answer this question: {}",
                file.name, text, message
            )))
        }
    }
}

/// [`build_prompt`] on the blocking pool; PDF parsing and image decoding are
/// CPU-bound and must not stall the async workers.
pub async fn build_prompt_blocking(
    message: String,
    file: Option<AttachedFile>,
) -> Result<PromptContent, PromptError> {
    let Some(file) = file else {
        return Ok(PromptContent::Text(message));
    };
    let filename = file.name.clone();
    tokio::task::spawn_blocking(move || build_prompt(message, Some(&file)))
        .await
        .unwrap_or_else(|e| {
            warn!(file_name = %filename, error = %e, "file processing task failed");
            Err(PromptError::FileProcessing {
                filename,
                cause: "file processing task did not complete".to_owned(),
            })
        })
}

fn processing_error(file: &AttachedFile, cause: String) -> PromptError {
    PromptError::FileProcessing {
        filename: file.name.clone(),
        cause,
    }
}

/// Extract the text of every page, in page order.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, String> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| format!("invalid PDF: {e}"))?;
    let pages = document.get_pages();
    let mut texts = Vec::with_capacity(pages.len());
    // `get_pages` is keyed by 1-based page number, so iteration is in order.
    for page_number in pages.keys() {
        let text = document
            .extract_text(&[*page_number])
            .map_err(|e| format!("failed to read page {page_number}: {e}"))?;
        texts.push(text);
    }
    Ok(texts.join("\n"))
}

fn decode_image(bytes: &Bytes) -> Result<ImagePart, String> {
    let format = image::guess_format(bytes).map_err(|e| format!("unrecognised image data: {e}"))?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| format!("failed to decode image: {e}"))?;
    Ok(ImagePart {
        mime_type: format.to_mime_type().to_owned(),
        data: bytes.clone(),
        width: decoded.width(),
        height: decoded.height(),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────
