//! Error types for the edgequake-ocr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OcrError`]: **Fatal**: the run cannot proceed at all (missing API
//!   key, unreadable input, upload over the size ceiling). Returned as
//!   `Err(OcrError)` from [`crate::batch::run_batch`] and the input helpers.
//!
//! * [`ImageError`]: **Non-fatal**: a single image failed (undecodable
//!   bytes, API error, timeout) but the rest of the batch is fine. Stored in
//!   [`crate::batch::BatchReport::failures`] so one bad image never costs
//!   the whole batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-ocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// No API key could be found in any configured secret source.
    #[error("API key is not configured.\nSet {env_vars} or add GOOGLE_API_KEY to '{secrets_path}'.")]
    MissingCredential {
        env_vars: String,
        secrets_path: PathBuf,
    },

    /// The secrets file exists but could not be read or parsed.
    #[error("Failed to read secrets file '{path}': {detail}")]
    SecretsUnreadable { path: PathBuf, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The upload is not a PNG, JPEG or BMP image.
    #[error("'{name}' is not a supported image (PNG, JPEG or BMP): {detail}")]
    UnsupportedImage { name: String, detail: String },

    // ── Validation errors ─────────────────────────────────────────────────
    /// Combined upload size is over the configured ceiling; nothing was sent.
    #[error(
        "Total upload size {total_bytes} bytes exceeds the {limit_bytes}-byte limit.\n\
Remove some files and try again."
    )]
    UploadTooLarge { total_bytes: u64, limit_bytes: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Building the XLSX workbook failed.
    #[error("Spreadsheet export failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// The batch records it, reports it through the progress callback and moves
/// on to the next image.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The upload could not be decoded or re-encoded for the request.
    #[error("{file}: image could not be decoded: {detail}")]
    DecodeFailed { file: String, detail: String },

    /// The generation API returned an error.
    #[error("{file}: API error: {detail}")]
    LlmFailed { file: String, detail: String },

    /// The generation API did not answer in time.
    #[error("{file}: API call timed out after {secs}s")]
    Timeout { file: String, secs: u64 },
}

impl ImageError {
    /// Name of the upload this error belongs to.
    pub fn file(&self) -> &str {
        match self {
            ImageError::DecodeFailed { file, .. }
            | ImageError::LlmFailed { file, .. }
            | ImageError::Timeout { file, .. } => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_too_large_display() {
        let e = OcrError::UploadTooLarge {
            total_bytes: 10_485_761,
            limit_bytes: 10_485_760,
        };
        let msg = e.to_string();
        assert!(msg.contains("10485761"), "got: {msg}");
        assert!(msg.contains("10485760"), "got: {msg}");
    }

    #[test]
    fn missing_credential_names_sources() {
        let e = OcrError::MissingCredential {
            env_vars: "GOOGLE_API_KEY or GEMINI_API_KEY".into(),
            secrets_path: PathBuf::from("secrets.toml"),
        };
        let msg = e.to_string();
        assert!(msg.contains("GOOGLE_API_KEY"));
        assert!(msg.contains("secrets.toml"));
    }

    #[test]
    fn image_error_reports_file() {
        let e = ImageError::Timeout {
            file: "scan.png".into(),
            secs: 120,
        };
        assert_eq!(e.file(), "scan.png");
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn llm_failed_display() {
        let e = ImageError::LlmFailed {
            file: "a.jpg".into(),
            detail: "quota exceeded".into(),
        };
        assert!(e.to_string().contains("quota exceeded"));
    }
}
