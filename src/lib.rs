//! # edgequake-ocr
//!
//! Extract text from images using Vision Language Models (VLMs) and export
//! it as CSV, plain text, Markdown, or an XLSX spreadsheet.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images (PNG / JPEG / BMP)
//!  │
//!  ├─ 1. Input     read files or download URLs
//!  ├─ 2. Validate  combined size ≤ limit (default 10 MiB), else stop
//!  ├─ 3. Prompt    one instruction per run: category × format
//!  ├─ 4. VLM       one call per image, strictly sequential
//!  ├─ 5. Clean     strip code fences from each answer
//!  ├─ 6. Assemble  per-file headers when more than one image
//!  └─ 7. Export    BOM-prefixed text file, optional XLSX from a Markdown table
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr::{
//!     run_batch, ContentCategory, OcrConfig, OutputFormat, Session, UploadedImage,
//!     VisionExtractor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY from the environment.
//!     let config = OcrConfig::default();
//!     let extractor = VisionExtractor::from_config(&config)?;
//!     let images = vec![UploadedImage::new("invoice.png", std::fs::read("invoice.png")?)];
//!
//!     let report = run_batch(&extractor, &images, ContentCategory::Table, OutputFormat::Md, &config).await?;
//!
//!     let mut session = Session::new();
//!     session.apply(&report);
//!     if let Some(download) = session.text_download() {
//!         download.write_to(".").await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgocr` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod secrets;
pub mod session;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{run_batch, BatchOrchestrator, BatchReport, BatchState, Outcome};
pub use config::{ContentCategory, OcrConfig, OcrConfigBuilder, OutputFormat};
pub use error::{ImageError, OcrError};
pub use export::{export_spreadsheet, export_text, Download};
pub use pipeline::input::{resolve_inputs, UploadedImage};
pub use pipeline::llm::{Extractor, VisionExtractor};
pub use pipeline::postprocess::clean_response;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{instruction, select_instruction, FALLBACK_INSTRUCTION};
pub use secrets::{resolve_api_key, ApiKey};
pub use session::{Session, SpreadsheetOffer};
pub use table::{parse_markdown_table, Table};
