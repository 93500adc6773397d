//! Per-image pipeline stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess
//! (path/URL) (RGB→PNG)  (VLM)   (fence cleanup)
//! ```
//!
//! 1. [`input`]: read local files or download URLs into `UploadedImage`s
//!    and reject anything that is not PNG, JPEG or BMP
//! 2. [`encode`]: decode, flatten to RGB and base64-wrap as PNG
//! 3. [`llm`]: the `Extractor` seam and the provider-backed
//!    implementation; the only stage with network I/O to the model
//! 4. [`postprocess`]: idempotent cleanup of the model's answer

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
