//! Configuration types for image-to-text extraction.
//!
//! All run behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]. The two user choices that drive every run,
//! [`ContentCategory`] and [`OutputFormat`], are closed enums so the
//! instruction table in [`crate::prompts`] is checked for exhaustiveness at
//! compile time.

use crate::error::OcrError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default ceiling for the combined size of one batch of uploads: 10 MiB.
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 10 * 1024 * 1024;

/// Default provider name passed to `edgequake_llm::ProviderFactory`.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for an extraction run.
///
/// # Example
/// ```rust
/// use edgequake_ocr::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .max_total_bytes(5 * 1024 * 1024)
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_total_bytes, 5 * 1024 * 1024);
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Maximum combined byte size of all images in one batch. Default: 10 MiB.
    ///
    /// A batch whose total is exactly this value is accepted; one byte more
    /// is rejected before any API call is made.
    pub max_total_bytes: u64,

    /// LLM provider name (e.g. "gemini", "openai"). Default: "gemini".
    pub provider_name: String,

    /// Vision model identifier. Default: "gemini-2.5-flash".
    pub model: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 4096.
    pub max_tokens: usize,

    /// Per-image API call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-image progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("max_total_bytes", &self.max_total_bytes)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`OcrConfig`].
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl fmt::Debug for OcrConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl OcrConfigBuilder {
    pub fn max_total_bytes(mut self, bytes: u64) -> Self {
        self.config.max_total_bytes = bytes;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.max_total_bytes == 0 {
            return Err(OcrError::InvalidConfig(
                "Upload size limit must be at least 1 byte".into(),
            ));
        }
        if c.provider.is_none() && c.provider_name.trim().is_empty() {
            return Err(OcrError::InvalidConfig("Provider name must not be empty".into()));
        }
        if c.model.trim().is_empty() {
            return Err(OcrError::InvalidConfig("Model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(OcrError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(OcrError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What kind of content the uploaded images hold.
///
/// | Category | Use case |
/// |----------|----------|
/// | `Table` | Tables, slips, invoices |
/// | `Document` | Ordinary prose |
/// | `RawText` | Text whose layout must be kept as-is |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    #[default]
    Table,
    Document,
    RawText,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 3] = [
        ContentCategory::Table,
        ContentCategory::Document,
        ContentCategory::RawText,
    ];

    /// Stable key used on the command line and in serialised reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentCategory::Table => "table",
            ContentCategory::Document => "document",
            ContentCategory::RawText => "raw_text",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ContentCategory::Table => "Tables & slips",
            ContentCategory::Document => "General document",
            ContentCategory::RawText => "Keep layout",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCategory {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(ContentCategory::Table),
            "document" => Ok(ContentCategory::Document),
            "raw_text" | "raw-text" => Ok(ContentCategory::RawText),
            other => Err(OcrError::InvalidConfig(format!(
                "Unknown content category '{other}' (expected table, document or raw_text)"
            ))),
        }
    }
}

/// Target representation of the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Delimited values.
    #[default]
    Csv,
    /// Plain text.
    Txt,
    /// Markdown; the only format that can also be exported as a spreadsheet.
    Md,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Csv, OutputFormat::Txt, OutputFormat::Md];

    /// Format name; doubles as the file extension of the text download.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Txt => "txt",
            OutputFormat::Md => "md",
        }
    }

    /// Fence tags a model may put on a code block holding this format.
    pub fn fence_tags(self) -> &'static [&'static str] {
        match self {
            OutputFormat::Csv => &["csv"],
            OutputFormat::Txt => &["txt", "text", "plaintext"],
            OutputFormat::Md => &["md", "markdown"],
        }
    }

    /// MIME type of the text download: `text/<format>`.
    pub fn mime_type(self) -> String {
        format!("text/{}", self.as_str())
    }

    /// Whether results in this format can be converted to a spreadsheet.
    pub fn supports_spreadsheet(self) -> bool {
        matches!(self, OutputFormat::Md)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "txt" => Ok(OutputFormat::Txt),
            "md" => Ok(OutputFormat::Md),
            other => Err(OcrError::InvalidConfig(format!(
                "Unknown output format '{other}' (expected csv, txt or md)"
            ))),
        }
    }
}
