//! Extraction client: send one instruction plus one image, get text back.
//!
//! [`Extractor`] is the seam between the batch orchestrator and the hosted
//! model. [`VisionExtractor`] is the production implementation on top of an
//! `edgequake-llm` provider; tests substitute scripted extractors.
//!
//! Failures are returned as [`ImageError`] and never retried: the batch
//! records them and moves on to the next image.

use crate::config::{OcrConfig, OutputFormat};
use crate::error::{ImageError, OcrError};
use crate::pipeline::encode;
use crate::pipeline::input::UploadedImage;
use crate::pipeline::postprocess;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Turns one image into text according to an instruction.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract text from `image`.
    ///
    /// `format` is the output format of the run; implementations use it to
    /// normalise the response (see [`postprocess::clean_response`]).
    async fn extract(
        &self,
        instruction: &str,
        image: &UploadedImage,
        format: OutputFormat,
    ) -> Result<String, ImageError>;
}

/// [`Extractor`] backed by a vision-capable `edgequake-llm` provider.
pub struct VisionExtractor {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl VisionExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &OcrConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    /// Build an extractor from the configured provider.
    ///
    /// A pre-built `config.provider` is used as-is; otherwise the provider is
    /// created by name through [`ProviderFactory`], which reads the API key
    /// from the environment.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let provider = match config.provider {
            Some(ref provider) => Arc::clone(provider),
            None => ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
                .map_err(|e| OcrError::ProviderNotConfigured {
                    provider: config.provider_name.clone(),
                    hint: format!("{e}"),
                })?,
        };
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl Extractor for VisionExtractor {
    async fn extract(
        &self,
        instruction: &str,
        image: &UploadedImage,
        format: OutputFormat,
    ) -> Result<String, ImageError> {
        let start = Instant::now();

        let image_data = encode::prepare_upload(image).map_err(|e| ImageError::DecodeFailed {
            file: image.name().to_string(),
            detail: e.to_string(),
        })?;

        // One user turn: the instruction text with the image attached.
        let messages = vec![ChatMessage::user_with_images(instruction, vec![image_data])];

        let response = tokio::time::timeout(
            self.timeout,
            self.provider.chat(&messages, Some(&self.options)),
        )
        .await
        .map_err(|_| {
            warn!("{}: API call timed out", image.name());
            ImageError::Timeout {
                file: image.name().to_string(),
                secs: self.timeout.as_secs(),
            }
        })?
        .map_err(|e| {
            warn!("{}: API call failed: {}", image.name(), e);
            ImageError::LlmFailed {
                file: image.name().to_string(),
                detail: e.to_string(),
            }
        })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            image.name(),
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(postprocess::clean_response(&response.content, format))
    }
}

/// Build `CompletionOptions` from the run config.
fn build_options(config: &OcrConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
