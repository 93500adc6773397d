//! Batch orchestration: validate the uploads, extract text from each image
//! in submission order, and assemble the aggregate result.
//!
//! ## States
//!
//! ```text
//! Idle ──▶ Validating ──┬──▶ Rejected                    (over size limit, no API calls)
//!                       └──▶ Running ──▶ Completed(Success | PartialFailure | NoResults)
//! ```
//!
//! Images are processed strictly sequentially: one request in flight at a
//! time, results appended in the order the images were submitted. A failed
//! image is reported and skipped; it never aborts the rest of the batch.

use crate::config::{ContentCategory, OcrConfig, OutputFormat};
use crate::error::{ImageError, OcrError};
use crate::pipeline::input::{self, UploadedImage};
use crate::pipeline::llm::Extractor;
use crate::prompts;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a batch is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Validating,
    Rejected { total_bytes: u64, limit_bytes: u64 },
    Running { processed: usize, total: usize },
    Completed { outcome: Outcome },
}

/// Terminal result of a batch that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every image produced text.
    Success,
    /// At least one image produced text and at least one failed.
    PartialFailure,
    /// No image produced text (all failed, or the batch was empty).
    NoResults,
}

impl Outcome {
    /// Whether the aggregate text is published.
    pub fn has_results(self) -> bool {
        !matches!(self, Outcome::NoResults)
    }
}

/// Everything a caller needs after a batch has run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub outcome: Outcome,
    pub category: ContentCategory,
    pub format: OutputFormat,
    /// Aggregate text; empty when `outcome` is `NoResults`.
    pub text: String,
    pub total_images: usize,
    pub succeeded: usize,
    pub total_bytes: u64,
    /// Skipped images, in submission order.
    pub failures: Vec<ImageError>,
    pub duration_ms: u64,
}

/// Header line placed before each result when the batch holds several images.
pub fn file_header(image: &UploadedImage) -> String {
    format!("--- OCR Result for: {} ---\n\n", image.base_name())
}

/// Append-only aggregate of per-image results.
#[derive(Debug)]
struct Aggregate {
    text: String,
    with_headers: bool,
    count: usize,
}

impl Aggregate {
    fn new(total: usize) -> Self {
        Self {
            text: String::new(),
            with_headers: total > 1,
            count: 0,
        }
    }

    fn push(&mut self, image: &UploadedImage, body: &str) {
        if self.with_headers {
            self.text.push_str(&file_header(image));
        }
        self.text.push_str(body);
        self.text.push_str("\n\n");
        self.count += 1;
    }
}

/// Drives one batch through the state machine.
///
/// The orchestrator owns the aggregate and the progress counter for the
/// duration of the run; nothing is shared with other batches.
pub struct BatchOrchestrator<'a, E: Extractor + ?Sized> {
    extractor: &'a E,
    config: &'a OcrConfig,
    state: BatchState,
}

impl<'a, E: Extractor + ?Sized> BatchOrchestrator<'a, E> {
    pub fn new(extractor: &'a E, config: &'a OcrConfig) -> Self {
        Self {
            extractor,
            config,
            state: BatchState::Idle,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Run the batch.
    ///
    /// # Errors
    /// Returns `Err(OcrError::UploadTooLarge)` when the combined size of
    /// `images` exceeds `config.max_total_bytes`. No API call is made in
    /// that case. Per-image failures are never returned as `Err`; they are
    /// collected in [`BatchReport::failures`].
    pub async fn run(
        &mut self,
        images: &[UploadedImage],
        category: ContentCategory,
        format: OutputFormat,
    ) -> Result<BatchReport, OcrError> {
        let start = Instant::now();
        let config = self.config;

        // ── Validating ───────────────────────────────────────────────────
        self.state = BatchState::Validating;
        let total_bytes = input::total_size(images);
        if total_bytes > config.max_total_bytes {
            warn!(
                "Upload rejected: {} bytes > {} byte limit",
                total_bytes, config.max_total_bytes
            );
            self.state = BatchState::Rejected {
                total_bytes,
                limit_bytes: config.max_total_bytes,
            };
            return Err(OcrError::UploadTooLarge {
                total_bytes,
                limit_bytes: config.max_total_bytes,
            });
        }

        // ── Running ──────────────────────────────────────────────────────
        let total = images.len();
        let instruction = prompts::instruction(category, format);
        info!(
            "Starting batch: {} images, {} bytes, {}/{}",
            total, total_bytes, category, format
        );

        let callback = config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_batch_start(total);
        }

        let mut aggregate = Aggregate::new(total);
        let mut failures = Vec::new();

        for (i, image) in images.iter().enumerate() {
            let index = i + 1;
            self.state = BatchState::Running {
                processed: i,
                total,
            };
            if let Some(cb) = callback {
                cb.on_image_start(index, total, image.base_name());
            }

            match self.extractor.extract(instruction, image, format).await {
                Ok(text) => {
                    debug!("{}: {} bytes of text", image.name(), text.len());
                    if let Some(cb) = callback {
                        cb.on_image_complete(index, total, image.base_name(), text.len());
                    }
                    aggregate.push(image, &text);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", image.name(), e);
                    if let Some(cb) = callback {
                        cb.on_image_error(index, total, image.base_name(), &e.to_string());
                    }
                    failures.push(e);
                }
            }
        }

        // ── Completed ────────────────────────────────────────────────────
        let succeeded = aggregate.count;
        let outcome = match (succeeded, failures.len()) {
            (0, _) => Outcome::NoResults,
            (_, 0) => Outcome::Success,
            _ => Outcome::PartialFailure,
        };
        let text = if outcome.has_results() {
            aggregate.text
        } else {
            String::new()
        };

        if let Some(cb) = callback {
            cb.on_batch_complete(total, succeeded);
        }
        self.state = BatchState::Completed { outcome };
        info!("Batch complete: {}/{} images produced text", succeeded, total);

        Ok(BatchReport {
            outcome,
            category,
            format,
            text,
            total_images: total,
            succeeded,
            total_bytes,
            failures,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Run one batch with a fresh orchestrator.
pub async fn run_batch<E: Extractor + ?Sized>(
    extractor: &E,
    images: &[UploadedImage],
    category: ContentCategory,
    format: OutputFormat,
    config: &OcrConfig,
) -> Result<BatchReport, OcrError> {
    BatchOrchestrator::new(extractor, config)
        .run(images, category, format)
        .await
}
