//! Input resolution: turn user-supplied paths or URLs into [`UploadedImage`]s.
//!
//! Every input is read fully into memory; the batch needs the byte sizes up
//! front to enforce the upload ceiling before any API call. We sniff the
//! content (not the extension) and accept only PNG, JPEG and BMP so callers
//! get a meaningful error instead of a decoder failure mid-batch.

use crate::error::OcrError;
use image::ImageFormat;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// One uploaded image: original file name plus its raw bytes.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    name: String,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedImage")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl UploadedImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Original file name as supplied by the user (may include directories).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without any directory part, used in per-file headers.
    pub fn base_name(&self) -> &str {
        self.name
            .rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Combined byte size of a batch.
pub fn total_size(images: &[UploadedImage]) -> u64 {
    images.iter().map(UploadedImage::size).sum()
}

/// Human-readable size in MiB with two decimals, e.g. `"1.50 MB"`.
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Check that the bytes hold a PNG, JPEG or BMP image.
pub fn ensure_supported(image: &UploadedImage) -> Result<ImageFormat, OcrError> {
    let format = image::guess_format(image.bytes()).map_err(|e| OcrError::UnsupportedImage {
        name: image.name().to_string(),
        detail: e.to_string(),
    })?;

    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp => Ok(format),
        other => Err(OcrError::UnsupportedImage {
            name: image.name().to_string(),
            detail: format!("detected {other:?}"),
        }),
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve every input, in order, into an uploaded image.
///
/// The first unreadable or unsupported input aborts the whole resolution:
/// the user fixes the selection before anything is sent.
pub async fn resolve_inputs(
    inputs: &[String],
    timeout_secs: u64,
) -> Result<Vec<UploadedImage>, OcrError> {
    let mut images = Vec::with_capacity(inputs.len());
    for input in inputs {
        let image = resolve_input(input, timeout_secs).await?;
        ensure_supported(&image)?;
        images.push(image);
    }
    Ok(images)
}

/// Resolve one local path or HTTP/HTTPS URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<UploadedImage, OcrError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if input.trim().is_empty() {
        Err(OcrError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<UploadedImage, OcrError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => OcrError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => OcrError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedImage::new(path.to_string_lossy(), bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedImage, OcrError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| OcrError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            OcrError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            OcrError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(OcrError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| OcrError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(UploadedImage::new(filename_from_url(url), bytes.to_vec()))
}

/// Last path segment of the URL, or `downloaded.png` when there is none.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.png".to_string()
}
