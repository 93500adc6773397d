//! Image encoding: uploaded bytes → RGB → base64 PNG wrapped in `ImageData`.
//!
//! Uploads arrive as PNG, JPEG or BMP, sometimes with an alpha channel or a
//! palette. Every image is decoded and flattened to 8-bit RGB, then sent as
//! PNG so the model always sees the same lossless colour layout.

use crate::pipeline::input::UploadedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Decode an upload and flatten it to RGB.
pub fn decode_rgb(upload: &UploadedImage) -> Result<DynamicImage, image::ImageError> {
    let img = image::load_from_memory(upload.bytes())?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

/// Encode an image as a base64 PNG ready for the API request.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Decode, flatten and encode one upload.
pub fn prepare_upload(upload: &UploadedImage) -> Result<ImageData, image::ImageError> {
    encode_image(&decode_rgb(upload)?)
}
