use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use image::ImageFormat;
use thiserror::Error;

pub const MAX_IMAGE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image format")]
    InvalidFormat,
    #[error("image is too large ({0} bytes, maximum {1})")]
    TooLarge(usize, usize),
}

/// Re-encodes an uploaded image as an inline data URI. The bytes are
/// sniffed, not trusted: anything that is not a known raster format is
/// rejected.
pub fn to_data_uri(bytes: &[u8]) -> Result<String, ImageError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge(bytes.len(), MAX_IMAGE_BYTES));
    }

    let format = image::guess_format(bytes).map_err(|_| ImageError::InvalidFormat)?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    ) {
        return Err(ImageError::InvalidFormat);
    }

    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        BASE64_STANDARD.encode(bytes)
    ))
}
