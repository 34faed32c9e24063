use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use crate::config::RecognitionConfig;
use crate::error::{CoverscanError, Result};

/// Media types every provider accepts without conversion.
const PASSTHROUGH_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub min_dimension: u32,
    pub max_dimension: u32,
}

impl From<&RecognitionConfig> for ImageLimits {
    fn from(config: &RecognitionConfig) -> Self {
        Self {
            min_dimension: config.min_image_dimension,
            max_dimension: config.max_image_dimension,
        }
    }
}

/// Image bytes ready to be embedded in a provider request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

/// Validate a cover image and shrink it to the provider-friendly size.
///
/// Images that already fit and use a common web format are passed through
/// untouched; everything else is downscaled (aspect ratio kept) and
/// re-encoded as JPEG.
pub fn prepare_image(bytes: &[u8], limits: &ImageLimits) -> Result<PreparedImage> {
    if bytes.is_empty() {
        return Err(CoverscanError::Image("Image is empty".to_string()));
    }

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CoverscanError::Image(format!("Failed to read image: {e}")))?
        .decode()
        .map_err(|e| CoverscanError::Image(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < limits.min_dimension || height < limits.min_dimension {
        return Err(CoverscanError::Image(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, limits.min_dimension, limits.min_dimension
        )));
    }

    let fits = width <= limits.max_dimension && height <= limits.max_dimension;
    let detected = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .and_then(|mime| PASSTHROUGH_TYPES.iter().copied().find(|t| *t == mime));

    if let (true, Some(media_type)) = (fits, detected) {
        return Ok(PreparedImage {
            bytes: bytes.to_vec(),
            media_type,
        });
    }

    let img = resize_if_needed(img, limits.max_dimension);
    encode_jpeg(img)
}

/// Resize image if it exceeds maximum dimension while maintaining aspect ratio
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

fn encode_jpeg(img: DynamicImage) -> Result<PreparedImage> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut output = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut output), ImageFormat::Jpeg)
        .map_err(|e| CoverscanError::Image(format!("Failed to encode image: {e}")))?;

    Ok(PreparedImage {
        bytes: output,
        media_type: "image/jpeg",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ImageLimits {
        ImageLimits {
            min_dimension: 32,
            max_dimension: 256,
        }
    }

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 40, 200]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_small_png_passes_through() {
        let bytes = encode(100, 150, ImageFormat::Png);
        let prepared = prepare_image(&bytes, &limits()).unwrap();
        assert_eq!(prepared.media_type, "image/png");
        assert_eq!(prepared.bytes, bytes);
    }

    #[test]
    fn test_large_image_is_downscaled_to_jpeg() {
        let bytes = encode(1024, 512, ImageFormat::Png);
        let prepared = prepare_image(&bytes, &limits()).unwrap();
        assert_eq!(prepared.media_type, "image/jpeg");

        let decoded = image::load_from_memory(&prepared.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (256, 128));
    }

    #[test]
    fn test_uncommon_format_is_reencoded() {
        let bytes = encode(64, 64, ImageFormat::Bmp);
        let prepared = prepare_image(&bytes, &limits()).unwrap();
        assert_eq!(prepared.media_type, "image/jpeg");
    }

    #[test]
    fn test_tiny_image_is_rejected() {
        let bytes = encode(10, 10, ImageFormat::Png);
        let result = prepare_image(&bytes, &limits());
        assert!(matches!(result, Err(CoverscanError::Image(msg)) if msg.contains("too small")));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(prepare_image(b"not an image", &limits()).is_err());
        assert!(prepare_image(&[], &limits()).is_err());
    }
}
