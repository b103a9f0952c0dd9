//! Conversion between encoded image bytes and the host's `[batch, height, width, channels]`
//! float tensors.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use ndarray::{Array4, ArrayView3, Axis};

use crate::error::{JobError, Result};

pub type ImageTensor = Array4<f32>;

/// Decodes any format the `image` crate knows into a batch of one RGB image in [0, 1].
pub fn decode_image(bytes: &[u8]) -> Result<ImageTensor> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = decoded.to_rgb32f();
    let (width, height) = rgb.dimensions();

    let tensor = Array4::from_shape_vec((1, height as usize, width as usize, 3), rgb.into_raw())?;
    Ok(tensor)
}

/// Encodes one image of the batch as PNG. Lossless, so decoding it gives back the same
/// 8-bit values.
pub fn encode_png(tensor: &ImageTensor, index: usize) -> Result<Vec<u8>> {
    let (batch, height, width, channels) = tensor.dim();
    if index >= batch {
        return Err(JobError::Validation(format!(
            "Image index {index} is out of range for a batch of {batch}"
        )));
    }

    let frame = tensor.index_axis(Axis(0), index);
    let dynamic = match channels {
        1 => DynamicImage::ImageLuma8(image::GrayImage::from_raw(
            width as u32,
            height as u32,
            quantize(frame),
        )
        .ok_or_else(|| layout_error(height, width, channels))?),
        3 => DynamicImage::ImageRgb8(
            RgbImage::from_raw(width as u32, height as u32, quantize(frame))
                .ok_or_else(|| layout_error(height, width, channels))?,
        ),
        4 => DynamicImage::ImageRgba8(
            RgbaImage::from_raw(width as u32, height as u32, quantize(frame))
                .ok_or_else(|| layout_error(height, width, channels))?,
        ),
        other => {
            return Err(JobError::Validation(format!(
                "Unsupported channel count {other}; expected 1, 3 or 4"
            )));
        }
    };

    let mut buffer = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(encode_error)?;
    Ok(buffer.into_inner())
}

fn quantize(frame: ArrayView3<'_, f32>) -> Vec<u8> {
    frame
        .iter()
        .map(|value| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

fn encode_error(err: image::ImageError) -> JobError {
    JobError::Encode(err.to_string())
}

fn layout_error(height: usize, width: usize, channels: usize) -> JobError {
    JobError::Validation(format!(
        "Tensor layout {height}x{width}x{channels} does not form a valid image"
    ))
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 40) as u8, (y * 60) as u8, ((x + y) * 25) as u8])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_batch_of_one_in_unit_range() {
        let tensor = decode_image(&sample_png(4, 3)).unwrap();
        assert_eq!(tensor.dim(), (1, 3, 4, 3));
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((tensor[[0, 0, 1, 0]] - 40.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_png_round_trip_is_lossless() {
        let original = sample_png(5, 4);
        let tensor = decode_image(&original).unwrap();
        let reencoded = encode_png(&tensor, 0).unwrap();
        let again = decode_image(&reencoded).unwrap();
        assert_eq!(tensor, again);

        let a = image::load_from_memory(&original).unwrap().to_rgb8();
        let b = image::load_from_memory(&reencoded).unwrap().to_rgb8();
        assert_eq!(a.into_raw(), b.into_raw());
    }

    #[test]
    fn test_encode_failure_is_not_reported_as_decode() {
        let err = encode_error(image::ImageError::IoError(std::io::Error::other("disk full")));
        assert!(matches!(err, JobError::Encode(_)));
        let text = err.to_string();
        assert!(text.contains("encode"), "{text}");
        assert!(!text.contains("decode"), "{text}");
    }

    #[test]
    fn test_encode_rejects_bad_index() {
        let tensor = ImageTensor::zeros((1, 2, 2, 3));
        assert!(matches!(encode_png(&tensor, 1), Err(JobError::Validation(_))));
    }

    #[test]
    fn test_undecodable_bytes() {
        assert!(matches!(decode_image(b"not an image"), Err(JobError::Decode(_))));
    }
}
