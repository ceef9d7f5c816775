//! Conversion between base64 encoded frames, as sent over the wire, and images.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{DynamicImage, ImageOutputFormat, RgbImage};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Frame is not valid base64: {0}")]
    Base64Error(base64::DecodeError),

    #[error("Could not decode the frame image: {0}")]
    DecodeError(image::ImageError),

    #[error("Could not encode the frame image: {0}")]
    EncodeError(image::ImageError),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode a base64 encoded frame (JPEG or PNG) into an RGB image.
pub fn decode_frame(frame_b64: &str) -> Result<RgbImage, FrameError> {
    let data = base64::decode(frame_b64.trim())
        .map_err(FrameError::Base64Error)?;

    let image = image::load_from_memory(&data)
        .map_err(FrameError::DecodeError)?;

    Ok(image.to_rgb8())
}

/// Encode an RGB image as a base64 JPEG with the given quality (1 to 100).
pub fn encode_frame_jpeg(image: &RgbImage, quality: u8) -> Result<String, FrameError> {
    let mut data = Vec::<u8>::new();

    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut data, ImageOutputFormat::Jpeg(quality))
        .map_err(FrameError::EncodeError)?;

    Ok(base64::encode(&data))
}

/// Encode an RGB image as a base64 PNG.
pub fn encode_frame_png(image: &RgbImage) -> Result<String, FrameError> {
    let mut data = Vec::<u8>::new();

    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut data, ImageOutputFormat::Png)
        .map_err(FrameError::EncodeError)?;

    Ok(base64::encode(&data))
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_png_frame() -> Result<(), FrameError> {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(3, 1, Rgb([200, 10, 30]));

        let decoded = decode_frame(&encode_frame_png(&img)?)?;

        assert_eq!(decoded, img);

        Ok(())
    }

    #[test]
    fn test_bad_frame() {
        assert!(matches!(decode_frame("%%%"), Err(FrameError::Base64Error(_))));
        assert!(matches!(
            decode_frame(&base64::encode(b"not an image")),
            Err(FrameError::DecodeError(_))
        ));
    }
}
