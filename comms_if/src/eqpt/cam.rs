//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use image::{DynamicImage, ImageResult};
use std::io::Cursor;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible formats for camera images. This is used rather than image::ImageFormat to:
///     1. Restrict the formats that can be sent to telemetry clients
///     2. Allow serialisation as image::ImageFormat does not implement serde.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG image
    Png,

    /// JPEG image with a quality value between 1 and 100, where 100 is best.
    Jpeg(u8)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ImageFormat {
    fn default() -> Self {
        ImageFormat::Png
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compress the image into the given format.
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> ImageResult<Vec<u8>> {
    let mut data = Vec::<u8>::new();

    // Get the output format type
    let output_format = match format {
        ImageFormat::Png => image::ImageOutputFormat::Png,
        ImageFormat::Jpeg(q)  => image::ImageOutputFormat::Jpeg(q)
    };

    image.write_to(&mut Cursor::new(&mut data), output_format)?;

    Ok(data)
}

/// Compress the image and encode the result as standard base64, the form in which frames are
/// published on the image telemetry channel.
pub fn encode_image_base64(image: &DynamicImage, format: ImageFormat) -> ImageResult<String> {
    encode_image(image, format).map(base64::encode)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_encode_png_base64() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, image::Rgb([10, 200, 30])));

        let b64 = encode_image_base64(&img, ImageFormat::Png).unwrap();
        let bytes = base64::decode(&b64).unwrap();

        // PNG signature
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(2, 1), &image::Rgb([10, 200, 30]));
    }
}
