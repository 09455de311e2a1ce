use std::io::Cursor;
use std::sync::Arc;

use image::ImageReader;

use crate::core::errors::PageError;
use crate::core::types::PageSource;

/// Probe the pixel dimensions of a page using spawn_blocking to avoid
/// blocking the async runtime.
///
/// Only the image header is parsed; a full decode of a large page would be
/// far more expensive. An unreadable header fails the page.
pub async fn probe_dimensions(page: &PageSource) -> Result<(u32, u32), PageError> {
    let index = page.index;
    let bytes = Arc::clone(&page.bytes);
    tokio::task::spawn_blocking(move || {
        ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| PageError::Decode {
                index,
                source: image::ImageError::IoError(e),
            })?
            .into_dimensions()
            .map_err(|e| PageError::Decode { index, source: e })
    })
    .await
    .map_err(|e| PageError::ProbeTask {
        index,
        reason: e.to_string(),
    })?
}

/// Detect the media type of encoded image bytes, defaulting to PNG when the
/// format is unrecognized.
pub fn detect_media_type(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "image/png".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    fn encoded_page(index: usize, width: u32, height: u32, format: ImageFormat) -> PageSource {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([120, 90, 60, 255]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        PageSource {
            index,
            filename: format!("page_{index:03}.png"),
            bytes: Arc::new(bytes),
        }
    }

    #[tokio::test]
    async fn test_probe_dimensions() {
        let page = encoded_page(0, 4, 7, ImageFormat::Png);
        let (width, height) = probe_dimensions(&page).await.unwrap();
        assert_eq!((width, height), (4, 7));
    }

    #[tokio::test]
    async fn test_probe_rejects_garbage() {
        let page = PageSource {
            index: 3,
            filename: "broken.png".to_string(),
            bytes: Arc::new(vec![0, 1, 2, 3, 4]),
        };
        let err = probe_dimensions(&page).await.unwrap_err();
        assert!(matches!(err, PageError::Decode { index: 3, .. }));
    }

    #[test]
    fn test_detect_media_type() {
        let png = encoded_page(0, 2, 2, ImageFormat::Png);
        assert_eq!(detect_media_type(&png.bytes), "image/png");

        let jpeg = {
            let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
                2,
                2,
                image::Rgb([1, 2, 3]),
            ));
            let mut bytes = Vec::new();
            img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
                .unwrap();
            bytes
        };
        assert_eq!(detect_media_type(&jpeg), "image/jpeg");

        assert_eq!(detect_media_type(&[0xFF, 0x00]), "image/png");
    }
}
