// Page request assembly
//
// Builds the ordered content-part sequence for one page: labelled reference
// images first, then the labelled target page, then the instruction text.
// The instruction goes last so the model reads it against the image directly
// above it.

use std::sync::Arc;
use tracing::debug;

use crate::core::errors::PageError;
use crate::core::types::{PageSource, ReferenceResolver};
use crate::services::prompts;
use crate::services::transform::ContentPart;
use crate::utils::image_ops;

/// Ordered content parts for one page submission.
#[derive(Debug)]
pub struct PageRequest {
    pub page_index: usize,
    pub parts: Vec<ContentPart>,
}

/// Build a colorization request: prior outputs as references, the target
/// page, then the colorize instruction.
///
/// References whose output was never captured (e.g. the page was skipped)
/// are omitted silently; a request with fewer references is still valid.
pub async fn build_colorize_request(
    page: &PageSource,
    reference_indices: &[usize],
    resolver: &dyn ReferenceResolver,
) -> Result<PageRequest, PageError> {
    let (width, height) = image_ops::probe_dimensions(page).await?;
    let media_type = image_ops::detect_media_type(&page.bytes);

    let mut parts = Vec::with_capacity(reference_indices.len() * 2 + 3);
    let mut reference_count = 0;

    for &ref_index in reference_indices {
        match resolver.resolve(ref_index) {
            Some(data) => {
                parts.push(ContentPart::Text(format!(
                    "Reference: previously colorized page {}:",
                    ref_index + 1
                )));
                parts.push(ContentPart::InlineImage {
                    // Prior outputs come back from the image model as PNG
                    media_type: "image/png".to_string(),
                    data,
                });
                reference_count += 1;
            }
            None => {
                debug!(
                    "Reference page {} unavailable, omitting from request for page {}",
                    ref_index, page.index
                );
            }
        }
    }

    parts.push(ContentPart::Text(format!(
        "Page {} to colorize:",
        page.index + 1
    )));
    parts.push(ContentPart::InlineImage {
        media_type,
        data: Arc::clone(&page.bytes),
    });
    parts.push(ContentPart::Text(prompts::colorize_instruction(
        reference_count,
        width,
        height,
    )));

    Ok(PageRequest {
        page_index: page.index,
        parts,
    })
}

/// Build a translation request: the target page followed by the translate
/// instruction. Translation batches carry no references.
pub async fn build_translate_request(
    page: &PageSource,
    source_language: &str,
    target_language: &str,
) -> Result<PageRequest, PageError> {
    // Probe up front so an undecodable page fails before any network traffic
    image_ops::probe_dimensions(page).await?;
    let media_type = image_ops::detect_media_type(&page.bytes);

    let parts = vec![
        ContentPart::Text(format!("Page {} to translate:", page.index + 1)),
        ContentPart::InlineImage {
            media_type,
            data: Arc::clone(&page.bytes),
        },
        ContentPart::Text(prompts::translate_instruction(
            source_language,
            target_language,
        )),
    ];

    Ok(PageRequest {
        page_index: page.index,
        parts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;

    struct MapResolver {
        outputs: HashMap<usize, Arc<Vec<u8>>>,
    }

    impl ReferenceResolver for MapResolver {
        fn resolve(&self, index: usize) -> Option<Arc<Vec<u8>>> {
            self.outputs.get(&index).cloned()
        }
    }

    fn png_page(index: usize) -> PageSource {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            3,
            5,
            image::Rgba([40, 50, 60, 255]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        PageSource {
            index,
            filename: format!("page_{index:03}.png"),
            bytes: Arc::new(bytes),
        }
    }

    fn text_of(part: &ContentPart) -> Option<&str> {
        match part {
            ContentPart::Text(text) => Some(text),
            ContentPart::InlineImage { .. } => None,
        }
    }

    #[tokio::test]
    async fn test_colorize_request_orders_parts_with_instruction_last() {
        let resolver = MapResolver {
            outputs: HashMap::from([
                (0, Arc::new(vec![0u8; 4])),
                (1, Arc::new(vec![1u8; 4])),
            ]),
        };

        let request = build_colorize_request(&png_page(2), &[0, 1], &resolver)
            .await
            .unwrap();

        assert_eq!(request.page_index, 2);
        assert_eq!(request.parts.len(), 7);
        assert_eq!(
            text_of(&request.parts[0]),
            Some("Reference: previously colorized page 1:")
        );
        assert!(matches!(request.parts[1], ContentPart::InlineImage { .. }));
        assert_eq!(
            text_of(&request.parts[2]),
            Some("Reference: previously colorized page 2:")
        );
        assert_eq!(text_of(&request.parts[4]), Some("Page 3 to colorize:"));
        assert!(matches!(request.parts[5], ContentPart::InlineImage { .. }));

        let instruction = text_of(request.parts.last().unwrap()).unwrap();
        assert!(instruction.contains("colorize"));
        assert!(instruction.contains("2 reference page(s)"));
    }

    #[tokio::test]
    async fn test_colorize_request_skips_missing_references() {
        let resolver = MapResolver {
            outputs: HashMap::from([(1, Arc::new(vec![1u8; 4]))]),
        };

        let request = build_colorize_request(&png_page(4), &[0, 1], &resolver)
            .await
            .unwrap();

        // One reference pair dropped: label + image + label + image + text
        assert_eq!(request.parts.len(), 5);
        assert_eq!(
            text_of(&request.parts[0]),
            Some("Reference: previously colorized page 2:")
        );
        let instruction = text_of(request.parts.last().unwrap()).unwrap();
        assert!(instruction.contains("1 reference page(s)"));
    }

    #[tokio::test]
    async fn test_colorize_request_fails_on_undecodable_page() {
        let resolver = MapResolver {
            outputs: HashMap::new(),
        };
        let page = PageSource {
            index: 7,
            filename: "broken.png".to_string(),
            bytes: Arc::new(vec![1, 2, 3]),
        };

        let err = build_colorize_request(&page, &[], &resolver).await.unwrap_err();
        assert!(matches!(err, PageError::Decode { index: 7, .. }));
    }

    #[tokio::test]
    async fn test_translate_request_shape() {
        let request = build_translate_request(&png_page(0), "Japanese", "English")
            .await
            .unwrap();

        assert_eq!(request.parts.len(), 3);
        assert_eq!(text_of(&request.parts[0]), Some("Page 1 to translate:"));
        assert!(matches!(request.parts[1], ContentPart::InlineImage { .. }));

        let instruction = text_of(&request.parts[2]).unwrap();
        assert!(instruction.contains("Japanese"));
        assert!(instruction.contains("English"));
    }
}
