// Remote page transformation service boundary

pub mod api_client;
pub mod request;

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::errors::TransformResult;

/// One element of the ordered content sequence sent to the image model.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    InlineImage {
        media_type: String,
        data: Arc<Vec<u8>>,
    },
}

/// A transformed image returned by the service.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// The remote image-generation call: one page per submission, zero or one
/// images back. Submissions are never retried here; retry policy belongs to
/// whoever invokes the whole run.
#[async_trait]
pub trait TransformService: Send + Sync {
    async fn submit(
        &self,
        parts: &[ContentPart],
        resolution_hint: &str,
        request_id: &str,
    ) -> TransformResult<Vec<TransformedImage>>;
}

pub use api_client::GeminiClient;
pub use request::{build_colorize_request, build_translate_request, PageRequest};
