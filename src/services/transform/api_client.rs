use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{TransformError, TransformResult};
use crate::middleware::api_key_pool::ApiKeyPool;
use crate::services::transform::{ContentPart, TransformService, TransformedImage};
use crate::utils::Metrics;

/// Gemini image-generation client.
///
/// Each submission is single-shot: the pool picks which key it uses and the
/// outcome is recorded against that key, but a failed call is never retried
/// here.
pub struct GeminiClient {
    config: Arc<Config>,
    key_pool: Arc<ApiKeyPool>,
    http_client: reqwest::Client,
    metrics: Option<Metrics>,
}

impl GeminiClient {
    pub fn new(config: Arc<Config>, metrics: Option<Metrics>) -> TransformResult<Self> {
        let key_pool = Arc::new(ApiKeyPool::new(config.api_keys().to_vec()));

        // Create HTTP client with timeout and connection pooling
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs()))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(TransformError::Http)?;

        Ok(Self {
            config,
            key_pool,
            http_client,
            metrics,
        })
    }

    async fn send(
        &self,
        url: &str,
        body: &serde_json::Value,
        request_id: &str,
    ) -> TransformResult<serde_json::Value> {
        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-request-id", request_id)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransformError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<serde_json::Value>().await?)
    }
}

#[async_trait]
impl TransformService for GeminiClient {
    #[instrument(skip(self, parts), fields(parts = parts.len(), request_id = request_id))]
    async fn submit(
        &self,
        parts: &[ContentPart],
        resolution_hint: &str,
        request_id: &str,
    ) -> TransformResult<Vec<TransformedImage>> {
        let (key_idx, api_key) = self
            .key_pool
            .next_key()
            .await
            .ok_or(TransformError::NoUsableKey)?;

        let model = self.config.image_model();
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, api_key
        );

        let request_body = json!({
            "contents": [{
                "parts": encode_parts(parts)
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": {
                    "imageSize": resolution_hint
                }
            }
        });

        let start = Instant::now();
        let result = self.send(&url, &request_body, request_id).await;
        let duration = start.elapsed();

        match result {
            Ok(response) => {
                self.key_pool.record_success(key_idx).await;

                let (input_tokens, output_tokens) = extract_token_usage(&response);
                if let Some(ref m) = self.metrics {
                    m.record_api_call(true, duration, input_tokens, output_tokens);
                }

                let images = extract_images(&response)?;
                debug!(
                    "Request {} returned {} image(s) in {:.2}s",
                    request_id,
                    images.len(),
                    duration.as_secs_f64()
                );
                Ok(images)
            }
            Err(e) => {
                self.key_pool.record_failure(key_idx).await;

                if let Some(ref m) = self.metrics {
                    m.record_api_call(false, duration, 0, 0);
                }

                warn!("Request {} failed with key {}: {}", request_id, key_idx, e);
                Err(e)
            }
        }
    }
}

/// Serialize content parts into generateContent JSON, base64-encoding
/// inline image data.
fn encode_parts(parts: &[ContentPart]) -> Vec<serde_json::Value> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({ "text": text }),
            ContentPart::InlineImage { media_type, data } => json!({
                "inline_data": {
                    "mime_type": media_type,
                    "data": general_purpose::STANDARD.encode(data.as_slice()),
                }
            }),
        })
        .collect()
}

/// Pull the zero-or-one inline images out of a generateContent response.
///
/// A candidate with no inline parts is an empty result, not a fault; only a
/// structurally broken payload is an error.
fn extract_images(response: &serde_json::Value) -> TransformResult<Vec<TransformedImage>> {
    let Some(parts) = response["candidates"][0]["content"]["parts"].as_array() else {
        return Ok(Vec::new());
    };

    let mut images = Vec::new();
    for part in parts {
        let inline = &part["inline_data"];
        if inline.is_null() {
            continue;
        }

        let data = inline["data"].as_str().ok_or_else(|| {
            TransformError::InvalidResponse("inline_data without data field".to_string())
        })?;
        let bytes = general_purpose::STANDARD.decode(data).map_err(|e| {
            TransformError::InvalidResponse(format!("inline_data is not valid base64: {}", e))
        })?;
        let media_type = inline["mime_type"].as_str().unwrap_or("image/png").to_string();

        images.push(TransformedImage { bytes, media_type });
    }

    Ok(images)
}

/// Extract token usage from a Gemini API response.
///
/// Returns (input_tokens, output_tokens) if available, otherwise (0, 0)
fn extract_token_usage(response: &serde_json::Value) -> (u64, u64) {
    let usage_metadata = &response["usageMetadata"];
    let input_tokens = usage_metadata["promptTokenCount"].as_u64().unwrap_or(0);
    let output_tokens = usage_metadata["candidatesTokenCount"].as_u64().unwrap_or(0);

    (input_tokens, output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_parts_keeps_order_and_encodes_images() {
        let parts = vec![
            ContentPart::Text("Reference: previously colorized page 1:".to_string()),
            ContentPart::InlineImage {
                media_type: "image/png".to_string(),
                data: Arc::new(vec![1, 2, 3]),
            },
            ContentPart::Text("colorize".to_string()),
        ];

        let encoded = encode_parts(&parts);
        assert_eq!(encoded.len(), 3);
        assert_eq!(
            encoded[0]["text"].as_str().unwrap(),
            "Reference: previously colorized page 1:"
        );
        assert_eq!(
            encoded[1]["inline_data"]["data"].as_str().unwrap(),
            general_purpose::STANDARD.encode([1u8, 2, 3])
        );
        assert_eq!(
            encoded[1]["inline_data"]["mime_type"].as_str().unwrap(),
            "image/png"
        );
        assert_eq!(encoded[2]["text"].as_str().unwrap(), "colorize");
    }

    #[test]
    fn test_extract_images_roundtrip() {
        let payload = general_purpose::STANDARD.encode([9u8, 8, 7]);
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "some commentary" },
                        { "inline_data": { "mime_type": "image/png", "data": payload } }
                    ]
                }
            }]
        });

        let images = extract_images(&response).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].bytes, vec![9, 8, 7]);
        assert_eq!(images[0].media_type, "image/png");
    }

    #[test]
    fn test_extract_images_empty_candidate_is_not_an_error() {
        let response = json!({ "candidates": [] });
        assert!(extract_images(&response).unwrap().is_empty());

        let text_only = json!({
            "candidates": [{ "content": { "parts": [{ "text": "no image" }] } }]
        });
        assert!(extract_images(&text_only).unwrap().is_empty());
    }

    #[test]
    fn test_extract_images_rejects_bad_base64() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inline_data": { "mime_type": "image/png", "data": "@@not-base64@@" } }]
                }
            }]
        });

        let err = extract_images(&response).unwrap_err();
        assert!(matches!(err, TransformError::InvalidResponse(_)));
    }

    #[test]
    fn test_extract_token_usage() {
        let response = json!({
            "usageMetadata": { "promptTokenCount": 1200, "candidatesTokenCount": 34 }
        });
        assert_eq!(extract_token_usage(&response), (1200, 34));
        assert_eq!(extract_token_usage(&json!({})), (0, 0));
    }
}
