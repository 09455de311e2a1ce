use crate::core::errors::ConfigError;
use std::env;
use tracing::Level;

/// API credentials and model selection
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_keys: Vec<String>,
    pub image_model: String,
    pub request_timeout_secs: u64,
}

/// Batch ramp configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Upper bound on pages dispatched concurrently in one batch
    pub max_batch_width: usize,
}

/// Output rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Resolution hint forwarded to the image model ("1K", "2K" or "4K")
    pub resolution_hint: String,
}

/// Language pair for translation mode
#[derive(Debug, Clone)]
pub struct TranslateConfig {
    pub source_language: String,
    pub target_language: String,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub batch: BatchConfig,
    pub render: RenderConfig,
    pub translate: TranslateConfig,
    pub log_level: Level,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env();
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Self {
        // Load API keys from environment (comma-separated) or use empty vec
        let api_keys = env::var("GEMINI_API_KEYS")
            .ok()
            .map(|keys| {
                keys.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        // Parse log level
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        Self {
            api: ApiConfig {
                api_keys,
                image_model: env::var("IMAGE_MODEL")
                    .unwrap_or_else(|_| "gemini-2.5-flash-image".to_string()),
                // Image generation is slow; the timeout also bounds hung calls
                request_timeout_secs: env::var("API_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            },
            batch: BatchConfig {
                max_batch_width: env::var("MAX_BATCH_WIDTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(4),
            },
            render: RenderConfig {
                resolution_hint: env::var("RESOLUTION_HINT")
                    .ok()
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "2K".to_string()),
            },
            translate: TranslateConfig {
                source_language: env::var("SOURCE_LANGUAGE")
                    .unwrap_or_else(|_| "Japanese".to_string()),
                target_language: env::var("TARGET_LANGUAGE")
                    .unwrap_or_else(|_| "English".to_string()),
            },
            log_level,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.api_keys.is_empty() {
            return Err(ConfigError::NoApiKeys);
        }

        if self.batch.max_batch_width == 0 {
            return Err(ConfigError::InvalidBatchWidth(self.batch.max_batch_width));
        }

        if !matches!(self.render.resolution_hint.as_str(), "1K" | "2K" | "4K") {
            return Err(ConfigError::InvalidResolutionHint(
                self.render.resolution_hint.clone(),
            ));
        }

        if self.translate.source_language.trim().is_empty() {
            return Err(ConfigError::InvalidLanguage(
                "source language must not be empty".to_string(),
            ));
        }
        if self.translate.target_language.trim().is_empty() {
            return Err(ConfigError::InvalidLanguage(
                "target language must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn api_keys(&self) -> &[String] {
        &self.api.api_keys
    }

    pub fn image_model(&self) -> &str {
        &self.api.image_model
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.api.request_timeout_secs
    }

    pub fn max_batch_width(&self) -> usize {
        self.batch.max_batch_width
    }

    pub fn resolution_hint(&self) -> &str {
        &self.render.resolution_hint
    }

    pub fn source_language(&self) -> &str {
        &self.translate.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.translate.target_language
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }
}

// Note: No Default implementation because Config::new() can fail
// Users should explicitly call Config::new()? and handle errors

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            api: ApiConfig {
                api_keys: vec!["key".to_string()],
                image_model: "gemini-2.5-flash-image".to_string(),
                request_timeout_secs: 300,
            },
            batch: BatchConfig { max_batch_width: 4 },
            render: RenderConfig {
                resolution_hint: "2K".to_string(),
            },
            translate: TranslateConfig {
                source_language: "Japanese".to_string(),
                target_language: "English".to_string(),
            },
            log_level: Level::INFO,
        }
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch_width() {
        let mut config = valid_config();
        config.batch.max_batch_width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBatchWidth(0))
        ));
    }

    #[test]
    fn validate_rejects_unknown_resolution_hint() {
        let mut config = valid_config();
        config.render.resolution_hint = "8K".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidResolutionHint(_))
        ));
    }

    #[test]
    fn validate_rejects_missing_keys() {
        let mut config = valid_config();
        config.api.api_keys.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoApiKeys)));
    }
}
