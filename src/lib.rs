// Library exports for the manga page colorization and translation engine

// Core modules
pub mod core;
pub mod middleware;
pub mod orchestration;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use crate::core::{
    config::Config,
    errors::{ConfigError, PageError, RunError, TransformError},
    types::{PageSource, ProcessedPage, ReferenceResolver, RunListener, RunSummary},
};

pub use crate::middleware::{ApiKeyPool, KeyHealth};

pub use crate::orchestration::batch_orchestrator::BatchOrchestrator;
pub use crate::orchestration::batch_planner::{plan_chained, plan_flat, BatchPlan};

pub use crate::services::transform::{
    ContentPart, GeminiClient, TransformService, TransformedImage,
};

pub use crate::utils::Metrics;
