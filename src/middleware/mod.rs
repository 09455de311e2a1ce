pub mod api_key_pool;

pub use api_key_pool::{ApiKeyPool, KeyHealth};
