// API key pool with round-robin selection and health accounting
//
// Picks which key a single submission uses and records the outcome. The
// pool never retries a request itself; keys that keep failing are passed
// over until their recovery window elapses.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};
use std::time::{Duration, Instant};

const UNHEALTHY_THRESHOLD: u32 = 3;
const RECOVERY_WINDOW: Duration = Duration::from_secs(300);
const RECOVERY_SUCCESSES: u32 = 5;

/// Health status of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyHealth {
    Healthy,
    Unhealthy,
}

/// API key with health tracking
#[derive(Debug, Clone)]
struct KeyState {
    key: String,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
    total_requests: u64,
    total_failures: u64,
}

impl KeyState {
    fn new(key: String) -> Self {
        Self {
            key,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure: None,
            total_requests: 0,
            total_failures: 0,
        }
    }

    fn health(&self) -> KeyHealth {
        if self.consecutive_failures >= UNHEALTHY_THRESHOLD {
            KeyHealth::Unhealthy
        } else {
            KeyHealth::Healthy
        }
    }

    fn should_recover(&self) -> bool {
        match self.last_failure {
            Some(at) => at.elapsed() > RECOVERY_WINDOW,
            None => true,
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.total_failures as f64 / self.total_requests as f64
    }
}

/// Round-robin pool over the configured credentials
pub struct ApiKeyPool {
    keys: RwLock<Vec<KeyState>>,
    cursor: AtomicUsize,
}

impl ApiKeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys: RwLock::new(keys.into_iter().map(KeyState::new).collect()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next usable key, round-robin, skipping unhealthy keys that are not
    /// yet due a recovery attempt. When every key is failing, the
    /// round-robin choice is handed out anyway so the caller's failure is
    /// attributed to a real key.
    pub async fn next_key(&self) -> Option<(usize, String)> {
        let keys = self.keys.read().await;
        if keys.is_empty() {
            return None;
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % keys.len();
        for offset in 0..keys.len() {
            let idx = (start + offset) % keys.len();
            let state = &keys[idx];
            if state.health() == KeyHealth::Healthy || state.should_recover() {
                return Some((idx, state.key.clone()));
            }
        }

        Some((start, keys[start].key.clone()))
    }

    pub async fn record_success(&self, index: usize) {
        let mut keys = self.keys.write().await;
        let Some(state) = keys.get_mut(index) else {
            return;
        };

        state.consecutive_successes += 1;
        state.consecutive_failures = 0;
        state.total_requests += 1;

        if state.consecutive_successes >= RECOVERY_SUCCESSES && state.last_failure.is_some() {
            info!(
                "API key {} recovered ({} consecutive successes)",
                index, state.consecutive_successes
            );
            state.last_failure = None;
        }
    }

    pub async fn record_failure(&self, index: usize) {
        let mut keys = self.keys.write().await;
        let Some(state) = keys.get_mut(index) else {
            return;
        };

        state.consecutive_failures += 1;
        state.consecutive_successes = 0;
        state.last_failure = Some(Instant::now());
        state.total_requests += 1;
        state.total_failures += 1;

        if state.consecutive_failures >= UNHEALTHY_THRESHOLD {
            warn!(
                "API key {} marked unhealthy ({} consecutive failures, {:.1}% overall failure rate)",
                index,
                state.consecutive_failures,
                state.failure_rate() * 100.0
            );
        }
    }

    pub async fn total_keys(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn healthy_count(&self) -> usize {
        self.keys
            .read()
            .await
            .iter()
            .filter(|k| k.health() == KeyHealth::Healthy)
            .count()
    }

    /// Per-key (health, total requests, total failures) for diagnostics.
    pub async fn stats(&self) -> Vec<(KeyHealth, u64, u64)> {
        self.keys
            .read()
            .await
            .iter()
            .map(|k| (k.health(), k.total_requests, k.total_failures))
            .collect()
    }
}
