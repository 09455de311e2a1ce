use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Run metrics collector.
///
/// Tracks API usage, token consumption and page outcomes. Cheap to clone;
/// all handles share the same counters.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    // API metrics
    api_calls_total: AtomicUsize,
    api_calls_success: AtomicUsize,
    api_calls_failed: AtomicUsize,
    api_tokens_input: AtomicU64,
    api_tokens_output: AtomicU64,
    api_latency_ms: RwLock<Vec<u64>>,

    // Run metrics
    pages_completed: AtomicUsize,
    pages_skipped: AtomicUsize,
    batches_dispatched: AtomicUsize,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                api_calls_total: AtomicUsize::new(0),
                api_calls_success: AtomicUsize::new(0),
                api_calls_failed: AtomicUsize::new(0),
                api_tokens_input: AtomicU64::new(0),
                api_tokens_output: AtomicU64::new(0),
                api_latency_ms: RwLock::new(Vec::new()),
                pages_completed: AtomicUsize::new(0),
                pages_skipped: AtomicUsize::new(0),
                batches_dispatched: AtomicUsize::new(0),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn record_api_call(
        &self,
        success: bool,
        duration: Duration,
        input_tokens: u64,
        output_tokens: u64,
    ) {
        self.inner.api_calls_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.inner.api_calls_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.api_calls_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.inner
            .api_tokens_input
            .fetch_add(input_tokens, Ordering::Relaxed);
        self.inner
            .api_tokens_output
            .fetch_add(output_tokens, Ordering::Relaxed);
        self.inner
            .api_latency_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    pub fn record_page_completed(&self) {
        self.inner.pages_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_skipped(&self) {
        self.inner.pages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_dispatched(&self) {
        self.inner.batches_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let latencies = self.inner.api_latency_ms.read();
        let api_latency_avg_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };

        MetricsSnapshot {
            api_calls_total: self.inner.api_calls_total.load(Ordering::Relaxed),
            api_calls_success: self.inner.api_calls_success.load(Ordering::Relaxed),
            api_calls_failed: self.inner.api_calls_failed.load(Ordering::Relaxed),
            api_tokens_input: self.inner.api_tokens_input.load(Ordering::Relaxed),
            api_tokens_output: self.inner.api_tokens_output.load(Ordering::Relaxed),
            api_latency_avg_ms,
            pages_completed: self.inner.pages_completed.load(Ordering::Relaxed),
            pages_skipped: self.inner.pages_skipped.load(Ordering::Relaxed),
            batches_dispatched: self.inner.batches_dispatched.load(Ordering::Relaxed),
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the collected metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub api_calls_total: usize,
    pub api_calls_success: usize,
    pub api_calls_failed: usize,
    pub api_tokens_input: u64,
    pub api_tokens_output: u64,
    pub api_latency_avg_ms: f64,
    pub pages_completed: usize,
    pub pages_skipped: usize,
    pub batches_dispatched: usize,
    pub uptime_seconds: u64,
}
