// Shared types for the transformation workflow

use serde::Serialize;
use std::sync::Arc;

/// One source page, identified by its zero-based position in the input order.
///
/// The bytes are the file contents as supplied by the caller; decoding and
/// dimension probing happen when the page's request is built.
#[derive(Clone)]
pub struct PageSource {
    pub index: usize,
    pub filename: String,
    pub bytes: Arc<Vec<u8>>,
}

/// The transformed image produced for one page.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    pub index: usize,
    pub image_bytes: Vec<u8>,
    pub media_type: String,
}

/// Terminal summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_pages: usize,
    pub completed: usize,
    pub skipped: Vec<usize>,
    pub batches: usize,
    pub elapsed_ms: f64,
}

/// Caller-facing progress notifications, fired synchronously from the
/// orchestration loop. Implementations must return promptly.
pub trait RunListener: Send + Sync {
    /// A batch of pages has been dispatched for processing. Fired once per
    /// batch with the full index list.
    fn batch_started(&self, indices: &[usize]);

    /// One page finished successfully. Fired as soon as that page's request
    /// resolves; ordering within a batch follows network completion. The
    /// result is handed over outright - the orchestrator keeps only the
    /// page index.
    fn page_completed(&self, page: ProcessedPage);
}

/// Supplies the encoded bytes of a previously completed page so it can be
/// embedded as a reference in a later request. Returning `None` drops the
/// reference from the request rather than failing it.
pub trait ReferenceResolver: Send + Sync {
    fn resolve(&self, index: usize) -> Option<Arc<Vec<u8>>>;
}
