// Batch Orchestrator: drives transformation runs batch by batch
//
// Each iteration plans a batch, dispatches every page in it concurrently,
// streams completions to the caller as they resolve, then advances the
// completion registry once the whole batch has settled. Colorize runs chain
// batches through the registry (later pages see earlier outputs as
// references) and absorb page failures as skips; translate runs use fixed
// batches and abort on the first page failure.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{RunError, TransformError};
use crate::core::types::{PageSource, ProcessedPage, ReferenceResolver, RunListener, RunSummary};
use crate::orchestration::batch_planner;
use crate::services::transform::request::{build_colorize_request, build_translate_request};
use crate::services::transform::{GeminiClient, PageRequest, TransformService};
use crate::utils::Metrics;

/// Outcome of one page's single attempt within a batch.
enum PageOutcome {
    Completed(usize),
    Skipped(usize, RunError),
}

/// Main batch orchestrator
pub struct BatchOrchestrator {
    config: Arc<Config>,
    service: Arc<dyn TransformService>,
    metrics: Metrics,
}

impl BatchOrchestrator {
    /// Create an orchestrator backed by the Gemini client.
    pub fn new(config: Arc<Config>, metrics: Metrics) -> Result<Self, TransformError> {
        let service: Arc<dyn TransformService> = Arc::new(GeminiClient::new(
            Arc::clone(&config),
            Some(metrics.clone()),
        )?);
        Ok(Self {
            config,
            service,
            metrics,
        })
    }

    /// Create an orchestrator over a specific service implementation.
    pub fn with_service(
        config: Arc<Config>,
        service: Arc<dyn TransformService>,
        metrics: Metrics,
    ) -> Self {
        Self {
            config,
            service,
            metrics,
        }
    }

    /// Colorize `pages` in reference-chained batches.
    ///
    /// Every page is attempted exactly once. Pages whose attempt fails -
    /// undecodable source, remote fault or an empty result - are skipped:
    /// they are excluded from the reference pool and the run carries on, so
    /// a colorize run always reaches the end of the input.
    #[instrument(skip_all, fields(total_pages = pages.len()))]
    pub async fn run_colorize(
        &self,
        pages: &[PageSource],
        listener: &dyn RunListener,
        resolver: &dyn ReferenceResolver,
    ) -> RunSummary {
        let start = Instant::now();
        let total_pages = pages.len();
        let max_width = self.config.max_batch_width();

        let mut completed: Vec<usize> = Vec::new();
        let mut skipped: Vec<usize> = Vec::new();
        let mut cursor = 0usize;
        let mut ordinal = 1usize;

        info!(
            "Colorize run: {} pages, max batch width {}",
            total_pages, max_width
        );

        while cursor < total_pages {
            let mut plan =
                batch_planner::plan_chained(total_pages, max_width, &completed, ordinal, cursor);
            if plan.page_indices.is_empty() {
                // Every completion so far was a skip, so the ramp has no
                // references to grow on. Re-seed with a single page.
                debug!("Reference pool empty after skips, reseeding with page {}", cursor);
                plan.page_indices = vec![cursor];
            }

            listener.batch_started(&plan.page_indices);
            self.metrics.record_batch_dispatched();
            debug!(
                "Batch {}: pages {:?}, references {:?}",
                plan.ordinal, plan.page_indices, plan.reference_indices
            );

            let ordinal_now = plan.ordinal;
            let reference_indices = plan.reference_indices.as_slice();
            let outcomes = join_all(plan.page_indices.iter().map(|&idx| {
                let page = &pages[idx];
                async move {
                    match build_colorize_request(page, reference_indices, resolver).await {
                        Ok(request) => {
                            self.submit_page(request, "colorize", ordinal_now, listener)
                                .await
                        }
                        Err(e) => PageOutcome::Skipped(
                            idx,
                            RunError::Page {
                                index: idx,
                                source: e,
                            },
                        ),
                    }
                }
            }))
            .await;

            let mut batch_completed = Vec::new();
            for outcome in outcomes {
                match outcome {
                    PageOutcome::Completed(idx) => batch_completed.push(idx),
                    PageOutcome::Skipped(idx, err) => {
                        warn!("Page {} skipped: {}", idx, err);
                        self.metrics.record_page_skipped();
                        skipped.push(idx);
                    }
                }
            }

            // The registry stays in page order no matter how the network
            // interleaved completions within the batch.
            batch_completed.sort_unstable();
            completed.extend(batch_completed);

            cursor += plan.page_indices.len();
            ordinal += 1;
        }

        let summary = RunSummary {
            total_pages,
            completed: completed.len(),
            skipped,
            batches: ordinal - 1,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        info!(
            "Colorize run finished: {}/{} pages in {:.2}s ({} skipped)",
            summary.completed,
            total_pages,
            start.elapsed().as_secs_f64(),
            summary.skipped.len()
        );
        summary
    }

    /// Translate `pages` in fixed-width batches.
    ///
    /// Any page failure - undecodable source, remote fault or an empty
    /// result - aborts the run once its batch has settled. Completions that
    /// already streamed out of the failing batch are not rolled back.
    #[instrument(skip_all, fields(total_pages = pages.len()))]
    pub async fn run_translate(
        &self,
        pages: &[PageSource],
        listener: &dyn RunListener,
    ) -> Result<RunSummary, RunError> {
        let start = Instant::now();
        let total_pages = pages.len();
        let max_width = self.config.max_batch_width();
        let source_language = self.config.source_language();
        let target_language = self.config.target_language();

        let mut completed_count = 0usize;
        let mut cursor = 0usize;
        let mut ordinal = 1usize;

        info!(
            "Translate run: {} pages ({} -> {}), batch width {}",
            total_pages, source_language, target_language, max_width
        );

        while cursor < total_pages {
            let plan = batch_planner::plan_flat(total_pages, max_width, ordinal, cursor);

            listener.batch_started(&plan.page_indices);
            self.metrics.record_batch_dispatched();
            debug!("Batch {}: pages {:?}", plan.ordinal, plan.page_indices);

            let ordinal_now = plan.ordinal;
            let outcomes = join_all(plan.page_indices.iter().map(|&idx| {
                let page = &pages[idx];
                async move {
                    match build_translate_request(page, source_language, target_language).await {
                        Ok(request) => {
                            self.submit_page(request, "translate", ordinal_now, listener)
                                .await
                        }
                        Err(e) => PageOutcome::Skipped(
                            idx,
                            RunError::Page {
                                index: idx,
                                source: e,
                            },
                        ),
                    }
                }
            }))
            .await;

            // The batch has settled; surface the lowest-indexed failure.
            for outcome in outcomes {
                match outcome {
                    PageOutcome::Completed(_) => completed_count += 1,
                    PageOutcome::Skipped(idx, err) => {
                        warn!("Page {} failed, aborting translate run: {}", idx, err);
                        return Err(err);
                    }
                }
            }

            cursor += plan.page_indices.len();
            ordinal += 1;
        }

        let summary = RunSummary {
            total_pages,
            completed: completed_count,
            skipped: Vec::new(),
            batches: ordinal - 1,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        info!(
            "Translate run finished: {}/{} pages in {:.2}s",
            summary.completed,
            total_pages,
            start.elapsed().as_secs_f64()
        );
        Ok(summary)
    }

    /// Submit one built request and stream the completion to the caller.
    async fn submit_page(
        &self,
        request: PageRequest,
        mode: &'static str,
        ordinal: usize,
        listener: &dyn RunListener,
    ) -> PageOutcome {
        let index = request.page_index;
        let request_id = make_request_id(mode, ordinal, index);
        debug!("Dispatching request {}", request_id);

        match self
            .service
            .submit(&request.parts, self.config.resolution_hint(), &request_id)
            .await
        {
            Ok(images) => match images.into_iter().next() {
                Some(image) => {
                    self.metrics.record_page_completed();
                    listener.page_completed(ProcessedPage {
                        index,
                        image_bytes: image.bytes,
                        media_type: image.media_type,
                    });
                    PageOutcome::Completed(index)
                }
                None => PageOutcome::Skipped(index, RunError::EmptyResult { index }),
            },
            Err(e) => PageOutcome::Skipped(
                index,
                RunError::Transform {
                    index,
                    source: e,
                },
            ),
        }
    }
}

/// Request identifier unique per (mode, batch ordinal, page, submission time).
fn make_request_id(mode: &str, ordinal: usize, page_index: usize) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-b{:03}-p{:03}-{}", mode, ordinal, page_index, millis)
}
