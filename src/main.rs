// Command-line entry point: transform a directory of manga pages.
//
// Usage: manga-colorist <colorize|translate> <input-dir> <output-dir>

use manga_colorist::{
    core::{
        config::Config,
        types::{PageSource, ProcessedPage, ReferenceResolver, RunListener},
    },
    orchestration::batch_orchestrator::BatchOrchestrator,
    utils::Metrics,
};

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Caller-side result store: feeds completed pages back to the orchestrator
/// as references and holds them until they are written out.
#[derive(Default)]
struct ResultStore {
    outputs: Mutex<HashMap<usize, (Arc<Vec<u8>>, String)>>,
}

impl RunListener for ResultStore {
    fn batch_started(&self, indices: &[usize]) {
        info!("Batch started: pages {:?}", indices);
    }

    fn page_completed(&self, page: ProcessedPage) {
        info!(
            "Page {} completed ({} bytes, {})",
            page.index,
            page.image_bytes.len(),
            page.media_type
        );
        self.outputs
            .lock()
            .insert(page.index, (Arc::new(page.image_bytes), page.media_type));
    }
}

impl ReferenceResolver for ResultStore {
    fn resolve(&self, index: usize) -> Option<Arc<Vec<u8>>> {
        self.outputs.lock().get(&index).map(|(bytes, _)| Arc::clone(bytes))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Arc::new(Config::new().context("Failed to load configuration")?);

    // Initialize logging
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!(
        "manga_colorist={}",
        match config.log_level() {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let (mode, input_dir, output_dir) = match (args.next(), args.next(), args.next()) {
        (Some(mode), Some(input), Some(output)) => {
            (mode, PathBuf::from(input), PathBuf::from(output))
        }
        _ => bail!("Usage: manga-colorist <colorize|translate> <input-dir> <output-dir>"),
    };

    let pages = load_pages(&input_dir)?;
    if pages.is_empty() {
        bail!("No image files found in {}", input_dir.display());
    }
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    info!("=== MANGA COLORIST ===");
    info!(
        "Mode: {}, pages: {}, max batch width: {}, resolution: {}, model: {}",
        mode,
        pages.len(),
        config.max_batch_width(),
        config.resolution_hint(),
        config.image_model()
    );

    let metrics = Metrics::new();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&config), metrics.clone())
        .context("Failed to initialize orchestrator")?;
    let store = ResultStore::default();

    let summary = match mode.as_str() {
        "colorize" => orchestrator.run_colorize(&pages, &store, &store).await,
        "translate" => orchestrator
            .run_translate(&pages, &store)
            .await
            .context("Translation run aborted")?,
        other => bail!("Unknown mode: {} (expected colorize or translate)", other),
    };

    write_outputs(&store, &pages, &output_dir)?;

    let snapshot = metrics.snapshot();
    info!(
        "Run complete: {}/{} pages in {:.2}s ({} API calls, {} in / {} out tokens)",
        summary.completed,
        summary.total_pages,
        summary.elapsed_ms / 1000.0,
        snapshot.api_calls_total,
        snapshot.api_tokens_input,
        snapshot.api_tokens_output
    );
    if !summary.skipped.is_empty() {
        warn!("Skipped pages: {:?}", summary.skipped);
    }

    Ok(())
}

/// Load page files from a directory in alphabetical order.
fn load_pages(dir: &Path) -> Result<Vec<PageSource>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("png" | "jpg" | "jpeg" | "webp")
            )
        })
        .collect();
    paths.sort();

    let mut pages = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("page_{index:03}"));
        pages.push(PageSource {
            index,
            filename,
            bytes: Arc::new(bytes),
        });
    }
    Ok(pages)
}

/// Write every captured output next to its source page's name.
fn write_outputs(store: &ResultStore, pages: &[PageSource], output_dir: &Path) -> Result<()> {
    let outputs = store.outputs.lock();
    for page in pages {
        let Some((bytes, media_type)) = outputs.get(&page.index) else {
            continue;
        };
        let extension = match media_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        };
        let stem = Path::new(&page.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("page_{:03}", page.index));
        let path = output_dir.join(format!("{}.{}", stem, extension));
        std::fs::write(&path, bytes.as_slice())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
