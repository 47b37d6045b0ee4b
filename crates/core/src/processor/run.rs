//! One processing run: destination setup, per-item fan-out and cleanup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pool::ResourcePool;
use super::types::{RunConfig, StageError};
use super::{archive, generation, upload};
use crate::config::Settings;
use crate::destination::Destination;
use crate::item::{Item, ItemRegistry, ProcessingState};
use crate::media::{split_tool_args, MediaGenerator};
use crate::metrics;
use crate::observer::Observer;
use crate::requirements::Requirements;
use crate::uploader::{UploadError, Uploader, UploaderSet};

/// Shared, read-only state of an active run.
///
/// Workers only mutate items through `registry`.
pub(crate) struct RunContext {
    pub registry: Arc<ItemRegistry>,
    pub observer: Arc<dyn Observer>,
    pub generator: Arc<dyn MediaGenerator>,
    /// Uploaders that initialized successfully, required destinations only.
    pub uploaders: HashMap<Destination, Arc<dyn Uploader>>,
    pub generation_pool: Arc<ResourcePool>,
    pub upload_pool: Arc<ResourcePool>,
    pub requirements: Requirements,
    pub settings: Settings,
    pub contact_sheet_args: Vec<String>,
    pub cancel: CancellationToken,
    pub work_dir: PathBuf,
    tool_missing_reported: AtomicBool,
}

impl RunContext {
    /// Moves an item forward unless the run is cancelled.
    pub async fn transition(&self, id: &str, next: ProcessingState) {
        if self.cancel.is_cancelled() {
            return;
        }
        if let Err(e) = self.registry.transition(id, next).await {
            warn!(item = id, error = %e, "State transition failed");
        }
    }

    /// Transitions to `next` the first time any sibling operation starts.
    pub async fn mark_started(&self, id: &str, started: &AtomicBool, next: ProcessingState) {
        if !started.swap(true, Ordering::SeqCst) {
            self.transition(id, next).await;
        }
    }

    /// Records a non-fatal problem on an item. Dropped once cancelled.
    pub async fn warn(&self, id: &str, message: impl Into<String>) {
        if self.cancel.is_cancelled() {
            return;
        }
        let message = message.into();
        warn!(item = id, "{}", message);
        if let Err(e) = self.registry.push_warning(id, message).await {
            debug!(item = id, error = %e, "Could not record warning");
        }
    }

    /// Tells the observer once per run that contact sheets are being skipped.
    pub fn report_missing_contact_sheet_tool(&self) {
        if !self.tool_missing_reported.swap(true, Ordering::SeqCst) {
            info!("Contact sheet tool not available, skipping contact sheets");
            self.observer
                .on_run_error("Contact sheet tool is not installed; contact sheets were skipped");
        }
    }
}

/// Everything a run needs, captured when it is started.
pub(crate) struct RunSetup {
    pub registry: Arc<ItemRegistry>,
    pub observer: Arc<dyn Observer>,
    pub generator: Arc<dyn MediaGenerator>,
    pub uploaders: UploaderSet,
    pub generation_pool: Arc<ResourcePool>,
    pub upload_pool: Arc<ResourcePool>,
    pub config: RunConfig,
    pub cancel: CancellationToken,
    pub work_dir: PathBuf,
    /// Items that were `Pending` at start.
    pub items: Vec<Item>,
}

/// Drives a run to completion. Always leaves the registry idle.
pub(crate) async fn execute(setup: RunSetup) {
    let RunSetup {
        registry,
        observer,
        generator,
        uploaders,
        generation_pool,
        upload_pool,
        config,
        cancel,
        work_dir,
        items,
    } = setup;

    metrics::RUNS_STARTED.inc();
    let requirements = Requirements::analyze(&config.template);
    info!(
        items = items.len(),
        destinations = requirements.destinations.len(),
        contact_sheet = requirements.any_needs_contact_sheet(),
        screenshots = requirements.any_needs_screenshots(),
        "Processing run started"
    );

    let initialized =
        initialize_destinations(&requirements, &uploaders, &config, &observer, &cancel).await;

    let ctx = Arc::new(RunContext {
        registry: Arc::clone(&registry),
        observer,
        generator,
        uploaders: initialized,
        generation_pool,
        upload_pool,
        requirements,
        contact_sheet_args: split_tool_args(&config.settings.contact_sheet_args),
        settings: config.settings,
        cancel,
        work_dir,
        tool_missing_reported: AtomicBool::new(false),
    });

    if !ctx.cancel.is_cancelled() {
        let mut tasks = JoinSet::new();
        for item in items {
            tasks.spawn(process_item(Arc::clone(&ctx), item));
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Item task panicked");
            }
        }
    }

    let reset = registry.reset_unfinished().await;
    if reset > 0 {
        metrics::ITEMS_FINISHED
            .with_label_values(&["reset"])
            .inc_by(reset as u64);
    }

    match tokio::fs::remove_dir_all(&ctx.work_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %ctx.work_dir.display(), error = %e, "Failed to remove work directory"),
    }

    registry.set_processing(false).await;
    info!(
        cancelled = ctx.cancel.is_cancelled(),
        reset, "Processing run finished"
    );
}

/// Initializes the uploaders of every required destination concurrently.
///
/// Failures are reported to the observer and leave the destination out.
async fn initialize_destinations(
    requirements: &Requirements,
    uploaders: &UploaderSet,
    config: &RunConfig,
    observer: &Arc<dyn Observer>,
    cancel: &CancellationToken,
) -> HashMap<Destination, Arc<dyn Uploader>> {
    let pending = requirements.required_destinations().map(|destination| {
        let uploader = uploaders.get(destination);
        let destination_config = config.destination(destination);
        async move {
            let Some(uploader) = uploader else {
                return (destination, Err(UploadError::NotConfigured(destination)));
            };
            debug!(destination = %destination, "Initializing destination");
            let result = uploader
                .initialize(&destination_config, cancel)
                .await
                .map(|()| uploader);
            (destination, result)
        }
    });

    let mut ready = HashMap::new();
    for (destination, result) in join_all(pending).await {
        match result {
            Ok(uploader) => {
                ready.insert(destination, uploader);
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                metrics::DESTINATION_INIT_FAILURES
                    .with_label_values(&[destination.display_name()])
                    .inc();
                error!(destination = %destination, error = %e, "Destination initialization failed");
                observer.on_run_error(&format!(
                    "{} initialization failed: {}",
                    destination.display_name(),
                    e
                ));
            }
        }
    }
    ready
}

async fn process_item(ctx: Arc<RunContext>, item: Item) {
    let started = Instant::now();
    let outcome = run_item(&ctx, &item).await;
    let elapsed = started.elapsed().as_secs_f64();

    match outcome {
        Ok(()) => {
            info!(item = %item.id, file = %item.file_name, "Item completed");
            record_outcome("completed", elapsed);
        }
        Err(StageError::Failed(message)) if !ctx.cancel.is_cancelled() => {
            warn!(item = %item.id, file = %item.file_name, error = %message, "Item failed");
            if let Err(e) = ctx.registry.fail(&item.id, message).await {
                debug!(item = %item.id, error = %e, "Could not record failure");
            }
            record_outcome("error", elapsed);
        }
        Err(_) => debug!(item = %item.id, "Item abandoned by cancellation"),
    }
}

fn record_outcome(outcome: &str, elapsed: f64) {
    metrics::ITEMS_FINISHED.with_label_values(&[outcome]).inc();
    metrics::ITEM_DURATION
        .with_label_values(&[outcome])
        .observe(elapsed);
}

async fn run_item(ctx: &Arc<RunContext>, item: &Item) -> Result<(), StageError> {
    ctx.transition(&item.id, ProcessingState::WaitingForGenerationSlot)
        .await;

    let media = generation::generate(ctx, item).await?;
    if media.is_empty() {
        return Err(StageError::Failed("No media generated".to_string()));
    }

    if let Some(dir) = &ctx.settings.save_media_directory {
        for warning in archive::archive_media(dir, item, &media).await {
            ctx.warn(&item.id, warning).await;
        }
    }

    ctx.transition(&item.id, ProcessingState::WaitingForUploadSlot)
        .await;
    upload::upload(ctx, item, &media).await?;

    if ctx.cancel.is_cancelled() {
        return Err(StageError::Cancelled);
    }
    ctx.transition(&item.id, ProcessingState::Completed).await;
    Ok(())
}
