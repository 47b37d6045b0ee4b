//! Pipeline processor implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ingest::expand_paths;
use super::pool::ResourcePool;
use super::run::{self, RunSetup};
use super::types::{AddSummary, PipelineStatus, RunConfig, RunError};
use crate::config::Settings;
use crate::item::{Item, ItemRegistry, ProcessingState};
use crate::media::format::format_file_size;
use crate::media::{apply_media_info, MediaGenerator, MediaProber};
use crate::observer::Observer;
use crate::template;
use crate::uploader::UploaderSet;

type RunHandle = Shared<BoxFuture<'static, ()>>;

/// Bookkeeping for the active run.
struct ActiveRun {
    cancel: CancellationToken,
    done: RunHandle,
}

struct Pools {
    generation: Arc<ResourcePool>,
    upload: Arc<ResourcePool>,
}

impl Pools {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            generation: Arc::new(ResourcePool::new(
                "generation",
                settings.max_concurrent_generation,
            )),
            upload: Arc::new(ResourcePool::new(
                "upload",
                settings.max_concurrent_uploads,
            )),
        }
    }

    fn matches(&self, settings: &Settings) -> bool {
        self.generation.capacity() == settings.max_concurrent_generation.max(1)
            && self.upload.capacity() == settings.max_concurrent_uploads.max(1)
    }
}

/// The main pipeline processor.
///
/// Owns the item registry and the two resource pools, and runs at most one
/// processing run at a time in the background.
pub struct PipelineProcessor<M: MediaProber + MediaGenerator> {
    media: Arc<M>,
    uploaders: UploaderSet,
    registry: Arc<ItemRegistry>,
    observer: Arc<dyn Observer>,
    pools: RwLock<Pools>,
    active: Mutex<Option<ActiveRun>>,
    temp_root: PathBuf,
}

impl<M: MediaProber + MediaGenerator + 'static> PipelineProcessor<M> {
    /// Creates a new pipeline processor with pools sized from `settings`.
    pub fn new(
        settings: &Settings,
        media: M,
        uploaders: UploaderSet,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            media: Arc::new(media),
            uploaders,
            registry: Arc::new(ItemRegistry::new(Arc::clone(&observer))),
            observer,
            pools: RwLock::new(Pools::from_settings(settings)),
            active: Mutex::new(None),
            temp_root: std::env::temp_dir(),
        }
    }

    /// Places per-run work directories under `root` instead of the system temp dir.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// The item registry.
    pub fn registry(&self) -> &Arc<ItemRegistry> {
        &self.registry
    }

    /// Whether a run is active.
    pub async fn is_running(&self) -> bool {
        self.registry.is_processing().await
    }

    /// Registers the files under `paths` and probes them.
    ///
    /// Directories are expanded recursively. Files that are not videos or
    /// fail to probe are removed again. Allowed while a run is active; new
    /// items join the next run.
    pub async fn add_files(&self, paths: &[PathBuf]) -> Result<AddSummary, RunError> {
        let files = expand_paths(paths).await;
        if files.is_empty() {
            return Ok(AddSummary::default());
        }

        let mut items = Vec::with_capacity(files.len());
        for path in &files {
            let mut item = Item::new(uuid::Uuid::new_v4().to_string(), path.clone());
            match tokio::fs::metadata(path).await {
                Ok(meta) => {
                    item.file_size_bytes = meta.len();
                    item.file_size = format_file_size(meta.len());
                }
                Err(e) => debug!(path = %path.display(), error = %e, "Could not stat file"),
            }
            items.push(item);
        }
        self.registry.add_many(items.clone()).await?;

        let probes = items.iter().map(|item| self.probe_item(item));
        let added = join_all(probes).await.into_iter().filter(|ok| *ok).count();

        let summary = AddSummary {
            found: files.len(),
            added,
            rejected: files.len() - added,
        };
        info!(
            found = summary.found,
            added = summary.added,
            rejected = summary.rejected,
            "Files added"
        );
        Ok(summary)
    }

    /// Probes one registered item; returns whether it stayed registered.
    async fn probe_item(&self, item: &Item) -> bool {
        let info = match self.media.probe(&item.file_path).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                info!(file = %item.file_name, "Not a video, skipping");
                self.registry.remove(&item.id).await;
                return false;
            }
            Err(e) => {
                warn!(file = %item.file_name, error = %e, "Probe failed, skipping");
                self.registry.remove(&item.id).await;
                return false;
            }
        };

        let updated = self
            .registry
            .update_by_id(&item.id, |item| {
                apply_media_info(item, &info);
                item.state = ProcessingState::Pending;
            })
            .await;
        updated.is_ok()
    }

    /// Removes one item. Rejected while a run is active.
    pub async fn remove_item(&self, id: &str) -> Result<Item, RunError> {
        self.ensure_idle().await?;
        self.registry
            .remove(id)
            .await
            .ok_or_else(|| crate::item::RegistryError::NotFound(id.to_string()).into())
    }

    /// Removes every item. Rejected while a run is active.
    pub async fn clear(&self) -> Result<(), RunError> {
        self.ensure_idle().await?;
        self.registry.clear().await;
        Ok(())
    }

    /// Returns every analyzed item to `Pending` with results cleared.
    /// Rejected while a run is active.
    pub async fn reset_all(&self) -> Result<(), RunError> {
        self.ensure_idle().await?;
        self.registry.reset_all().await;
        Ok(())
    }

    /// Rearranges items into `order`.
    pub async fn reorder(&self, order: &[String]) -> Result<(), RunError> {
        self.registry.reorder(order).await?;
        Ok(())
    }

    /// Replaces both pools with pools sized from `settings`.
    /// Rejected while a run is active.
    pub async fn resize_pools(&self, settings: &Settings) -> Result<(), RunError> {
        self.ensure_idle().await?;
        *self.pools.write().await = Pools::from_settings(settings);
        info!(
            generation = settings.max_concurrent_generation,
            upload = settings.max_concurrent_uploads,
            "Resource pools resized"
        );
        Ok(())
    }

    async fn ensure_idle(&self) -> Result<(), RunError> {
        if self.is_running().await {
            return Err(RunError::AlreadyRunning);
        }
        Ok(())
    }

    /// Starts processing every `Pending` item.
    ///
    /// Returns immediately, processing happens in the background. Rejected
    /// if a run is active or nothing is pending.
    pub async fn start(&self, config: RunConfig) -> Result<(), RunError> {
        let mut active = self.active.lock().await;
        if self.is_running().await {
            return Err(RunError::AlreadyRunning);
        }

        let items = self
            .registry
            .items_in_state(ProcessingState::Pending)
            .await;
        if items.is_empty() {
            return Err(RunError::NothingPending);
        }

        let (generation_pool, upload_pool) = {
            let mut pools = self.pools.write().await;
            if !pools.matches(&config.settings) {
                *pools = Pools::from_settings(&config.settings);
            }
            (Arc::clone(&pools.generation), Arc::clone(&pools.upload))
        };

        self.registry.set_processing(true).await;

        let cancel = CancellationToken::new();
        let generator: Arc<dyn MediaGenerator> = self.media.clone();
        let setup = RunSetup {
            registry: Arc::clone(&self.registry),
            observer: Arc::clone(&self.observer),
            generator,
            uploaders: self.uploaders.clone(),
            generation_pool,
            upload_pool,
            config,
            cancel: cancel.clone(),
            work_dir: self
                .temp_root
                .join(format!("spoilr-{}", uuid::Uuid::new_v4())),
            items,
        };

        let handle = tokio::spawn(run::execute(setup));
        let done = handle
            .map(|joined| {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Run task panicked");
                }
            })
            .boxed()
            .shared();

        *active = Some(ActiveRun { cancel, done });
        Ok(())
    }

    /// Signals the active run to stop. No-op when idle.
    pub async fn cancel(&self) {
        if let Some(run) = self.active.lock().await.as_ref() {
            info!("Cancelling processing run");
            run.cancel.cancel();
        }
    }

    /// Waits until the active run (if any) has finished its cleanup.
    pub async fn wait(&self) {
        let done = self.active.lock().await.as_ref().map(|r| r.done.clone());
        if let Some(done) = done {
            done.await;
        }
    }

    /// Starts a run and waits for it to finish.
    pub async fn run(&self, config: RunConfig) -> Result<(), RunError> {
        self.start(config).await?;
        self.wait().await;
        Ok(())
    }

    /// Returns the current pipeline status.
    pub async fn status(&self) -> PipelineStatus {
        let snapshot = self.registry.snapshot().await;
        let pools = self.pools.read().await;

        let mut generating_items = Vec::new();
        let mut uploading_items = Vec::new();
        for item in &snapshot.items {
            match item.state {
                ProcessingState::WaitingForGenerationSlot | ProcessingState::GeneratingMedia => {
                    generating_items.push(item.id.clone())
                }
                ProcessingState::WaitingForUploadSlot | ProcessingState::Uploading => {
                    uploading_items.push(item.id.clone())
                }
                _ => {}
            }
        }

        PipelineStatus {
            running: snapshot.processing,
            generation_pool: pools.generation.status(),
            upload_pool: pools.upload.status(),
            generating_items,
            uploading_items,
        }
    }

    /// Renders every completed item with `template`.
    pub async fn render_report(&self, template: &str) -> String {
        let snapshot = self.registry.snapshot().await;
        template::render_batch(template, &snapshot.items)
    }

    /// Renders one item regardless of its state; empty for unknown ids.
    pub async fn render_item(&self, template: &str, id: &str) -> String {
        self.registry
            .get(id)
            .await
            .map(|item| template::render_item(template, &item))
            .unwrap_or_default()
    }

    /// Root directory for per-run work directories.
    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }
}
