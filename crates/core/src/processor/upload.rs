//! Upload fan-out stage.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error};

use super::run::RunContext;
use super::types::{GeneratedMedia, StageError};
use crate::destination::Destination;
use crate::item::{Item, ProcessingState};
use crate::metrics;
use crate::uploader::{UploadRequest, Uploader};

/// A generated image eligible for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Artifact {
    ContactSheet,
    /// Zero-based position in the generated screenshot list.
    Screenshot(usize),
}

impl Artifact {
    /// Client-side file name for destinations that accept one.
    fn upload_name(&self, stem: &str) -> String {
        match self {
            Self::ContactSheet => format!("{}_contact_sheet.jpg", stem),
            Self::Screenshot(index) => format!("{}_screenshot_{}.jpg", stem, index + 1),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContactSheet => f.write_str("contact sheet"),
            Self::Screenshot(index) => write!(f, "screenshot {}", index + 1),
        }
    }
}

/// One upload of one artifact to one destination.
struct UploadOp {
    destination: Destination,
    uploader: Arc<dyn Uploader>,
    artifact: Artifact,
    path: PathBuf,
}

/// Uploads every required artifact to every ready destination.
///
/// Links are written into the item as each upload finishes, so screenshot
/// slots fill in arrival order. Individual failures become warnings.
pub(crate) async fn upload(
    ctx: &Arc<RunContext>,
    item: &Item,
    media: &GeneratedMedia,
) -> Result<(), StageError> {
    let ops = plan(ctx, media);
    if ops.is_empty() {
        if ctx.cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        if ctx.requirements.is_empty() {
            return Ok(());
        }
        return Err(StageError::Failed(
            "No destination available for upload".to_string(),
        ));
    }

    let stem = item.stem();
    let started = Arc::new(AtomicBool::new(false));
    let mut tasks = JoinSet::new();
    for op in ops {
        let filename = op
            .destination
            .takes_filename()
            .then(|| op.artifact.upload_name(&stem));
        tasks.spawn(upload_task(
            Arc::clone(ctx),
            item.id.clone(),
            Arc::clone(&started),
            op,
            filename,
        ));
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(item = %item.id, error = %e, "Upload task panicked");
        }
    }

    if ctx.cancel.is_cancelled() {
        return Err(StageError::Cancelled);
    }
    Ok(())
}

fn plan(ctx: &RunContext, media: &GeneratedMedia) -> Vec<UploadOp> {
    let mut ops = Vec::new();
    for (destination, needs) in &ctx.requirements.destinations {
        let Some(uploader) = ctx.uploaders.get(destination) else {
            continue;
        };

        if needs.contact_sheet {
            if let Some(path) = &media.contact_sheet {
                ops.push(UploadOp {
                    destination: *destination,
                    uploader: Arc::clone(uploader),
                    artifact: Artifact::ContactSheet,
                    path: path.clone(),
                });
            }
        }

        if needs.screenshots {
            for (index, path) in media.screenshots.iter().enumerate() {
                ops.push(UploadOp {
                    destination: *destination,
                    uploader: Arc::clone(uploader),
                    artifact: Artifact::Screenshot(index),
                    path: path.clone(),
                });
            }
        }
    }
    ops
}

async fn upload_task(
    ctx: Arc<RunContext>,
    id: String,
    started: Arc<AtomicBool>,
    op: UploadOp,
    filename: Option<String>,
) {
    let Ok(_permit) = ctx.upload_pool.acquire(&ctx.cancel).await else {
        return;
    };
    ctx.mark_started(&id, &started, ProcessingState::Uploading)
        .await;

    let UploadOp {
        destination,
        uploader,
        artifact,
        path,
    } = op;
    debug!(item = %id, destination = %destination, artifact = %artifact, "Uploading");

    let request = UploadRequest {
        path,
        filename,
        thumb_size: ctx.settings.image_miniature_size,
    };

    match uploader.upload(request, &ctx.cancel).await {
        Ok(image) => {
            record(destination, "success");
            // Completed uploads are kept even if the run was cancelled meanwhile
            let written = ctx
                .registry
                .update_by_id(&id, move |item| {
                    let links = item.links_mut(destination);
                    match artifact {
                        Artifact::ContactSheet => {
                            links.contact_sheet = image.small;
                            links.contact_sheet_big = image.big;
                        }
                        Artifact::Screenshot(index) => {
                            links.set_screenshot(index, image.small, image.big)
                        }
                    }
                    if let Some(album) = image.album.as_deref() {
                        item.offer_album_link(album);
                    }
                })
                .await;
            if let Err(e) = written {
                debug!(item = %id, error = %e, "Could not record upload links");
            }
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
            record(destination, "failed");
            ctx.warn(
                &id,
                format!("{} upload of {} failed: {}", destination, artifact, e),
            )
            .await;
        }
    }
}

fn record(destination: Destination, result: &str) {
    metrics::UPLOADS
        .with_label_values(&[destination.display_name(), result])
        .inc();
}
