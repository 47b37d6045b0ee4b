//! Media generation stage.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error};

use super::run::RunContext;
use super::types::{GeneratedMedia, StageError};
use crate::config::SCREENSHOT_QUALITY_RANGE;
use crate::item::{Item, ProcessingState};
use crate::media::{ContactSheetJob, ScreenshotJob};
use crate::metrics;

/// Evenly spaced seek positions: `duration * i / (count + 1)` for `i` in `1..=count`.
pub fn screenshot_timestamps(duration_secs: f64, count: u32) -> Vec<f64> {
    let step = duration_secs / f64::from(count + 1);
    (1..=count).map(|i| step * f64::from(i)).collect()
}

/// Output of one generation task.
enum Produced {
    ContactSheet(Option<PathBuf>),
    Screenshot(usize, Option<PathBuf>),
}

/// Generates the contact sheet and screenshots the run requires for `item`.
///
/// Individual failures become warnings. Returns `Cancelled` if the run was
/// cancelled before every operation finished.
pub(crate) async fn generate(
    ctx: &Arc<RunContext>,
    item: &Item,
) -> Result<GeneratedMedia, StageError> {
    let item_dir = ctx.work_dir.join(&item.id);
    tokio::fs::create_dir_all(&item_dir).await.map_err(|e| {
        StageError::Failed(format!("Failed to create work directory: {}", e))
    })?;

    let started = Arc::new(AtomicBool::new(false));
    let mut tasks = JoinSet::new();

    if ctx.requirements.any_needs_contact_sheet() {
        let job = ContactSheetJob {
            input_path: item.file_path.clone(),
            output_dir: item_dir.join("contact_sheet"),
            args: ctx.contact_sheet_args.clone(),
        };
        tasks.spawn(contact_sheet_task(
            Arc::clone(ctx),
            item.id.clone(),
            Arc::clone(&started),
            job,
        ));
    }

    let mut slots: Vec<Option<PathBuf>> = Vec::new();
    if ctx.requirements.any_needs_screenshots() {
        let quality = ctx
            .settings
            .screenshot_quality
            .clamp(SCREENSHOT_QUALITY_RANGE.0, SCREENSHOT_QUALITY_RANGE.1) as u8;
        let timestamps = screenshot_timestamps(item.duration_secs, ctx.settings.screenshot_count);
        slots.resize(timestamps.len(), None);

        for (index, timestamp_secs) in timestamps.into_iter().enumerate() {
            let job = ScreenshotJob {
                input_path: item.file_path.clone(),
                output_path: item_dir.join(format!("screenshot_{}.jpg", index + 1)),
                timestamp_secs,
                quality,
            };
            tasks.spawn(screenshot_task(
                Arc::clone(ctx),
                item.id.clone(),
                Arc::clone(&started),
                index,
                job,
            ));
        }
    }

    let mut contact_sheet = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Produced::ContactSheet(path)) => contact_sheet = path,
            Ok(Produced::Screenshot(index, path)) => slots[index] = path,
            Err(e) => error!(item = %item.id, error = %e, "Generation task panicked"),
        }
    }

    if ctx.cancel.is_cancelled() {
        return Err(StageError::Cancelled);
    }

    Ok(GeneratedMedia {
        contact_sheet,
        screenshots: slots.into_iter().flatten().collect(),
    })
}

async fn contact_sheet_task(
    ctx: Arc<RunContext>,
    id: String,
    started: Arc<AtomicBool>,
    job: ContactSheetJob,
) -> Produced {
    let Ok(_permit) = ctx.generation_pool.acquire(&ctx.cancel).await else {
        return Produced::ContactSheet(None);
    };
    ctx.mark_started(&id, &started, ProcessingState::GeneratingMedia)
        .await;

    debug!(item = %id, "Generating contact sheet");
    match ctx.generator.generate_contact_sheet(job, &ctx.cancel).await {
        Ok(Some(path)) => {
            record("contact_sheet", "success");
            Produced::ContactSheet(Some(path))
        }
        Ok(None) => {
            record("contact_sheet", "skipped");
            ctx.report_missing_contact_sheet_tool();
            Produced::ContactSheet(None)
        }
        Err(e) if e.is_cancelled() => Produced::ContactSheet(None),
        Err(e) => {
            record("contact_sheet", "failed");
            ctx.warn(&id, format!("Contact sheet generation failed: {}", e))
                .await;
            Produced::ContactSheet(None)
        }
    }
}

async fn screenshot_task(
    ctx: Arc<RunContext>,
    id: String,
    started: Arc<AtomicBool>,
    index: usize,
    job: ScreenshotJob,
) -> Produced {
    let Ok(_permit) = ctx.generation_pool.acquire(&ctx.cancel).await else {
        return Produced::Screenshot(index, None);
    };
    ctx.mark_started(&id, &started, ProcessingState::GeneratingMedia)
        .await;

    debug!(item = %id, index, timestamp = job.timestamp_secs, "Generating screenshot");
    let output_path = job.output_path.clone();
    match ctx.generator.generate_screenshot(job, &ctx.cancel).await {
        Ok(()) => {
            record("screenshot", "success");
            Produced::Screenshot(index, Some(output_path))
        }
        Err(e) if e.is_cancelled() => Produced::Screenshot(index, None),
        Err(e) => {
            record("screenshot", "failed");
            ctx.warn(&id, format!("Screenshot {} failed: {}", index + 1, e))
                .await;
            Produced::Screenshot(index, None)
        }
    }
}

fn record(kind: &str, result: &str) {
    metrics::GENERATION_OPS
        .with_label_values(&[kind, result])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_evenly_spaced() {
        assert_eq!(screenshot_timestamps(30.0, 2), vec![10.0, 20.0]);
        assert_eq!(screenshot_timestamps(100.0, 3), vec![25.0, 50.0, 75.0]);
    }

    #[test]
    fn test_timestamps_zero_count() {
        assert!(screenshot_timestamps(30.0, 0).is_empty());
    }
}
