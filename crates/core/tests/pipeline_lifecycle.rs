//! Pipeline lifecycle integration tests.
//!
//! These tests drive the pipeline processor with mock media tooling and
//! mock uploaders:
//! - Run preconditions and the running flag
//! - Generation timestamps and concurrency limits
//! - State transitions (pending -> generating -> uploading -> completed)
//! - Partial failures, destination failures and cancellation

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use spoilr_core::{
    config::Settings,
    processor::{PipelineProcessor, RunConfig, RunError},
    testing::{fixtures, ContactSheetBehavior, MockMedia, MockUploader, RecordingObserver},
    Destination, Item, ProcessingState, UploaderSet,
};

/// Test helper to create a pipeline processor with mocks.
struct TestHarness {
    processor: PipelineProcessor<MockMedia>,
    media: MockMedia,
    fastpic: MockUploader,
    imgbox: MockUploader,
    hamster: MockUploader,
    observer: Arc<RecordingObserver>,
    settings: Settings,
    work_root: TempDir,
    source_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_settings(fixtures::settings(2))
    }

    fn with_settings(settings: Settings) -> Self {
        let work_root = TempDir::new().expect("Failed to create work dir");
        let source_dir = TempDir::new().expect("Failed to create source dir");

        let media = MockMedia::new();
        let fastpic = MockUploader::new(Destination::Fastpic);
        let imgbox = MockUploader::new(Destination::Imgbox);
        let hamster = MockUploader::new(Destination::Hamster);
        let observer = Arc::new(RecordingObserver::new());

        let uploaders = UploaderSet::new()
            .with(Arc::new(fastpic.clone()))
            .with(Arc::new(imgbox.clone()))
            .with(Arc::new(hamster.clone()));

        let processor =
            PipelineProcessor::new(&settings, media.clone(), uploaders, observer.clone())
                .with_temp_root(work_root.path());

        Self {
            processor,
            media,
            fastpic,
            imgbox,
            hamster,
            observer,
            settings,
            work_root,
            source_dir,
        }
    }

    /// Creates empty files in the source dir and registers them.
    async fn add_videos(&self, names: &[&str]) -> Vec<Item> {
        let mut paths = Vec::new();
        for name in names {
            let path = self.source_dir.path().join(name);
            std::fs::write(&path, b"video").expect("Failed to write source file");
            paths.push(path);
        }
        self.processor
            .add_files(&paths)
            .await
            .expect("Failed to add files");
        self.processor.registry().snapshot().await.items
    }

    fn run_config(&self, template: &str) -> RunConfig {
        RunConfig {
            settings: self.settings.clone(),
            template: template.to_string(),
            destinations: BTreeMap::new(),
        }
    }

    async fn item(&self, id: &str) -> Item {
        self.processor
            .registry()
            .get(id)
            .await
            .expect("Item should exist")
    }

    /// Polls until any item reaches `state`.
    async fn wait_for_state(&self, state: ProcessingState) {
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = self.processor.registry().snapshot().await;
                if snapshot.items.iter().any(|i| i.state == state) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(result.is_ok(), "Timed out waiting for {:?}", state);
    }

    fn work_dirs_left(&self) -> usize {
        std::fs::read_dir(self.work_root.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

const FASTPIC_TEMPLATE: &str = "%FILE_NAME%\n%CONTACT_SHEET_FP%\n%SCREENSHOTS_FP%";

// =============================================================================
// Run preconditions
// =============================================================================

#[tokio::test]
async fn test_start_with_nothing_pending_is_rejected() {
    let harness = TestHarness::new();
    let before = harness.observer.state_count();

    let result = harness
        .processor
        .start(harness.run_config(FASTPIC_TEMPLATE))
        .await;

    assert!(matches!(result, Err(RunError::NothingPending)));
    assert!(!harness.processor.is_running().await);
    assert_eq!(harness.observer.state_count(), before);
    assert_eq!(harness.media.generation_count().await, 0);
}

#[tokio::test]
async fn test_completed_items_are_not_pending() {
    let harness = TestHarness::new();
    harness.add_videos(&["a.mkv"]).await;
    harness
        .processor
        .run(harness.run_config(FASTPIC_TEMPLATE))
        .await
        .unwrap();

    let again = harness
        .processor
        .start(harness.run_config(FASTPIC_TEMPLATE))
        .await;
    assert!(matches!(again, Err(RunError::NothingPending)));
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let harness = TestHarness::new();
    harness
        .media
        .set_operation_delay(Duration::from_secs(30))
        .await;
    let items = harness.add_videos(&["a.mkv"]).await;

    harness
        .processor
        .start(harness.run_config(FASTPIC_TEMPLATE))
        .await
        .unwrap();
    assert!(harness.processor.is_running().await);

    let second = harness
        .processor
        .start(harness.run_config(FASTPIC_TEMPLATE))
        .await;
    assert!(matches!(second, Err(RunError::AlreadyRunning)));

    let removed = harness.processor.remove_item(&items[0].id).await;
    assert!(matches!(removed, Err(RunError::AlreadyRunning)));
    assert!(matches!(
        harness.processor.clear().await,
        Err(RunError::AlreadyRunning)
    ));

    harness.processor.cancel().await;
    harness.processor.wait().await;
    assert!(!harness.processor.is_running().await);
}

// =============================================================================
// Ingest
// =============================================================================

#[tokio::test]
async fn test_add_files_drops_non_video_and_failed_probes() {
    let harness = TestHarness::new();
    let dir = harness.source_dir.path();
    for name in ["movie.mkv", "notes.txt", "broken.mkv"] {
        std::fs::write(dir.join(name), b"data").unwrap();
    }
    harness.media.set_non_video(dir.join("notes.txt")).await;
    harness.media.set_probe_failure(dir.join("broken.mkv")).await;

    let summary = harness
        .processor
        .add_files(&[dir.to_path_buf()])
        .await
        .unwrap();

    assert_eq!(summary.found, 3);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.rejected, 2);

    let items = harness.processor.registry().snapshot().await.items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].file_name, "movie.mkv");
    assert_eq!(items[0].state, ProcessingState::Pending);
    assert_eq!(items[0].file_size, "4 B");
    assert_eq!(items[0].duration, "0:30");
    assert_eq!(items[0].video_codec, "h264");
}

// =============================================================================
// Full runs
// =============================================================================

#[tokio::test]
async fn test_full_run_completes_items() {
    let harness = TestHarness::new();
    let items = harness.add_videos(&["first.mkv", "second.mkv"]).await;

    harness
        .processor
        .run(harness.run_config(FASTPIC_TEMPLATE))
        .await
        .unwrap();

    for item in &items {
        let item = harness.item(&item.id).await;
        assert_eq!(item.state, ProcessingState::Completed);
        assert!(item.warnings.is_empty(), "{:?}", item.warnings);

        let links = item.links(Destination::Fastpic).unwrap();
        assert_eq!(links.contact_sheet, "FP-small-contact_sheet.jpg");
        assert_eq!(links.contact_sheet_big, "FP-big-contact_sheet.jpg");
        assert_eq!(
            links.screenshots,
            vec!["FP-small-screenshot_1.jpg", "FP-small-screenshot_2.jpg"]
        );
        assert!(item.links(Destination::Imgbox).is_none());
    }

    // One contact sheet plus two screenshots per item
    assert_eq!(harness.fastpic.upload_count().await, 6);
    assert_eq!(harness.imgbox.upload_count().await, 0);
    assert_eq!(harness.hamster.upload_count().await, 0);

    let uploads = harness.fastpic.recorded_uploads().await;
    let mut names: Vec<String> = uploads.iter().filter_map(|u| u.filename.clone()).collect();
    names.sort();
    assert!(names.contains(&"first_contact_sheet.jpg".to_string()));
    assert!(names.contains(&"second_screenshot_2.jpg".to_string()));
    assert!(uploads.iter().all(|u| u.thumb_size == 350));

    let report = harness.processor.render_report(FASTPIC_TEMPLATE).await;
    assert!(report.starts_with("first.mkv\nFP-small-contact_sheet.jpg\n"));
    assert!(report.contains("\n\nsecond.mkv\n"));

    assert!(!harness.processor.is_running().await);
    assert_eq!(harness.work_dirs_left(), 0, "Work dir should be removed");
}

#[tokio::test]
async fn test_screenshot_timestamps_evenly_spaced() {
    let harness = TestHarness::new();
    harness.add_videos(&["a.mkv"]).await;

    harness
        .processor
        .run(harness.run_config("%SCREENSHOTS_IB%"))
        .await
        .unwrap();

    let mut timestamps: Vec<f64> = harness
        .media
        .recorded_screenshots()
        .await
        .iter()
        .map(|job| job.timestamp_secs)
        .collect();
    timestamps.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(timestamps, vec![10.0, 20.0]);
    assert!(harness.media.recorded_contact_sheets().await.is_empty());
}

#[tokio::test]
async fn test_state_moves_forward_only() {
    let harness = TestHarness::new();
    let items = harness.add_videos(&["a.mkv"]).await;

    harness
        .processor
        .run(harness.run_config(FASTPIC_TEMPLATE))
        .await
        .unwrap();

    assert_eq!(
        harness.observer.state_history(&items[0].id),
        vec![
            ProcessingState::AnalyzingMedia,
            ProcessingState::Pending,
            ProcessingState::WaitingForGenerationSlot,
            ProcessingState::GeneratingMedia,
            ProcessingState::WaitingForUploadSlot,
            ProcessingState::Uploading,
            ProcessingState::Completed,
        ]
    );

    let last = harness.observer.last_snapshot().unwrap();
    assert!(!last.processing);
}

#[tokio::test]
async fn test_template_without_markers_does_no_work() {
    let harness = TestHarness::new();
    let items = harness.add_videos(&["a.mkv"]).await;

    harness
        .processor
        .run(harness.run_config("%FILE_NAME% %FILE_SIZE%"))
        .await
        .unwrap();

    assert_eq!(harness.media.generation_count().await, 0);
    assert_eq!(harness.fastpic.upload_count().await, 0);
    assert!(harness.fastpic.recorded_initializations().await.is_empty());

    let item = harness.item(&items[0].id).await;
    assert_eq!(item.state, ProcessingState::Error);
    assert_eq!(item.error.as_deref(), Some("No media generated"));
}

// =============================================================================
// Partial failures
// =============================================================================

#[tokio::test]
async fn test_partial_generation_records_warnings() {
    let harness = TestHarness::with_settings(fixtures::settings(3));
    harness.media.fail_screenshot(2).await;
    harness
        .media
        .set_contact_sheet_behavior(ContactSheetBehavior::ToolMissing)
        .await;
    let items = harness.add_videos(&["a.mkv", "b.mkv"]).await;

    harness
        .processor
        .run(harness.run_config(FASTPIC_TEMPLATE))
        .await
        .unwrap();

    for item in &items {
        let item = harness.item(&item.id).await;
        assert_eq!(item.state, ProcessingState::Completed);
        assert_eq!(item.warnings.len(), 1);
        assert!(item.warnings[0].contains("Screenshot 2 failed"));

        let links = item.links(Destination::Fastpic).unwrap();
        assert_eq!(links.contact_sheet, "");
        // Failed slot dropped, order kept
        assert_eq!(
            links.screenshots,
            vec!["FP-small-screenshot_1.jpg", "FP-small-screenshot_3.jpg"]
        );
    }

    // Missing tool reported once per run
    let errors = harness.observer.run_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Contact sheet tool"));
}

#[tokio::test]
async fn test_no_media_generated_is_an_error() {
    let harness = TestHarness::with_settings(fixtures::settings(1));
    harness.media.fail_screenshot(1).await;
    let items = harness.add_videos(&["a.mkv"]).await;

    harness
        .processor
        .run(harness.run_config("%SCREENSHOTS_HAM%"))
        .await
        .unwrap();

    let item = harness.item(&items[0].id).await;
    assert_eq!(item.state, ProcessingState::Error);
    assert_eq!(item.error.as_deref(), Some("No media generated"));
    assert_eq!(harness.hamster.upload_count().await, 0);
}

#[tokio::test]
async fn test_out_of_order_uploads_stay_index_aligned() {
    let harness = TestHarness::with_settings(Settings {
        max_concurrent_uploads: 6,
        ..fixtures::settings(3)
    });
    harness
        .fastpic
        .set_delay_for("screenshot_1.jpg", Duration::from_millis(120))
        .await;
    harness
        .fastpic
        .set_delay_for("screenshot_2.jpg", Duration::from_millis(60))
        .await;
    harness.imgbox.fail_file("screenshot_2.jpg").await;
    let items = harness.add_videos(&["a.mkv"]).await;

    harness
        .processor
        .run(harness.run_config("%SCREENSHOTS_FP%\n%SCREENSHOTS_IB_BIG%"))
        .await
        .unwrap();

    let item = harness.item(&items[0].id).await;
    assert_eq!(item.state, ProcessingState::Completed);

    let fastpic = item.links(Destination::Fastpic).unwrap();
    assert_eq!(
        fastpic.screenshots,
        vec![
            "FP-small-screenshot_1.jpg",
            "FP-small-screenshot_2.jpg",
            "FP-small-screenshot_3.jpg"
        ]
    );

    let imgbox = item.links(Destination::Imgbox).unwrap();
    assert_eq!(
        imgbox.screenshots_big,
        vec!["IB-big-screenshot_1.jpg", "", "IB-big-screenshot_3.jpg"]
    );
    assert_eq!(item.warnings.len(), 1);
    assert!(item.warnings[0].contains("Imgbox upload of screenshot 2 failed"));

    let rendered = harness
        .processor
        .render_item("%SCREENSHOTS_IB_BIG_SPACED%", &item.id)
        .await;
    assert_eq!(rendered, "IB-big-screenshot_1.jpg IB-big-screenshot_3.jpg");
}

#[tokio::test]
async fn test_destination_init_failure_is_reported_and_skipped() {
    let harness = TestHarness::new();
    harness.imgbox.set_init_error("invalid credentials").await;
    let items = harness.add_videos(&["a.mkv"]).await;

    harness
        .processor
        .run(harness.run_config("%SCREENSHOTS_FP%\n%SCREENSHOTS_IB%"))
        .await
        .unwrap();

    let errors = harness.observer.run_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Imgbox initialization failed"));
    assert!(errors[0].contains("invalid credentials"));

    assert_eq!(harness.imgbox.upload_count().await, 0);
    assert_eq!(harness.fastpic.upload_count().await, 2);
    assert!(harness.hamster.recorded_initializations().await.is_empty());

    let item = harness.item(&items[0].id).await;
    assert_eq!(item.state, ProcessingState::Completed);
    assert!(item.links(Destination::Imgbox).is_none());
}

#[tokio::test]
async fn test_album_link_recorded_once() {
    let harness = TestHarness::new();
    harness.fastpic.set_album("https://fastpic.example/album/7").await;
    let items = harness.add_videos(&["a.mkv"]).await;

    harness
        .processor
        .run(harness.run_config("%SCREENSHOTS_FP%"))
        .await
        .unwrap();

    let item = harness.item(&items[0].id).await;
    assert_eq!(item.album_link, "https://fastpic.example/album/7");
}

// =============================================================================
// Concurrency limits
// =============================================================================

#[tokio::test]
async fn test_pools_bound_concurrency() {
    let harness = TestHarness::with_settings(Settings {
        max_concurrent_generation: 2,
        max_concurrent_uploads: 1,
        ..fixtures::settings(3)
    });
    harness
        .media
        .set_operation_delay(Duration::from_millis(20))
        .await;
    harness.hamster.set_delay(Duration::from_millis(10)).await;
    harness.add_videos(&["a.mkv", "b.mkv", "c.mkv"]).await;

    harness
        .processor
        .run(harness.run_config("%CONTACT_SHEET_HAM%\n%SCREENSHOTS_HAM%"))
        .await
        .unwrap();

    assert_eq!(harness.media.generation_count().await, 12);
    assert!(harness.media.peak_concurrency() <= 2);
    assert_eq!(harness.hamster.upload_count().await, 12);
    assert_eq!(harness.hamster.peak_concurrency(), 1);

    let status = harness.processor.status().await;
    assert_eq!(status.generation_pool.active, 0);
    assert_eq!(status.upload_pool.total_acquired, 12);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_mid_run_resets_items() {
    let harness = TestHarness::new();
    harness
        .media
        .set_operation_delay(Duration::from_secs(30))
        .await;
    harness.media.fail_screenshot(1).await;
    harness.add_videos(&["a.mkv", "b.mkv", "c.mkv"]).await;

    harness
        .processor
        .start(harness.run_config(FASTPIC_TEMPLATE))
        .await
        .unwrap();
    harness
        .wait_for_state(ProcessingState::GeneratingMedia)
        .await;

    let status = harness.processor.status().await;
    assert!(status.running);
    assert!(!status.generating_items.is_empty());
    assert!(status.uploading_items.is_empty());

    harness.processor.cancel().await;
    tokio::time::timeout(Duration::from_secs(5), harness.processor.wait())
        .await
        .expect("Run should stop promptly after cancel");

    let snapshot = harness.processor.registry().snapshot().await;
    assert!(!snapshot.processing);
    for item in &snapshot.items {
        assert_eq!(item.state, ProcessingState::Pending);
        assert!(item.error.is_none());
        assert!(item.warnings.is_empty());
        assert!(item.results.is_empty());
    }
    assert_eq!(harness.fastpic.upload_count().await, 0);
    assert!(harness.observer.run_errors().is_empty());
    assert_eq!(harness.work_dirs_left(), 0);

    // Reset items can be processed again
    harness
        .media
        .set_operation_delay(Duration::ZERO)
        .await;
    harness
        .processor
        .run(harness.run_config("%SCREENSHOTS_FP%"))
        .await
        .unwrap();
    let done = harness
        .processor
        .registry()
        .items_in_state(ProcessingState::Completed)
        .await;
    assert_eq!(done.len(), 3);
}

// =============================================================================
// Archival
// =============================================================================

#[tokio::test]
async fn test_media_saved_to_local_directory() {
    let archive = TempDir::new().unwrap();
    let harness = TestHarness::with_settings(Settings {
        save_media_directory: Some(PathBuf::from(archive.path())),
        ..fixtures::settings(2)
    });
    harness.add_videos(&["Movie: Part 1.mkv"]).await;

    harness
        .processor
        .run(harness.run_config(FASTPIC_TEMPLATE))
        .await
        .unwrap();

    let target = archive.path().join("Movie_ Part 1");
    assert!(target.join("contact_sheet.jpg").exists());
    assert!(target.join("screenshot_01.jpg").exists());
    assert!(target.join("screenshot_02.jpg").exists());
}
