//! End-to-end recording flow against mock collaborators.
//!
//! Exercises the keyword-level surface: session handles, the no-browser
//! no-op, the bounded stop wait, skip conditions and video assembly.

use image::{Rgb, RgbImage};
use screencast::paths::ensure_parent_dir;
use screencast::{
    CaptureConfig, Config, RecordingController, Reporter, Result, ScreenCapturer, ScreencastError,
    SessionState, VideoConfig, VideoEncoder, VideoSink,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Writes a real PNG per capture; the red channel of the first pixel carries
/// the capture ordinal so frame order survives into the encoder.
struct PngCapturer {
    attached: AtomicBool,
    captures: AtomicUsize,
}

impl PngCapturer {
    fn new(attached: bool) -> Self {
        Self {
            attached: AtomicBool::new(attached),
            captures: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ScreenCapturer for PngCapturer {
    async fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    async fn capture(&self, path: &Path) -> Result<bool> {
        let ordinal = self.captures.fetch_add(1, Ordering::SeqCst) as u8;
        let mut image = RgbImage::new(8, 6);
        image.put_pixel(0, 0, Rgb([ordinal, 0, 0]));
        image
            .save(path)
            .map_err(|e| ScreencastError::ScreenshotFailed(e.to_string()))?;
        Ok(true)
    }
}

struct FailingCapturer;

#[async_trait::async_trait]
impl ScreenCapturer for FailingCapturer {
    async fn is_attached(&self) -> bool {
        true
    }

    async fn capture(&self, _path: &Path) -> Result<bool> {
        Err(ScreencastError::ScreenshotFailed("no target".into()))
    }
}

/// Simulates a hung driver call: never resolves, so the loop cannot observe
/// the stop request.
struct StuckCapturer;

#[async_trait::async_trait]
impl ScreenCapturer for StuckCapturer {
    async fn is_attached(&self) -> bool {
        true
    }

    async fn capture(&self, _path: &Path) -> Result<bool> {
        std::future::pending().await
    }
}

#[derive(Default)]
struct MockEncoder {
    opened: Arc<Mutex<Vec<(PathBuf, u32, u32, u32)>>>,
    frame_ordinals: Arc<Mutex<Vec<u8>>>,
    finished: Arc<Mutex<usize>>,
}

struct MockSink {
    frame_ordinals: Arc<Mutex<Vec<u8>>>,
    finished: Arc<Mutex<usize>>,
    path: PathBuf,
}

impl VideoEncoder for MockEncoder {
    fn open(&self, path: &Path, fps: u32, width: u32, height: u32) -> Result<Box<dyn VideoSink>> {
        self.opened
            .lock()
            .unwrap()
            .push((path.to_path_buf(), fps, width, height));
        Ok(Box::new(MockSink {
            frame_ordinals: self.frame_ordinals.clone(),
            finished: self.finished.clone(),
            path: path.to_path_buf(),
        }))
    }
}

impl VideoSink for MockSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.frame_ordinals.lock().unwrap().push(frame.get_pixel(0, 0)[0]);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        std::fs::write(&self.path, b"mp4")?;
        *self.finished.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct CollectingReporter {
    infos: Mutex<Vec<String>>,
    warns: Mutex<Vec<String>>,
}

impl Reporter for CollectingReporter {
    fn info(&self, message: &str, _markup: bool) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warns.lock().unwrap().push(message.to_string());
    }
}

fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.capture = CaptureConfig {
        output_dir: output_dir.to_path_buf(),
        capture_interval_ms: 10,
        error_backoff_ms: 10,
        ..CaptureConfig::default()
    };
    config.video = VideoConfig {
        stop_wait_polls: 5,
        stop_poll_interval_ms: 100,
        ..VideoConfig::default()
    };
    config
}

fn controller(
    config: Config,
    capturer: Arc<dyn ScreenCapturer>,
) -> (
    RecordingController,
    Arc<MockEncoder>,
    Arc<CollectingReporter>,
) {
    let encoder = Arc::new(MockEncoder::default());
    let reporter = Arc::new(CollectingReporter::default());
    let controller = RecordingController::new(config, capturer, encoder.clone(), reporter.clone());
    (controller, encoder, reporter)
}

#[tokio::test]
async fn test_sequential_starts_yield_dense_handles() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, _, _) = controller(test_config(dir.path()), Arc::new(PngCapturer::new(true)));

    for expected in 0..3 {
        let handle = controller.start_recording(None).await.unwrap();
        assert_eq!(handle, Some(expected));
    }
    assert_eq!(controller.session_count().await, 3);

    for handle in 0..3 {
        controller.stop_recording(handle, None).await.unwrap();
    }
}

#[tokio::test]
async fn test_start_without_browser_is_logged_noop() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, _, reporter) =
        controller(test_config(dir.path()), Arc::new(PngCapturer::new(false)));

    let handle = controller.start_recording(None).await.unwrap();

    assert_eq!(handle, None);
    assert_eq!(controller.session_count().await, 0);
    assert!(
        reporter
            .infos
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("no browser is open"))
    );
}

#[tokio::test]
async fn test_stop_with_invalid_handle_fails_without_waiting() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, _, _) = controller(test_config(dir.path()), Arc::new(PngCapturer::new(true)));

    let started = Instant::now();
    let result = controller.stop_recording(7, None).await;

    assert!(matches!(
        result,
        Err(ScreencastError::InvalidHandle {
            handle: 7,
            registered: 0
        })
    ));
    // validation happens before any completion wait
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_stop_without_captures_produces_no_video() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, encoder, reporter) =
        controller(test_config(dir.path()), Arc::new(FailingCapturer));

    let handle = controller.start_recording(None).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let video = controller.stop_recording(handle, None).await.unwrap();

    assert_eq!(video, None);
    assert!(encoder.opened.lock().unwrap().is_empty());
    assert!(
        reporter
            .infos
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("skipping video"))
    );

    let session = controller.session(handle).await.unwrap();
    assert_eq!(session.state(), SessionState::Finished);
    assert_eq!(session.elapsed_secs(), 0.0);
}

#[tokio::test]
async fn test_stop_timeout_abandons_session_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.video.stop_wait_polls = 2;
    config.video.stop_poll_interval_ms = 25;
    let (controller, encoder, reporter) = controller(config, Arc::new(StuckCapturer));

    let handle = controller.start_recording(None).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let video = controller.stop_recording(handle, None).await.unwrap();

    assert_eq!(video, None);
    assert!(encoder.opened.lock().unwrap().is_empty());
    assert!(
        reporter
            .warns
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("did not stop"))
    );

    let session = controller.session(handle).await.unwrap();
    assert_eq!(session.state(), SessionState::Abandoned);
}

#[tokio::test]
async fn test_second_stop_on_finished_session_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, _, _) = controller(test_config(dir.path()), Arc::new(PngCapturer::new(true)));

    let handle = controller.start_recording(None).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.stop_recording(handle, None).await.unwrap();

    let second = controller.stop_recording(handle, None).await;
    assert!(matches!(
        second,
        Err(ScreencastError::NotRecording {
            state: SessionState::Finished,
            ..
        })
    ));
}

#[tokio::test]
async fn test_end_to_end_recording_produces_ordered_video() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = Arc::new(PngCapturer::new(true));
    let (controller, encoder, _) = controller(test_config(dir.path()), capturer.clone());

    let handle = controller
        .start_recording(Some("frame-{index}.png"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handle, 0);

    tokio::time::sleep(Duration::from_millis(120)).await;

    let video = controller
        .stop_recording(handle, Some("out-{index}.mp4"))
        .await
        .unwrap()
        .expect("a video should have been produced");

    assert_eq!(video, dir.path().join("out-1.mp4"));
    assert!(video.exists());

    let session = controller.session(handle).await.unwrap();
    let frames = session.frames().await;
    assert!(!frames.is_empty());
    assert_eq!(frames[0], dir.path().join("frame-1.png"));

    // encoder sized to the first frame
    let opened = encoder.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    let (ref path, _fps, width, height) = opened[0];
    assert_eq!(*path, video);
    assert_eq!((width, height), (8, 6));

    // every frame written, in capture order
    let ordinals = encoder.frame_ordinals.lock().unwrap();
    assert_eq!(ordinals.len(), frames.len());
    assert!(ordinals.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*encoder.finished.lock().unwrap(), 1);
}
