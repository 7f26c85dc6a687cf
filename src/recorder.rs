use crate::capture::{CaptureLoop, ScreenCapturer};
use crate::config::Config;
use crate::paths::PathAllocator;
use crate::report::Reporter;
use crate::session::{Session, SessionHandle, SessionRegistry};
use crate::video::{VideoAssembler, VideoEncoder};
use crate::{Result, ScreencastError};
use std::path::PathBuf;
use std::sync::Arc;

/// Public surface of the recording subsystem: starts and stops independent
/// recording sessions and owns the bounded-wait shutdown protocol.
///
/// Constructing the controller also constructs the registry and the path
/// allocator, so there is no implicitly initialized process-wide state.
pub struct RecordingController {
    config: Config,
    registry: SessionRegistry,
    allocator: Arc<PathAllocator>,
    capturer: Arc<dyn ScreenCapturer>,
    assembler: VideoAssembler,
    reporter: Arc<dyn Reporter>,
}

impl RecordingController {
    pub fn new(
        config: Config,
        capturer: Arc<dyn ScreenCapturer>,
        encoder: Arc<dyn VideoEncoder>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let allocator = Arc::new(PathAllocator::new(config.capture.output_dir.clone()));
        let assembler = VideoAssembler::new(allocator.clone(), encoder, reporter.clone());

        Self {
            config,
            registry: SessionRegistry::new(),
            allocator,
            capturer,
            assembler,
            reporter,
        }
    }

    /// Starts a recording session and returns its handle immediately; the
    /// capture loop runs as a detached task.
    ///
    /// Returns `Ok(None)` (a logged no-op) when no browser is attached.
    /// `template` falls back to the configured frame template.
    pub async fn start_recording(&self, template: Option<&str>) -> Result<Option<SessionHandle>> {
        if !self.capturer.is_attached().await {
            self.reporter.info(
                "Cannot start screen recording because no browser is open.",
                false,
            );
            return Ok(None);
        }

        let template = template
            .unwrap_or(&self.config.capture.frame_template)
            .to_string();

        let session = self.registry.register().await;
        let handle = session.handle();

        CaptureLoop::new(
            session,
            self.capturer.clone(),
            self.allocator.clone(),
            self.reporter.clone(),
            template,
            &self.config.capture,
        )
        .spawn();

        self.reporter
            .info(&format!("Started screen recording with index {handle}."), false);

        Ok(Some(handle))
    }

    /// Stops the session behind `handle` and, if the capture loop acknowledges
    /// within the configured wait budget, assembles its frames into a video.
    ///
    /// Returns the video path, or `Ok(None)` when nothing was captured or the
    /// loop failed to acknowledge in time (the session is then abandoned).
    /// An unknown handle or a session that is not recording is an error.
    pub async fn stop_recording(
        &self,
        handle: SessionHandle,
        video_template: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        let registered = self.registry.len().await;
        let session = self
            .registry
            .get(handle)
            .await
            .ok_or(ScreencastError::InvalidHandle { handle, registered })?;

        self.reporter
            .info(&format!("Stopping screen recording with index {handle}."), false);

        if !session.request_stop() {
            return Err(ScreencastError::NotRecording {
                handle,
                state: session.state(),
            });
        }

        let budget = self.config.video.stop_wait();
        if tokio::time::timeout(budget, session.wait_finished())
            .await
            .is_err()
        {
            session.mark_abandoned();
            self.reporter.warn(&format!(
                "Screen recording {handle} did not stop within {:.0}s; no video will be written.",
                budget.as_secs_f64()
            ));
            return Ok(None);
        }

        let elapsed = session.elapsed_secs();
        let frames = session.frames().await;
        self.reporter.info(
            &format!(
                "Recording {handle} ran {elapsed:.1}s and captured {} frame(s).",
                frames.len()
            ),
            false,
        );

        if elapsed == 0.0 || frames.is_empty() {
            self.reporter.info(
                &format!("Nothing was captured for index {handle}; skipping video."),
                false,
            );
            return Ok(None);
        }

        let template = video_template.unwrap_or(&self.config.video.video_template);
        let path = self.assembler.assemble(&frames, elapsed, template)?;
        Ok(Some(path))
    }

    /// Sessions stay resolvable after they end, so a stopped recording can
    /// still be inspected.
    pub async fn session(&self, handle: SessionHandle) -> Option<Arc<Session>> {
        self.registry.get(handle).await
    }

    pub async fn session_count(&self) -> usize {
        self.registry.len().await
    }
}
