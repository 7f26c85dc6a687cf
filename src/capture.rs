use crate::paths::{PathAllocator, PathKind, ensure_parent_dir};
use crate::report::Reporter;
use crate::session::Session;
use crate::{CaptureConfig, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Browser/driver collaborator the capture loop polls.
#[async_trait::async_trait]
pub trait ScreenCapturer: Send + Sync {
    /// Whether a browser target is currently available to capture from.
    async fn is_attached(&self) -> bool;

    /// Writes one screenshot to `path`. `Ok(false)` means the driver declined
    /// the capture (no file written); errors are treated as transient by the
    /// capture loop and retried after a backoff.
    async fn capture(&self, path: &Path) -> Result<bool>;
}

/// One concurrent unit of work per active session.
///
/// Polls the capturer on a fixed cadence, appends successful frame paths to
/// its session and tracks elapsed time. Capture failures never terminate the
/// loop; only the session's stop request does. Marking the session finished
/// is the loop's last action.
pub struct CaptureLoop {
    session: Arc<Session>,
    capturer: Arc<dyn ScreenCapturer>,
    allocator: Arc<PathAllocator>,
    reporter: Arc<dyn Reporter>,
    template: String,
    capture_interval: Duration,
    error_backoff: Duration,
}

impl CaptureLoop {
    pub fn new(
        session: Arc<Session>,
        capturer: Arc<dyn ScreenCapturer>,
        allocator: Arc<PathAllocator>,
        reporter: Arc<dyn Reporter>,
        template: String,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            session,
            capturer,
            allocator,
            reporter,
            template,
            capture_interval: config.capture_interval(),
            error_backoff: config.error_backoff(),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let started = Instant::now();

        while self.session.is_recording() {
            match self.capture_once().await {
                Ok(_appended) => {
                    self.session.set_elapsed_secs(started.elapsed().as_secs_f64());
                    tokio::time::sleep(self.capture_interval).await;
                }
                Err(e) => {
                    self.reporter
                        .info(&format!("Cannot capture screenshots: {e}"), false);
                    tokio::time::sleep(self.error_backoff).await;
                }
            }
        }

        self.session.mark_finished();
    }

    async fn capture_once(&self) -> Result<bool> {
        let path = self.allocator.next_path(&self.template, PathKind::Frame);
        ensure_parent_dir(&path)?;

        if self.capturer.capture(&path).await? {
            self.session.push_frame(path).await;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
