use crate::paths::{PathAllocator, PathKind, ensure_parent_dir};
use crate::report::Reporter;
use crate::{Result, ScreencastError};
use image::RgbImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;

/// Below this many frames the computed rate is considered too sparse to be
/// meaningful and encoding falls back to 1 fps.
const MIN_FRAMES_FOR_COMPUTED_FPS: usize = 5;

/// Encoder collaborator: opens a writer sized to the recording.
pub trait VideoEncoder: Send + Sync {
    fn open(&self, path: &Path, fps: u32, width: u32, height: u32) -> Result<Box<dyn VideoSink>>;
}

/// One open video file. Frames are appended in order, then finalized.
pub trait VideoSink: Send {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    fn finish(self: Box<Self>) -> Result<()>;
}

/// Turns an ordered sequence of captured frames into a single video file.
pub struct VideoAssembler {
    allocator: Arc<PathAllocator>,
    encoder: Arc<dyn VideoEncoder>,
    reporter: Arc<dyn Reporter>,
}

impl VideoAssembler {
    pub fn new(
        allocator: Arc<PathAllocator>,
        encoder: Arc<dyn VideoEncoder>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            allocator,
            encoder,
            reporter,
        }
    }

    /// Encodes `frames` at a rate derived from the recording's elapsed time,
    /// sized to the first frame. Returns the allocated output path.
    pub fn assemble(
        &self,
        frames: &[PathBuf],
        elapsed_secs: f64,
        template: &str,
    ) -> Result<PathBuf> {
        let first = frames
            .first()
            .ok_or_else(|| ScreencastError::EncodingFailed("no frames to encode".into()))?;

        let fps = compute_fps(frames.len(), elapsed_secs);
        let first_frame = image::open(first)?.to_rgb8();
        let (width, height) = first_frame.dimensions();

        let path = self.allocator.next_path(template, PathKind::Video);
        ensure_parent_dir(&path)?;

        let sink = self.encoder.open(&path, fps, width, height)?;
        if let Err(e) = self.write_all_frames(sink, &first_frame, &frames[1..]) {
            // the sink has been dropped at this point; don't leave a partial
            // video behind for the allocator to skip forever
            std::fs::remove_file(&path).ok();
            return Err(e);
        }

        self.reporter.info(
            &format!(
                "Wrote video {} ({} frames at {fps} fps, {width}x{height}).",
                path.display(),
                frames.len()
            ),
            false,
        );

        Ok(path)
    }

    /// Consumes the sink so that an error drops it (and with it the encoder's
    /// hold on the output file) before the caller cleans up.
    fn write_all_frames(
        &self,
        mut sink: Box<dyn VideoSink>,
        first_frame: &RgbImage,
        rest: &[PathBuf],
    ) -> Result<()> {
        let (width, height) = first_frame.dimensions();
        sink.write_frame(first_frame)?;

        for frame_path in rest {
            let frame = image::open(frame_path)?.to_rgb8();
            if frame.dimensions() != (width, height) {
                self.reporter.warn(&format!(
                    "Frame {} differs in size from the first frame; skipping it.",
                    frame_path.display()
                ));
                continue;
            }
            sink.write_frame(&frame)?;
        }

        sink.finish()
    }
}

/// Encoders reject absurd rates; anything above this clamps down to it.
const MAX_FPS: u32 = 240;

/// `floor(frames / elapsed)`, clamped to 1 for very short or sparse
/// recordings where the computed rate would be degenerate, and capped for
/// near-zero elapsed times.
pub(crate) fn compute_fps(frame_count: usize, elapsed_secs: f64) -> u32 {
    if elapsed_secs <= 0.0 {
        return 1;
    }
    let fps = (frame_count as f64 / elapsed_secs) as u32;
    if fps < 1 || frame_count < MIN_FRAMES_FOR_COMPUTED_FPS {
        1
    } else {
        fps.min(MAX_FPS)
    }
}

/// Default encoder: pipes raw RGB frames into an `ffmpeg` child process.
pub struct FfmpegEncoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn open(&self, path: &Path, fps: u32, width: u32, height: u32) -> Result<Box<dyn VideoSink>> {
        let mut child = Command::new(&self.ffmpeg_path)
            .args([
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{width}x{height}"),
                "-r",
                &fps.to_string(),
                "-i",
                "-",
                "-c:v",
                "libx264",
                "-preset",
                "fast",
                "-pix_fmt",
                "yuv420p",
                "-an",
                "-y",
            ])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ScreencastError::EncodingFailed(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScreencastError::EncodingFailed("ffmpeg stdin unavailable".into()))?;

        Ok(Box::new(FfmpegSink {
            child: Some(child),
            stdin: Some(stdin),
        }))
    }
}

struct FfmpegSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if let Some(stdin) = self.stdin.as_mut() {
            stdin.write_all(frame.as_raw())?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        // closing stdin signals end of input
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait()?;
        if !status.success() {
            return Err(ScreencastError::EncodingFailed(format!(
                "ffmpeg exited with {status}"
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    /// Reaps the child when the sink is dropped without `finish()`, e.g. on
    /// an error mid-assembly; an un-waited child would linger as a zombie.
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            drop(self.stdin.take());
            child.kill().ok();
            child.wait().ok();
        }
    }
}
