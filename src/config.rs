use crate::{Result, ScreencastError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Directory all frame, screenshot and video paths are resolved against.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_frame_template")]
    pub frame_template: String,
    /// Cadence between capture attempts while a session is recording.
    #[serde(default = "default_capture_interval_ms")]
    pub capture_interval_ms: u64,
    /// Backoff after a failed capture attempt before the loop retries.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    #[serde(default)]
    pub format: CaptureFormat,
    #[serde(default = "default_quality")]
    pub quality: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    #[default]
    Png,
    Jpeg,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    #[serde(default = "default_video_template")]
    pub video_template: String,
    /// How many times a stop request re-checks for loop completion.
    #[serde(default = "default_stop_wait_polls")]
    pub stop_wait_polls: u32,
    #[serde(default = "default_stop_poll_interval_ms")]
    pub stop_poll_interval_ms: u64,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
}

impl CaptureConfig {
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl VideoConfig {
    /// Total time a stop request waits for the capture loop to acknowledge
    /// completion before giving up on the session.
    pub fn stop_wait(&self) -> Duration {
        Duration::from_millis(self.stop_wait_polls as u64 * self.stop_poll_interval_ms)
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_frame_template() -> String {
    "screenshots-{index}.png".to_string()
}
fn default_video_template() -> String {
    "video-{index}.mp4".to_string()
}
fn default_capture_interval_ms() -> u64 {
    200
}
fn default_error_backoff_ms() -> u64 {
    1000
}
fn default_quality() -> u8 {
    90
}
fn default_stop_wait_polls() -> u32 {
    5
}
fn default_stop_poll_interval_ms() -> u64 {
    1000
}
fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            frame_template: default_frame_template(),
            capture_interval_ms: default_capture_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            format: CaptureFormat::default(),
            quality: default_quality(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            video_template: default_video_template(),
            stop_wait_polls: default_stop_wait_polls(),
            stop_poll_interval_ms: default_stop_poll_interval_ms(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let project_path = PathBuf::from(".screencast.toml");
        if project_path.exists() {
            let content = std::fs::read_to_string(&project_path)?;
            config = toml::from_str(&content)?;
        }

        config.load_from_env();
        Ok(config)
    }

    fn load_from_env(&mut self) {
        if let Ok(dir) = std::env::var("SCREENCAST_OUTPUT_DIR") {
            self.capture.output_dir = PathBuf::from(dir);
        }
        if let Ok(interval) = std::env::var("SCREENCAST_CAPTURE_INTERVAL_MS")
            && let Ok(interval) = interval.parse()
        {
            self.capture.capture_interval_ms = interval;
        }
        if let Ok(path) = std::env::var("SCREENCAST_FFMPEG_PATH") {
            self.video.ffmpeg_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.quality < 1 || self.capture.quality > 100 {
            return Err(ScreencastError::ConfigError(
                "quality must be between 1 and 100".into(),
            ));
        }

        if self.video.stop_wait_polls == 0 {
            return Err(ScreencastError::ConfigError(
                "stop_wait_polls must be greater than 0".into(),
            ));
        }

        if self.capture.error_backoff_ms == 0 {
            return Err(ScreencastError::ConfigError(
                "error_backoff_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
