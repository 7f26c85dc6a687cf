use crate::session::SessionState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreencastError {
    #[error("Invalid recording handle {handle}: {registered} session(s) registered")]
    InvalidHandle { handle: usize, registered: usize },

    #[error("Recording {handle} is not active (state: {state:?})")]
    NotRecording {
        handle: usize,
        state: SessionState,
    },

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Video encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Frame decode failed: {0}")]
    FrameDecode(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),
}
