pub mod capture;
pub mod chrome;
pub mod config;
pub mod error;
pub mod paths;
pub mod recorder;
pub mod report;
pub mod session;
pub mod video;

pub use capture::ScreenCapturer;
pub use chrome::CdpCapturer;
pub use config::{CaptureConfig, CaptureFormat, Config, VideoConfig};
pub use error::ScreencastError;
pub use recorder::RecordingController;
pub use report::{Reporter, TracingReporter};
pub use session::{Session, SessionHandle, SessionRegistry, SessionState};
pub use video::{FfmpegEncoder, VideoAssembler, VideoEncoder, VideoSink};

pub type Result<T> = std::result::Result<T, ScreencastError>;
