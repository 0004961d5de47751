pub mod traits;

#[cfg(feature = "camera")]
mod native;

pub use traits::FrameSource;

#[cfg(feature = "camera")]
pub use native::CameraSource;

/// Failure while reading from an opened device.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    #[error("camera disconnected")]
    Disconnected,
    #[error("camera read failed: {0}")]
    Read(String),
    #[error("unsupported frame format: {0}")]
    UnsupportedFormat(String),
}

/// Failure while opening the device, before the scan loop starts.
#[derive(Debug, thiserror::Error)]
pub enum CameraSetupError {
    #[error("built without camera support, rebuild with `--features camera,window`")]
    Unavailable,
    #[error("failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },
    #[error("failed to start camera stream: {0}")]
    Stream(String),
    #[error("camera failed during warmup: {0}")]
    Warmup(String),
    #[error("failed to spawn capture thread: {0}")]
    Thread(String),
}

/// Placeholder used when the binary has no camera backend compiled in.
#[cfg(not(feature = "camera"))]
#[derive(Debug)]
pub struct CameraSource {
    _private: (),
}

#[cfg(not(feature = "camera"))]
impl CameraSource {
    pub async fn open(
        _config: &scan_relay_common::config::CameraConfig,
    ) -> Result<Self, CameraSetupError> {
        Err(CameraSetupError::Unavailable)
    }
}

#[cfg(not(feature = "camera"))]
impl FrameSource for CameraSource {
    async fn next_frame(
        &mut self,
    ) -> Result<scan_relay_common::frame::Frame, CaptureError> {
        Err(CaptureError::Disconnected)
    }
}
