use scan_relay_common::frame::Frame;

use super::CaptureError;

/// Blocking-style source of camera frames.
///
/// Each call waits until a frame is available or the device fails. A
/// `CaptureError` is terminal: callers stop reading after the first one.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    async fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}
