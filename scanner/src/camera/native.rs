//! Camera capture using `nokhwa`. The camera handle is `!Send`, so it lives
//! on a dedicated OS thread and hands frames to the scan loop over a bounded
//! channel.

use std::thread::{self, JoinHandle};

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use scan_relay_common::config::CameraConfig;
use scan_relay_common::frame::Frame;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::{CaptureError, CameraSetupError, FrameSource};

type FrameResult = Result<Frame, CaptureError>;

const REQUESTED_FPS: u32 = 30;

pub struct CameraSource {
    receiver: Option<mpsc::Receiver<FrameResult>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for CameraSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSource")
            .field("receiver", &self.receiver.is_some())
            .field("thread_handle", &self.thread_handle.is_some())
            .finish()
    }
}

impl CameraSource {
    /// Open the camera, start streaming and discard the warmup frames.
    ///
    /// Returns once the device has delivered `warmup_frames` frames, so a
    /// successful return means the camera is actually producing images.
    pub async fn open(config: &CameraConfig) -> Result<Self, CameraSetupError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (frame_tx, frame_rx) = mpsc::channel(config.buffer_count.max(1));
        let config = config.clone();

        let handle = thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || capture_thread(config, ready_tx, frame_tx))
            .map_err(|e| CameraSetupError::Thread(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                receiver: Some(frame_rx),
                thread_handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CameraSetupError::Thread(
                    "capture thread exited during setup".into(),
                ))
            }
        }
    }
}

impl FrameSource for CameraSource {
    async fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let receiver = self.receiver.as_mut().ok_or(CaptureError::Disconnected)?;
        receiver.recv().await.ok_or(CaptureError::Disconnected)?
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        // Closing the channel makes the next blocking_send fail, ending the thread.
        drop(self.receiver.take());
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

fn open_camera(config: &CameraConfig) -> Result<Camera, CameraSetupError> {
    let format = CameraFormat::new_from(
        config.width,
        config.height,
        FrameFormat::MJPEG,
        REQUESTED_FPS,
    );
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

    let mut camera = Camera::new(CameraIndex::Index(config.index), requested).map_err(|e| {
        CameraSetupError::Open {
            index: config.index,
            reason: e.to_string(),
        }
    })?;
    camera
        .open_stream()
        .map_err(|e| CameraSetupError::Stream(e.to_string()))?;
    Ok(camera)
}

fn read_frame(camera: &mut Camera, seq: u64) -> FrameResult {
    let buffer = camera
        .frame()
        .map_err(|e| CaptureError::Read(e.to_string()))?;
    let decoded = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| CaptureError::UnsupportedFormat(e.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());
    Frame::rgb(decoded.into_raw(), width, height, seq)
        .map_err(|e| CaptureError::UnsupportedFormat(e.to_string()))
}

fn capture_thread(
    config: CameraConfig,
    ready: oneshot::Sender<Result<(), CameraSetupError>>,
    tx: mpsc::Sender<FrameResult>,
) {
    let mut camera = match open_camera(&config) {
        Ok(c) => c,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let actual = camera.camera_format();
    info!(
        device = config.index,
        requested_w = config.width,
        requested_h = config.height,
        actual_w = actual.resolution().width_x,
        actual_h = actual.resolution().height_y,
        fps = actual.frame_rate(),
        "camera stream opened"
    );

    for i in 0..config.warmup_frames {
        if let Err(e) = camera.frame() {
            let _ = ready.send(Err(CameraSetupError::Warmup(format!("frame {i}: {e}"))));
            return;
        }
    }
    debug!(frames = config.warmup_frames, "camera warmup complete");

    if ready.send(Ok(())).is_err() {
        return;
    }

    let mut seq: u64 = 0;
    loop {
        let result = read_frame(&mut camera, seq);
        let failed = result.is_err();
        if let Err(e) = &result {
            error!(device = config.index, error = %e, "camera read error");
        }
        if tx.blocking_send(result).is_err() {
            debug!("frame receiver dropped, stopping capture");
            break;
        }
        if failed {
            break;
        }
        seq += 1;
    }

    if let Err(e) = camera.stop_stream() {
        debug!(error = %e, "failed to stop camera stream");
    }
}
