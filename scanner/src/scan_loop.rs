use scan_relay_common::config::{ScanConfig, ScanStrategy};
use scan_relay_common::frame::Frame;
use scan_relay_common::payload::DecodedPayload;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::camera::{CaptureError, FrameSource};
use crate::decoder::Decoder;
use crate::dedup::DedupGate;
use crate::display::Display;
use crate::reporter::{ReportOutcome, Reporter};

/// Why the loop stopped.
#[derive(Debug, Clone)]
pub enum LoopExit {
    /// Quit key, closed window or interrupt signal.
    Cancelled,
    /// The camera stopped delivering frames.
    CaptureFailed(CaptureError),
}

impl LoopExit {
    pub const CAPTURE_FAILED_CODE: i32 = 2;

    pub fn exit_code(&self) -> i32 {
        match self {
            LoopExit::Cancelled => 0,
            LoopExit::CaptureFailed(_) => Self::CAPTURE_FAILED_CODE,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub scans: u64,
    pub reports: u64,
    pub report_failures: u64,
}

/// Capture, throttle, decode, dedupe and report, one frame at a time.
pub struct ScanLoop<S, D, R, V> {
    source: S,
    decoder: D,
    reporter: R,
    display: V,
    gate: DedupGate,
    scan_interval: u32,
    strategy: ScanStrategy,
    frame_counter: u32,
    /// Set once the loop has stopped; later steps return it without capturing.
    exit: Option<LoopExit>,
    shutdown: Option<watch::Receiver<bool>>,
    stats: LoopStats,
}

impl<S, D, R, V> ScanLoop<S, D, R, V>
where
    S: FrameSource,
    D: Decoder,
    R: Reporter,
    V: Display,
{
    pub fn new(source: S, decoder: D, reporter: R, display: V, config: &ScanConfig) -> Self {
        Self {
            source,
            decoder,
            reporter,
            display,
            gate: DedupGate::new(),
            scan_interval: config.interval,
            strategy: config.strategy,
            frame_counter: 0,
            exit: None,
            shutdown: None,
            stats: LoopStats::default(),
        }
    }

    /// Stop after the current iteration once `shutdown` becomes `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn last_seen(&self) -> Option<&DecodedPayload> {
        self.gate.last_seen()
    }

    /// Run until cancelled or the camera fails.
    pub async fn run(&mut self) -> LoopExit {
        info!(
            scan_interval = self.scan_interval,
            strategy = ?self.strategy,
            "scanning"
        );
        loop {
            if let Some(exit) = self.step().await {
                return exit;
            }
        }
    }

    /// One iteration. Returns `Some` when the loop must stop.
    pub async fn step(&mut self) -> Option<LoopExit> {
        if let Some(exit) = &self.exit {
            return Some(exit.clone());
        }

        let frame = match self.source.next_frame().await {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, frames = self.stats.frames, "webcam read error");
                return self.stop(LoopExit::CaptureFailed(e));
            }
        };
        self.stats.frames += 1;

        self.frame_counter += 1;
        if self.frame_counter > self.scan_interval {
            self.frame_counter = 0;
            self.scan(&frame).await;
        }

        self.display.render(&frame, self.gate.last_seen());

        if self.display.poll_cancel() {
            info!("exiting from user input");
            return self.stop(LoopExit::Cancelled);
        }
        if self.shutdown.as_ref().is_some_and(|rx| *rx.borrow()) {
            info!("exiting on shutdown signal");
            return self.stop(LoopExit::Cancelled);
        }
        None
    }

    fn stop(&mut self, exit: LoopExit) -> Option<LoopExit> {
        self.exit = Some(exit.clone());
        Some(exit)
    }

    async fn scan(&mut self, frame: &Frame) {
        self.stats.scans += 1;
        let mut payloads = self.decoder.decode(frame);
        debug!(seq = frame.seq(), found = payloads.len(), "scan attempt");

        if self.strategy == ScanStrategy::First {
            payloads.truncate(1);
        }

        for payload in payloads {
            if !self.gate.consider(&payload) {
                continue;
            }
            info!(payload = %payload, seq = frame.seq(), "new code detected");
            self.stats.reports += 1;
            // Delivery failure leaves the gate holding the payload.
            if let ReportOutcome::Failed { reason } = self.reporter.report(&payload).await {
                warn!(payload = %payload, reason = %reason, "report failed, not retrying");
                self.stats.report_failures += 1;
            }
        }
    }
}
