pub mod downsample;
pub mod guard;

#[cfg(test)]
pub(crate) mod fakes;

use image::DynamicImage;
use qr_scanner_common::config::Config;
use qr_scanner_common::frame::{DecodedPayload, Frame, Point};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::cancel::Cancellation;
use crate::detector::{DetectError, Detector};
use crate::display::Display;
use crate::snapshot::SnapshotWriter;

use downsample::{downsample, DetectorInput};
use guard::SessionGuard;

/// Timing and downsampling knobs for the loop.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub downsample: bool,
    pub target_width: u32,
    pub target_height: u32,
    /// Pause after every iteration to bound CPU usage.
    pub frame_delay: Duration,
    /// Pause after a failed capture before trying again.
    pub retry_backoff: Duration,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            downsample: config.scan.downsample,
            target_width: config.scan.target_width,
            target_height: config.scan.target_height,
            frame_delay: config.scan.frame_delay(),
            retry_backoff: config.camera.retry_backoff(),
        }
    }
}

/// What a single iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    CaptureFailed,
    NoCode,
    DetectFailed,
    /// A code was decoded but its text was empty or already on display.
    Unchanged,
    Updated(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub frames: u64,
    pub capture_failures: u64,
    pub detect_failures: u64,
    pub updates: u64,
}

/// The capture → detect → display loop.
///
/// Owns its collaborators and the last displayed payload. The display always
/// shows exactly `last_seen`.
pub struct ScanLoop<C: Camera, D: Detector, S: Display> {
    session: SessionGuard<C, S>,
    detector: D,
    settings: ScanSettings,
    snapshots: Option<SnapshotWriter>,
    last_seen: String,
    summary: ScanSummary,
}

impl<C: Camera, D: Detector, S: Display> ScanLoop<C, D, S> {
    pub fn new(camera: C, detector: D, display: S, settings: ScanSettings) -> Self {
        Self {
            session: SessionGuard::new(camera, display),
            detector,
            settings,
            snapshots: None,
            last_seen: String::new(),
            summary: ScanSummary::default(),
        }
    }

    pub fn with_snapshots(mut self, writer: SnapshotWriter) -> Self {
        self.snapshots = Some(writer);
        self
    }

    #[cfg(test)]
    pub fn last_seen(&self) -> &str {
        &self.last_seen
    }

    /// Run until cancelled, then release the camera and destroy the display.
    ///
    /// Cancellation is honoured mid-capture and during both pauses, not only
    /// at the end of an iteration.
    pub async fn run(mut self, mut cancel: Cancellation) -> ScanSummary {
        info!(
            camera = self.session.camera().name(),
            detector = self.detector.name(),
            display = self.session.display().name(),
            downsample = self.settings.downsample,
            "entering scan loop"
        );

        loop {
            let outcome = tokio::select! {
                outcome = self.step() => outcome,
                _ = cancel.cancelled() => break,
            };

            let pause = match outcome {
                StepOutcome::CaptureFailed => self.settings.retry_backoff,
                _ => self.settings.frame_delay,
            };
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cancel.cancelled() => break,
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        self.session.close();
        info!(
            frames = self.summary.frames,
            capture_failures = self.summary.capture_failures,
            detect_failures = self.summary.detect_failures,
            updates = self.summary.updates,
            last_payload = self.last_seen,
            "scan loop stopped"
        );
        self.summary.clone()
    }

    /// One capture → detect → display pass, followed by a display refresh.
    pub async fn step(&mut self) -> StepOutcome {
        let outcome = self.process_next_frame().await;
        if let Err(e) = self.session.display_mut().refresh() {
            warn!(error = %e, "display refresh failed");
        }
        outcome
    }

    async fn process_next_frame(&mut self) -> StepOutcome {
        let frame = match self.session.camera_mut().read().await {
            Ok(frame) => frame,
            Err(e) => {
                self.summary.capture_failures += 1;
                warn!(
                    error = %e,
                    retry_in = ?self.settings.retry_backoff,
                    "failed to capture frame"
                );
                return StepOutcome::CaptureFailed;
            }
        };
        self.summary.frames += 1;

        let input = if self.settings.downsample {
            downsample(&frame.image, self.settings.target_width, self.settings.target_height)
        } else {
            DetectorInput::passthrough(&frame.image)
        };
        debug!(
            seq = frame.seq,
            width = frame.width(),
            height = frame.height(),
            downsampled = input.is_downsampled(),
            "frame captured"
        );

        let payload = match detect_contained(&mut self.detector, &input.image) {
            Ok(Some(payload)) => payload,
            Ok(None) => return StepOutcome::NoCode,
            Err(e) => {
                self.summary.detect_failures += 1;
                warn!(error = %e, seq = frame.seq, "detector failed, skipping frame");
                return StepOutcome::DetectFailed;
            }
        };

        if payload.is_empty() || payload.text == self.last_seen {
            return StepOutcome::Unchanged;
        }

        if let Err(e) = self.show(&payload.text) {
            warn!(error = %e, "failed to update display, will retry on next sighting");
            return StepOutcome::Unchanged;
        }
        self.last_seen = payload.text.clone();
        self.summary.updates += 1;
        info!(payload = payload.text, seq = frame.seq, "QR code detected");

        let (scale_x, scale_y) = (input.scale_x, input.scale_y);
        self.write_snapshot(&frame, &payload, scale_x, scale_y);
        StepOutcome::Updated(payload.text)
    }

    /// Replace the whole display content with `text`.
    fn show(&mut self, text: &str) -> Result<(), crate::display::DisplayError> {
        let display = self.session.display_mut();
        display.clear()?;
        display.append(text)
    }

    fn write_snapshot(&self, frame: &Frame, payload: &DecodedPayload, scale_x: f64, scale_y: f64) {
        let Some(writer) = &self.snapshots else {
            return;
        };
        let polygon: Vec<Point> = payload
            .polygon
            .iter()
            .map(|p| p.scaled(scale_x, scale_y))
            .collect();
        if let Err(e) = writer.write(frame, &polygon) {
            warn!(error = %e, "failed to write snapshot");
        }
    }
}

/// Run the detector, turning a panic inside it into an ordinary error so a
/// single bad frame cannot take the loop down.
fn detect_contained<D: Detector>(
    detector: &mut D,
    image: &DynamicImage,
) -> Result<Option<DecodedPayload>, DetectError> {
    match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(image))) {
        Ok(result) => result,
        Err(cause) => {
            let message = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Err(DetectError::Panicked(message))
        }
    }
}
