//! A monitoring session, owned by the foreground.

use crate::camera::{preferred_camera, CameraCandidate, Capture, FrameSource};
use crate::config::{Settings, PREVIEW_QUEUE};
use crate::detector::HandDetector;
use crate::error::{DetectorError, SessionError};
use crate::monitor::{Monitor, MonitorChannels, MonitorEvent, PreviewFrame};
use crate::zone::DangerZoneConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

pub struct Session<F, D> {
    camera: CameraCandidate,
    started_at: Instant,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Option<D>>>,
    events: mpsc::UnboundedReceiver<MonitorEvent>,
    preview: Option<mpsc::Receiver<PreviewFrame<F>>>,
    warnings: u32,
    warning_active: bool,
    ended: Option<Option<String>>,
}

impl<F, D> Session<F, D>
where
    F: Send + 'static,
    D: HandDetector<F>,
{
    /// Validates the selection, opens the camera and starts the worker.
    ///
    /// The detector is only acquired once the camera has delivered a test frame.
    pub fn start<S, G>(
        source: &S,
        cameras: &[CameraCandidate],
        selected: Option<u32>,
        zone: watch::Receiver<DangerZoneConfig>,
        settings: &Settings,
        detector: G,
    ) -> Result<Self, SessionError>
    where
        S: FrameSource,
        S::Capture: Capture<Frame = F>,
        G: FnOnce() -> Result<D, DetectorError>,
    {
        let index = selected
            .or_else(|| preferred_camera(cameras))
            .ok_or(SessionError::NoCamerasFound)?;
        if cameras.is_empty() {
            return Err(SessionError::NoCamerasFound);
        }
        let camera = cameras
            .iter()
            .find(|camera| camera.index == index)
            .cloned()
            .ok_or(SessionError::CameraNotAvailable(index))?;

        let mut capture = source
            .open(index)
            .map_err(|e| SessionError::DeviceUnavailable {
                index,
                reason: format!("Could not open camera {index}: {e}"),
            })?;
        if let Err(e) = capture.read_frame() {
            capture.release();
            return Err(SessionError::DeviceUnavailable {
                index,
                reason: format!("Camera {index} opened but cannot read frames: {e}"),
            });
        }

        let detector = match detector() {
            Ok(detector) => detector,
            Err(e) => {
                capture.release();
                return Err(e.into());
            }
        };

        let running = Arc::new(AtomicBool::new(true));
        let (events_tx, events) = mpsc::unbounded_channel();
        let (preview_tx, preview) = if settings.preview {
            let (tx, rx) = mpsc::channel(PREVIEW_QUEUE);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let monitor = Monitor::new(
            capture,
            detector,
            settings.cooldown,
            MonitorChannels {
                running: running.clone(),
                zone,
                events: events_tx,
                preview: preview_tx,
            },
        );
        let worker = thread::Builder::new()
            .name(format!("monitor-camera-{index}"))
            .spawn(move || monitor.run())
            .map_err(SessionError::Worker)?;

        log::info!(
            "Started monitoring with {} camera: {}",
            camera.kind().to_lowercase(),
            camera.name
        );

        Ok(Self {
            camera,
            started_at: Instant::now(),
            running,
            worker: Some(worker),
            events,
            preview,
            warnings: 0,
            warning_active: false,
            ended: None,
        })
    }
}

impl<F, D> Session<F, D> {
    /// Pulls pending worker events and folds them into the session statistics.
    pub fn poll_events(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match &event {
                MonitorEvent::WarningRaised { count } => {
                    self.warnings = *count;
                    self.warning_active = true;
                }
                MonitorEvent::WarningCleared => self.warning_active = false,
                MonitorEvent::Ended { error } => self.ended = Some(error.clone()),
            }
            events.push(event);
        }
        events
    }

    /// Most recent preview frame, discarding older ones.
    pub fn latest_preview(&mut self) -> Option<PreviewFrame<F>> {
        let preview = self.preview.as_mut()?;
        let mut latest = None;
        while let Ok(frame) = preview.try_recv() {
            latest = Some(frame);
        }
        latest
    }

    /// `Some` once the worker has exited, carrying its error if it stopped on its own.
    pub fn ended(&self) -> Option<&Option<String>> {
        self.ended.as_ref()
    }

    pub fn camera(&self) -> &CameraCandidate {
        &self.camera
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn warning_active(&self) -> bool {
        self.warning_active
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn status_line(&self) -> String {
        format!("Status: Monitoring Active (Camera {})", self.camera.index)
    }

    pub fn camera_status(&self) -> String {
        format!("Camera: {} ({})", self.camera.name, self.camera.kind())
    }

    /// Requests a cooperative stop and waits for the worker to release the camera.
    ///
    /// Returns the detector for reuse, unless it failed or the worker panicked.
    pub fn stop(mut self) -> Option<D> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<D> {
        let worker = self.worker.take()?;
        self.running.store(false, Ordering::Release);
        let detector = match worker.join() {
            Ok(detector) => detector,
            Err(_) => {
                log::warn!("monitor thread for camera {} panicked", self.camera.index);
                None
            }
        };
        self.poll_events();
        self.warning_active = false;
        log::info!(
            "Stopped monitoring camera {} after {} with {} warnings",
            self.camera.index,
            format_elapsed(self.elapsed()),
            self.warnings
        );
        detector
    }
}

impl<F, D> Drop for Session<F, D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// `HH:MM:SS`
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
