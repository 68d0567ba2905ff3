//! The background worker: capture, detect, evaluate, report.

use crate::camera::Capture;
use crate::detector::HandDetector;
use crate::error::MonitorError;
use crate::zone::{DangerZoneConfig, HandLandmarks, Transition, WarningState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

/// Worker to foreground notifications. Never dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    WarningRaised { count: u32 },
    WarningCleared,
    /// The worker has released the camera and is about to exit.
    /// `error` is set when the session ended on its own.
    Ended { error: Option<String> },
}

impl From<Transition> for MonitorEvent {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Raised { count } => MonitorEvent::WarningRaised { count },
            Transition::Cleared => MonitorEvent::WarningCleared,
        }
    }
}

/// A processed frame for display, with everything needed to annotate it.
#[derive(Debug)]
pub struct PreviewFrame<F> {
    pub frame: F,
    pub hands: Vec<HandLandmarks>,
    pub zone: DangerZoneConfig,
    pub hands_in_danger: bool,
}

pub struct MonitorChannels<F> {
    pub running: Arc<AtomicBool>,
    pub zone: watch::Receiver<DangerZoneConfig>,
    pub events: mpsc::UnboundedSender<MonitorEvent>,
    /// Bounded. Frames are dropped while the foreground is behind.
    pub preview: Option<mpsc::Sender<PreviewFrame<F>>>,
}

pub struct Monitor<C: Capture, D> {
    capture: C,
    detector: D,
    state: WarningState,
    channels: MonitorChannels<C::Frame>,
}

impl<C, D> Monitor<C, D>
where
    C: Capture,
    D: HandDetector<C::Frame>,
{
    pub fn new(
        capture: C,
        detector: D,
        cooldown: Duration,
        channels: MonitorChannels<C::Frame>,
    ) -> Self {
        Self {
            capture,
            detector,
            state: WarningState::new(cooldown),
            channels,
        }
    }

    /// Processes one frame. An error ends the session.
    pub fn process_frame(&mut self, now: Instant) -> Result<(), MonitorError> {
        let frame = self.capture.read_frame()?;
        let hands = self.detector.detect(&frame)?;

        let zone = *self.channels.zone.borrow();
        let hands_in_danger =
            zone.any_in_zone(hands.iter().filter_map(HandLandmarks::observation));

        if let Some(transition) = self.state.update(hands_in_danger, now) {
            log::debug!("warning transition {transition:?}");
            self.notify(transition.into());
        }

        if let Some(preview) = &self.channels.preview {
            let preview_frame = PreviewFrame {
                frame,
                hands,
                zone,
                hands_in_danger,
            };
            if let Err(TrySendError::Closed(_)) = preview.try_send(preview_frame) {
                self.channels.preview = None;
            }
        }
        Ok(())
    }

    fn notify(&self, event: MonitorEvent) {
        // a closed channel means the foreground is gone; the stop flag ends the loop
        _ = self.channels.events.send(event);
    }

    /// Runs until stopped or until capture or detection fails.
    ///
    /// Hands the detector back for reuse, unless it was the detector that failed.
    pub fn run(mut self) -> Option<D> {
        let mut error = None;
        let mut detector_failed = false;
        while self.channels.running.load(Ordering::Acquire) {
            if let Err(e) = self.process_frame(Instant::now()) {
                log::warn!("Monitoring stopped: {e}");
                detector_failed = matches!(e, MonitorError::Detector(_));
                error = Some(e.to_string());
                break;
            }
            if self.channels.events.is_closed() {
                break;
            }
        }

        self.capture.release();
        if let Some(transition) = self.state.clear() {
            self.notify(transition.into());
        }
        self.channels.running.store(false, Ordering::Release);
        self.notify(MonitorEvent::Ended { error });
        (!detector_failed).then_some(self.detector)
    }

    pub fn warning_state(&self) -> &WarningState {
        &self.state
    }
}
