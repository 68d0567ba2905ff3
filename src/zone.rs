use serde::Deserialize;
use std::time::{Duration, Instant};

/// Minimum interval between two warning state updates.
pub const WARNING_COOLDOWN: Duration = Duration::from_millis(500);

pub const TOP_RANGE: (f32, f32) = (0.0, 0.5);
pub const BOTTOM_RANGE: (f32, f32) = (0.5, 1.0);

/// Vertical band of the frame, in normalized coordinates, treated as "near the face".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DangerZoneConfig {
    top: f32,
    bottom: f32,
}

impl DangerZoneConfig {
    /// Bounds are clamped into their slider ranges, so `top <= bottom` always holds.
    pub fn new(top: f32, bottom: f32) -> Self {
        Self {
            top: top.clamp(TOP_RANGE.0, TOP_RANGE.1),
            bottom: bottom.clamp(BOTTOM_RANGE.0, BOTTOM_RANGE.1),
        }
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    /// Any-overlap test between the hand's vertical span and the band.
    pub fn contains(&self, hand: &HandObservation) -> bool {
        hand.min_y < self.bottom && hand.max_y > self.top
    }

    pub fn any_in_zone(&self, hands: impl IntoIterator<Item = HandObservation>) -> bool {
        hands.into_iter().any(|hand| self.contains(&hand))
    }
}

impl Default for DangerZoneConfig {
    fn default() -> Self {
        Self::new(0.5, 0.75)
    }
}

/// Normalized landmark position (0.0 to 1.0 of image width and height)
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

/// One detected hand
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct HandLandmarks {
    pub landmarks: Vec<Landmark>,
}

impl HandLandmarks {
    /// Vertical extent of the hand, `None` when the detector returned no points.
    pub fn observation(&self) -> Option<HandObservation> {
        let mut points = self.landmarks.iter().map(|landmark| landmark.y);
        let first = points.next()?;
        let (min_y, max_y) = points.fold((first, first), |(min, max), y| {
            (min.min(y), max.max(y))
        });
        Some(HandObservation { min_y, max_y })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandObservation {
    pub min_y: f32,
    pub max_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningPhase {
    Idle,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Raised { count: u32 },
    Cleared,
}

/// Debounced warning state of one monitoring session.
#[derive(Debug, Clone)]
pub struct WarningState {
    phase: WarningPhase,
    trigger_count: u32,
    last_update: Option<Instant>,
    cooldown: Duration,
}

impl WarningState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            phase: WarningPhase::Idle,
            trigger_count: 0,
            last_update: None,
            cooldown,
        }
    }

    pub fn phase(&self) -> WarningPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == WarningPhase::Warning
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    fn gate_open(&self, now: Instant) -> bool {
        match self.last_update {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
        }
    }

    /// Feeds one frame's verdict. Returns the transition taken, if any.
    pub fn update(&mut self, hands_in_danger: bool, now: Instant) -> Option<Transition> {
        if !self.gate_open(now) {
            return None;
        }
        self.last_update = Some(now);

        match (self.phase, hands_in_danger) {
            (WarningPhase::Idle, true) => {
                self.phase = WarningPhase::Warning;
                self.trigger_count += 1;
                Some(Transition::Raised {
                    count: self.trigger_count,
                })
            }
            (WarningPhase::Warning, false) => {
                self.phase = WarningPhase::Idle;
                Some(Transition::Cleared)
            }
            _ => None,
        }
    }

    /// Drops an active warning regardless of the cooldown.
    pub fn clear(&mut self) -> Option<Transition> {
        if self.is_active() {
            self.phase = WarningPhase::Idle;
            Some(Transition::Cleared)
        } else {
            None
        }
    }
}

impl Default for WarningState {
    fn default() -> Self {
        Self::new(WARNING_COOLDOWN)
    }
}
