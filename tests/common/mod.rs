#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use trichshot::camera::{Capture, FrameSource, Resolution};
use trichshot::detector::HandDetector;
use trichshot::probe::DeviceInfoProbe;
use trichshot::zone::{HandLandmarks, Landmark};
use trichshot::{CameraError, DetectorError};

/// Frames are plain sequence numbers.
pub type Frame = usize;

#[derive(Debug, Clone)]
pub enum Device {
    /// Opens and delivers this many frames, then fails. `None` delivers forever.
    Working(Option<usize>),
    NoFrames,
    Unopenable,
}

#[derive(Default)]
pub struct FakeCameras {
    pub devices: HashMap<u32, Device>,
    pub released: Arc<AtomicUsize>,
}

impl FakeCameras {
    pub fn new(devices: impl IntoIterator<Item = (u32, Device)>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
            released: Default::default(),
        }
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

pub struct FakeCapture {
    index: u32,
    remaining: Option<usize>,
    next: Frame,
    released: Arc<AtomicUsize>,
}

impl Capture for FakeCapture {
    type Frame = Frame;

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        match &mut self.remaining {
            Some(0) => return Err(CameraError::ReadFailed(self.index)),
            Some(remaining) => *remaining -= 1,
            None => std::thread::sleep(std::time::Duration::from_millis(1)),
        }
        let frame = self.next;
        self.next += 1;
        Ok(frame)
    }

    fn resolution(&self) -> Option<Resolution> {
        Some(Resolution {
            width: 640,
            height: 480,
        })
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl FrameSource for FakeCameras {
    type Capture = FakeCapture;

    fn device_slots(&self) -> Vec<u32> {
        (0..10).collect()
    }

    fn open(&self, index: u32) -> Result<FakeCapture, CameraError> {
        let remaining = match self.devices.get(&index) {
            Some(Device::Working(frames)) => *frames,
            Some(Device::NoFrames) => Some(0),
            Some(Device::Unopenable) | None => return Err(CameraError::OpenFailed(index)),
        };
        Ok(FakeCapture {
            index,
            remaining,
            next: 0,
            released: self.released.clone(),
        })
    }
}

#[derive(Default)]
pub struct FakeProbe {
    pub names: HashMap<u32, String>,
}

impl FakeProbe {
    pub fn new<'a>(names: impl IntoIterator<Item = (u32, &'a str)>) -> Self {
        Self {
            names: names
                .into_iter()
                .map(|(index, name)| (index, name.to_owned()))
                .collect(),
        }
    }
}

impl DeviceInfoProbe for FakeProbe {
    async fn device_name(&self, index: u32) -> Option<String> {
        self.names.get(&index).cloned()
    }
}

/// A hand covering `min_y..=max_y`.
pub fn hand(min_y: f32, max_y: f32) -> HandLandmarks {
    HandLandmarks {
        landmarks: vec![
            Landmark { x: 0.4, y: min_y },
            Landmark {
                x: 0.5,
                y: (min_y + max_y) / 2.0,
            },
            Landmark { x: 0.6, y: max_y },
        ],
    }
}

/// Returns scripted hands per frame, then none.
#[derive(Default)]
pub struct ScriptedDetector {
    pub script: VecDeque<Vec<HandLandmarks>>,
    pub calls: usize,
    pub fail: bool,
}

impl ScriptedDetector {
    pub fn new(script: impl IntoIterator<Item = Vec<HandLandmarks>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl HandDetector<Frame> for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<HandLandmarks>, DetectorError> {
        self.calls += 1;
        if self.fail {
            return Err(DetectorError::Closed);
        }
        Ok(self.script.pop_front().unwrap_or_default())
    }
}
