//! Camera discovery and ranking.
//!
//! Every addressable device slot is opened and asked for a single frame. Devices that
//! deliver one are kept, named by a [`DeviceInfoProbe`], classified as external or
//! integrated and sorted so that external cameras come first.

use crate::error::CameraError;
use crate::probe::DeviceInfoProbe;
use std::fmt;

pub const UNKNOWN_NAME: &str = "Unknown";

/// Checked first. A match means external even if an integrated token also matches.
pub const EXTERNAL_INDICATORS: &[&str] = &[
    "usb", "logitech", "microsoft", "creative", "webcam", "external", "hd pro", "c920", "c922",
    "c930", "c270",
];

pub const INTEGRATED_INDICATORS: &[&str] = &[
    "integrated",
    "built-in",
    "internal",
    "laptop",
    "chicony",
    "realtek",
    "asus",
    "hp truevision",
    "lenovo",
    "dell",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// An open capture device.
pub trait Capture: Send + 'static {
    type Frame: Send + 'static;

    fn read_frame(&mut self) -> Result<Self::Frame, CameraError>;

    fn resolution(&self) -> Option<Resolution>;

    fn release(&mut self);
}

/// Something that can open capture devices by index.
pub trait FrameSource {
    type Capture: Capture;

    /// Device indices worth trying.
    fn device_slots(&self) -> Vec<u32>;

    fn open(&self, index: u32) -> Result<Self::Capture, CameraError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraCandidate {
    pub index: u32,
    pub name: String,
    pub is_external: bool,
    pub resolution: Option<Resolution>,
}

impl CameraCandidate {
    pub fn kind(&self) -> &'static str {
        if self.is_external {
            "External"
        } else {
            "Integrated"
        }
    }
}

impl fmt::Display for CameraCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Camera {}: {} ({}) - ", self.index, self.name, self.kind())?;
        match self.resolution {
            Some(Resolution { width, height }) => write!(f, "{width}x{height}"),
            None => write!(f, "{UNKNOWN_NAME}"),
        }
    }
}

/// Classifies a device from its name, falling back to "index 0 is built in".
pub fn is_external(name: &str, index: u32) -> bool {
    let name = name.to_lowercase();
    if EXTERNAL_INDICATORS.iter().any(|token| name.contains(token)) {
        true
    } else if INTEGRATED_INDICATORS.iter().any(|token| name.contains(token)) {
        false
    } else {
        index > 0
    }
}

/// External cameras first, then ascending index.
pub fn rank(cameras: &mut [CameraCandidate]) {
    cameras.sort_by_key(|camera| (!camera.is_external, camera.index));
}

/// Opens the device, reads one frame and releases it again.
pub fn test_device<S: FrameSource>(
    source: &S,
    index: u32,
) -> Result<Option<Resolution>, CameraError> {
    let mut capture = source.open(index)?;
    let frame = capture.read_frame();
    let resolution = capture.resolution();
    capture.release();
    frame?;
    Ok(resolution)
}

/// Enumerates usable cameras, sorted by preference.
///
/// Never fails. Devices that cannot be opened or deliver no frame are left out.
pub async fn find_available_cameras<S, P>(source: &S, probe: &P) -> Vec<CameraCandidate>
where
    S: FrameSource,
    P: DeviceInfoProbe,
{
    let mut cameras = Vec::new();
    for index in source.device_slots() {
        let resolution = match test_device(source, index) {
            Ok(resolution) => resolution,
            Err(e) => {
                log::debug!("camera {index} excluded: {e}");
                continue;
            }
        };
        let name = probe
            .device_name(index)
            .await
            .unwrap_or_else(|| UNKNOWN_NAME.to_owned());
        let is_external = is_external(&name, index);
        cameras.push(CameraCandidate {
            index,
            name,
            is_external,
            resolution,
        });
    }
    rank(&mut cameras);
    cameras
}

pub fn preferred_camera(cameras: &[CameraCandidate]) -> Option<u32> {
    cameras.first().map(|camera| camera.index)
}

/// Multi-line summary for display, one camera per line.
pub fn describe(cameras: &[CameraCandidate]) -> String {
    if cameras.is_empty() {
        return "No working cameras detected!".to_owned();
    }
    cameras
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
