use crate::camera::{Capture, FrameSource, Resolution};
use crate::error::CameraError;
use crate::probe::device_path;
use opencv::prelude::*;
use opencv::{core, videoio};

/// Cameras reachable through OpenCV `videoio`.
#[derive(Debug, Clone)]
pub struct OpenCvCameras {
    pub max_devices: u32,
    pub mirror: bool,
}

impl Default for OpenCvCameras {
    fn default() -> Self {
        Self {
            max_devices: 10,
            mirror: true,
        }
    }
}

impl OpenCvCameras {
    /// Same devices, opened without the mirror flip. Enumeration only needs one raw frame.
    pub fn unmirrored(&self) -> Self {
        Self {
            mirror: false,
            ..self.clone()
        }
    }
}

impl FrameSource for OpenCvCameras {
    type Capture = OpenCvCapture;

    fn device_slots(&self) -> Vec<u32> {
        (0..self.max_devices)
            .filter(|&index| !cfg!(target_os = "linux") || device_path(index).exists())
            .collect()
    }

    fn open(&self, index: u32) -> Result<OpenCvCapture, CameraError> {
        let cam = videoio::VideoCapture::new(index as i32, videoio::CAP_ANY)?;
        let opened = videoio::VideoCapture::is_opened(&cam)?;
        if !opened {
            return Err(CameraError::OpenFailed(index));
        }
        Ok(OpenCvCapture {
            index,
            cam,
            mirror: self.mirror,
        })
    }
}

pub struct OpenCvCapture {
    index: u32,
    cam: videoio::VideoCapture,
    mirror: bool,
}

impl Capture for OpenCvCapture {
    type Frame = Mat;

    fn read_frame(&mut self) -> Result<Mat, CameraError> {
        let mut frame = Mat::default();
        let grabbed = self.cam.read(&mut frame)?;
        if !grabbed || frame.size()?.width == 0 {
            return Err(CameraError::ReadFailed(self.index));
        }
        if !self.mirror {
            return Ok(frame);
        }
        // horizontal flip for a mirror image
        let mut mirrored = Mat::default();
        core::flip(&frame, &mut mirrored, 1)?;
        Ok(mirrored)
    }

    fn resolution(&self) -> Option<Resolution> {
        let width = self.cam.get(videoio::CAP_PROP_FRAME_WIDTH).ok()?;
        let height = self.cam.get(videoio::CAP_PROP_FRAME_HEIGHT).ok()?;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(Resolution {
            width: width as u32,
            height: height as u32,
        })
    }

    fn release(&mut self) {
        if let Err(e) = self.cam.release() {
            log::warn!("failed to release camera {}: {e}", self.index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmirrored_keeps_device_range() {
        let source = OpenCvCameras {
            max_devices: 4,
            mirror: true,
        };
        let raw = source.unmirrored();
        assert!(!raw.mirror);
        assert_eq!(raw.max_devices, 4);
        assert!(source.mirror);
    }
}
