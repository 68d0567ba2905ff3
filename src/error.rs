use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("could not open camera {0}")]
    OpenFailed(u32),
    #[error("failed to read frame from camera {0}")]
    ReadFailed(u32),
    #[error("OpenCV error {0}")]
    OpenCv(#[from] opencv::Error),
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to start hand detector: {0}")]
    Spawn(std::io::Error),
    #[error("hand detector did not signal ready, got {0:?}")]
    NotReady(String),
    #[error("hand detector closed its output")]
    Closed,
    #[error("hand detector reported: {0}")]
    Remote(String),
    #[error("frame is not a continuous BGR image")]
    UnsupportedFrame,
    #[error("hand detector IO error {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed hand detector response {0}")]
    Json(#[from] serde_json::Error),
    #[error("OpenCV error {0}")]
    OpenCv(#[from] opencv::Error),
}

/// Ends a running session.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Failures surfaced to the user when monitoring cannot start.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No cameras available. Please refresh and try again.")]
    NoCamerasFound,
    #[error("Selected camera {0} is not available.")]
    CameraNotAvailable(u32),
    #[error("{reason}")]
    DeviceUnavailable { index: u32, reason: String },
    #[error("hand detector unavailable: {0}")]
    Detector(#[from] DetectorError),
    #[error("failed to start monitoring thread: {0}")]
    Worker(std::io::Error),
}
