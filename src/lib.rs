pub mod camera;
pub mod capture;
pub mod config;
pub mod detector;
pub mod error;
pub mod monitor;
pub mod overlay;
pub mod probe;
pub mod session;
pub mod zone;

pub use camera::{find_available_cameras, preferred_camera, CameraCandidate};
pub use capture::OpenCvCameras;
pub use config::Settings;
pub use detector::{DetectorCommand, HandDetector, MediapipeDetector};
pub use error::{CameraError, DetectorError, MonitorError, SessionError};
pub use monitor::MonitorEvent;
pub use probe::{NoProbe, V4l2CtlProbe};
pub use session::Session;
pub use zone::{DangerZoneConfig, WarningState};
