use crate::detector::DetectorCommand;
use crate::probe::DEFAULT_PROBE_TIMEOUT;
use crate::zone::{DangerZoneConfig, WARNING_COOLDOWN};
use std::time::Duration;

/// Preview frames buffered between worker and foreground before frames are dropped.
pub const PREVIEW_QUEUE: usize = 2;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Preselected camera index, otherwise the preferred camera is used.
    pub camera: Option<u32>,
    pub max_devices: u32,
    pub probe_names: bool,
    pub probe_timeout: Duration,
    pub zone: DangerZoneConfig,
    pub cooldown: Duration,
    pub mirror: bool,
    pub preview: bool,
    pub detector: DetectorCommand,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera: None,
            max_devices: 10,
            probe_names: true,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            zone: DangerZoneConfig::default(),
            cooldown: WARNING_COOLDOWN,
            mirror: true,
            preview: true,
            detector: DetectorCommand::default(),
        }
    }
}
