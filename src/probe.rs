//! Best-effort lookup of human readable device names.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[allow(async_fn_in_trait)]
pub trait DeviceInfoProbe {
    /// Name of the device at `index`, or `None` if it could not be determined.
    async fn device_name(&self, index: u32) -> Option<String>;
}

/// Skips name lookup entirely, leaving classification to the index fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl DeviceInfoProbe for NoProbe {
    async fn device_name(&self, _index: u32) -> Option<String> {
        None
    }
}

/// Reads the "Card type" reported by `v4l2-ctl --info`.
#[derive(Debug, Clone)]
pub struct V4l2CtlProbe {
    program: String,
    device_root: PathBuf,
    timeout: Duration,
}

impl V4l2CtlProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "v4l2-ctl".to_owned(),
            device_root: PathBuf::from(DEVICE_ROOT),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory holding the `videoN` device nodes.
    pub fn with_device_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.device_root = root.into();
        self
    }
}

impl Default for V4l2CtlProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

const DEVICE_ROOT: &str = "/dev";

pub fn device_path(index: u32) -> PathBuf {
    device_path_in(Path::new(DEVICE_ROOT), index)
}

fn device_path_in(root: &Path, index: u32) -> PathBuf {
    root.join(format!("video{index}"))
}

impl DeviceInfoProbe for V4l2CtlProbe {
    async fn device_name(&self, index: u32) -> Option<String> {
        let device = device_path_in(&self.device_root, index);
        if !device.exists() {
            return None;
        }

        let output = Command::new(&self.program)
            .arg("--device")
            .arg(&device)
            .arg("--info")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                log::debug!("{} unavailable for {}: {e}", self.program, device.display());
                return None;
            }
            Err(_) => {
                log::debug!("{} timed out for {}", self.program, device.display());
                return None;
            }
        };

        if !output.status.success() {
            log::debug!(
                "{} exited with {} for {}",
                self.program,
                output.status,
                device.display()
            );
            return None;
        }

        parse_card_type(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extracts the value of the first `Card type` line.
pub fn parse_card_type(info: &str) -> Option<String> {
    info.lines()
        .find(|line| line.contains("Card type"))
        .and_then(|line| line.split(':').nth(1))
        .map(|name| name.trim().to_owned())
}
