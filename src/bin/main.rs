use clap::Parser;
use opencv::core::Mat;
use opencv::highgui;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use trichshot::camera::{describe, find_available_cameras, preferred_camera, CameraCandidate};
use trichshot::overlay::{self, ControlPanel, PanelView, WarningOverlay};
use trichshot::session::format_elapsed;
use trichshot::{
    DangerZoneConfig, DetectorCommand, MediapipeDetector, MonitorEvent, NoProbe, OpenCvCameras,
    Session, Settings, V4l2CtlProbe,
};

const KEY_ESCAPE: i32 = 27;

#[derive(Parser, Debug)]
#[command(about = "Warns when a hand comes near your face")]
struct Args {
    /// Camera index to preselect instead of the preferred one.
    #[clap(short, long)]
    camera: Option<u32>,

    /// Number of device slots to probe.
    #[clap(long, default_value_t = 10)]
    max_devices: u32,

    /// Timeout for looking up a single camera name.
    #[clap(long, default_value_t = 5)]
    probe_timeout_secs: u64,

    /// Do not look up camera names with v4l2-ctl.
    #[clap(long)]
    no_probe: bool,

    /// Top of the danger zone as a fraction of frame height (0.0 - 0.5).
    #[clap(long, default_value_t = 0.5)]
    danger_top: f32,

    /// Bottom of the danger zone as a fraction of frame height (0.5 - 1.0).
    #[clap(long, default_value_t = 0.75)]
    danger_bottom: f32,

    /// Minimum time between warning updates.
    #[clap(long, default_value_t = 500)]
    cooldown_ms: u64,

    /// Do not flip frames horizontally.
    #[clap(long)]
    no_mirror: bool,

    /// Do not show the annotated camera preview.
    #[clap(long)]
    no_preview: bool,

    /// Python interpreter with mediapipe installed.
    #[clap(long, default_value = "python3")]
    python: PathBuf,

    /// Hand detector helper script.
    #[clap(long, default_value = "scripts/hand_detect.py")]
    detector_script: PathBuf,

    #[clap(long, default_value_t = 2)]
    max_hands: u32,

    #[clap(long, default_value_t = 0.7)]
    min_detection_confidence: f32,

    #[clap(long, default_value_t = 0.5)]
    min_tracking_confidence: f32,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            camera: self.camera,
            max_devices: self.max_devices,
            probe_names: !self.no_probe,
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            zone: DangerZoneConfig::new(self.danger_top, self.danger_bottom),
            cooldown: Duration::from_millis(self.cooldown_ms),
            mirror: !self.no_mirror,
            preview: !self.no_preview,
            detector: DetectorCommand {
                python: self.python.clone(),
                script: self.detector_script.clone(),
                max_hands: self.max_hands,
                min_detection_confidence: self.min_detection_confidence,
                min_tracking_confidence: self.min_tracking_confidence,
            },
        }
    }
}

struct App {
    runtime: tokio::runtime::Runtime,
    settings: Settings,
    source: OpenCvCameras,
    cameras: Vec<CameraCandidate>,
    selected: Option<u32>,
    zone: watch::Sender<DangerZoneConfig>,
    session: Option<Session<Mat, MediapipeDetector>>,
    detector: Option<MediapipeDetector>,
    overlay: WarningOverlay,
    panel: ControlPanel,
    status: String,
    last_warnings: u32,
}

impl App {
    fn new(settings: Settings) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let source = OpenCvCameras {
            max_devices: settings.max_devices,
            mirror: settings.mirror,
        };
        let (zone, _) = watch::channel(settings.zone);
        let panel = ControlPanel::create(settings.zone)?;
        let mut app = Self {
            runtime,
            selected: settings.camera,
            settings,
            source,
            cameras: Vec::new(),
            zone,
            session: None,
            detector: None,
            overlay: WarningOverlay::default(),
            panel,
            status: "Status: Stopped".to_owned(),
            last_warnings: 0,
        };
        app.refresh_cameras();
        Ok(app)
    }

    fn refresh_cameras(&mut self) {
        if self.session.is_some() {
            self.status = "Status: Stop monitoring before refreshing cameras".to_owned();
            return;
        }
        let source = &self.source.unmirrored();
        let timeout = self.settings.probe_timeout;
        self.cameras = if self.settings.probe_names {
            self.runtime
                .block_on(find_available_cameras(source, &V4l2CtlProbe::new(timeout)))
        } else {
            self.runtime.block_on(find_available_cameras(source, &NoProbe))
        };

        for camera in &self.cameras {
            log::info!("{camera}");
        }
        let still_listed = self
            .selected
            .is_some_and(|index| self.cameras.iter().any(|camera| camera.index == index));
        if !still_listed {
            self.selected = preferred_camera(&self.cameras);
        }
        if self.cameras.is_empty() {
            log::warn!("No working cameras detected");
        }
    }

    fn select_next_camera(&mut self) {
        if self.session.is_some() || self.cameras.is_empty() {
            return;
        }
        let position = self
            .cameras
            .iter()
            .position(|camera| Some(camera.index) == self.selected);
        let next = position.map_or(0, |position| (position + 1) % self.cameras.len());
        self.selected = Some(self.cameras[next].index);
    }

    fn start_monitoring(&mut self) {
        if self.session.is_some() {
            return;
        }
        let cached = &mut self.detector;
        let command = &self.settings.detector;
        let result = Session::start(
            &self.source,
            &self.cameras,
            self.selected,
            self.zone.subscribe(),
            &self.settings,
            || match cached.take() {
                Some(detector) => Ok(detector),
                None => MediapipeDetector::spawn(command),
            },
        );
        match result {
            Ok(session) => {
                self.status = session.status_line();
                self.last_warnings = 0;
                self.session = Some(session);
            }
            Err(e) => {
                log::warn!("Camera error: {e}");
                self.status = format!("Error: {e}");
            }
        }
    }

    fn stop_monitoring(&mut self) -> anyhow::Result<()> {
        if let Some(session) = self.session.take() {
            let camera = session.camera().index;
            self.last_warnings = session.warnings();
            self.detector = session.stop();
            if self.settings.preview {
                // the window may never have been shown
                _ = highgui::destroy_window(&overlay::preview_window(camera));
            }
        }
        self.overlay.hide()?;
        self.status = "Status: Stopped".to_owned();
        Ok(())
    }

    fn view(&self) -> PanelView {
        let (warnings, session_time, camera_status) = match &self.session {
            Some(session) => (
                session.warnings(),
                format_elapsed(session.elapsed()),
                session.camera_status(),
            ),
            None => (
                self.last_warnings,
                format_elapsed(Duration::ZERO),
                "Camera: Not active".to_owned(),
            ),
        };
        PanelView {
            status: self.status.clone(),
            cameras: describe(&self.cameras),
            selected: self.selected,
            warnings,
            session_time,
            camera_status,
        }
    }

    /// Drains worker output. Returns the session's end state once the worker has exited.
    fn pump_session(&mut self) -> anyhow::Result<Option<Option<String>>> {
        let Some(session) = &mut self.session else {
            return Ok(None);
        };

        let mut ended = None;
        for event in session.poll_events() {
            match event {
                MonitorEvent::WarningRaised { count } => self.overlay.show(count)?,
                MonitorEvent::WarningCleared => self.overlay.hide()?,
                MonitorEvent::Ended { error } => ended = Some(error),
            }
        }

        if let Some(mut preview) = session.latest_preview() {
            overlay::annotate(&mut preview)?;
            highgui::imshow(&overlay::preview_window(session.camera().index), &preview.frame)?;
        }
        Ok(ended)
    }

    fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let zone = self.panel.zone()?;
            self.zone.send_if_modified(|current| {
                let changed = *current != zone;
                *current = zone;
                changed
            });

            if let Some(error) = self.pump_session()? {
                self.stop_monitoring()?;
                if let Some(error) = error {
                    self.status = format!("Error: {error}");
                }
            }

            self.panel.render(&self.view())?;

            let key = highgui::wait_key(30)?;
            match key {
                KEY_ESCAPE => break,
                _ if key == 's' as i32 => self.start_monitoring(),
                _ if key == 'x' as i32 || key == 'q' as i32 => self.stop_monitoring()?,
                _ if key == 'r' as i32 => self.refresh_cameras(),
                _ if key == 'n' as i32 => self.select_next_camera(),
                _ => {}
            }

            if !self.panel.is_open()? {
                break;
            }
        }

        self.stop_monitoring()?;
        highgui::destroy_all_windows()?;
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = Args::parse();

    println!("TrichShot");
    println!("This app will monitor your hands and warn when they get near your face.");
    println!("External cameras are automatically prioritized over integrated cameras.");
    println!("Press 's' to start monitoring and 'q' to stop. Esc quits.");
    println!("Adjust the danger zone trackbars to customize the detection area.\n");

    let mut app = App::new(args.settings())?;
    app.run()
}
