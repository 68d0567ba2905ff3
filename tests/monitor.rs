mod common;

use common::{hand, Device, FakeCameras, ScriptedDetector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use trichshot::camera::FrameSource;
use trichshot::monitor::{Monitor, MonitorChannels};
use trichshot::zone::WarningPhase;
use trichshot::{DangerZoneConfig, MonitorEvent};

struct Harness {
    running: Arc<AtomicBool>,
    zone: watch::Sender<DangerZoneConfig>,
    events: mpsc::UnboundedReceiver<MonitorEvent>,
    preview: mpsc::Receiver<trichshot::monitor::PreviewFrame<usize>>,
}

fn channels() -> (Harness, MonitorChannels<usize>) {
    let running = Arc::new(AtomicBool::new(true));
    let (zone_tx, zone_rx) = watch::channel(DangerZoneConfig::new(0.1, 0.9));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (preview_tx, preview_rx) = mpsc::channel(1);
    (
        Harness {
            running: running.clone(),
            zone: zone_tx,
            events: events_rx,
            preview: preview_rx,
        },
        MonitorChannels {
            running,
            zone: zone_rx,
            events: events_tx,
            preview: Some(preview_tx),
        },
    )
}

fn drain(events: &mut mpsc::UnboundedReceiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

#[test]
fn read_failure_ends_session_and_clears_warning() {
    let cameras = FakeCameras::new([(7, Device::Working(Some(4)))]);
    let capture = cameras.open(7).unwrap();
    let detector = ScriptedDetector::new([
        vec![hand(0.2, 0.3)],
        vec![hand(0.95, 1.0)],
        vec![],
        vec![hand(0.95, 1.0), hand(0.0, 0.15)],
    ]);
    let (mut harness, channels) = channels();

    let detector = Monitor::new(capture, detector, Duration::ZERO, channels)
        .run()
        .unwrap();

    assert_eq!(detector.calls, 4);
    assert_eq!(
        drain(&mut harness.events),
        vec![
            MonitorEvent::WarningRaised { count: 1 },
            MonitorEvent::WarningCleared,
            MonitorEvent::WarningRaised { count: 2 },
            MonitorEvent::WarningCleared,
            MonitorEvent::Ended {
                error: Some("failed to read frame from camera 7".to_owned())
            },
        ]
    );
    assert_eq!(cameras.released(), 1);
    assert!(!harness.running.load(Ordering::SeqCst));
}

#[test]
fn detector_failure_ends_session() {
    let cameras = FakeCameras::new([(0, Device::Working(None))]);
    let detector = ScriptedDetector {
        fail: true,
        ..Default::default()
    };
    let (mut harness, channels) = channels();

    let detector =
        Monitor::new(cameras.open(0).unwrap(), detector, Duration::ZERO, channels).run();

    assert!(detector.is_none());
    assert!(matches!(
        drain(&mut harness.events).as_slice(),
        [MonitorEvent::Ended { error: Some(_) }]
    ));
    assert_eq!(cameras.released(), 1);
}

#[test]
fn cleared_stop_flag_exits_before_reading() {
    let cameras = FakeCameras::new([(0, Device::Working(None))]);
    let (mut harness, channels) = channels();
    harness.running.store(false, Ordering::SeqCst);

    let detector = Monitor::new(
        cameras.open(0).unwrap(),
        ScriptedDetector::default(),
        Duration::ZERO,
        channels,
    )
    .run()
    .unwrap();

    assert_eq!(detector.calls, 0);
    assert_eq!(
        drain(&mut harness.events),
        vec![MonitorEvent::Ended { error: None }]
    );
    assert_eq!(cameras.released(), 1);
}

#[test]
fn flicker_inside_cooldown_is_debounced() {
    let cameras = FakeCameras::new([(0, Device::Working(None))]);
    let detector = ScriptedDetector::new([
        vec![hand(0.2, 0.3)],
        vec![],
        vec![hand(0.2, 0.3)],
        vec![],
    ]);
    let (mut harness, channels) = channels();
    let mut monitor = Monitor::new(
        cameras.open(0).unwrap(),
        detector,
        Duration::from_millis(500),
        channels,
    );

    let start = Instant::now();
    monitor.process_frame(start).unwrap();
    monitor.process_frame(start + Duration::from_millis(100)).unwrap();
    monitor.process_frame(start + Duration::from_millis(300)).unwrap();
    assert_eq!(monitor.warning_state().phase(), WarningPhase::Warning);

    monitor.process_frame(start + Duration::from_millis(600)).unwrap();
    assert_eq!(monitor.warning_state().phase(), WarningPhase::Idle);
    assert_eq!(monitor.warning_state().trigger_count(), 1);

    assert_eq!(
        drain(&mut harness.events),
        vec![
            MonitorEvent::WarningRaised { count: 1 },
            MonitorEvent::WarningCleared,
        ]
    );
}

#[test]
fn zone_updates_apply_to_next_frame() {
    let cameras = FakeCameras::new([(0, Device::Working(None))]);
    let detector = ScriptedDetector::new([vec![hand(0.6, 0.7)], vec![hand(0.6, 0.7)]]);
    let (mut harness, channels) = channels();
    let mut monitor = Monitor::new(cameras.open(0).unwrap(), detector, Duration::ZERO, channels);

    harness.zone.send_replace(DangerZoneConfig::new(0.0, 0.5));
    monitor.process_frame(Instant::now()).unwrap();
    assert!(!monitor.warning_state().is_active());

    harness.zone.send_replace(DangerZoneConfig::new(0.0, 1.0));
    monitor.process_frame(Instant::now()).unwrap();
    assert!(monitor.warning_state().is_active());

    assert_eq!(
        drain(&mut harness.events),
        vec![MonitorEvent::WarningRaised { count: 1 }]
    );
}

#[test]
fn preview_frames_are_dropped_when_foreground_lags() {
    let cameras = FakeCameras::new([(0, Device::Working(None))]);
    let detector = ScriptedDetector::new([vec![hand(0.2, 0.3)], vec![], vec![]]);
    let (mut harness, channels) = channels();
    let mut monitor = Monitor::new(cameras.open(0).unwrap(), detector, Duration::ZERO, channels);

    for _ in 0..3 {
        monitor.process_frame(Instant::now()).unwrap();
    }

    let preview = harness.preview.try_recv().unwrap();
    assert_eq!(preview.frame, 0);
    assert!(preview.hands_in_danger);
    assert_eq!(preview.hands.len(), 1);
    assert!(harness.preview.try_recv().is_err());
}
