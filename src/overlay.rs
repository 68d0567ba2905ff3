//! Windows drawn with OpenCV `highgui`. Everything here must run on the foreground thread.

use crate::monitor::PreviewFrame;
use crate::zone::{DangerZoneConfig, HandLandmarks, BOTTOM_RANGE, TOP_RANGE};
use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::prelude::*;
use opencv::{core, highgui, imgproc};

pub const CONTROL_WINDOW: &str = "TrichShot";
pub const WARNING_WINDOW: &str = "TrichShot Warning";

const TOP_TRACKBAR: &str = "Danger Zone Top %";
const BOTTOM_TRACKBAR: &str = "Danger Zone Bottom %";

/// MediaPipe hand skeleton as pairs of landmark indices.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

fn bgr(b: f64, g: f64, r: f64) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

pub fn preview_window(camera: u32) -> String {
    format!("Hand Detection - Camera {camera} (Press Q to stop)")
}

/// Draws landmarks on every frame, and the danger band while a hand is inside it.
pub fn annotate(preview: &mut PreviewFrame<Mat>) -> opencv::Result<()> {
    let width = preview.frame.cols();
    let height = preview.frame.rows();

    for hand in &preview.hands {
        draw_hand(&mut preview.frame, hand, width, height)?;
    }

    if preview.hands_in_danger {
        let top = (height as f32 * preview.zone.top()) as i32;
        let bottom = (height as f32 * preview.zone.bottom()) as i32;
        imgproc::rectangle(
            &mut preview.frame,
            Rect::new(0, top, width, bottom - top),
            bgr(0.0, 0.0, 255.0),
            3,
            imgproc::LINE_8,
            0,
        )?;
    }
    Ok(())
}

fn draw_hand(frame: &mut Mat, hand: &HandLandmarks, width: i32, height: i32) -> opencv::Result<()> {
    let points: Vec<Point> = hand
        .landmarks
        .iter()
        .map(|landmark| {
            Point::new(
                (landmark.x * width as f32) as i32,
                (landmark.y * height as f32) as i32,
            )
        })
        .collect();

    for (from, to) in HAND_CONNECTIONS {
        if let (Some(&from), Some(&to)) = (points.get(from), points.get(to)) {
            imgproc::line(frame, from, to, bgr(255.0, 255.0, 255.0), 2, imgproc::LINE_AA, 0)?;
        }
    }
    for &center in &points {
        imgproc::circle(
            frame,
            center,
            4,
            bgr(0.0, 0.0, 255.0),
            imgproc::FILLED,
            imgproc::LINE_AA,
            0,
        )?;
    }
    Ok(())
}

/// Full screen, top most window showing the warning count.
#[derive(Debug, Default)]
pub struct WarningOverlay {
    shown: bool,
}

impl WarningOverlay {
    pub fn show(&mut self, count: u32) -> opencv::Result<()> {
        if self.shown {
            return Ok(());
        }
        let mut image =
            Mat::new_rows_cols_with_default(720, 1280, core::CV_8UC3, Scalar::all(0.0))?;
        let text = count.to_string();
        let font = imgproc::FONT_HERSHEY_SIMPLEX;
        let (scale, thickness) = (12.0, 24);
        let mut baseline = 0;
        let size = imgproc::get_text_size(&text, font, scale, thickness, &mut baseline)?;
        let origin = Point::new(
            (image.cols() - size.width) / 2,
            (image.rows() + size.height) / 2,
        );
        imgproc::put_text(
            &mut image,
            &text,
            origin,
            font,
            scale,
            bgr(255.0, 255.0, 255.0),
            thickness,
            imgproc::LINE_AA,
            false,
        )?;

        highgui::named_window(WARNING_WINDOW, highgui::WINDOW_NORMAL)?;
        highgui::set_window_property(
            WARNING_WINDOW,
            highgui::WND_PROP_FULLSCREEN,
            highgui::WINDOW_FULLSCREEN as f64,
        )?;
        // not every highgui backend supports this
        if let Err(e) =
            highgui::set_window_property(WARNING_WINDOW, highgui::WND_PROP_TOPMOST, 1.0)
        {
            log::debug!("warning window cannot stay on top: {e}");
        }
        highgui::imshow(WARNING_WINDOW, &image)?;
        self.shown = true;
        Ok(())
    }

    pub fn hide(&mut self) -> opencv::Result<()> {
        if !self.shown {
            return Ok(());
        }
        self.shown = false;
        highgui::destroy_window(WARNING_WINDOW)
    }
}

/// Text shown on the control window.
#[derive(Debug, Default)]
pub struct PanelView {
    pub status: String,
    pub cameras: String,
    pub selected: Option<u32>,
    pub warnings: u32,
    pub session_time: String,
    pub camera_status: String,
}

impl PanelView {
    pub fn lines(&self) -> Vec<String> {
        let selected = self
            .selected
            .map_or_else(|| "none".to_owned(), |index| index.to_string());
        let mut lines = vec![self.status.clone(), String::new(), "Cameras:".to_owned()];
        lines.extend(self.cameras.lines().map(|line| format!("  {line}")));
        lines.push(format!("Selected Camera: {selected}"));
        lines.push(String::new());
        lines.push(format!("Warnings triggered: {}", self.warnings));
        lines.push(format!("Session time: {}", self.session_time));
        lines.push(self.camera_status.clone());
        lines.push(String::new());
        lines.push("[s] start  [x] stop  [r] refresh  [n] next camera  [Esc] quit".to_owned());
        lines
    }
}

/// The control window: status text plus danger zone trackbars.
pub struct ControlPanel;

impl ControlPanel {
    pub fn create(zone: DangerZoneConfig) -> opencv::Result<Self> {
        highgui::named_window(CONTROL_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        let top_max = percent(TOP_RANGE.1);
        let bottom_max = percent(BOTTOM_RANGE.1);
        highgui::create_trackbar(TOP_TRACKBAR, CONTROL_WINDOW, None, top_max, None)?;
        highgui::create_trackbar(BOTTOM_TRACKBAR, CONTROL_WINDOW, None, bottom_max, None)?;
        highgui::set_trackbar_min(BOTTOM_TRACKBAR, CONTROL_WINDOW, percent(BOTTOM_RANGE.0))?;
        highgui::set_trackbar_pos(TOP_TRACKBAR, CONTROL_WINDOW, percent(zone.top()))?;
        highgui::set_trackbar_pos(BOTTOM_TRACKBAR, CONTROL_WINDOW, percent(zone.bottom()))?;
        Ok(Self)
    }

    pub fn zone(&self) -> opencv::Result<DangerZoneConfig> {
        let top = highgui::get_trackbar_pos(TOP_TRACKBAR, CONTROL_WINDOW)?;
        let bottom = highgui::get_trackbar_pos(BOTTOM_TRACKBAR, CONTROL_WINDOW)?;
        Ok(DangerZoneConfig::new(top as f32 / 100.0, bottom as f32 / 100.0))
    }

    /// False once the user closed the window.
    pub fn is_open(&self) -> opencv::Result<bool> {
        Ok(highgui::get_window_property(CONTROL_WINDOW, highgui::WND_PROP_VISIBLE)? >= 1.0)
    }

    pub fn render(&self, view: &PanelView) -> opencv::Result<()> {
        let lines = view.lines();
        let line_height = 22;
        let height = (lines.len() as i32 + 1) * line_height;
        let background = bgr(40.0, 40.0, 40.0);
        let mut image = Mat::new_rows_cols_with_default(height, 640, core::CV_8UC3, background)?;
        for (i, line) in lines.iter().enumerate() {
            imgproc::put_text(
                &mut image,
                line,
                Point::new(10, (i as i32 + 1) * line_height),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.5,
                bgr(230.0, 230.0, 230.0),
                1,
                imgproc::LINE_AA,
                false,
            )?;
        }
        highgui::imshow(CONTROL_WINDOW, &image)
    }
}

fn percent(fraction: f32) -> i32 {
    (fraction * 100.0).round() as i32
}
