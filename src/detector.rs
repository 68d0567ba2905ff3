//! Hand landmark detection.
//!
//! The detector itself is MediaPipe running in a helper process. Frames go to its stdin as a
//! small header (width, height, channels as little endian `u32`) followed by raw BGR bytes,
//! and one JSON line per frame comes back on stdout.

use crate::error::DetectorError;
use crate::zone::HandLandmarks;
use opencv::prelude::*;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub trait HandDetector<F>: Send + 'static {
    /// Landmark sets of every hand found in `frame`. Empty when there are none.
    fn detect(&mut self, frame: &F) -> Result<Vec<HandLandmarks>, DetectorError>;
}

/// How to launch the helper process.
#[derive(Debug, Clone)]
pub struct DetectorCommand {
    pub python: PathBuf,
    pub script: PathBuf,
    pub max_hands: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorCommand {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            script: PathBuf::from("scripts/hand_detect.py"),
            max_hands: 2,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.5,
        }
    }
}

#[derive(Deserialize, Debug)]
struct DetectionResponse {
    #[serde(default)]
    hands: Vec<HandLandmarks>,
    #[serde(default)]
    error: Option<String>,
}

/// Parses one response line from the helper.
pub fn parse_response(line: &str) -> Result<Vec<HandLandmarks>, DetectorError> {
    let response: DetectionResponse = serde_json::from_str(line)?;
    match response.error {
        Some(error) => Err(DetectorError::Remote(error)),
        None => Ok(response.hands),
    }
}

pub struct MediapipeDetector {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl MediapipeDetector {
    /// Starts the helper and waits for its `READY` line.
    pub fn spawn(command: &DetectorCommand) -> Result<Self, DetectorError> {
        log::info!(
            "Starting hand detector {} {}",
            command.python.display(),
            command.script.display()
        );
        let mut process = Command::new(&command.python)
            .arg(&command.script)
            .arg("--max-hands")
            .arg(command.max_hands.to_string())
            .arg("--min-detection-confidence")
            .arg(command.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(command.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(DetectorError::Spawn)?;

        let (Some(stdin), Some(stdout)) = (process.stdin.take(), process.stdout.take()) else {
            _ = process.kill();
            return Err(DetectorError::Closed);
        };
        let mut detector = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let ready = detector.read_line()?;
        if ready.trim() != "READY" {
            return Err(DetectorError::NotReady(ready));
        }
        log::info!("Hand detector ready");
        Ok(detector)
    }

    fn read_line(&mut self) -> Result<String, DetectorError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(DetectorError::Closed);
        }
        Ok(line)
    }
}

impl HandDetector<Mat> for MediapipeDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<HandLandmarks>, DetectorError> {
        if frame.empty() {
            return Ok(Vec::new());
        }
        if !frame.is_continuous() || frame.channels() != 3 {
            return Err(DetectorError::UnsupportedFrame);
        }

        let header = [frame.cols() as u32, frame.rows() as u32, frame.channels() as u32];
        for value in header {
            self.stdin.write_all(&value.to_le_bytes())?;
        }
        self.stdin.write_all(frame.data_bytes()?)?;
        self.stdin.flush()?;

        let line = self.read_line()?;
        parse_response(&line)
    }
}

impl Drop for MediapipeDetector {
    fn drop(&mut self) {
        _ = self.process.kill();
        _ = self.process.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::Landmark;

    #[test]
    fn hands_are_parsed() {
        let hands = parse_response(
            r#"{"hands": [{"landmarks": [{"x": 0.5, "y": 0.25}, {"x": 0.6, "y": 0.75}]}, {"landmarks": []}]}"#,
        )
        .unwrap();
        assert_eq!(hands.len(), 2);
        assert_eq!(
            hands[0].landmarks,
            vec![Landmark { x: 0.5, y: 0.25 }, Landmark { x: 0.6, y: 0.75 }]
        );
        assert_eq!(hands[1].observation(), None);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let hands = parse_response(
            r#"{"hands": [{"handedness": "Left", "score": 0.9, "landmarks": [{"x": 0.1, "y": 0.2, "z": -0.01}]}]}"#,
        )
        .unwrap();
        assert_eq!(hands[0].landmarks, vec![Landmark { x: 0.1, y: 0.2 }]);
    }

    #[test]
    fn no_hands() {
        assert!(parse_response(r#"{"hands": []}"#).unwrap().is_empty());
        assert!(parse_response("{}").unwrap().is_empty());
    }

    #[test]
    fn remote_error() {
        let err = parse_response(r#"{"hands": [], "error": "bad frame"}"#).unwrap_err();
        assert!(matches!(err, DetectorError::Remote(message) if message == "bad frame"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_response("Traceback (most recent call last):"),
            Err(DetectorError::Json(_))
        ));
    }

    #[test]
    fn missing_interpreter_fails_to_spawn() {
        let command = DetectorCommand {
            python: PathBuf::from("/nonexistent/python-interpreter"),
            ..Default::default()
        };
        assert!(matches!(
            MediapipeDetector::spawn(&command),
            Err(DetectorError::Spawn(_))
        ));
    }
}
