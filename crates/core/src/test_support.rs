//! Stub collaborators shared by the unit tests.

use std::sync::{Arc, Mutex};

use crate::camera::domain::video_source::VideoSource;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::overlay::domain::draw_surface::{DrawSurface, Stroke, TextStyle};
use crate::session::session_observer::SessionObserver;
use crate::shared::acquisition_error::AcquisitionError;
use crate::shared::detection_result::{DetectionResult, Point};
use crate::shared::frame::Frame;

pub fn result(x1: f64, y1: f64, x2: f64, y2: f64, confidence: Option<f64>) -> DetectionResult {
    DetectionResult::new(Point::new(x1, y1), Point::new(x2, y2), confidence)
}

pub fn rgb_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
    let data = rgb.repeat((width * height) as usize);
    Frame::new(data, width, height, 3, 0)
}

// --- Draw surface ---

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Resize(u32, u32),
    Clear,
    Rect { top_left: Point, bottom_right: Point },
    Text { text: String, origin: Point },
}

/// Records every call; `snapshot` yields a transparent RGBA frame.
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Arc<Mutex<Vec<DrawOp>>>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Operations since the most recent clear or resize, i.e. what is
    /// currently visible.
    pub fn visible(&self) -> Vec<DrawOp> {
        let ops = self.ops();
        let start = ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Clear | DrawOp::Resize(..)))
            .map_or(0, |i| i + 1);
        ops[start..].to_vec()
    }

    pub fn rects(&self) -> Vec<(Point, Point)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                DrawOp::Rect {
                    top_left,
                    bottom_right,
                } => Some((top_left, bottom_right)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, op: DrawOp) {
        self.ops.lock().unwrap().push(op);
    }
}

impl DrawSurface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.push(DrawOp::Resize(width, height));
    }

    fn clear(&mut self) {
        self.push(DrawOp::Clear);
    }

    fn draw_rect(&mut self, top_left: Point, bottom_right: Point, _stroke: &Stroke) {
        self.push(DrawOp::Rect {
            top_left,
            bottom_right,
        });
    }

    fn draw_text(&mut self, text: &str, origin: Point, _style: &TextStyle) {
        self.push(DrawOp::Text {
            text: text.to_string(),
            origin,
        });
    }

    fn snapshot(&self) -> Frame {
        let len = (self.width * self.height * 4) as usize;
        Frame::new(vec![0u8; len], self.width, self.height, 4, 0)
    }
}

// --- Video source ---

/// Serves a fixed frame once `frame` is set; `start` can be made to fail.
#[derive(Default)]
pub struct StubVideoSource {
    pub frame: Option<Frame>,
    pub fail_start: bool,
    pub started: bool,
}

impl StubVideoSource {
    pub fn with_frame(frame: Frame) -> Self {
        Self {
            frame: Some(frame),
            ..Self::default()
        }
    }
}

impl VideoSource for StubVideoSource {
    fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.fail_start {
            return Err(AcquisitionError::Camera("permission denied".into()));
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|f| (f.width(), f.height()))
    }

    fn current_frame(&self) -> Option<Frame> {
        self.frame.clone()
    }
}

// --- Detector ---

type DetectHook = Box<dyn FnMut() + Send>;

/// Returns the same results on every pass, or an error when `fail` is set.
/// `on_detect` runs inside each pass, standing in for work that happens
/// while inference is in flight.
pub struct ScriptedDetector {
    pub results: Vec<DetectionResult>,
    pub ready: bool,
    pub fail: bool,
    pub calls: Arc<Mutex<usize>>,
    on_detect: Option<DetectHook>,
}

impl ScriptedDetector {
    pub fn new(results: Vec<DetectionResult>) -> Self {
        Self {
            results,
            ready: true,
            fail: false,
            calls: Arc::new(Mutex::new(0)),
            on_detect: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn unready() -> Self {
        Self {
            ready: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn on_detect(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_detect = Some(Box::new(hook));
        self
    }
}

impl FaceDetector for ScriptedDetector {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn estimate_faces(&mut self, _frame: &Frame) -> Result<Vec<DetectionResult>, DetectionError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(hook) = self.on_detect.as_mut() {
            hook();
        }
        if self.fail {
            return Err(DetectionError::Inference("scripted failure".into()));
        }
        Ok(self.results.clone())
    }
}

// --- Observer ---

#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub statuses: Arc<Mutex<Vec<String>>>,
    pub counts: Arc<Mutex<Vec<usize>>>,
    pub passes: Arc<Mutex<usize>>,
}

impl RecordingObserver {
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.counts.lock().unwrap().clone()
    }

    pub fn passes(&self) -> usize {
        *self.passes.lock().unwrap()
    }
}

impl SessionObserver for RecordingObserver {
    fn status(&mut self, message: &str) {
        self.statuses.lock().unwrap().push(message.to_string());
    }

    fn count(&mut self, faces: usize) {
        self.counts.lock().unwrap().push(faces);
    }

    fn pass_completed(&mut self) {
        *self.passes.lock().unwrap() += 1;
    }
}
