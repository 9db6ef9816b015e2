use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::shared::detection_result::DetectionResult;
use crate::shared::frame::Frame;

/// A single detection pass failed. Never fatal to the detection loop.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("face detection model is not loaded")]
    NotReady,
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Domain interface for face detection.
///
/// Implementations may hold inference sessions with interior state,
/// hence `&mut self`.
pub trait FaceDetector: Send {
    /// Whether a model is loaded and `estimate_faces` can succeed.
    fn is_ready(&self) -> bool {
        true
    }

    /// Runs one detection pass. Results keep the detector's own order.
    fn estimate_faces(&mut self, frame: &Frame) -> Result<Vec<DetectionResult>, DetectionError>;
}

pub type SharedFaceDetector = Arc<Mutex<dyn FaceDetector>>;
