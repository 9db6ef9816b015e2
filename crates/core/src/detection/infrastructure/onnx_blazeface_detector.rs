/// BlazeFace face detector using ONNX Runtime via `ort`.
///
/// Lightweight short-range detector: bounding boxes plus a confidence score
/// per face, no landmarks, no tracking.
use std::path::Path;

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::detection::infrastructure::execution_provider::open_session;
use crate::shared::detection_result::{DetectionResult, Point};
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    /// Load a BlazeFace ONNX model.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;
        log::info!("Loaded BlazeFace model from {}", model_path.display());
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<DetectionResult>, Box<dyn std::error::Error>> {
        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let candidates = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence,
            frame.width(),
            frame.height(),
        );
        Ok(nms(candidates, NMS_IOU_THRESH))
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn estimate_faces(&mut self, frame: &Frame) -> Result<Vec<DetectionResult>, DetectionError> {
        if !frame.has_pixels() {
            return Err(DetectionError::EmptyFrame);
        }
        self.infer(frame)
            .map_err(|e| DetectionError::Inference(e.to_string()))
    }
}

/// Resize frame to `size × size` and normalize to [-1,1] NCHW float32.
///
/// Nearest-neighbour sampling at pixel centres; alpha is ignored.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 127.5 - 1.0;
            }
        }
    }

    tensor
}

/// Short-range anchors: a 16×16 grid with 2 anchors per cell followed by
/// an 8×8 grid with 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let layers = [(8usize, 2usize), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for (stride, per_cell) in layers {
        let grid = INPUT_SIZE as usize / stride;
        for row in 0..grid {
            for col in 0..grid {
                let center = [
                    (col as f32 + 0.5) / grid as f32,
                    (row as f32 + 0.5) / grid as f32,
                ];
                anchors.extend(std::iter::repeat(center).take(per_cell));
            }
        }
    }

    anchors
}

/// Turns raw model outputs into frame-space candidates above `confidence`.
fn decode(
    regressors: &[f32],
    raw_scores: &[f32],
    anchors: &[[f32; 2]],
    confidence: f64,
    frame_w: u32,
    frame_h: u32,
) -> Vec<DetectionResult> {
    let fw = frame_w as f32;
    let fh = frame_h as f32;
    let input = INPUT_SIZE as f32;
    let count = anchors.len().min(NUM_ANCHORS).min(raw_scores.len());

    let mut candidates = Vec::new();
    for i in 0..count {
        let score = sigmoid(raw_scores[i]);
        if (score as f64) < confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        let Some(reg) = regressors.get(offset..offset + 4) else {
            break;
        };

        let anchor = anchors[i];
        let cx = anchor[0] + reg[0] / input;
        let cy = anchor[1] + reg[1] / input;
        let w = reg[2] / input;
        let h = reg[3] / input;

        let x1 = ((cx - w / 2.0) * fw).clamp(0.0, fw);
        let y1 = ((cy - h / 2.0) * fh).clamp(0.0, fh);
        let x2 = ((cx + w / 2.0) * fw).clamp(0.0, fw);
        let y2 = ((cy + h / 2.0) * fh).clamp(0.0, fh);

        candidates.push(DetectionResult::new(
            Point::new(x1 as f64, y1 as f64),
            Point::new(x2 as f64, y2 as f64),
            Some(score as f64),
        ));
    }
    candidates
}

/// Greedy NMS. Output is ordered by descending confidence.
fn nms(mut candidates: Vec<DetectionResult>, iou_thresh: f64) -> Vec<DetectionResult> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<DetectionResult> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_thresh) {
            kept.push(candidate);
        }
    }
    kept
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
