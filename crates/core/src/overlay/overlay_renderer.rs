use crate::overlay::domain::draw_surface::{DrawSurface, Stroke, TextStyle};
use crate::shared::constants::{LABEL_OFFSET_ABOVE, LABEL_OFFSET_BELOW};
use crate::shared::detection_result::{DetectionResult, Point};

/// Styling shared by every box and label of the overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OverlayStyle {
    pub stroke: Stroke,
    pub text: TextStyle,
}

/// 1-based label for the face at `index` in detector order.
pub fn face_label(index: usize) -> String {
    format!("Face {}", index + 1)
}

/// Confidence as a percentage with one decimal, e.g. `0.873 -> "87.3%"`.
///
/// Ties round up (`0.1225 -> "12.3%"`); `{:.1}` alone would round them to even.
pub fn format_confidence(score: f64) -> String {
    let tenths = (score * 100.0 * 10.0).round();
    format!("{:.1}%", tenths / 10.0)
}

/// Draws one frame's detections onto an overlay surface.
#[derive(Clone, Debug, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    /// Clears the surface, then draws a box, a `Face N` label above it and,
    /// when a score is present, a percentage below it for every result.
    ///
    /// Results are drawn in the order given; labels follow that order.
    pub fn render(&self, surface: &mut dyn DrawSurface, results: &[DetectionResult]) {
        surface.clear();

        for (index, result) in results.iter().enumerate() {
            let top_left = result.top_left;
            surface.draw_rect(top_left, result.bottom_right, &self.style.stroke);

            let above = Point::new(top_left.x, top_left.y - LABEL_OFFSET_ABOVE);
            surface.draw_text(&face_label(index), above, &self.style.text);

            if let Some(score) = result.confidence {
                let below = Point::new(top_left.x, result.bottom_right.y + LABEL_OFFSET_BELOW);
                surface.draw_text(&format_confidence(score), below, &self.style.text);
            }
        }
    }
}
