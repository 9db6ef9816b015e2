/// A point in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One detected face in one frame.
///
/// Lives only for the render pass of the frame that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionResult {
    pub top_left: Point,
    pub bottom_right: Point,
    /// Detector confidence in `[0, 1]`, when the detector reports one.
    pub confidence: Option<f64>,
}

impl DetectionResult {
    pub fn new(top_left: Point, bottom_right: Point, confidence: Option<f64>) -> Self {
        Self {
            top_left,
            bottom_right,
            confidence,
        }
    }

    pub fn width(&self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }

    pub fn iou(&self, other: &DetectionResult) -> f64 {
        let ix1 = self.top_left.x.max(other.top_left.x);
        let iy1 = self.top_left.y.max(other.top_left.y);
        let ix2 = self.bottom_right.x.min(other.bottom_right.x);
        let iy2 = self.bottom_right.y.min(other.bottom_right.y);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.width() * self.height();
        let area_b = other.width() * other.height();
        inter / (area_a + area_b - inter)
    }
}
