pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// Default BlazeFace confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Resolution requested from the camera.
pub const DEFAULT_CAMERA_WIDTH: u32 = 640;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 480;

/// Pacing of the detection loop when no display drives it.
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 60;

pub const BOX_COLOR: [u8; 4] = [0x00, 0xff, 0x00, 0xff];
pub const BOX_LINE_WIDTH: u32 = 3;
pub const LABEL_FONT_SIZE: f32 = 16.0;

/// Gap between the top of a box and the baseline of its "Face N" label.
pub const LABEL_OFFSET_ABOVE: f64 = 10.0;
/// Gap between the bottom of a box and the baseline of its confidence label.
pub const LABEL_OFFSET_BELOW: f64 = 20.0;
