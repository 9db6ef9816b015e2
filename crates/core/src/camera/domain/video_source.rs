use std::sync::{Arc, Mutex};

use crate::shared::acquisition_error::AcquisitionError;
use crate::shared::frame::Frame;

/// A live stream of frames, typically a camera.
///
/// Dimensions stay unknown until the device has delivered its first frame;
/// consumers poll rather than block.
pub trait VideoSource: Send {
    /// Acquires the device and begins producing frames.
    fn start(&mut self) -> Result<(), AcquisitionError>;

    /// Releases the device. Idempotent.
    fn stop(&mut self);

    /// Pixel dimensions of the stream, `None` before the first frame.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Most recent frame, `None` before the first frame.
    fn current_frame(&self) -> Option<Frame>;

    /// True when dimensions are known and non-zero.
    fn has_video(&self) -> bool {
        matches!(self.dimensions(), Some((w, h)) if w > 0 && h > 0)
    }
}

pub type SharedVideoSource = Arc<Mutex<dyn VideoSource>>;
