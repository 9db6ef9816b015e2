use std::time::Instant;

use crate::camera::domain::video_source::SharedVideoSource;
use crate::detection::domain::face_detector::SharedFaceDetector;
use crate::overlay::domain::draw_surface::SharedDrawSurface;
use crate::overlay::overlay_renderer::OverlayRenderer;
use crate::session::loop_state::LoopState;
use crate::session::refresh_ticker::RefreshTicker;
use crate::session::session_observer::SharedSessionObserver;
use crate::shared::sync::lock;

/// Outcome of one loop iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Iteration {
    /// A pass completed and drew this many faces.
    Rendered(usize),
    /// No frame yet, or the pass failed; try again next tick.
    Waiting,
    /// The session was cancelled; nothing was drawn.
    Halted,
}

/// The per-frame detect-and-draw step of one session.
pub struct DetectionLoop {
    video: SharedVideoSource,
    detector: SharedFaceDetector,
    surface: SharedDrawSurface,
    renderer: OverlayRenderer,
    state: LoopState,
    observer: SharedSessionObserver,
    last_error: Option<String>,
}

impl DetectionLoop {
    pub fn new(
        video: SharedVideoSource,
        detector: SharedFaceDetector,
        surface: SharedDrawSurface,
        renderer: OverlayRenderer,
        state: LoopState,
        observer: SharedSessionObserver,
    ) -> Self {
        Self {
            video,
            detector,
            surface,
            renderer,
            state,
            observer,
            last_error: None,
        }
    }

    /// Runs iterations, one per tick, until the session is cancelled.
    pub fn run(mut self, ticker: &mut dyn RefreshTicker) {
        while self.run_iteration() != Iteration::Halted {
            ticker.wait_next();
        }
        log::debug!("Detection loop halted");
    }

    /// One detection pass on the current frame, drawn only if the session
    /// is still active once the pass returns.
    pub fn run_iteration(&mut self) -> Iteration {
        if !self.state.is_active() {
            return Iteration::Halted;
        }

        let frame = lock(&self.video).current_frame().filter(|f| f.has_pixels());
        let Some(frame) = frame else {
            return Iteration::Waiting;
        };

        // The surface stays unlocked during inference so `stop` never waits on it.
        let detect_start = Instant::now();
        let outcome = lock(&self.detector).estimate_faces(&frame);
        let detect_ms = detect_start.elapsed().as_secs_f64() * 1000.0;

        let results = match outcome {
            Ok(results) => {
                self.last_error = None;
                results
            }
            Err(e) => {
                log::warn!("Error during detection on frame {}: {e}", frame.index());
                self.report_error(e.to_string());
                return if self.state.is_active() {
                    Iteration::Waiting
                } else {
                    Iteration::Halted
                };
            }
        };

        // `stop` cancels first and then clears under this lock, so checking
        // here means a cancelled pass can never draw over the cleared surface.
        let mut surface = lock(&self.surface);
        if !self.state.is_active() {
            return Iteration::Halted;
        }

        let render_start = Instant::now();
        self.renderer.render(&mut *surface, &results);
        let render_ms = render_start.elapsed().as_secs_f64() * 1000.0;

        let faces = results.len();
        self.state.set_last_count(faces);

        let mut observer = lock(&self.observer);
        observer.timing("detect", detect_ms);
        observer.timing("render", render_ms);
        observer.pass_completed();
        observer.count(faces);

        Iteration::Rendered(faces)
    }

    /// Repeated identical failures are reported once.
    fn report_error(&mut self, message: String) {
        if self.last_error.as_deref() == Some(message.as_str()) {
            return;
        }
        lock(&self.observer).status(&format!("Error during detection: {message}"));
        self.last_error = Some(message);
    }
}
