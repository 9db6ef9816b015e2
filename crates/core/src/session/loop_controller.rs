use std::thread::{self, JoinHandle};

use crate::camera::domain::video_source::SharedVideoSource;
use crate::detection::domain::face_detector::SharedFaceDetector;
use crate::overlay::domain::draw_surface::SharedDrawSurface;
use crate::overlay::overlay_renderer::OverlayRenderer;
use crate::session::detection_loop::DetectionLoop;
use crate::session::loop_state::LoopState;
use crate::session::refresh_ticker::{IntervalTicker, RefreshTicker};
use crate::session::session_observer::SharedSessionObserver;
use crate::shared::acquisition_error::AcquisitionError;
use crate::shared::sync::lock;

pub const STATUS_STARTED: &str = "Camera started. Detecting faces...";
pub const STATUS_STOPPED: &str = "Camera stopped. Type \"start\" to begin again.";

/// Creates the pacing ticker for each new session.
pub type TickerFactory = Box<dyn Fn() -> Box<dyn RefreshTicker> + Send>;

/// Starts and stops detection sessions over injected collaborators.
///
/// At most one session runs at a time. Each session runs its
/// [`DetectionLoop`] on a worker thread with its own [`LoopState`];
/// `stop` cancels that state and clears the overlay.
pub struct DetectionLoopController {
    state: LoopState,
    renderer: OverlayRenderer,
    observer: SharedSessionObserver,
    ticker_factory: TickerFactory,
    surface: Option<SharedDrawSurface>,
    worker: Option<JoinHandle<()>>,
}

impl DetectionLoopController {
    pub fn new(
        renderer: OverlayRenderer,
        observer: SharedSessionObserver,
        refresh_rate_hz: u32,
    ) -> Self {
        Self::with_ticker(
            renderer,
            observer,
            Box::new(move || -> Box<dyn RefreshTicker> {
                Box::new(IntervalTicker::new(refresh_rate_hz))
            }),
        )
    }

    pub fn with_ticker(
        renderer: OverlayRenderer,
        observer: SharedSessionObserver,
        ticker_factory: TickerFactory,
    ) -> Self {
        Self {
            state: LoopState::new(),
            renderer,
            observer,
            ticker_factory,
            surface: None,
            worker: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Faces found by the latest completed pass; 0 when stopped.
    pub fn last_count(&self) -> usize {
        self.state.last_count()
    }

    /// Begins a session if the detector is ready and the video has frames.
    ///
    /// On failure nothing changes and the reason is also sent to the
    /// observer as a status line.
    pub fn start(
        &mut self,
        video: SharedVideoSource,
        detector: SharedFaceDetector,
        surface: SharedDrawSurface,
    ) -> Result<(), AcquisitionError> {
        let (width, height) = match self.check_preconditions(&video, &detector) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                lock(&self.observer).status(&e.to_string());
                return Err(e);
            }
        };

        self.join_worker();

        let state = self.state.next_session();
        lock(&surface).resize(width, height);
        {
            let mut observer = lock(&self.observer);
            observer.session_started();
            observer.count(0);
            observer.status(STATUS_STARTED);
        }
        log::info!("Detection session started at {width}x{height}");

        let detection_loop = DetectionLoop::new(
            video,
            detector,
            surface.clone(),
            self.renderer.clone(),
            state.clone(),
            self.observer.clone(),
        );
        let mut ticker = (self.ticker_factory)();
        self.worker = Some(thread::spawn(move || {
            detection_loop.run(ticker.as_mut());
        }));
        self.state = state;
        self.surface = Some(surface);
        Ok(())
    }

    /// Cancels the running session and blanks the overlay. Safe to call
    /// repeatedly or when nothing is running.
    ///
    /// Does not wait for an in-flight pass; that pass sees the cancelled
    /// state and returns without drawing.
    pub fn stop(&mut self) {
        let was_active = self.state.is_active();
        self.state.cancel();

        match &self.surface {
            Some(surface) => {
                let mut surface = lock(surface);
                surface.clear();
                self.state.set_last_count(0);
                if was_active {
                    lock(&self.observer).count(0);
                }
            }
            None => self.state.set_last_count(0),
        }

        if was_active {
            let mut observer = lock(&self.observer);
            observer.summary();
            observer.status(STATUS_STOPPED);
            log::info!("Detection session stopped");
        }
    }

    fn check_preconditions(
        &self,
        video: &SharedVideoSource,
        detector: &SharedFaceDetector,
    ) -> Result<(u32, u32), AcquisitionError> {
        if self.state.is_active() {
            return Err(AcquisitionError::AlreadyRunning);
        }
        if !lock(detector).is_ready() {
            return Err(AcquisitionError::ModelNotReady);
        }
        lock(video)
            .dimensions()
            .filter(|&(w, h)| w > 0 && h > 0)
            .ok_or(AcquisitionError::NoVideo)
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Detection loop worker panicked");
            }
        }
    }
}

impl Drop for DetectionLoopController {
    fn drop(&mut self) {
        self.stop();
        self.join_worker();
    }
}
