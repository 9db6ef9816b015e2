use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use face_overlay_core::camera::domain::video_source::SharedVideoSource;
use face_overlay_core::detection::domain::face_detector::SharedFaceDetector;
use face_overlay_core::detection::infrastructure::deferred_detector::LoadStatus;
use face_overlay_core::overlay::domain::draw_surface::SharedDrawSurface;
use face_overlay_core::session::loop_controller::DetectionLoopController;
use face_overlay_core::session::screenshot::{self, save_png, ScreenshotGallery};
use face_overlay_core::session::session_observer::SharedSessionObserver;
use face_overlay_core::shared::acquisition_error::AcquisitionError;
use face_overlay_core::shared::sync::lock;

use crate::commands::{Command, HELP};

/// How long `start` waits for the camera's first frame.
pub const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Reports the background model load.
pub type ModelStatusFn = Box<dyn Fn() -> LoadStatus + Send>;

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Handles interactive commands against one camera, detector and overlay.
pub struct App {
    camera: SharedVideoSource,
    detector: SharedFaceDetector,
    model_status: ModelStatusFn,
    surface: SharedDrawSurface,
    controller: DetectionLoopController,
    observer: SharedSessionObserver,
    gallery: ScreenshotGallery,
    screenshot_dir: Option<PathBuf>,
    first_frame_timeout: Duration,
}

impl App {
    pub fn new(
        camera: SharedVideoSource,
        detector: SharedFaceDetector,
        model_status: ModelStatusFn,
        surface: SharedDrawSurface,
        controller: DetectionLoopController,
        observer: SharedSessionObserver,
        screenshot_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            camera,
            detector,
            model_status,
            surface,
            controller,
            observer,
            gallery: ScreenshotGallery::new(),
            screenshot_dir,
            first_frame_timeout: FIRST_FRAME_TIMEOUT,
        }
    }

    pub fn with_first_frame_timeout(mut self, timeout: Duration) -> Self {
        self.first_frame_timeout = timeout;
        self
    }

    pub fn gallery(&self) -> &ScreenshotGallery {
        &self.gallery
    }

    pub fn is_detecting(&self) -> bool {
        self.controller.is_active()
    }

    /// Processes commands until `Quit` or the channel closes, then shuts
    /// the session down.
    pub fn run(&mut self, commands: &Receiver<Command>) {
        while let Ok(command) = commands.recv() {
            if self.handle(command) == Flow::Quit {
                break;
            }
        }
        self.shutdown();
    }

    pub fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Capture => self.capture(),
            Command::Status => self.report_status(),
            Command::Help => self.status(HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Checks the model before touching the camera, then waits for the
    /// first frame so the overlay can be sized to it.
    fn start(&mut self) {
        if self.controller.is_active() {
            self.status(&AcquisitionError::AlreadyRunning.to_string());
            return;
        }
        match (self.model_status)() {
            LoadStatus::Ready => {}
            LoadStatus::Loading => {
                self.status(&AcquisitionError::ModelNotReady.to_string());
                return;
            }
            LoadStatus::Failed(reason) => {
                self.status(&AcquisitionError::Model(reason).to_string());
                return;
            }
        }

        if let Err(e) = lock(&self.camera).start() {
            self.status(&e.to_string());
            return;
        }
        if !self.wait_for_video() {
            lock(&self.camera).stop();
            self.status(&AcquisitionError::NoVideo.to_string());
            return;
        }

        let started = self.controller.start(
            self.camera.clone(),
            self.detector.clone(),
            self.surface.clone(),
        );
        if started.is_err() {
            lock(&self.camera).stop();
        }
    }

    fn wait_for_video(&self) -> bool {
        let deadline = Instant::now() + self.first_frame_timeout;
        loop {
            if lock(&self.camera).has_video() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn stop(&mut self) {
        self.controller.stop();
        lock(&self.camera).stop();
    }

    fn capture(&mut self) {
        let sequence = self.gallery.len() + 1;
        let controller = &self.controller;
        let shot = screenshot::capture(
            &self.camera,
            &self.surface,
            || controller.last_count(),
            &mut self.gallery,
            &self.observer,
        );
        let shot = match shot {
            Ok(Some(shot)) => shot,
            Ok(None) => {
                self.status("No video to capture. Type \"start\" first.");
                return;
            }
            Err(e) => {
                log::error!("Screenshot failed: {e}");
                self.status(&format!("Screenshot failed: {e}"));
                return;
            }
        };

        let caption = shot.caption();
        let saved = self
            .screenshot_dir
            .as_deref()
            .map(|dir| save_png(shot, dir, sequence));
        self.status(&caption);
        match saved {
            Some(Ok(path)) => self.status(&format!("Saved {}", path.display())),
            Some(Err(e)) => {
                log::error!("{e}");
                self.status(&format!("Screenshot not saved: {e}"));
            }
            None => {}
        }
    }

    fn report_status(&mut self) {
        let model = match (self.model_status)() {
            LoadStatus::Loading => "loading".to_string(),
            LoadStatus::Ready => "ready".to_string(),
            LoadStatus::Failed(reason) => format!("failed ({reason})"),
        };
        let detecting = if self.controller.is_active() { "yes" } else { "no" };
        let line = format!(
            "Model: {model} | Detecting: {detecting} | Faces detected: {} | Screenshots: {}",
            self.controller.last_count(),
            self.gallery.len()
        );
        self.status(&line);
    }

    fn status(&self, message: &str) {
        lock(&self.observer).status(message);
    }

    pub fn shutdown(&mut self) {
        self.stop();
    }
}
