use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::detection_result::DetectionResult;
use crate::shared::frame::Frame;
use crate::shared::sync::lock;

/// Builds the real detector; runs on the loader thread.
pub type DetectorFactory =
    Box<dyn FnOnce() -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> + Send>;

/// Called once on the loader thread when loading finishes.
pub type LoadedCallback = Box<dyn FnOnce(&LoadStatus) + Send>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed(String),
}

enum Slot {
    Loading,
    Ready(Box<dyn FaceDetector>),
    Failed(String),
}

impl Slot {
    fn status(&self) -> LoadStatus {
        match self {
            Slot::Loading => LoadStatus::Loading,
            Slot::Ready(_) => LoadStatus::Ready,
            Slot::Failed(msg) => LoadStatus::Failed(msg.clone()),
        }
    }
}

struct Shared {
    slot: Mutex<Slot>,
    done: Condvar,
}

/// Detector whose model loads in the background.
///
/// Reports `is_ready() == false` until the factory has produced the inner
/// detector, so callers can refuse to start work against a missing model.
pub struct DeferredDetector {
    shared: Arc<Shared>,
}

impl DeferredDetector {
    /// Starts loading on a background thread and returns immediately.
    pub fn spawn(factory: DetectorFactory, on_loaded: Option<LoadedCallback>) -> Self {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Loading),
            done: Condvar::new(),
        });

        let loader = shared.clone();
        thread::spawn(move || {
            let slot = match factory() {
                Ok(detector) => Slot::Ready(detector),
                Err(e) => {
                    log::error!("Error loading model: {e}");
                    Slot::Failed(e.to_string())
                }
            };
            let status = slot.status();
            *lock(&loader.slot) = slot;
            loader.done.notify_all();
            if let Some(callback) = on_loaded {
                callback(&status);
            }
        });

        Self { shared }
    }

    pub fn status(&self) -> LoadStatus {
        lock(&self.shared.slot).status()
    }

    /// Blocks until loading finishes or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> LoadStatus {
        let guard = lock(&self.shared.slot);
        let (slot, _) = self
            .shared
            .done
            .wait_timeout_while(guard, timeout, |slot| matches!(slot, Slot::Loading))
            .unwrap_or_else(PoisonError::into_inner);
        slot.status()
    }
}

impl FaceDetector for DeferredDetector {
    fn is_ready(&self) -> bool {
        self.status() == LoadStatus::Ready
    }

    fn estimate_faces(&mut self, frame: &Frame) -> Result<Vec<DetectionResult>, DetectionError> {
        let mut slot = lock(&self.shared.slot);
        match &mut *slot {
            Slot::Ready(detector) => detector.estimate_faces(frame),
            Slot::Loading | Slot::Failed(_) => Err(DetectionError::NotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::detection_result::Point;
    use std::sync::mpsc;

    type LoadResult = Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>>;

    struct OneFace;

    impl FaceDetector for OneFace {
        fn estimate_faces(&mut self, _frame: &Frame) -> Result<Vec<DetectionResult>, DetectionError> {
            Ok(vec![DetectionResult::new(
                Point::new(1.0, 2.0),
                Point::new(3.0, 4.0),
                Some(0.9),
            )])
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, 0)
    }

    #[test]
    fn test_not_ready_while_loading() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut detector = DeferredDetector::spawn(
            Box::new(move || -> LoadResult {
                let _ = release_rx.recv();
                Ok(Box::new(OneFace))
            }),
            None,
        );

        assert!(!detector.is_ready());
        assert!(matches!(
            detector.estimate_faces(&frame()),
            Err(DetectionError::NotReady)
        ));

        release_tx.send(()).unwrap();
        assert_eq!(detector.wait(Duration::from_secs(5)), LoadStatus::Ready);
    }

    #[test]
    fn test_delegates_once_ready() {
        let mut detector =
            DeferredDetector::spawn(Box::new(|| -> LoadResult { Ok(Box::new(OneFace)) }), None);

        assert_eq!(detector.wait(Duration::from_secs(5)), LoadStatus::Ready);
        assert!(detector.is_ready());
        assert_eq!(detector.estimate_faces(&frame()).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_load_reports_message_and_stays_unready() {
        let mut detector = DeferredDetector::spawn(
            Box::new(|| -> LoadResult { Err("no model file".into()) }),
            None,
        );

        assert_eq!(
            detector.wait(Duration::from_secs(5)),
            LoadStatus::Failed("no model file".into())
        );
        assert!(!detector.is_ready());
        assert!(detector.estimate_faces(&frame()).is_err());
    }

    #[test]
    fn test_callback_receives_final_status() {
        let (tx, rx) = mpsc::channel();
        let _detector = DeferredDetector::spawn(
            Box::new(|| -> LoadResult { Ok(Box::new(OneFace)) }),
            Some(Box::new(move |status: &LoadStatus| {
                let _ = tx.send(status.clone());
            })),
        );

        let status = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(status, LoadStatus::Ready);
    }

    #[test]
    fn test_load_lands_even_if_slot_was_poisoned() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut detector = DeferredDetector::spawn(
            Box::new(move || -> LoadResult {
                let _ = release_rx.recv();
                Ok(Box::new(OneFace))
            }),
            None,
        );
        let shared = detector.shared.clone();
        let _ = thread::spawn(move || {
            let _guard = shared.slot.lock().unwrap();
            panic!("poison the slot");
        })
        .join();
        assert!(detector.shared.slot.is_poisoned());

        release_tx.send(()).unwrap();

        assert_eq!(detector.wait(Duration::from_secs(5)), LoadStatus::Ready);
        assert!(detector.is_ready());
        assert_eq!(detector.estimate_faces(&frame()).unwrap().len(), 1);
    }
}
