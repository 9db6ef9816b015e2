use thiserror::Error;

/// The camera or the model could not be brought up.
///
/// Surfaced to the user as a one-line status; the failed operation is
/// abandoned without retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Model not loaded yet. Please wait...")]
    ModelNotReady,
    #[error("Camera is not producing frames yet. Please wait...")]
    NoVideo,
    #[error("Error accessing camera. Please check permissions. ({0})")]
    Camera(String),
    #[error("Error loading model. Please restart. ({0})")]
    Model(String),
    #[error("Detection is already running.")]
    AlreadyRunning,
}
