pub mod acquisition_error;
pub mod constants;
pub mod detection_result;
pub mod frame;
pub mod sync;
