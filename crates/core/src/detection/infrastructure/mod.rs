pub mod deferred_detector;
pub mod execution_provider;
pub mod model_resolver;
pub mod onnx_blazeface_detector;
