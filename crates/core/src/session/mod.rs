pub mod detection_loop;
pub mod loop_controller;
pub mod loop_state;
pub mod refresh_ticker;
pub mod screenshot;
pub mod session_observer;
