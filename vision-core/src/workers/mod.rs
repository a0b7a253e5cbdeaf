//! The six long-lived pipeline workers, one module per thread body.

pub mod annotate;
pub mod ball;
pub mod frame_source;
pub mod goal;
pub mod preprocessor;
pub mod send_payload;
