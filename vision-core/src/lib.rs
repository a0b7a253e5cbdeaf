//! Composition root for the on-board vision pipeline: six worker threads wired together
//! through a handful of broadcast primitives, a lock-free live parameter block, and the
//! annotated-frame renderer a debug client can attach to.

pub mod coordinator;
pub mod debug;
pub mod detections;
pub mod error;
pub mod gate;
pub mod params;
pub mod slot;
pub mod trackers;
pub mod worker_id;
pub mod workers;

pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use params::{ParameterBlock, ParameterBlockToml};
