//! Frame preprocessing and ball/goal detection for the downward-facing fisheye vision
//! pipeline: circular crop and reorientation, HSV color masking and field-mask
//! derivation, and the contour-based ball/goal detectors that each drive a Kalman
//! filter from `filter` and convert through `coords`.

pub mod ball;
pub mod frame;
pub mod geometry;
pub mod goal;
pub mod hsv;
pub mod preprocess;

pub use ball::{BallDetection, BallDetector, BallParams};
pub use frame::{Frame, Mask};
pub use goal::{GoalDetection, GoalDetector, GoalParams};
pub use preprocess::{preprocess, Preprocessed, PreprocessParams};
