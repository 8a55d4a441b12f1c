//! Webcam gaze-dataset collection: shows fixation targets on a monitor and
//! pairs each confirmed fixation with a webcam frame in a CSV-indexed folder.

pub mod capture;
pub mod display;
pub mod error;
pub mod monitor;
pub mod recorder;
pub mod session;
pub mod target;
