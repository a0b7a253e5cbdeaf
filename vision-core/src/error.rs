//! Fatal boot-time errors: device-unavailable and configuration failures (spec.md §7).
//! Anything that can happen mid-flight instead becomes a logged `continue` or an
//! `Option::None`, never an `Error` here.

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to load the parameter block")]
    Config(#[from] odal::Error),

    #[error("failed to open the camera")]
    Camera(#[from] capture::Error),

    #[error("failed to open the serial link to the microcontroller")]
    Serial(#[from] wire::Error),
}
