//! Result and Error types for the crate, following `heimdall`'s
//! `thiserror` + `miette::Diagnostic` convention.

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to open camera device `{path}`")]
    DeviceOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to negotiate a capture format")]
    Format(#[source] std::io::Error),

    #[error("failed to start the capture stream")]
    StreamStart(#[source] std::io::Error),

    #[error("failed to read the initial frame from the device")]
    InitialFrame(#[source] std::io::Error),

    #[error("camera returned a frame in an unsupported pixel format `{0}`")]
    UnsupportedPixelFormat(String),

    #[error(transparent)]
    Decode(#[from] image::ImageError),
}
