//! V4L2 frame source: opens a webcam device, negotiates a capture format at the
//! configured resolution/FPS/buffer count, and exposes a blocking `read_frame` that
//! hands back a [`vision::Frame`].
//!
//! Grounded on `heimdall::Camera` (`IntelligentRoboticsLab-yggdrasil`) for the
//! `thiserror` + `miette::Diagnostic` error convention and the device-wrapper shape,
//! generalized from the NAO's fixed YUYV sensor to any V4L2-compatible webcam; the
//! property set (width/height/fps/buffer-size/orientation) and the "never tear down on
//! a failed read" contract follow `FetchFrameThread` in
//! `examples/original_source/.../camera.py`.

pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};
use vision::Frame;

pub use error::{Error, Result};

/// Resolution, frame rate, and buffer depth FrameSource negotiates with the device.
/// Defaults match spec.md §6: 640x480, buffer size 2 (minimizing latency over
/// throughput).
#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub device_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub buffer_count: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/video0"),
            width: 640,
            height: 480,
            fps: 30,
            buffer_count: 2,
        }
    }
}

const FOURCC_CANDIDATES: [&[u8; 4]; 3] = [b"BGR3", b"YUYV", b"MJPG"];

/// An open V4L2 capture device. Exclusively owned by `FrameSource` (spec.md §5).
pub struct Camera {
    stream: MmapStream<'static>,
    fourcc: FourCC,
    width: u32,
    height: u32,
}

impl Camera {
    /// Opens `config.device_path`, negotiates the best-available pixel format among
    /// BGR3/YUYV/MJPG, sets FPS and buffer count, and reads one frame to fail fast if
    /// the device is unusable.
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let device = open_device(&config.device_path)?;
        let format = negotiate_format(&device, config)?;
        set_frame_rate(&device, config.fps)?;

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
            .map_err(Error::StreamStart)?;

        let mut camera = Self { stream, fourcc: format.fourcc, width: format.width, height: format.height };
        camera.read_frame().map_err(|_| Error::InitialFrame(std::io::Error::other("initial frame read failed")))?;

        tracing::info!(
            device = %config.device_path.display(),
            width = format.width,
            height = format.height,
            fourcc = ?format.fourcc,
            "camera opened"
        );

        Ok(camera)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Blocks for the next frame and decodes it to BGR. A failed read is the caller's to
    /// retry — this never tears down the device (spec.md §4.1).
    pub fn read_frame(&mut self) -> Result<Frame> {
        let (buffer, meta) = self.stream.next().map_err(Error::InitialFrame)?;
        let bytes = &buffer[..(meta.bytesused as usize).min(buffer.len())];
        decode_frame(self.fourcc, self.width, self.height, bytes)
    }
}

fn open_device(path: &Path) -> Result<Device> {
    Device::with_path(path).map_err(|source| Error::DeviceOpen { path: path.display().to_string(), source })
}

fn negotiate_format(device: &Device, config: &CameraConfig) -> Result<Format> {
    for candidate in FOURCC_CANDIDATES {
        let mut format = device.format().map_err(Error::Format)?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = FourCC::new(candidate);

        if let Ok(accepted) = device.set_format(&format) {
            if accepted.fourcc == format.fourcc {
                return Ok(accepted);
            }
        }
    }

    device.format().map_err(Error::Format)
}

fn set_frame_rate(device: &Device, fps: u32) -> Result<()> {
    let mut params = device.params().map_err(Error::Format)?;
    params.interval = v4l::Fraction { numerator: 1, denominator: fps };
    device.set_params(&params).map_err(Error::Format)?;
    Ok(())
}

fn decode_frame(fourcc: FourCC, width: u32, height: u32, bytes: &[u8]) -> Result<Frame> {
    match &fourcc.repr {
        b"BGR3" => Ok(Frame::from_bgr(width, height, bytes.to_vec())),
        b"YUYV" => Ok(decode_yuyv(width, height, bytes)),
        b"MJPG" | b"JPEG" => {
            let rgb = image::load_from_memory(bytes)?.to_rgb8();
            Ok(Frame::from_rgb_image(&rgb))
        }
        other => Err(Error::UnsupportedPixelFormat(String::from_utf8_lossy(other).into_owned())),
    }
}

/// YUYV 4:2:2 to BGR8, the standard ITU-R BT.601 conversion (shared in spirit with
/// `heimdall::Camera::yuyv444_to_rgb`, with the channel order flipped to BGR).
fn decode_yuyv(width: u32, height: u32, yuyv: &[u8]) -> Frame {
    let mut bgr = Vec::with_capacity(width as usize * height as usize * 3);

    for chunk in yuyv.chunks_exact(4) {
        let [y0, u, y1, v] = [chunk[0], chunk[1], chunk[2], chunk[3]];
        for y in [y0, y1] {
            let c = i32::from(y) - 16;
            let d = i32::from(u) - 128;
            let e = i32::from(v) - 128;

            let r = clamp_u8((298 * c + 409 * e + 128) >> 8);
            let g = clamp_u8((298 * c - 100 * d - 208 * e + 128) >> 8);
            let b = clamp_u8((298 * c + 516 * d + 128) >> 8);

            bgr.extend_from_slice(&[b, g, r]);
        }
    }

    bgr.resize(width as usize * height as usize * 3, 0);
    Frame::from_bgr(width, height, bgr)
}

fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// A constant frame rate used only to time synthetic capture loops in tests; never
/// touches a real device.
pub const fn default_poll_interval(fps: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / fps as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_decode_produces_a_bgr_buffer_of_the_right_length() {
        let (width, height) = (2, 1);
        let yuyv = [128u8, 128, 128, 128]; // mid-grey 2-pixel YUYV macropixel
        let frame = decode_yuyv(width, height, &yuyv);
        assert_eq!(frame.as_bgr().len(), (width * height * 3) as usize);
    }

    #[test]
    fn default_poll_interval_matches_thirty_fps() {
        assert_eq!(default_poll_interval(30), Duration::from_nanos(1_000_000_000 / 30));
    }
}
