use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera {device} is not open")]
    NotOpen { device: String },
    #[error("failed to open camera {device}: {message}")]
    Open { device: String, message: String },
    #[error("camera {device} returned no frame: {message}")]
    NoFrame { device: String, message: String },
    #[error("unsupported pixel format {fourcc} on {device}")]
    UnsupportedFormat { device: String, fourcc: String },
}

/// Yields raw frames from a camera on demand.
///
/// `next_frame` may block on hardware. Frames carry a monotonically
/// increasing capture index. `release` must be safe to call more than once.
pub trait FrameSource: Send {
    /// Identifier the source was configured with (device path or URI).
    fn device(&self) -> &str;

    fn open(&mut self) -> Result<(), CaptureError>;

    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    fn is_open(&self) -> bool;

    fn release(&mut self);
}
