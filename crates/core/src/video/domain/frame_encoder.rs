use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("frame buffer does not match {width}x{height}")]
    InvalidBuffer { width: u32, height: u32 },
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Encodes an annotated frame into a displayable image format.
pub trait FrameEncoder: Send {
    /// MIME type of the encoded bytes (used as the multipart part header).
    fn content_type(&self) -> &'static str;

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError>;
}
