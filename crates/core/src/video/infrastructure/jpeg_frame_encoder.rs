use image::codecs::jpeg::JpegEncoder;

use crate::shared::frame::Frame;
use crate::video::domain::frame_encoder::{EncodeError, FrameEncoder};

pub const DEFAULT_QUALITY: u8 = 95;

/// Baseline JPEG encoder backed by the `image` crate.
pub struct JpegFrameEncoder {
    quality: u8,
}

impl JpegFrameEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or(EncodeError::InvalidBuffer {
                width: frame.width(),
                height: frame.height(),
            })?;

        let mut buffer = Vec::with_capacity(frame.data().len() / 8);
        JpegEncoder::new_with_quality(&mut buffer, self.quality).encode_image(&img)?;
        Ok(buffer)
    }
}
