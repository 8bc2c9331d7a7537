use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{CaptureError, FrameSource};

pub const URI_SCHEME: &str = "file://";

/// Replays one image file as an endless live feed.
///
/// The image is decoded once on `open` and resized to the configured capture
/// resolution, so downstream stages see the same geometry as the real camera.
pub struct StillImageFrameSource {
    device: String,
    path: PathBuf,
    width: u32,
    height: u32,
    image: Option<image::RgbImage>,
    next_index: u64,
}

impl StillImageFrameSource {
    pub fn new(device: &str, path: &Path, width: u32, height: u32) -> Self {
        Self {
            device: device.to_string(),
            path: path.to_path_buf(),
            width,
            height,
            image: None,
            next_index: 0,
        }
    }
}

impl FrameSource for StillImageFrameSource {
    fn device(&self) -> &str {
        &self.device
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        let decoded = image::open(&self.path).map_err(|e| CaptureError::Open {
            device: self.device.clone(),
            message: e.to_string(),
        })?;
        let rgb = decoded.to_rgb8();
        let rgb = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            image::imageops::resize(
                &rgb,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            )
        };
        self.image = Some(rgb);
        log::info!(
            "Camera {} connected ({}x{}, still image)",
            self.device,
            self.width,
            self.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let image = self.image.as_ref().ok_or_else(|| CaptureError::NotOpen {
            device: self.device.clone(),
        })?;
        let frame = Frame::from_rgb_image(image.clone(), self.next_index);
        self.next_index += 1;
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.image.is_some()
    }

    fn release(&mut self) {
        if self.image.take().is_some() {
            log::info!("Camera {} released", self.device);
        }
    }
}
