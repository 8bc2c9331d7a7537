use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{CaptureError, FrameSource};

pub const URI_SCHEME: &str = "stub://";

/// Generates a moving gradient instead of reading a device.
///
/// Selected with a `stub://<name>` camera identifier so the controller can
/// run on machines without a camera attached.
pub struct SyntheticFrameSource {
    device: String,
    width: u32,
    height: u32,
    open: bool,
    next_index: u64,
}

impl SyntheticFrameSource {
    pub fn new(device: &str, width: u32, height: u32) -> Self {
        Self {
            device: device.to_string(),
            width,
            height,
            open: false,
            next_index: 0,
        }
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let shift = self.next_index as usize;
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                pixels.push(((x + shift) % 256) as u8);
                pixels.push(((y + shift) % 256) as u8);
                pixels.push(((x + y) % 256) as u8);
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticFrameSource {
    fn device(&self) -> &str {
        &self.device
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        self.open = true;
        log::info!(
            "Camera {} connected ({}x{}, synthetic)",
            self.device,
            self.width,
            self.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        if !self.open {
            return Err(CaptureError::NotOpen {
                device: self.device.clone(),
            });
        }
        let frame = Frame::new(
            self.generate_pixels(),
            self.width,
            self.height,
            self.next_index,
        );
        self.next_index += 1;
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            log::info!("Camera {} released", self.device);
        }
    }
}
