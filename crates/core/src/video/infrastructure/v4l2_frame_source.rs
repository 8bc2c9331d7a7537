use ouroboros::self_referencing;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{CaptureError, FrameSource};

const MMAP_BUFFERS: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PixelLayout {
    Rgb3,
    Yuyv,
    Mjpg,
}

impl PixelLayout {
    fn from_fourcc(repr: [u8; 4]) -> Option<Self> {
        match &repr {
            b"RGB3" => Some(Self::Rgb3),
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpg),
            _ => None,
        }
    }
}

#[self_referencing]
struct DeviceStream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

/// Captures from a Video4Linux2 device node such as `/dev/video0`.
///
/// Asks the driver for packed RGB at the configured resolution and falls back
/// to whatever the driver negotiates, converting YUYV or MJPG to RGB.
pub struct V4l2FrameSource {
    device: String,
    width: u32,
    height: u32,
    layout: PixelLayout,
    state: Option<DeviceStream>,
    next_index: u64,
}

impl V4l2FrameSource {
    pub fn new(device: &str, width: u32, height: u32) -> Self {
        Self {
            device: device.to_string(),
            width,
            height,
            layout: PixelLayout::Rgb3,
            state: None,
            next_index: 0,
        }
    }

    fn open_error(&self, err: impl std::fmt::Display) -> CaptureError {
        CaptureError::Open {
            device: self.device.clone(),
            message: err.to_string(),
        }
    }

    fn to_rgb(&self, buf: &[u8]) -> Result<Vec<u8>, CaptureError> {
        let expected = (self.width * self.height * 3) as usize;
        let rgb = match self.layout {
            PixelLayout::Rgb3 => buf.get(..expected).map(<[u8]>::to_vec),
            PixelLayout::Yuyv => Some(yuyv_to_rgb(buf, expected)),
            PixelLayout::Mjpg => image::load_from_memory(buf)
                .ok()
                .map(|img| img.to_rgb8().into_raw()),
        };
        rgb.filter(|data| data.len() == expected)
            .ok_or_else(|| CaptureError::NoFrame {
                device: self.device.clone(),
                message: format!("short or undecodable {:?} buffer", self.layout),
            })
    }
}

impl FrameSource for V4l2FrameSource {
    fn device(&self) -> &str {
        &self.device
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = v4l::Device::with_path(&self.device).map_err(|e| self.open_error(e))?;
        let mut format = device.format().map_err(|e| self.open_error(e))?;
        format.width = self.width;
        format.height = self.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("Failed to set format on {}: {}", self.device, err);
                device.format().map_err(|e| self.open_error(e))?
            }
        };

        self.layout = PixelLayout::from_fourcc(format.fourcc.repr).ok_or_else(|| {
            CaptureError::UnsupportedFormat {
                device: self.device.clone(),
                fourcc: String::from_utf8_lossy(&format.fourcc.repr).into_owned(),
            }
        })?;
        self.width = format.width;
        self.height = format.height;

        let state = DeviceStreamTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, MMAP_BUFFERS)
            },
        }
        .try_build()
        .map_err(|e| self.open_error(e))?;
        self.state = Some(state);

        log::info!(
            "Camera {} connected ({}x{}, {:?})",
            self.device,
            self.width,
            self.height,
            self.layout
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().ok_or_else(|| CaptureError::NotOpen {
            device: self.device.clone(),
        })?;
        let raw = state
            .with_mut(|fields| fields.stream.next().map(|(buf, _meta)| buf.to_vec()))
            .map_err(|err| CaptureError::NoFrame {
                device: self.device.clone(),
                message: err.to_string(),
            })?;

        let rgb = self.to_rgb(&raw)?;
        let frame = Frame::new(rgb, self.width, self.height, self.next_index);
        self.next_index += 1;
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!("Camera {} released", self.device);
        }
    }
}

/// Converts packed YUYV 4:2:2 to RGB using BT.601 coefficients.
fn yuyv_to_rgb(buf: &[u8], expected_len: usize) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(expected_len);
    for chunk in buf.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_pixel(y0, u, v));
        rgb.extend_from_slice(&yuv_pixel(y1, u, v));
        if rgb.len() >= expected_len {
            break;
        }
    }
    rgb
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    [
        clamp(y + 1.402 * v),
        clamp(y - 0.344_136 * u - 0.714_136 * v),
        clamp(y + 1.772 * u),
    ]
}
