//! Face embedding model (FaceNet-style) on ONNX Runtime.
//!
//! Crops each located face with a margin, resizes the crop to the model's
//! square input and normalises pixels to `[-1, 1]`.
use std::path::Path;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::CROP_MARGIN_RATIO;
use crate::shared::frame::Frame;

use super::onnx_session;

const DEFAULT_INPUT_SIZE: usize = 160;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TensorLayout {
    Nchw,
    Nhwc,
}

pub struct FaceEmbedder {
    session: ort::session::Session,
    input_size: usize,
    layout: TensorLayout,
}

impl FaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::load_session(model_path)?;
        let (input_size, layout) = input_geometry(&onnx_session::first_input_dims(&session));
        log::debug!("Face embedder input {input_size}x{input_size} ({layout:?})");
        Ok(Self {
            session,
            input_size,
            layout,
        })
    }

    /// Crop margin in pixels, a fixed fraction of the model input size.
    pub fn margin(&self) -> i32 {
        crop_margin(self.input_size)
    }

    pub fn embed(
        &mut self,
        frame: &Frame,
        bbox: BoundingBox,
    ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let crop = bbox.expanded_within(self.margin(), frame.width(), frame.height());
        if crop.is_empty() {
            return Err(format!("face crop {crop:?} is empty").into());
        }
        let tensor = preprocess(frame, crop, self.input_size, self.layout);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding = outputs[0].try_extract_array::<f32>()?;
        Ok(embedding.iter().copied().collect())
    }
}

fn crop_margin(input_size: usize) -> i32 {
    (CROP_MARGIN_RATIO * input_size as f64) as i32
}

/// Square input size and channel layout from a 4-D input shape.
///
/// `[N, 3, H, W]` is NCHW; `[N, H, W, 3]` is NHWC. Dynamic axes fall back
/// to a 160 px NHWC input.
fn input_geometry(dims: &[Option<usize>]) -> (usize, TensorLayout) {
    match dims {
        [_, Some(3), Some(h), _] => (*h, TensorLayout::Nchw),
        [_, Some(h), _, Some(3)] => (*h, TensorLayout::Nhwc),
        _ => (DEFAULT_INPUT_SIZE, TensorLayout::Nhwc),
    }
}

/// Resize a crop to `size`×`size` and normalise into the model's layout.
fn preprocess(
    frame: &Frame,
    crop: BoundingBox,
    size: usize,
    layout: TensorLayout,
) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let crop_w = crop.width as usize;
    let crop_h = crop.height as usize;
    let shape = match layout {
        TensorLayout::Nchw => (1, 3, size, size),
        TensorLayout::Nhwc => (1, size, size, 3),
    };
    let mut tensor = ndarray::Array4::<f32>::zeros(shape);

    for y in 0..size {
        let src_y = crop.y as usize
            + (((y as f64 + 0.5) * crop_h as f64 / size as f64) as usize).min(crop_h - 1);
        for x in 0..size {
            let src_x = crop.x as usize
                + (((x as f64 + 0.5) * crop_w as f64 / size as f64) as usize).min(crop_w - 1);
            for c in 0..3 {
                let value = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
                match layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                }
            }
        }
    }

    tensor
}
