//! YOLO-face box locator running on ONNX Runtime via `ort`.
//!
//! Handles letterbox preprocessing, inference, confidence filtering and NMS.
//! Landmark columns, when the model emits them, are ignored.
use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::math::non_max_suppression;
use super::onnx_session;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox fill value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

/// A located face before embedding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocatedFace {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

pub struct FaceLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl FaceLocator {
    /// Load a YOLO-face ONNX model. The square input resolution is read from
    /// the model's NCHW input shape, falling back to 640 when dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::load_session(model_path)?;
        let input_size = onnx_session::first_input_dims(&session)
            .get(2)
            .copied()
            .flatten()
            .map(|h| h as u32)
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    pub fn locate(&mut self, frame: &Frame) -> Result<Vec<LocatedFace>, Box<dyn std::error::Error>> {
        let letterboxed = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(letterboxed.tensor.clone())?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face locator model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("unexpected face locator output shape: {shape:?}").into());
        }
        let data = tensor
            .as_standard_layout()
            .as_slice()
            .ok_or("cannot get tensor slice")?
            .to_vec();

        let candidates = parse_rows(
            &data,
            shape[1],
            shape[2],
            self.confidence,
            &letterboxed,
        );
        let boxes: Vec<([f64; 4], f64)> = candidates.iter().map(|c| (c.0, c.1)).collect();
        let kept = non_max_suppression(&boxes, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|i| {
                let [x1, y1, x2, y2] = boxes[i].0;
                LocatedFace {
                    bbox: BoundingBox::from_corners(
                        x1.max(0.0),
                        y1.max(0.0),
                        x2.min(frame.width() as f64),
                        y2.min(frame.height() as f64),
                    ),
                    confidence: boxes[i].1 as f32,
                }
            })
            .filter(|face| !face.bbox.is_empty())
            .collect())
    }
}

struct Letterboxed {
    tensor: Array4<f32>,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterboxed {
    fn to_frame_coords(&self, v: f64, pad: u32) -> f64 {
        (v - pad as f64) / self.scale
    }
}

/// Fit the frame into a `target_size` square, centred on a grey border, as a
/// `[1, 3, S, S]` tensor scaled to `[0, 1]`.
fn letterbox(frame: &Frame, target_size: u32) -> Letterboxed {
    let scale = (target_size as f64 / frame.width() as f64)
        .min(target_size as f64 / frame.height() as f64);
    let fitted_w = ((frame.width() as f64 * scale).round() as u32).clamp(1, target_size);
    let fitted_h = ((frame.height() as f64 * scale).round() as u32).clamp(1, target_size);
    let pad_x = (target_size - fitted_w) / 2;
    let pad_y = (target_size - fitted_h) / 2;

    let fitted = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .map(|img| imageops::resize(&img, fitted_w, fitted_h, FilterType::Triangle));

    let side = target_size as usize;
    let tensor = Array4::from_shape_fn((1, 3, side, side), |(_, c, row, col)| {
        let (Some(x), Some(y)) = (
            (col as u32).checked_sub(pad_x).filter(|&x| x < fitted_w),
            (row as u32).checked_sub(pad_y).filter(|&y| y < fitted_h),
        ) else {
            return PAD_VALUE;
        };
        fitted
            .as_ref()
            .map_or(PAD_VALUE, |img| img.get_pixel(x, y)[c] as f32 / 255.0)
    });

    Letterboxed {
        tensor,
        scale,
        pad_x,
        pad_y,
    }
}

/// Decode `[1, A, B]` YOLO output into frame-space corners and scores.
///
/// Rows are `[cx, cy, w, h, conf, ...]`. The output may be transposed
/// (`[1, features, detections]`), detected by the smaller middle axis.
fn parse_rows(
    data: &[f32],
    dim1: usize,
    dim2: usize,
    confidence: f64,
    letterboxed: &Letterboxed,
) -> Vec<([f64; 4], f64)> {
    let transposed = dim1 < dim2;
    let (num_dets, num_feats) = if transposed { (dim2, dim1) } else { (dim1, dim2) };
    if num_feats < 5 {
        return Vec::new();
    }
    let at = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    (0..num_dets)
        .filter_map(|i| {
            let conf = at(i, 4);
            if conf <= confidence {
                return None;
            }
            let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
            let x1 = letterboxed.to_frame_coords(cx - w / 2.0, letterboxed.pad_x);
            let y1 = letterboxed.to_frame_coords(cy - h / 2.0, letterboxed.pad_y);
            let x2 = letterboxed.to_frame_coords(cx + w / 2.0, letterboxed.pad_x);
            let y2 = letterboxed.to_frame_coords(cy + h / 2.0, letterboxed.pad_y);
            Some(([x1, y1, x2, y2], conf))
        })
        .collect()
}
