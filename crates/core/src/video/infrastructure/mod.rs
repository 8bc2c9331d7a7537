pub mod jpeg_frame_encoder;
pub mod still_image_frame_source;
pub mod synthetic_frame_source;
#[cfg(feature = "v4l2")]
pub mod v4l2_frame_source;
