pub mod face_embedder;
pub mod face_locator;
mod math;
pub mod onnx_face_detector;
pub mod onnx_session;
