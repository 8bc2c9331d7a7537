pub mod onnx_identity_classifier;
