//! Dense identity classifier on ONNX Runtime.
//!
//! Feeds one embedding as a `[1, K]` f32 tensor and returns the flattened
//! first output as label scores.
use std::path::Path;

use crate::detection::infrastructure::onnx_session;
use crate::identity::domain::identity_classifier::{ClassificationScores, IdentityClassifier};

pub struct OnnxIdentityClassifier {
    session: ort::session::Session,
    embedding_dim: Option<usize>,
}

impl OnnxIdentityClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::load_session(model_path)?;
        let embedding_dim = onnx_session::first_input_dims(&session)
            .get(1)
            .copied()
            .flatten();
        Ok(Self {
            session,
            embedding_dim,
        })
    }
}

impl IdentityClassifier for OnnxIdentityClassifier {
    fn classify(
        &mut self,
        embedding: &[f32],
    ) -> Result<ClassificationScores, Box<dyn std::error::Error>> {
        if let Some(dim) = self.embedding_dim {
            if dim != embedding.len() {
                return Err(format!(
                    "embedding has {} values, classifier expects {dim}",
                    embedding.len()
                )
                .into());
            }
        }
        let input = ndarray::Array2::from_shape_vec((1, embedding.len()), embedding.to_vec())?;
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("identity classifier produced no outputs".into());
        }
        let scores = outputs[0].try_extract_array::<f32>()?;
        Ok(ClassificationScores::new(scores.iter().copied().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_fails_construction() {
        let result = OnnxIdentityClassifier::new(Path::new("/nonexistent/classifier.onnx"));
        assert!(result.is_err());
    }
}
