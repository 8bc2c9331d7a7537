use thiserror::Error;

/// Per-label scores for one embedding, positionally aligned to `IdentityLabels`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationScores(Vec<f32>);

impl ClassificationScores {
    pub fn new(scores: Vec<f32>) -> Self {
        Self(scores)
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }
}

#[derive(Error, Debug)]
#[error("identity classification failed: {message}")]
pub struct ClassifierError {
    pub message: String,
}

impl ClassifierError {
    pub fn new(source: impl std::fmt::Display) -> Self {
        Self {
            message: source.to_string(),
        }
    }
}

/// Maps one face embedding to scores over the known identities.
pub trait IdentityClassifier: Send {
    fn classify(
        &mut self,
        embedding: &[f32],
    ) -> Result<ClassificationScores, Box<dyn std::error::Error>>;
}
