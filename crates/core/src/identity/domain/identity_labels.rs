use thiserror::Error;

use crate::shared::constants::DEFAULT_LABELS;

/// Enrolled identities plus the trailing unknown label.
pub const LABEL_COUNT: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("expected exactly 3 identity labels (two enrolled, one unknown), got {0}")]
pub struct LabelCountError(pub usize);

/// Fixed positional label list: indices 0 and 1 are enrolled, 2 is unknown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityLabels {
    labels: [String; LABEL_COUNT],
}

impl IdentityLabels {
    pub fn new(labels: &[String]) -> Result<Self, LabelCountError> {
        match labels {
            [a, b, unknown] => Ok(Self {
                labels: [a.clone(), b.clone(), unknown.clone()],
            }),
            _ => Err(LabelCountError(labels.len())),
        }
    }

    pub fn enrolled(&self, index: usize) -> Option<&str> {
        self.labels[..LABEL_COUNT - 1].get(index).map(String::as_str)
    }

    pub fn unknown(&self) -> &str {
        &self.labels[LABEL_COUNT - 1]
    }

    pub fn enrolled_count(&self) -> usize {
        LABEL_COUNT - 1
    }
}

impl Default for IdentityLabels {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.map(String::from),
        }
    }
}
