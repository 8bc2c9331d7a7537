use crate::shared::bounding_box::BoundingBox;

/// Authorization result for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Authorized(String),
    Denied(String),
    /// Zero or several faces in frame; nothing was classified.
    Ambiguous,
}

impl AccessDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    /// Short tag for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authorized(_) => "authorized",
            Self::Denied(_) => "denied",
            Self::Ambiguous => "ambiguous",
        }
    }
}

/// A decision plus what should be burned into the frame for the viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub decision: AccessDecision,
    pub overlay_text: String,
    pub draw_box: Option<BoundingBox>,
}
