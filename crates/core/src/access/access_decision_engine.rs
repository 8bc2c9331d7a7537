use crate::detection::domain::face_detector::Detection;
use crate::identity::domain::identity_classifier::{
    ClassificationScores, ClassifierError, IdentityClassifier,
};
use crate::identity::domain::identity_labels::IdentityLabels;
use crate::shared::constants::DOOR_HOLD_SECS;

use super::access_decision::{AccessDecision, DecisionOutcome};

pub const SINGLE_FACE_PROMPT: &str = "Please point the camera at a single face, then retry.";

/// Scores are compared after rounding to this many decimals.
const SCORE_DECIMALS: i32 = 6;

/// Turns one frame's detections into an authorization outcome.
///
/// A face is authorized only when its enrolled score rounds to exactly 1.0.
/// Label 0 is checked before label 1; anything else is denied as unknown.
pub struct AccessDecisionEngine {
    classifier: Box<dyn IdentityClassifier>,
    labels: IdentityLabels,
}

impl AccessDecisionEngine {
    pub fn new(classifier: Box<dyn IdentityClassifier>, labels: IdentityLabels) -> Self {
        Self { classifier, labels }
    }

    pub fn decide(&mut self, detections: &[Detection]) -> Result<DecisionOutcome, ClassifierError> {
        let [face] = detections else {
            log::debug!("{} faces in frame, skipping classification", detections.len());
            return Ok(DecisionOutcome {
                decision: AccessDecision::Ambiguous,
                overlay_text: SINGLE_FACE_PROMPT.to_string(),
                draw_box: None,
            });
        };

        let scores = self
            .classifier
            .classify(&face.embedding)
            .map_err(ClassifierError::new)?;

        let decision = match matched_identity(&scores, self.labels.enrolled_count()) {
            Some(index) => {
                let label = self.labels.enrolled(index).unwrap_or(self.labels.unknown());
                AccessDecision::Authorized(label.to_string())
            }
            None => AccessDecision::Denied(self.labels.unknown().to_string()),
        };
        let overlay_text = overlay_text(&decision);

        Ok(DecisionOutcome {
            decision,
            overlay_text,
            draw_box: Some(face.bbox),
        })
    }
}

/// First enrolled index whose score is exactly 1.0 at six decimals.
///
/// Missing positions in a short score vector count as no match.
fn matched_identity(scores: &ClassificationScores, enrolled: usize) -> Option<usize> {
    (0..enrolled).find(|&i| scores.get(i).is_some_and(is_certain))
}

fn is_certain(score: f32) -> bool {
    let factor = 10f64.powi(SCORE_DECIMALS);
    (score as f64 * factor).round() / factor == 1.0
}

fn overlay_text(decision: &AccessDecision) -> String {
    match decision {
        AccessDecision::Authorized(label) => {
            format!("You are {label}. The door will open for {DOOR_HOLD_SECS} seconds.")
        }
        AccessDecision::Denied(label) => format!("You are {label}. The door stays closed."),
        AccessDecision::Ambiguous => SINGLE_FACE_PROMPT.to_string(),
    }
}
