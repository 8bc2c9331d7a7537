use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::access::access_decision::AccessDecision;
use crate::access::access_decision_engine::AccessDecisionEngine;
use crate::detection::domain::face_detector::FaceDetector;
use crate::door::domain::door_command::{AckOutcome, DoorCommand};
use crate::door::door_actuator::DoorActuator;
use crate::overlay::annotator::FrameAnnotator;
use crate::shared::frame::Frame;
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::frame_source::{CaptureError, FrameSource};

use super::pipeline_logger::PipelineLogger;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("{stage} failed: {message}")]
    Processing { stage: &'static str, message: String },
}

impl PipelineError {
    fn processing(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Processing {
            stage,
            message: err.to_string(),
        }
    }
}

/// Result of one capture → decide → (actuate) pass.
#[derive(Debug)]
pub struct IterationOutcome {
    /// Annotated frame ready for encoding.
    pub frame: Frame,
    pub decision: AccessDecision,
    /// Set only when an unlock was attempted and the actuator answered.
    pub ack: Option<AckOutcome>,
}

/// Drives one frame through capture, detection, decision, annotation and,
/// for an authorized face with an actuator wired, the door unlock.
///
/// Iterations are strictly sequential: the next capture starts only after
/// the previous decision and actuation have finished.
pub struct FramePipeline {
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    engine: AccessDecisionEngine,
    annotator: FrameAnnotator,
    encoder: Box<dyn FrameEncoder>,
    actuator: Option<Arc<DoorActuator>>,
    logger: Box<dyn PipelineLogger>,
}

impl FramePipeline {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        engine: AccessDecisionEngine,
        encoder: Box<dyn FrameEncoder>,
        actuator: Option<Arc<DoorActuator>>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            detector,
            engine,
            annotator: FrameAnnotator::default(),
            encoder,
            actuator,
            logger,
        }
    }

    pub fn run_iteration(&mut self) -> Result<IterationOutcome, PipelineError> {
        let t0 = Instant::now();
        let mut frame = self.source.next_frame()?;
        self.logger.timing("capture", elapsed_ms(t0));

        let t0 = Instant::now();
        let detections = self
            .detector
            .detect(&frame)
            .map_err(|e| PipelineError::processing("detect", e))?;
        self.logger.timing("detect", elapsed_ms(t0));
        self.logger.metric("faces", detections.len() as f64);

        let t0 = Instant::now();
        let outcome = self
            .engine
            .decide(&detections)
            .map_err(|e| PipelineError::processing("decide", e))?;
        self.logger.timing("decide", elapsed_ms(t0));
        self.logger.decision(outcome.decision.kind());

        let t0 = Instant::now();
        self.annotator.annotate(&mut frame, &outcome);
        self.logger.timing("annotate", elapsed_ms(t0));

        let ack = match (&outcome.decision, &self.actuator) {
            (AccessDecision::Authorized(label), Some(actuator)) => {
                self.logger
                    .info(&format!("Frame {}: {label} authorized, opening door", frame.index()));
                let t0 = Instant::now();
                let result = actuator.actuate(DoorCommand::Open);
                self.logger.timing("actuate", elapsed_ms(t0));
                match result {
                    Ok(AckOutcome::TimedOut) => {
                        log::warn!("Door did not acknowledge open for {label}");
                        Some(AckOutcome::TimedOut)
                    }
                    Ok(ack) => Some(ack),
                    Err(e) => {
                        log::error!("Door actuation failed: {e}");
                        None
                    }
                }
            }
            _ => None,
        };

        self.logger.frame_completed(frame.index());
        Ok(IterationOutcome {
            frame,
            decision: outcome.decision,
            ack,
        })
    }

    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>, PipelineError> {
        self.encoder
            .encode(frame)
            .map_err(|e| PipelineError::processing("encode", e))
    }

    pub fn content_type(&self) -> &'static str {
        self.encoder.content_type()
    }

    pub fn has_actuator(&self) -> bool {
        self.actuator.is_some()
    }

    /// Closes out the current viewer session in the logger.
    pub fn end_session(&mut self) {
        self.logger.end_session();
    }

    pub(crate) fn source_mut(&mut self) -> &mut dyn FrameSource {
        self.source.as_mut()
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
