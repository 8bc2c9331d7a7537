use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use thiserror::Error;

use crate::access::access_decision_engine::AccessDecisionEngine;
use crate::config::ConfigError;
use crate::detection::domain::face_detector::FaceDetector;
use crate::door::domain::door_command::{AckOutcome, DoorCommand};
use crate::door::door_actuator::{ActuatorError, DoorActuator};
use crate::identity::domain::identity_classifier::IdentityClassifier;
use crate::identity::domain::identity_labels::IdentityLabels;
use crate::pipeline::frame_pipeline::FramePipeline;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::streaming::frame_streamer::StreamMode;
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::frame_source::{CaptureError, FrameSource};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("camera {device} is not supported by this build: {reason}")]
    UnsupportedCamera { device: String, reason: String },
    #[error(transparent)]
    Camera(#[from] CaptureError),
    #[error("failed to load {role} model {path}: {message}")]
    Model {
        role: &'static str,
        path: String,
        message: String,
    },
    #[error("failed to open serial port {path}: {message}")]
    Serial { path: String, message: String },
    #[error("secured mode requires a door actuator")]
    MissingActuator,
    #[error("failed to reset door to closed: {0}")]
    DoorReset(#[from] ActuatorError),
}

/// Everything the controller needs, built but not yet started.
pub struct Components {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn FaceDetector>,
    pub classifier: Box<dyn IdentityClassifier>,
    pub labels: IdentityLabels,
    pub encoder: Box<dyn FrameEncoder>,
    /// Absent in monitor mode, where the serial port is never opened.
    pub actuator: Option<DoorActuator>,
}

/// Owns the camera, the models and the door link for the process lifetime.
///
/// Dereferences to the frame pipeline so a viewer session can drive it.
/// Hardware handles are released by `shutdown`, or on drop.
pub struct DoorController {
    pipeline: FramePipeline,
    actuator: Option<Arc<DoorActuator>>,
    mode: StreamMode,
    shut_down: bool,
}

impl DoorController {
    /// Opens the camera and, in secured mode, drives the door to closed.
    ///
    /// A missing acknowledgment for that first `close` is only logged; a
    /// serial I/O failure aborts startup.
    pub fn start(
        components: Components,
        mode: StreamMode,
        logger: Box<dyn PipelineLogger>,
    ) -> Result<Self, StartupError> {
        let Components {
            mut source,
            detector,
            classifier,
            labels,
            encoder,
            actuator,
        } = components;

        let actuator = match mode {
            StreamMode::SecuredSession => {
                Some(Arc::new(actuator.ok_or(StartupError::MissingActuator)?))
            }
            StreamMode::ContinuousMonitor => {
                if let Some(unused) = actuator {
                    unused.close();
                }
                None
            }
        };

        source.open()?;

        if let Some(actuator) = &actuator {
            match actuator.actuate(DoorCommand::Close) {
                Ok(AckOutcome::Acknowledged) => log::info!("Door reset to closed"),
                Ok(AckOutcome::TimedOut) => {
                    log::warn!("Door did not acknowledge initial close; continuing")
                }
                Err(e) => {
                    source.release();
                    actuator.close();
                    return Err(e.into());
                }
            }
        }

        let pipeline = FramePipeline::new(
            source,
            detector,
            AccessDecisionEngine::new(classifier, labels),
            encoder,
            actuator.clone(),
            logger,
        );
        log::info!("Door controller started in {mode:?} mode");

        Ok(Self {
            pipeline,
            actuator,
            mode,
            shut_down: false,
        })
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Releases the camera, then the serial link. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let source = self.pipeline.source_mut();
        if source.is_open() {
            source.release();
        }
        if let Some(actuator) = &self.actuator {
            if actuator.is_open() {
                actuator.close();
            }
        }
        log::info!("Door controller shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Deref for DoorController {
    type Target = FramePipeline;

    fn deref(&self) -> &FramePipeline {
        &self.pipeline
    }
}

impl DerefMut for DoorController {
    fn deref_mut(&mut self) -> &mut FramePipeline {
        &mut self.pipeline
    }
}

impl Drop for DoorController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::test_support::{
        fast_ack_timing, FakeSerialChannel, FixedClassifier, ScriptedDetector,
        ScriptedFrameSource,
    };
    use crate::video::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
    use std::sync::atomic::Ordering;

    fn components(source: ScriptedFrameSource, channel: Option<&FakeSerialChannel>) -> Components {
        Components {
            source: Box::new(source),
            detector: Box::new(ScriptedDetector::new(vec![])),
            classifier: Box::new(FixedClassifier::new(vec![0.0, 0.0, 1.0])),
            labels: IdentityLabels::default(),
            encoder: Box::new(JpegFrameEncoder::default()),
            actuator: channel
                .map(|c| DoorActuator::new(Box::new(c.clone()), fast_ack_timing())),
        }
    }

    #[test]
    fn test_secured_start_sends_close_and_opens_camera() {
        let channel = FakeSerialChannel::new();
        channel.queue_reply(b"OK!\n");
        let source = ScriptedFrameSource::new(3);
        let controller = DoorController::start(
            components(source, Some(&channel)),
            StreamMode::SecuredSession,
            Box::new(NullPipelineLogger),
        )
        .unwrap();

        assert_eq!(channel.written(), b"close\n");
        assert!(controller.has_actuator());
        assert_eq!(controller.mode(), StreamMode::SecuredSession);
    }

    #[test]
    fn test_initial_close_timeout_is_not_fatal() {
        let channel = FakeSerialChannel::new();
        let result = DoorController::start(
            components(ScriptedFrameSource::new(1), Some(&channel)),
            StreamMode::SecuredSession,
            Box::new(NullPipelineLogger),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_initial_close_io_error_is_fatal_and_releases_camera() {
        let channel = FakeSerialChannel::new();
        channel.fail_next_write();
        let source = ScriptedFrameSource::new(1);
        let releases = source.release_counter();

        let result = DoorController::start(
            components(source, Some(&channel)),
            StreamMode::SecuredSession,
            Box::new(NullPipelineLogger),
        );

        assert!(matches!(result, Err(StartupError::DoorReset(_))));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_secured_without_actuator_is_rejected() {
        let result = DoorController::start(
            components(ScriptedFrameSource::new(1), None),
            StreamMode::SecuredSession,
            Box::new(NullPipelineLogger),
        );
        assert!(matches!(result, Err(StartupError::MissingActuator)));
    }

    #[test]
    fn test_monitor_mode_never_touches_serial() {
        let channel = FakeSerialChannel::new();
        let controller = DoorController::start(
            components(ScriptedFrameSource::new(1), Some(&channel)),
            StreamMode::ContinuousMonitor,
            Box::new(NullPipelineLogger),
        )
        .unwrap();
        assert!(channel.written().is_empty());
        assert!(!controller.has_actuator());
    }

    #[test]
    fn test_shutdown_is_idempotent_and_runs_on_drop() {
        let channel = FakeSerialChannel::new();
        channel.queue_reply(b"OK!\n");
        let source = ScriptedFrameSource::new(1);
        let releases = source.release_counter();
        let mut controller = DoorController::start(
            components(source, Some(&channel)),
            StreamMode::SecuredSession,
            Box::new(NullPipelineLogger),
        )
        .unwrap();

        controller.shutdown();
        controller.shutdown();
        assert!(controller.is_shut_down());
        drop(controller);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_capture_works_after_start() {
        let channel = FakeSerialChannel::new();
        channel.queue_reply(b"OK!\n");
        let mut controller = DoorController::start(
            components(ScriptedFrameSource::new(1), Some(&channel)),
            StreamMode::SecuredSession,
            Box::new(NullPipelineLogger),
        )
        .unwrap();
        let outcome = controller.run_iteration().unwrap();
        assert_eq!(outcome.frame.index(), 0);
    }
}
