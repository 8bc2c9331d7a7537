use std::path::Path;

use crate::config::{CameraConfig, ControllerConfig, ServerMode};
use crate::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use crate::door::door_actuator::DoorActuator;
use crate::door::infrastructure::serialport_channel::SerialPortChannel;
use crate::identity::infrastructure::onnx_identity_classifier::OnnxIdentityClassifier;
use crate::video::domain::frame_source::FrameSource;
use crate::video::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
use crate::video::infrastructure::{still_image_frame_source, synthetic_frame_source};

use super::door_controller::{Components, StartupError};

/// Construct every production component from configuration.
///
/// Nothing is opened here except the models and, in secured mode, the
/// serial port. Any failure aborts startup as a whole.
pub fn build_components(config: &ControllerConfig) -> Result<Components, StartupError> {
    config.validate()?;
    let labels = config.labels()?;
    let source = create_frame_source(&config.camera)?;

    let detector = OnnxFaceDetector::new(
        &config.models.detector_path,
        &config.models.embedder_path,
        config.models.detection_confidence,
    )
    .map_err(|e| model_error("face detection", &config.models.detector_path, e))?;
    log::info!(
        "Loaded face detection models {} and {}",
        config.models.detector_path.display(),
        config.models.embedder_path.display()
    );

    let classifier = OnnxIdentityClassifier::new(&config.models.classifier_path)
        .map_err(|e| model_error("identity classifier", &config.models.classifier_path, e))?;
    log::info!(
        "Loaded identity classifier {}",
        config.models.classifier_path.display()
    );

    let actuator = match config.server.mode {
        ServerMode::Secured => {
            let serial = &config.serial;
            let channel =
                SerialPortChannel::open(&serial.path, serial.baud_rate, serial.read_timeout())
                    .map_err(|e| StartupError::Serial {
                        path: serial.path.clone(),
                        message: e.to_string(),
                    })?;
            Some(DoorActuator::new(Box::new(channel), serial.ack_timing()))
        }
        ServerMode::Monitor => {
            log::info!("Monitor mode: serial port {} left closed", config.serial.path);
            None
        }
    };

    Ok(Components {
        source,
        detector: Box::new(detector),
        classifier: Box::new(classifier),
        labels,
        encoder: Box::new(JpegFrameEncoder::new(config.server.jpeg_quality)),
        actuator,
    })
}

/// Select a frame source from the camera identifier.
///
/// `stub://` and `file://` are always available; device paths need the
/// `v4l2` feature.
pub fn create_frame_source(camera: &CameraConfig) -> Result<Box<dyn FrameSource>, StartupError> {
    let device = camera.device.as_str();
    if device.starts_with(synthetic_frame_source::URI_SCHEME) {
        return Ok(Box::new(synthetic_frame_source::SyntheticFrameSource::new(
            device,
            camera.width,
            camera.height,
        )));
    }
    if let Some(path) = device.strip_prefix(still_image_frame_source::URI_SCHEME) {
        return Ok(Box::new(still_image_frame_source::StillImageFrameSource::new(
            device,
            Path::new(path),
            camera.width,
            camera.height,
        )));
    }
    create_device_source(camera)
}

#[cfg(feature = "v4l2")]
fn create_device_source(camera: &CameraConfig) -> Result<Box<dyn FrameSource>, StartupError> {
    use crate::video::infrastructure::v4l2_frame_source::V4l2FrameSource;

    Ok(Box::new(V4l2FrameSource::new(
        &camera.device,
        camera.width,
        camera.height,
    )))
}

#[cfg(not(feature = "v4l2"))]
fn create_device_source(camera: &CameraConfig) -> Result<Box<dyn FrameSource>, StartupError> {
    Err(StartupError::UnsupportedCamera {
        device: camera.device.clone(),
        reason: "built without the `v4l2` feature".into(),
    })
}

fn model_error(role: &'static str, path: &Path, err: Box<dyn std::error::Error>) -> StartupError {
    StartupError::Model {
        role,
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
