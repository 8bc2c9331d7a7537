use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::door::door_actuator::AckTiming;
use crate::identity::domain::identity_labels::{IdentityLabels, LabelCountError};
use crate::shared::constants::DEFAULT_LABELS;
use crate::streaming::frame_streamer::StreamMode;

pub const ENV_PREFIX: &str = "FACEDOOR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Labels(#[from] LabelCountError),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device path, `stub://<name>` or `file://<image path>`.
    pub device: String,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".into(),
            width: 800,
            height: 800,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub path: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub ack_deadline_ms: u64,
    pub ack_poll_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB0".into(),
            baud_rate: 9600,
            read_timeout_ms: 1000,
            ack_deadline_ms: 3000,
            ack_poll_interval_ms: 20,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn ack_timing(&self) -> AckTiming {
        AckTiming {
            deadline: Duration::from_millis(self.ack_deadline_ms),
            poll_interval: Duration::from_millis(self.ack_poll_interval_ms),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub detector_path: PathBuf,
    pub embedder_path: PathBuf,
    pub classifier_path: PathBuf,
    pub detection_confidence: f64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            detector_path: "models/face_detector.onnx".into(),
            embedder_path: "models/face_embedder.onnx".into(),
            classifier_path: "models/identity_classifier.onnx".into(),
            detection_confidence: 0.95,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Two enrolled names followed by the unknown label.
    pub labels: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Unlock on the first authorized face and end the viewer session.
    #[default]
    Secured,
    /// Annotate continuously without touching the door.
    Monitor,
}

impl ServerMode {
    pub fn stream_mode(self) -> StreamMode {
        match self {
            Self::Secured => StreamMode::SecuredSession,
            Self::Monitor => StreamMode::ContinuousMonitor,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub mode: ServerMode,
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".into(),
            mode: ServerMode::default(),
            jpeg_quality: 95,
        }
    }
}

/// Process-wide settings, layered as defaults < config file < environment.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub camera: CameraConfig,
    pub serial: SerialConfig,
    pub models: ModelsConfig,
    pub identity: IdentityConfig,
    pub server: ServerConfig,
}

impl ControllerConfig {
    /// Load from an optional file plus `FACEDOOR_*` environment variables,
    /// e.g. `FACEDOOR_SERIAL__BAUD_RATE=115200`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("identity.labels")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        IdentityLabels::new(&self.identity.labels)?;
        if self.camera.device.trim().is_empty() {
            return Err(invalid("camera.device must not be empty"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(invalid("camera.width and camera.height must be non-zero"));
        }
        if self.serial.baud_rate == 0 {
            return Err(invalid("serial.baud_rate must be non-zero"));
        }
        if self.serial.ack_deadline_ms == 0 {
            return Err(invalid("serial.ack_deadline_ms must be non-zero"));
        }
        if self.serial.ack_poll_interval_ms == 0 {
            return Err(invalid("serial.ack_poll_interval_ms must be non-zero"));
        }
        if !(1..=100).contains(&self.server.jpeg_quality) {
            return Err(invalid("server.jpeg_quality must be within 1..=100"));
        }
        if !(0.0..=1.0).contains(&self.models.detection_confidence) {
            return Err(invalid("models.detection_confidence must be within 0..=1"));
        }
        Ok(())
    }

    pub fn labels(&self) -> Result<IdentityLabels, ConfigError> {
        Ok(IdentityLabels::new(&self.identity.labels)?)
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
