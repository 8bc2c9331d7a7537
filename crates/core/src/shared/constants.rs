/// Multipart boundary used by the live stream.
pub const STREAM_BOUNDARY: &str = "frame";

pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Acknowledgment token the actuator firmware writes after every command.
pub const ACK_TOKEN: &[u8; 4] = b"OK!\n";

/// How long the firmware keeps the relay energised after `open`.
pub const DOOR_HOLD_SECS: u64 = 5;

/// Embedding crop margin as a fraction of the embedder input size.
pub const CROP_MARGIN_RATIO: f64 = 0.1;

pub const DEFAULT_LABELS: [&str; 3] = ["Nhi", "Thuy", "Unknown user"];
