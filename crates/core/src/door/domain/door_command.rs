/// Command sent to the door actuator firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorCommand {
    Open,
    Close,
}

impl DoorCommand {
    /// Newline-terminated wire form.
    pub fn wire_bytes(self) -> &'static [u8] {
        match self {
            Self::Open => b"open\n",
            Self::Close => b"close\n",
        }
    }
}

impl std::fmt::Display for DoorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// How a command round trip ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckOutcome {
    Acknowledged,
    TimedOut,
}
