use std::io;

/// Byte link to the actuator firmware.
///
/// `read` blocks for at most the channel's per-read timeout. A timeout is
/// reported as `io::ErrorKind::TimedOut` (or `WouldBlock`) or as `Ok(0)`.
pub trait SerialChannel: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Drops whatever the firmware sent that has not been read yet.
    fn discard_input(&mut self) -> io::Result<()>;
}
