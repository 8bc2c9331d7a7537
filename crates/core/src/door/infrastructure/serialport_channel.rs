use std::io::{self, Read, Write};
use std::time::Duration;

use crate::door::domain::serial_channel::SerialChannel;

/// `SerialChannel` over a host serial port (e.g. a USB ZigBee dongle).
pub struct SerialPortChannel {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialPortChannel {
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> serialport::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()?;
        log::info!("Serial port {path} opened at {baud_rate} baud");
        Ok(Self { port })
    }
}

impl SerialChannel for SerialPortChannel {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_port_fails_to_open() {
        let result =
            SerialPortChannel::open("/dev/ttyDOES-NOT-EXIST", 9600, Duration::from_millis(10));
        assert!(result.is_err());
    }
}
