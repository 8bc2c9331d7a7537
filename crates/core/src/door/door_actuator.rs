use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::shared::constants::ACK_TOKEN;

use super::domain::door_command::{AckOutcome, DoorCommand};
use super::domain::serial_channel::SerialChannel;

pub const DEFAULT_ACK_DEADLINE: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

const IDLE: u8 = 0;
const COMMAND_SENT: u8 = 1;

#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("a door command is already in flight")]
    Busy,
    #[error("serial channel is closed")]
    Closed,
    #[error("serial I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug)]
pub struct AckTiming {
    pub deadline: Duration,
    pub poll_interval: Duration,
}

impl Default for AckTiming {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_ACK_DEADLINE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Drives the open/close protocol over a serial link.
///
/// Each command is written once and then acknowledged by the firmware with
/// the 4-byte token `OK!\n`, or times out. Only one command may be in flight;
/// a concurrent call fails with `Busy` instead of waiting.
pub struct DoorActuator {
    channel: Mutex<Option<Box<dyn SerialChannel>>>,
    state: AtomicU8,
    timing: AckTiming,
}

/// Returns the actuator to idle however `actuate` exits.
struct InFlight<'a>(&'a AtomicU8);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

impl DoorActuator {
    pub fn new(channel: Box<dyn SerialChannel>, timing: AckTiming) -> Self {
        Self {
            channel: Mutex::new(Some(channel)),
            state: AtomicU8::new(IDLE),
            timing,
        }
    }

    pub fn actuate(&self, command: DoorCommand) -> Result<AckOutcome, ActuatorError> {
        self.state
            .compare_exchange(IDLE, COMMAND_SENT, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ActuatorError::Busy)?;
        let _in_flight = InFlight(&self.state);

        let mut guard = self.channel.lock().unwrap_or_else(|e| e.into_inner());
        let channel = guard.as_mut().ok_or(ActuatorError::Closed)?;

        // A late ack from a timed-out command must not answer this one.
        channel.discard_input()?;
        log::debug!("Sending door command: {command}");
        channel.write_all(command.wire_bytes())?;

        let outcome = self.await_ack(channel.as_mut())?;
        match outcome {
            AckOutcome::Acknowledged => log::info!("Door command {command} acknowledged"),
            AckOutcome::TimedOut => log::debug!(
                "No acknowledgment for {command} within {:?}",
                self.timing.deadline
            ),
        }
        Ok(outcome)
    }

    fn await_ack(&self, channel: &mut dyn SerialChannel) -> Result<AckOutcome, ActuatorError> {
        let deadline = Instant::now() + self.timing.deadline;
        let mut frame = [0u8; ACK_TOKEN.len()];
        let mut filled = 0;

        loop {
            let received = match channel.read(&mut frame[filled..]) {
                Ok(n) => n,
                Err(e) if is_read_timeout(&e) => 0,
                Err(e) => return Err(ActuatorError::Io(e)),
            };
            filled += received;

            if filled == frame.len() {
                if &frame == ACK_TOKEN {
                    return Ok(AckOutcome::Acknowledged);
                }
                log::debug!(
                    "Discarding unexpected reply {:?}",
                    String::from_utf8_lossy(&frame)
                );
                filled = 0;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(AckOutcome::TimedOut);
            }
            if received == 0 {
                std::thread::sleep(self.timing.poll_interval.min(remaining));
            }
        }
    }

    /// Releases the serial channel. Later commands fail with `Closed`.
    pub fn close(&self) {
        let mut guard = self.channel.lock().unwrap_or_else(|e| e.into_inner());
        if guard.take().is_some() {
            log::info!("Serial channel closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.channel
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

fn is_read_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSerialChannel;
    use std::sync::Arc;

    fn fast_timing() -> AckTiming {
        AckTiming {
            deadline: Duration::from_millis(150),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_acknowledged_when_token_arrives() {
        let channel = FakeSerialChannel::new();
        channel.queue_reply(b"OK!\n");
        let actuator = DoorActuator::new(Box::new(channel.clone()), fast_timing());

        assert_eq!(
            actuator.actuate(DoorCommand::Open).unwrap(),
            AckOutcome::Acknowledged
        );
        assert_eq!(channel.written(), b"open\n");
    }

    #[test]
    fn test_token_split_across_reads_is_reassembled() {
        let channel = FakeSerialChannel::new().with_max_read(1);
        channel.queue_reply(b"OK!\n");
        let actuator = DoorActuator::new(Box::new(channel), fast_timing());
        assert_eq!(
            actuator.actuate(DoorCommand::Close).unwrap(),
            AckOutcome::Acknowledged
        );
    }

    #[test]
    fn test_silence_times_out_near_deadline() {
        let channel = FakeSerialChannel::new();
        let actuator = DoorActuator::new(Box::new(channel.clone()), fast_timing());

        let started = Instant::now();
        let outcome = actuator.actuate(DoorCommand::Open).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome, AckOutcome::TimedOut);
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_millis(1000));
        assert_eq!(channel.written(), b"open\n");
    }

    #[test]
    fn test_wrong_token_is_not_an_ack() {
        let channel = FakeSerialChannel::new();
        channel.queue_reply(b"ERR\n");
        let actuator = DoorActuator::new(Box::new(channel), fast_timing());
        assert_eq!(
            actuator.actuate(DoorCommand::Open).unwrap(),
            AckOutcome::TimedOut
        );
    }

    #[test]
    fn test_ack_after_discarded_frame_is_accepted() {
        let channel = FakeSerialChannel::new();
        channel.queue_reply(b"ERR\nOK!\n");
        let actuator = DoorActuator::new(Box::new(channel), fast_timing());
        assert_eq!(
            actuator.actuate(DoorCommand::Open).unwrap(),
            AckOutcome::Acknowledged
        );
    }

    #[test]
    fn test_returns_to_idle_and_repeats_full_protocol() {
        let channel = FakeSerialChannel::new();
        let actuator = DoorActuator::new(Box::new(channel.clone()), fast_timing());

        assert_eq!(
            actuator.actuate(DoorCommand::Close).unwrap(),
            AckOutcome::TimedOut
        );
        channel.queue_reply(b"OK!\n");
        assert_eq!(
            actuator.actuate(DoorCommand::Close).unwrap(),
            AckOutcome::Acknowledged
        );
        assert_eq!(channel.written(), b"close\nclose\n");
    }

    #[test]
    fn test_late_ack_from_timed_out_command_is_discarded() {
        let channel = FakeSerialChannel::new();
        let actuator = DoorActuator::new(Box::new(channel.clone()), fast_timing());

        assert_eq!(
            actuator.actuate(DoorCommand::Open).unwrap(),
            AckOutcome::TimedOut
        );
        channel.inject_unread(b"OK!\n");
        assert_eq!(
            actuator.actuate(DoorCommand::Close).unwrap(),
            AckOutcome::TimedOut
        );
        assert_eq!(channel.written(), b"open\nclose\n");
    }

    #[test]
    fn test_write_failure_is_io_error_and_state_recovers() {
        let channel = FakeSerialChannel::new();
        channel.fail_next_write();
        let actuator = DoorActuator::new(Box::new(channel.clone()), fast_timing());

        assert!(matches!(
            actuator.actuate(DoorCommand::Open),
            Err(ActuatorError::Io(_))
        ));
        channel.queue_reply(b"OK!\n");
        assert_eq!(
            actuator.actuate(DoorCommand::Open).unwrap(),
            AckOutcome::Acknowledged
        );
    }

    #[test]
    fn test_concurrent_command_is_rejected_as_busy() {
        let channel = FakeSerialChannel::new();
        let actuator = Arc::new(DoorActuator::new(
            Box::new(channel.clone()),
            AckTiming {
                deadline: Duration::from_millis(400),
                poll_interval: Duration::from_millis(5),
            },
        ));

        let background = {
            let actuator = Arc::clone(&actuator);
            std::thread::spawn(move || actuator.actuate(DoorCommand::Open))
        };
        while channel.written().is_empty() {
            std::thread::sleep(Duration::from_millis(1));
        }

        assert!(matches!(
            actuator.actuate(DoorCommand::Close),
            Err(ActuatorError::Busy)
        ));
        assert_eq!(
            background.join().unwrap().unwrap(),
            AckOutcome::TimedOut
        );
        assert_eq!(channel.written(), b"open\n");
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_commands() {
        let actuator = DoorActuator::new(Box::new(FakeSerialChannel::new()), fast_timing());
        assert!(actuator.is_open());
        actuator.close();
        actuator.close();
        assert!(!actuator.is_open());
        assert!(matches!(
            actuator.actuate(DoorCommand::Open),
            Err(ActuatorError::Closed)
        ));
    }
}
