//! Scripted collaborators shared by unit tests across the crate.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::detection::domain::face_detector::{Detection, FaceDetector};
use crate::door::domain::serial_channel::SerialChannel;
use crate::door::door_actuator::AckTiming;
use crate::identity::domain::identity_classifier::{ClassificationScores, IdentityClassifier};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::video::domain::frame_encoder::{EncodeError, FrameEncoder};
use crate::video::domain::frame_source::{CaptureError, FrameSource};

pub const TEST_FRAME_WIDTH: u32 = 160;
pub const TEST_FRAME_HEIGHT: u32 = 120;

pub fn fast_ack_timing() -> AckTiming {
    AckTiming {
        deadline: Duration::from_millis(60),
        poll_interval: Duration::from_millis(5),
    }
}

/// A 40x40 face at `(x, y)` with a dummy embedding.
pub fn detection_at(x: i32, y: i32) -> Detection {
    Detection {
        bbox: BoundingBox::new(x, y, 40, 40),
        confidence: 0.99,
        embedding: vec![0.5; 8],
    }
}

/// Yields `frames` grey frames, then fails with `NoFrame`.
pub struct ScriptedFrameSource {
    remaining: usize,
    next_index: u64,
    open: bool,
    pulls: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl ScriptedFrameSource {
    pub fn new(frames: usize) -> Self {
        Self {
            remaining: frames,
            next_index: 0,
            open: false,
            pulls: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn opened(frames: usize) -> Self {
        let mut source = Self::new(frames);
        source.open = true;
        source
    }

    /// Counter of `next_frame` calls, readable after the source is boxed.
    pub fn pull_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pulls)
    }

    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

impl FrameSource for ScriptedFrameSource {
    fn device(&self) -> &str {
        "scripted"
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        self.open = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        if !self.open {
            return Err(CaptureError::NotOpen {
                device: "scripted".into(),
            });
        }
        if self.remaining == 0 {
            return Err(CaptureError::NoFrame {
                device: "scripted".into(),
                message: "script exhausted".into(),
            });
        }
        self.remaining -= 1;
        let size = (TEST_FRAME_WIDTH * TEST_FRAME_HEIGHT * 3) as usize;
        let frame = Frame::new(
            vec![90; size],
            TEST_FRAME_WIDTH,
            TEST_FRAME_HEIGHT,
            self.next_index,
        );
        self.next_index += 1;
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Returns one scripted detection list per call; empty once exhausted.
pub struct ScriptedDetector {
    script: VecDeque<Vec<Detection>>,
    calls: usize,
    fail_on_call: Option<usize>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
            fail_on_call: None,
        }
    }

    /// Errors on the `call`-th invocation (zero-based) and every one after.
    pub fn failing_from(script: Vec<Vec<Detection>>, call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new(script)
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on_call.is_some_and(|n| call >= n) {
            return Err("inference backend lost".into());
        }
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

/// Encoder that rejects every frame.
pub struct FailingEncoder;

impl FrameEncoder for FailingEncoder {
    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        Err(EncodeError::InvalidBuffer {
            width: frame.width(),
            height: frame.height(),
        })
    }
}

/// Classifier returning fixed scores (or a fixed error) and counting calls.
#[derive(Clone)]
pub struct FixedClassifier {
    result: Result<Vec<f32>, String>,
    calls: Arc<AtomicUsize>,
}

impl FixedClassifier {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            result: Ok(scores),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityClassifier for FixedClassifier {
    fn classify(
        &mut self,
        _embedding: &[f32],
    ) -> Result<ClassificationScores, Box<dyn std::error::Error>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(scores) => Ok(ClassificationScores::new(scores.clone())),
            Err(message) => Err(message.clone().into()),
        }
    }
}

#[derive(Default)]
struct SerialState {
    written: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
    fail_next_write: bool,
}

/// In-memory serial link. Each queued reply is delivered after the next
/// successful write; nothing unread reads as a timeout, the way a real port
/// with a read timeout behaves.
#[derive(Clone)]
pub struct FakeSerialChannel {
    state: Arc<Mutex<SerialState>>,
    max_read: usize,
}

impl FakeSerialChannel {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SerialState::default())),
            max_read: usize::MAX,
        }
    }

    /// Caps how many bytes a single `read` may return.
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = max_read.max(1);
        self
    }

    /// Reply the firmware sends after the next command it receives.
    pub fn queue_reply(&self, bytes: &[u8]) {
        self.state.lock().unwrap().replies.push_back(bytes.to_vec());
    }

    /// Bytes already waiting in the input buffer.
    pub fn inject_unread(&self, bytes: &[u8]) {
        self.state.lock().unwrap().pending.extend(bytes);
    }

    pub fn fail_next_write(&self) {
        self.state.lock().unwrap().fail_next_write = true;
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }
}

impl SerialChannel for FakeSerialChannel {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next_write) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "port unplugged"));
        }
        state.written.extend_from_slice(bytes);
        if let Some(reply) = state.replies.pop_front() {
            state.pending.extend(reply);
        }
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().pending.clear();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        }
        let n = buf.len().min(self.max_read).min(state.pending.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.pending.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}
