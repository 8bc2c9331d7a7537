use std::ops::DerefMut;

use crate::access::access_decision::AccessDecision;
use crate::pipeline::frame_pipeline::{FramePipeline, PipelineError};

use super::multipart::multipart_part;

/// How long a viewer's stream lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    /// Ends right after the first frame that unlocked the door.
    SecuredSession,
    /// Runs until capture or processing fails; never actuates.
    ContinuousMonitor,
}

/// One encoded frame as delivered to the viewer.
#[derive(Clone, Debug)]
pub struct StreamedFrame {
    pub index: u64,
    pub content_type: &'static str,
    pub jpeg: Vec<u8>,
    pub decision: AccessDecision,
}

impl StreamedFrame {
    pub fn to_multipart_part(&self) -> Vec<u8> {
        multipart_part(self.content_type, &self.jpeg)
    }
}

/// Pull-driven sequence of encoded frames for one viewer.
///
/// Each `next` runs exactly one pipeline iteration, so production never
/// gets ahead of the consumer. Any failure is logged and ends the sequence;
/// nothing about it reaches the viewer. The logger's session is
/// closed once, when the sequence ends or the streamer is dropped.
pub struct FrameStreamer<P: DerefMut<Target = FramePipeline>> {
    pipeline: P,
    mode: StreamMode,
    finished: bool,
    session_closed: bool,
}

impl<P: DerefMut<Target = FramePipeline>> FrameStreamer<P> {
    pub fn new(pipeline: P, mode: StreamMode) -> Self {
        Self {
            pipeline,
            mode,
            finished: false,
            session_closed: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        if !self.session_closed {
            self.session_closed = true;
            self.pipeline.end_session();
        }
    }

    fn produce(&mut self) -> Result<StreamedFrame, PipelineError> {
        let outcome = self.pipeline.run_iteration()?;
        let jpeg = self.pipeline.encode(&outcome.frame)?;
        Ok(StreamedFrame {
            index: outcome.frame.index(),
            content_type: self.pipeline.content_type(),
            jpeg,
            decision: outcome.decision,
        })
    }
}

impl<P: DerefMut<Target = FramePipeline>> Iterator for FrameStreamer<P> {
    type Item = StreamedFrame;

    fn next(&mut self) -> Option<StreamedFrame> {
        if self.finished {
            return None;
        }
        match self.produce() {
            Ok(frame) => {
                if self.mode == StreamMode::SecuredSession && frame.decision.is_authorized() {
                    log::info!("Door unlocked on frame {}, ending session", frame.index);
                    self.finish();
                }
                Some(frame)
            }
            Err(e) => {
                log::error!("Stream stopped: {e}");
                self.finish();
                None
            }
        }
    }
}

impl<P: DerefMut<Target = FramePipeline>> Drop for FrameStreamer<P> {
    fn drop(&mut self) {
        if !self.finished {
            log::info!("Viewer disconnected");
        }
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::access_decision_engine::AccessDecisionEngine;
    use crate::detection::domain::face_detector::Detection;
    use crate::door::door_actuator::DoorActuator;
    use crate::identity::domain::identity_labels::IdentityLabels;
    use crate::pipeline::pipeline_logger::PipelineLogger;
    use crate::test_support::{
        detection_at, fast_ack_timing, FailingEncoder, FakeSerialChannel, FixedClassifier,
        ScriptedDetector, ScriptedFrameSource,
    };
    use crate::video::domain::frame_encoder::FrameEncoder;
    use crate::video::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingLogger(Arc<AtomicUsize>);

    impl PipelineLogger for CountingLogger {
        fn frame_completed(&mut self, _index: u64) {}
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn decision(&mut self, _kind: &str) {}
        fn info(&mut self, _message: &str) {}
        fn end_session(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        pipeline: FramePipeline,
        pulls: Arc<AtomicUsize>,
        sessions_closed: Arc<AtomicUsize>,
        channel: FakeSerialChannel,
    }

    /// `script` lists detections per frame; scores decide every single face.
    fn fixture(
        frames: usize,
        script: Vec<Vec<Detection>>,
        scores: Vec<f32>,
        actuated: bool,
    ) -> Fixture {
        fixture_with(
            frames,
            ScriptedDetector::new(script),
            Box::new(JpegFrameEncoder::default()),
            scores,
            actuated,
        )
    }

    fn fixture_with(
        frames: usize,
        detector: ScriptedDetector,
        encoder: Box<dyn FrameEncoder>,
        scores: Vec<f32>,
        actuated: bool,
    ) -> Fixture {
        let source = ScriptedFrameSource::opened(frames);
        let pulls = source.pull_counter();
        let sessions_closed = Arc::new(AtomicUsize::new(0));
        let channel = FakeSerialChannel::new();
        channel.queue_reply(b"OK!\n");
        let actuator = actuated.then(|| {
            Arc::new(DoorActuator::new(Box::new(channel.clone()), fast_ack_timing()))
        });
        let pipeline = FramePipeline::new(
            Box::new(source),
            Box::new(detector),
            AccessDecisionEngine::new(
                Box::new(FixedClassifier::new(scores)),
                IdentityLabels::default(),
            ),
            encoder,
            actuator,
            Box::new(CountingLogger(Arc::clone(&sessions_closed))),
        );
        Fixture {
            pipeline,
            pulls,
            sessions_closed,
            channel,
        }
    }

    #[test]
    fn test_secured_session_stops_after_first_authorized_frame() {
        let face = detection_at(20, 20);
        let script = vec![vec![], vec![], vec![], vec![face.clone()], vec![face]];
        let mut f = fixture(10, script, vec![1.0, 0.0, 0.0], true);

        let frames: Vec<_> =
            FrameStreamer::new(&mut f.pipeline, StreamMode::SecuredSession).collect();

        assert_eq!(frames.len(), 4);
        assert_eq!(
            frames.iter().map(|fr| fr.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(frames[..3].iter().all(|fr| fr.decision == AccessDecision::Ambiguous));
        assert!(frames[3].decision.is_authorized());
        assert_eq!(f.pulls.load(Ordering::SeqCst), 4);
        assert_eq!(f.channel.written(), b"open\n");
        assert_eq!(f.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_monitor_runs_until_capture_failure() {
        let script = vec![vec![detection_at(20, 20)]; 5];
        let mut f = fixture(5, script, vec![1.0, 0.0, 0.0], false);

        let frames: Vec<_> =
            FrameStreamer::new(&mut f.pipeline, StreamMode::ContinuousMonitor).collect();

        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|fr| fr.decision.is_authorized()));
        assert_eq!(f.pulls.load(Ordering::SeqCst), 6);
        assert!(f.channel.written().is_empty());
        assert_eq!(f.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detector_failure_ends_stream() {
        let detector = ScriptedDetector::failing_from(vec![vec![]; 10], 2);
        let encoder = Box::new(JpegFrameEncoder::default());
        let mut f = fixture_with(10, detector, encoder, vec![0.0, 0.0, 1.0], false);

        let mut streamer = FrameStreamer::new(&mut f.pipeline, StreamMode::ContinuousMonitor);
        assert_eq!(streamer.next().map(|fr| fr.index), Some(0));
        assert_eq!(streamer.next().map(|fr| fr.index), Some(1));
        assert!(streamer.next().is_none());
        assert!(streamer.next().is_none());
        assert!(streamer.is_finished());
        drop(streamer);

        assert_eq!(f.pulls.load(Ordering::SeqCst), 3);
        assert_eq!(f.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_encode_failure_ends_stream_before_any_part() {
        let detector = ScriptedDetector::new(vec![]);
        let mut f = fixture_with(10, detector, Box::new(FailingEncoder), vec![], false);

        let frames: Vec<_> =
            FrameStreamer::new(&mut f.pipeline, StreamMode::ContinuousMonitor).collect();

        assert!(frames.is_empty());
        assert_eq!(f.pulls.load(Ordering::SeqCst), 1);
        assert_eq!(f.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finished_streamer_never_pulls_again() {
        let mut f = fixture(0, vec![], vec![], false);
        let mut streamer = FrameStreamer::new(&mut f.pipeline, StreamMode::ContinuousMonitor);
        assert!(streamer.next().is_none());
        assert!(streamer.next().is_none());
        assert!(streamer.is_finished());
        drop(streamer);
        assert_eq!(f.pulls.load(Ordering::SeqCst), 1);
        assert_eq!(f.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_mid_stream_stops_production_and_closes_session_once() {
        let mut f = fixture(100, vec![], vec![], false);
        {
            let mut streamer = FrameStreamer::new(&mut f.pipeline, StreamMode::ContinuousMonitor);
            assert!(streamer.next().is_some());
            assert!(streamer.next().is_some());
        }
        assert_eq!(f.pulls.load(Ordering::SeqCst), 2);
        assert_eq!(f.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parts_carry_jpeg_payload() {
        let mut f = fixture(1, vec![], vec![], false);
        let frame = FrameStreamer::new(&mut f.pipeline, StreamMode::ContinuousMonitor)
            .next()
            .unwrap();
        let part = frame.to_multipart_part();
        let header = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
        assert!(part.starts_with(header));
        assert_eq!(&part[header.len()..header.len() + 2], &[0xFF, 0xD8]);
        assert!(part.ends_with(b"\xFF\xD9\r\n"));
    }
}
