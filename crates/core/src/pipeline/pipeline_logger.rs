use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for per-frame pipeline events.
///
/// The server reports through `log`; tests discard everything.
pub trait PipelineLogger: Send {
    fn frame_completed(&mut self, index: u64);

    /// Duration of one stage (`capture`, `detect`, ...) for the current frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time measurement such as the number of faces in frame.
    fn metric(&mut self, name: &str, value: f64);

    /// One access decision, keyed by `AccessDecision::kind`.
    fn decision(&mut self, kind: &str);

    fn info(&mut self, message: &str);

    /// Called once when a viewer session ends.
    fn end_session(&mut self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_completed(&mut self, _index: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn decision(&mut self, _kind: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// Count, sum and peak of a series of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

impl RunningStat {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Aggregates one viewer session and logs a report when it ends.
///
/// The controller outlives any session, so samples are folded into running
/// statistics and cleared at `end_session`. A debug line is written every
/// `throttle_frames` frames.
pub struct LogPipelineLogger {
    throttle_frames: u64,
    stages: BTreeMap<String, RunningStat>,
    metrics: BTreeMap<String, RunningStat>,
    decisions: BTreeMap<String, usize>,
    session_start: Instant,
    frames: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            stages: BTreeMap::new(),
            metrics: BTreeMap::new(),
            decisions: BTreeMap::new(),
            session_start: Instant::now(),
            frames: 0,
        }
    }

    /// Session report, or `None` before the first frame.
    pub fn report(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let secs = self.session_start.elapsed().as_secs_f64();
        let mut out = format!("Viewer session: {} frames in {secs:.1}s", self.frames);

        for (stage, stat) in &self.stages {
            out.push_str(&format!(
                "\n  {stage:<9} mean {:6.1}ms  peak {:6.1}ms",
                stat.mean(),
                stat.max
            ));
        }
        for (name, stat) in &self.metrics {
            out.push_str(&format!("\n  {name:<9} mean {:.2}", stat.mean()));
        }
        if !self.decisions.is_empty() {
            let tally = self
                .decisions
                .iter()
                .map(|(kind, n)| format!("{kind} {n}"))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("\n  decisions {tally}"));
        }
        if secs > 0.0 {
            out.push_str(&format!("\n  rate      {:.1} fps", self.frames as f64 / secs));
        }

        Some(out)
    }

    pub fn stage(&self, stage: &str) -> Option<RunningStat> {
        self.stages.get(stage).copied()
    }

    pub fn decision_count(&self, kind: &str) -> usize {
        self.decisions.get(kind).copied().unwrap_or(0)
    }

    fn reset(&mut self) {
        self.stages.clear();
        self.metrics.clear();
        self.decisions.clear();
        self.frames = 0;
        self.session_start = Instant::now();
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn frame_completed(&mut self, index: u64) {
        if self.frames == 0 {
            self.session_start = Instant::now();
        }
        self.frames += 1;
        if index % self.throttle_frames == 0 {
            log::debug!("Frame {index} done ({} this session)", self.frames);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages
            .entry(stage.to_owned())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_owned()).or_default().record(value);
    }

    fn decision(&mut self, kind: &str) {
        *self.decisions.entry(kind.to_owned()).or_default() += 1;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn end_session(&mut self) {
        if let Some(report) = self.report() {
            log::info!("{report}");
        }
        self.reset();
    }
}
