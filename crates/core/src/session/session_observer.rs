use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Receives user-facing status lines and face counts from a session.
///
/// Lets the loop and controller report progress without knowing whether the
/// front end is a terminal, a log file, or a test.
pub trait SessionObserver: Send {
    /// A one-line status message for the user.
    fn status(&mut self, message: &str);

    /// The number of faces found by the latest completed pass.
    fn count(&mut self, faces: usize);

    /// How long a named stage took for one pass.
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}

    /// A detection pass finished and its results were drawn.
    fn pass_completed(&mut self) {}

    /// A new session began.
    fn session_started(&mut self) {}

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

pub type SharedSessionObserver = Arc<Mutex<dyn SessionObserver>>;

/// Forwards status to `log` and tracks per-stage timings for a summary
/// at the end of each session.
pub struct LogSessionObserver {
    timings: HashMap<String, Vec<f64>>,
    started: Instant,
    passes: usize,
    last_count: Option<usize>,
}

impl LogSessionObserver {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            started: Instant::now(),
            passes: 0,
            last_count: None,
        }
    }

    /// Returns the formatted summary string, or `None` if no pass completed.
    pub fn summary_string(&self) -> Option<String> {
        if self.passes == 0 {
            return None;
        }

        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let passes = self.passes;
        let mut lines = vec![format!(
            "Session summary ({passes} passes, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        if elapsed_ms > 0.0 {
            let rate = passes as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.1} passes/s"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }
}

impl Default for LogSessionObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for LogSessionObserver {
    fn status(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn count(&mut self, faces: usize) {
        if self.last_count != Some(faces) {
            log::debug!("Faces detected: {faces}");
            self.last_count = Some(faces);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn pass_completed(&mut self) {
        self.passes += 1;
    }

    fn session_started(&mut self) {
        self.timings.clear();
        self.started = Instant::now();
        self.passes = 0;
        self.last_count = None;
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
