use std::time::Instant;

use indexmap::IndexMap;

/// Accumulates elapsed-time samples between named checkpoints.
///
/// Each `mark` records the time elapsed since the previous checkpoint (or since
/// construction for the first one) and restarts the clock. Insertion order is
/// preserved, so the recorded steps read as the stage sequence of a run.
#[derive(Debug)]
pub struct TimingLog {
    start: Instant,
    steps: IndexMap<String, f64>,
}

impl TimingLog {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            steps: IndexMap::new(),
        }
    }

    /// Records the elapsed seconds since the previous checkpoint under `name`,
    /// rounded to 4 decimals, and restarts the clock.
    pub fn mark(&mut self, name: &str) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.start).as_secs_f64();
        self.steps
            .insert(name.to_string(), (elapsed * 10_000.0).round() / 10_000.0);
        self.start = now;
    }

    pub fn steps(&self) -> &IndexMap<String, f64> {
        &self.steps
    }

    /// Consumes the log, freezing the recorded steps
    pub fn into_steps(self) -> IndexMap<String, f64> {
        self.steps
    }
}

impl Default for TimingLog {
    fn default() -> Self {
        Self::new()
    }
}
