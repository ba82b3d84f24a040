/// Receives advisory progress while the engine walks the snapshots.
/// Values are in `0.0..=1.0` and never decrease within one run.
pub trait ProgressReporter {
    fn update(&mut self, value: f64, label: &str);
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&mut self, _value: f64, _label: &str) {}
}

/// Emits progress as `debug` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn update(&mut self, value: f64, label: &str) {
        tracing::debug!(percent = value * 100.0, "{label}");
    }
}
