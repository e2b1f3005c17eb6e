//! Frame and per-operation performance accounting
//!
//! The render engine records every public operation and every composited
//! frame here. Nothing acts on the numbers inside the engine; a slow frame
//! is an observable condition for the host (which may drop the quality
//! tier), not an error.

use std::collections::BTreeMap;
use std::time::Duration;

/// Smoothing factor for the running FPS estimate
const FPS_SMOOTHING: f64 = 0.1;

/// Accumulated timing for one named operation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OpStats {
    pub total: Duration,
    pub calls: u64,
}

impl OpStats {
    /// Mean duration per call
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

/// Process-wide render statistics, owned by the engine
///
/// Mutates on every call and survives until `reset` or engine teardown.
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    /// Wall time of the most recent composited frame
    pub last_frame: Duration,
    /// Frames composited since creation or the last reset
    pub frame_count: u64,
    /// Elements excluded by the most recent culling pass
    pub culled_elements: usize,
    smoothed_fps: f64,
    operations: BTreeMap<String, OpStats>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one named operation
    ///
    /// Zero-duration records are legitimate: no-op renders on empty input
    /// still count a call so the host can see the pass happened.
    pub fn record_op(&mut self, name: &str, elapsed: Duration) {
        let stats = self.operations.entry(name.to_string()).or_default();
        stats.total += elapsed;
        stats.calls += 1;
    }

    /// Record a composited frame and fold it into the FPS estimate
    pub fn record_frame(&mut self, elapsed: Duration) {
        self.last_frame = elapsed;
        self.frame_count += 1;

        let secs = elapsed.as_secs_f64();
        let instantaneous = if secs > 0.0 { 1.0 / secs } else { 0.0 };
        self.smoothed_fps = if self.frame_count == 1 {
            instantaneous
        } else {
            self.smoothed_fps * (1.0 - FPS_SMOOTHING) + instantaneous * FPS_SMOOTHING
        };
    }

    /// Exponentially smoothed frames-per-second
    pub fn average_fps(&self) -> f64 {
        self.smoothed_fps
    }

    /// Stats for one operation, if it ever ran
    pub fn op(&self, name: &str) -> Option<&OpStats> {
        self.operations.get(name)
    }

    /// All recorded operations in name order
    pub fn operations(&self) -> impl Iterator<Item = (&str, &OpStats)> {
        self.operations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Update the culled-element count for the most recent pass
    pub fn set_culled_elements(&mut self, culled: usize) {
        self.culled_elements = culled;
    }

    /// Whether the last frame blew the given budget
    pub fn over_budget(&self, budget: Duration) -> bool {
        self.last_frame > budget
    }

    /// Clear everything back to a fresh state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Frame budget for a target refresh rate (~16.67ms at 60Hz)
pub fn frame_budget(target_fps: u32) -> Duration {
    if target_fps == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(1.0 / target_fps as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_accumulation_and_average() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_op("waveform", Duration::from_millis(4));
        metrics.record_op("waveform", Duration::from_millis(2));
        let stats = metrics.op("waveform").unwrap();
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.total, Duration::from_millis(6));
        assert_eq!(stats.average(), Duration::from_millis(3));
    }

    #[test]
    fn test_zero_cost_op_still_counts_a_call() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_op("regions", Duration::ZERO);
        let stats = metrics.op("regions").unwrap();
        assert_eq!(stats.calls, 1);
        assert_eq!(stats.average(), Duration::ZERO);
    }

    #[test]
    fn test_fps_smoothing_converges() {
        let mut metrics = PerformanceMetrics::new();
        for _ in 0..200 {
            metrics.record_frame(Duration::from_millis(10));
        }
        assert!(
            (metrics.average_fps() - 100.0).abs() < 1.0,
            "Steady 10ms frames converge near 100 fps, got {}",
            metrics.average_fps()
        );
        assert_eq!(metrics.frame_count, 200);
    }

    #[test]
    fn test_budget_observation() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_frame(Duration::from_millis(20));
        assert!(metrics.over_budget(frame_budget(60)));
        metrics.record_frame(Duration::from_millis(10));
        assert!(!metrics.over_budget(frame_budget(60)));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_op("cursor", Duration::from_millis(1));
        metrics.record_frame(Duration::from_millis(5));
        metrics.set_culled_elements(42);
        metrics.reset();
        assert_eq!(metrics.frame_count, 0);
        assert_eq!(metrics.culled_elements, 0);
        assert!(metrics.op("cursor").is_none());
        assert_eq!(metrics.average_fps(), 0.0);
    }
}
