//! Viewport culling, RMS downsampling, and draw-routine selection
//!
//! This is the data-reduction stage of the render pipeline: the full sample
//! buffer is sliced to the visible time range (plus a guard band so panning
//! never exposes an unrendered edge), optionally RMS-grouped by the zoom
//! tier's resolution factor, and the result is matched to a drawing routine
//! by sample density.

use crate::types::SampleBuffer;
use crate::viewport::{DetailLevel, ViewportBounds};
use rayon::prelude::*;

// =============================================================================
// Constants
// =============================================================================

/// Guard band added on each side of the visible range, in seconds
///
/// Avoids edge artifacts while panning; overridable through `RenderSettings`.
pub const DEFAULT_GUARD_BAND_SECS: f64 = 0.1;

/// Sample count above which RMS grouping runs on the rayon pool
const PARALLEL_RMS_THRESHOLD: usize = 1 << 16;

// =============================================================================
// Draw Routine Selection
// =============================================================================

/// The closed set of waveform drawing routines
///
/// Selected once per frame from zoom tier and sample density; the painters
/// dispatch on this enum rather than per-sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRoutine {
    /// One marker per sample, connected when spacing allows
    Point,
    /// Polyline with a translucent area fill
    Line,
    /// One signed bar per sample
    Bar,
    /// Min/max column envelope
    PeakEnvelope,
}

/// Pick a routine from detail level and samples-per-pixel
///
/// First match wins; `None` falls back to a pure density ladder.
pub fn select_routine(detail: Option<DetailLevel>, samples_per_pixel: f64) -> DrawRoutine {
    match detail {
        Some(DetailLevel::Sample) => DrawRoutine::Point,
        Some(DetailLevel::High) => {
            if samples_per_pixel < 2.0 {
                DrawRoutine::Line
            } else {
                DrawRoutine::Bar
            }
        }
        Some(DetailLevel::Medium) => {
            if samples_per_pixel < 5.0 {
                DrawRoutine::Bar
            } else {
                DrawRoutine::PeakEnvelope
            }
        }
        Some(DetailLevel::Low) | Some(DetailLevel::Overview) => DrawRoutine::PeakEnvelope,
        None => {
            if samples_per_pixel < 1.0 {
                DrawRoutine::Point
            } else if samples_per_pixel < 2.0 {
                DrawRoutine::Line
            } else if samples_per_pixel < 10.0 {
                DrawRoutine::Bar
            } else {
                DrawRoutine::PeakEnvelope
            }
        }
    }
}

// =============================================================================
// Culled Window
// =============================================================================

/// Render-ready sample window produced by culling + RMS reduction
#[derive(Debug, Clone, PartialEq)]
pub struct CulledWindow {
    /// Reduced samples covering the visible range plus guard band
    pub samples: Vec<f32>,
    /// Time of the first output sample in seconds
    pub start_time: f64,
    /// Seconds covered by one output sample
    pub seconds_per_sample: f64,
    /// Length of the source buffer before reduction
    pub source_len: usize,
    /// `source_len - samples.len()`, reported to the metrics pass
    pub culled: usize,
}

impl CulledWindow {
    /// Empty window used for no-op renders
    pub fn empty() -> Self {
        Self {
            samples: Vec::new(),
            start_time: 0.0,
            seconds_per_sample: 0.0,
            source_len: 0,
            culled: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample density against a target surface width
    pub fn samples_per_pixel(&self, surface_width: f32) -> f64 {
        if surface_width <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / surface_width as f64
    }

    /// Time covered by the window's last sample (exclusive end)
    pub fn end_time(&self) -> f64 {
        self.start_time + self.samples.len() as f64 * self.seconds_per_sample
    }
}

/// Pick a routine for a window, with the defensive fallback
///
/// Empty output or a degenerate surface always resolves to the envelope
/// routine, which tolerates any density.
pub fn choose_routine(
    window: &CulledWindow,
    detail: Option<DetailLevel>,
    surface_width: f32,
) -> DrawRoutine {
    if window.is_empty() || surface_width <= 0.0 {
        return DrawRoutine::PeakEnvelope;
    }
    select_routine(detail, window.samples_per_pixel(surface_width))
}

// =============================================================================
// Culling + RMS Reduction
// =============================================================================

/// Cull a buffer to the viewport and reduce it by the resolution factor
///
/// With culling disabled the whole buffer passes through (still reduced when
/// `resolution_factor > 1`). Empty buffers and zero-width viewports yield an
/// empty window with `culled = 0` so the caller can record a zero-cost pass.
pub fn cull_window(
    buffer: &SampleBuffer,
    bounds: &ViewportBounds,
    resolution_factor: u32,
    guard_band_secs: f64,
    culling_enabled: bool,
) -> CulledWindow {
    if buffer.is_empty() || bounds.duration() <= 0.0 {
        return CulledWindow::empty();
    }

    let rate = buffer.sample_rate as f64;
    let len = buffer.len();

    let (start_idx, end_idx) = if culling_enabled {
        let start = ((bounds.start - guard_band_secs) * rate).floor().max(0.0) as usize;
        let end = (((bounds.end + guard_band_secs) * rate).ceil() as usize).min(len);
        (start.min(len), end)
    } else {
        (0, len)
    };

    if start_idx >= end_idx {
        // Viewport entirely outside the buffer
        return CulledWindow {
            samples: Vec::new(),
            start_time: bounds.start,
            seconds_per_sample: 0.0,
            source_len: len,
            culled: len,
        };
    }

    let slice = &buffer.samples[start_idx..end_idx];
    let factor = resolution_factor.max(1) as usize;
    let samples = if factor > 1 {
        rms_reduce(slice, factor)
    } else {
        slice.to_vec()
    };

    let culled = len - samples.len();
    log::debug!(
        "cull_window: {} -> {} samples (factor {}, culling {})",
        len,
        samples.len(),
        factor,
        culling_enabled
    );

    CulledWindow {
        samples,
        start_time: start_idx as f64 / rate,
        seconds_per_sample: factor as f64 / rate,
        source_len: len,
        culled,
    }
}

/// Collapse every `factor` consecutive samples into one RMS value
///
/// The magnitude is the root-mean-square of the group, which tracks
/// perceived loudness better than picking every Nth sample; the sign is
/// taken from the group's first sample (zero counts as non-negative).
pub fn rms_reduce(samples: &[f32], factor: usize) -> Vec<f32> {
    if factor <= 1 || samples.is_empty() {
        return samples.to_vec();
    }

    let group = |chunk: &[f32]| -> f32 {
        let mean_sq =
            chunk.iter().map(|s| (*s as f64) * (*s as f64)).sum::<f64>() / chunk.len() as f64;
        chunk[0].signum() * mean_sq.sqrt() as f32
    };

    if samples.len() >= PARALLEL_RMS_THRESHOLD {
        samples.par_chunks(factor).map(group).collect()
    } else {
        samples.chunks(factor).map(group).collect()
    }
}

// =============================================================================
// Region Culling
// =============================================================================

/// Indices of the regions intersecting the visible range
pub fn visible_regions(regions: &[crate::types::Region], bounds: &ViewportBounds) -> Vec<usize> {
    regions
        .iter()
        .enumerate()
        .filter(|(_, r)| r.end_time > bounds.start && r.start_time < bounds.end)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;

    fn bounds(start: f64, end: f64, pps: f64) -> ViewportBounds {
        ViewportBounds {
            start,
            end,
            pixels_per_second: pps,
        }
    }

    #[test]
    fn test_output_never_exceeds_input() {
        let buffer = SampleBuffer::new(vec![0.5; 10_000], 1000);
        let window = cull_window(&buffer, &bounds(2.0, 4.0, 80.0), 4, 0.1, true);
        assert!(window.samples.len() <= buffer.len());
        assert_eq!(window.culled, buffer.len() - window.samples.len());
    }

    #[test]
    fn test_culling_disabled_with_unit_factor_is_identity() {
        let buffer = SampleBuffer::new((0..1000).map(|i| (i as f32).sin()).collect(), 1000);
        let window = cull_window(&buffer, &bounds(0.2, 0.3, 800.0), 1, 0.1, false);
        assert_eq!(window.samples.len(), buffer.len(), "Nothing culled when disabled");
        assert_eq!(window.culled, 0);
        assert_eq!(window.samples, buffer.samples);
    }

    #[test]
    fn test_guard_band_extends_slice() {
        let buffer = SampleBuffer::new(vec![0.1; 10_000], 1000);
        let window = cull_window(&buffer, &bounds(2.0, 4.0, 80.0), 1, 0.1, true);
        // [1.9s, 4.1s] at 1kHz = 2200 samples
        assert_eq!(window.samples.len(), 2200);
        assert!((window.start_time - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_rms_magnitude_with_sign_from_first() {
        let reduced = rms_reduce(&[0.5, -0.5], 2);
        assert_eq!(reduced.len(), 1);
        assert!((reduced[0] - 0.5).abs() < 1e-6, "RMS of +/-0.5 is 0.5, sign positive");

        let reduced = rms_reduce(&[-0.5, 0.5], 2);
        assert!((reduced[0] + 0.5).abs() < 1e-6, "Sign follows the first sample");

        // Zero counts as non-negative
        let reduced = rms_reduce(&[0.0, -1.0], 2);
        assert!(reduced[0] > 0.0);
    }

    #[test]
    fn test_empty_buffer_yields_empty_window() {
        let buffer = SampleBuffer::new(Vec::new(), 1000);
        let window = cull_window(&buffer, &bounds(0.0, 1.0, 800.0), 2, 0.1, true);
        assert!(window.is_empty());
        assert_eq!(window.culled, 0, "Empty input records a zero-cost pass");
    }

    #[test]
    fn test_zero_width_viewport_yields_empty_window() {
        let buffer = SampleBuffer::new(vec![0.5; 100], 1000);
        let window = cull_window(&buffer, &bounds(1.0, 1.0, 800.0), 1, 0.1, true);
        assert!(window.is_empty());
        assert_eq!(window.culled, 0);
    }

    #[test]
    fn test_viewport_beyond_buffer_culls_everything() {
        let buffer = SampleBuffer::new(vec![0.5; 1000], 1000);
        let window = cull_window(&buffer, &bounds(100.0, 101.0, 800.0), 1, 0.1, true);
        assert!(window.is_empty());
        assert_eq!(window.culled, 1000);
    }

    // =========================================================================
    // Routine selection table
    // =========================================================================

    #[test]
    fn test_sample_detail_always_points() {
        assert_eq!(select_routine(Some(DetailLevel::Sample), 50.0), DrawRoutine::Point);
    }

    #[test]
    fn test_high_detail_boundary_at_two() {
        assert_eq!(select_routine(Some(DetailLevel::High), 1.9), DrawRoutine::Line);
        assert_eq!(select_routine(Some(DetailLevel::High), 2.0), DrawRoutine::Bar);
    }

    #[test]
    fn test_medium_detail_boundary_at_five() {
        assert_eq!(select_routine(Some(DetailLevel::Medium), 4.9), DrawRoutine::Bar);
        assert_eq!(
            select_routine(Some(DetailLevel::Medium), 5.0),
            DrawRoutine::PeakEnvelope
        );
    }

    #[test]
    fn test_low_and_overview_always_envelope() {
        assert_eq!(
            select_routine(Some(DetailLevel::Low), 0.1),
            DrawRoutine::PeakEnvelope
        );
        assert_eq!(
            select_routine(Some(DetailLevel::Overview), 0.1),
            DrawRoutine::PeakEnvelope
        );
    }

    #[test]
    fn test_density_ladder_without_detail_level() {
        assert_eq!(select_routine(None, 0.99), DrawRoutine::Point);
        assert_eq!(select_routine(None, 1.0), DrawRoutine::Line);
        assert_eq!(select_routine(None, 2.0), DrawRoutine::Bar);
        assert_eq!(select_routine(None, 10.0), DrawRoutine::PeakEnvelope);
    }

    #[test]
    fn test_empty_window_defaults_to_envelope() {
        let window = CulledWindow::empty();
        assert_eq!(
            choose_routine(&window, Some(DetailLevel::Sample), 800.0),
            DrawRoutine::PeakEnvelope
        );
    }

    #[test]
    fn test_zero_width_surface_defaults_to_envelope() {
        let buffer = SampleBuffer::new(vec![0.5; 100], 1000);
        let window = cull_window(&buffer, &bounds(0.0, 0.1, 800.0), 1, 0.0, true);
        assert_eq!(
            choose_routine(&window, Some(DetailLevel::Sample), 0.0),
            DrawRoutine::PeakEnvelope
        );
    }

    // =========================================================================
    // Scenario tests
    // =========================================================================

    #[test]
    fn test_ten_second_buffer_medium_detail_picks_envelope() {
        // 10s at 8kHz, resolution factor 4, viewport [2, 4]s, 800px surface.
        // Slice [1.9, 4.1]s = 17600 samples -> 4400 reduced -> 5.5 samples/px,
        // which lands in the envelope branch of the Medium tier.
        let buffer = SampleBuffer::new(vec![0.25; 80_000], 8000);
        let window = cull_window(&buffer, &bounds(2.0, 4.0, 400.0), 4, 0.1, true);
        assert_eq!(window.samples.len(), 4400);
        let spp = window.samples_per_pixel(800.0);
        assert!((spp - 5.5).abs() < 1e-9);
        assert_eq!(
            choose_routine(&window, Some(DetailLevel::Medium), 800.0),
            DrawRoutine::PeakEnvelope
        );
    }

    #[test]
    fn test_region_culling_excludes_most_of_a_spread() {
        // 200 regions spread over 100s, 10s viewport: the large majority
        // falls outside the window.
        let regions: Vec<Region> = (0..200)
            .map(|i| {
                let start = i as f64 * 0.5;
                Region::new(i, start, start + 0.4)
            })
            .collect();
        let visible = visible_regions(&regions, &bounds(45.0, 55.0, 80.0));
        let culled = regions.len() - visible.len();
        assert!(culled > 150, "Expected most regions culled, got {}", culled);
        assert!(!visible.is_empty());
    }
}
