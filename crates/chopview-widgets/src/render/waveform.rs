//! Waveform drawing routines
//!
//! Four alternative sample painters (point, line, bar, peak envelope) plus
//! the grid and zero-crossing markers. Geometry is computed by pure
//! functions over the culled window so the painters stay thin; every routine
//! is driven by the reduced window only, never the full buffer.

use iced::widget::canvas::{Frame, Path, Stroke};
use iced::{Color, Point, Size};

use chopview_core::config::RenderQuality;
use chopview_core::cull::{CulledWindow, DrawRoutine};
use chopview_core::viewport::ViewportBounds;

use crate::theme;

/// Fraction of the half-height a full-scale sample reaches
const AMPLITUDE_SCALE: f32 = 0.9;

/// Minimum horizontal spacing before point markers get connector lines
const MIN_POINT_SPACING: f32 = 4.0;

/// Alpha multiplier for the area fill under the line routine
const LINE_FILL_ALPHA: f32 = 0.25;

/// Zero-crossing tick height in pixels
const ZERO_CROSSING_TICK: f32 = 8.0;

// =============================================================================
// Geometry
// =============================================================================

/// Min/max amplitude per pixel column
///
/// Scans the samples mapped to each destination column, so the envelope is
/// correct even when thousands of samples collapse into one column. Columns
/// with no mapped samples yield silence.
pub fn envelope_columns(
    window: &CulledWindow,
    bounds: &ViewportBounds,
    width: usize,
) -> Vec<(f32, f32)> {
    if window.is_empty() || width == 0 || window.seconds_per_sample <= 0.0 {
        return Vec::new();
    }

    let len = window.samples.len();
    (0..width)
        .map(|col| {
            let t0 = bounds.pixel_to_time(col as f32);
            let t1 = bounds.pixel_to_time((col + 1) as f32);
            let i0 = ((t0 - window.start_time) / window.seconds_per_sample).floor();
            let i1 = ((t1 - window.start_time) / window.seconds_per_sample).ceil();
            let i0 = (i0.max(0.0) as usize).min(len);
            let i1 = (i1.max(0.0) as usize).min(len);
            if i0 >= i1 {
                return (0.0, 0.0);
            }

            let mut min = f32::INFINITY;
            let mut max = f32::NEG_INFINITY;
            for &sample in &window.samples[i0..i1] {
                min = min.min(sample);
                max = max.max(sample);
            }
            (min, max)
        })
        .collect()
}

/// Grid interval for a visible duration, in seconds
///
/// Bucketed so labels stay readable across the whole zoom range.
pub fn grid_interval(visible_secs: f64) -> f64 {
    if visible_secs > 300.0 {
        60.0
    } else if visible_secs > 60.0 {
        10.0
    } else if visible_secs > 10.0 {
        1.0
    } else if visible_secs > 1.0 {
        0.1
    } else {
        0.01
    }
}

/// Times of the vertical grid lines inside the visible range
pub fn grid_lines(bounds: &ViewportBounds) -> Vec<f64> {
    let interval = grid_interval(bounds.duration());
    let mut lines = Vec::new();
    let mut tick = (bounds.start / interval).ceil() * interval;
    while tick < bounds.end {
        lines.push(tick);
        tick += interval;
    }
    lines
}

/// Indices where the signal crosses zero
///
/// Strict sign change between adjacent samples, zero counting as
/// non-negative; the returned index is the first sample of the pair.
pub fn zero_crossings(samples: &[f32]) -> Vec<usize> {
    samples
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| (pair[0] < 0.0) != (pair[1] < 0.0))
        .map(|(i, _)| i)
        .collect()
}

/// Horizontal pixel spacing between consecutive samples
pub fn sample_spacing(window: &CulledWindow, bounds: &ViewportBounds) -> f32 {
    (window.seconds_per_sample * bounds.pixels_per_second) as f32
}

// =============================================================================
// Painters
// =============================================================================

/// Paint the window with the selected routine
pub(crate) fn paint(
    frame: &mut Frame,
    window: &CulledWindow,
    bounds: &ViewportBounds,
    routine: DrawRoutine,
    color: Color,
    quality: RenderQuality,
    width: f32,
    height: f32,
) {
    if window.is_empty() || width <= 0.0 || height <= 0.0 {
        return;
    }
    match routine {
        DrawRoutine::PeakEnvelope => paint_envelope(frame, window, bounds, color, width, height),
        DrawRoutine::Bar => paint_bars(frame, window, bounds, color, width, height),
        DrawRoutine::Line => paint_line(frame, window, bounds, color, quality, height),
        DrawRoutine::Point => paint_points(frame, window, bounds, color, quality, height),
    }
}

/// Vertical min/max segment per pixel column
fn paint_envelope(
    frame: &mut Frame,
    window: &CulledWindow,
    bounds: &ViewportBounds,
    color: Color,
    width: f32,
    height: f32,
) {
    let center_y = height / 2.0;
    let columns = envelope_columns(window, bounds, width as usize);

    for (x, &(min, max)) in columns.iter().enumerate() {
        if min == 0.0 && max == 0.0 {
            continue;
        }
        let y1 = center_y - max * center_y * AMPLITUDE_SCALE;
        let y2 = center_y - min * center_y * AMPLITUDE_SCALE;
        frame.stroke(
            &Path::line(Point::new(x as f32, y1), Point::new(x as f32, y2)),
            Stroke::default().with_color(color).with_width(1.0),
        );
    }
}

/// One filled rectangle per sample, signed around the center line
fn paint_bars(
    frame: &mut Frame,
    window: &CulledWindow,
    bounds: &ViewportBounds,
    color: Color,
    width: f32,
    height: f32,
) {
    let center_y = height / 2.0;
    let count = window.samples.len();
    let bar_width = (width / count as f32).max(1.0) * 0.9;

    for (i, &sample) in window.samples.iter().enumerate() {
        let time = window.start_time + i as f64 * window.seconds_per_sample;
        let x = bounds.time_to_pixel(time);
        if x + bar_width < 0.0 || x > width {
            continue;
        }
        let bar_height = sample.abs() * center_y * AMPLITUDE_SCALE;
        if bar_height <= 0.0 {
            continue;
        }
        let y = if sample >= 0.0 {
            center_y - bar_height
        } else {
            center_y
        };
        frame.fill_rectangle(Point::new(x, y), Size::new(bar_width, bar_height), color);
    }
}

/// Polyline through the samples with a translucent area fill underneath
fn paint_line(
    frame: &mut Frame,
    window: &CulledWindow,
    bounds: &ViewportBounds,
    color: Color,
    quality: RenderQuality,
    height: f32,
) {
    let center_y = height / 2.0;
    let points: Vec<Point> = window
        .samples
        .iter()
        .enumerate()
        .map(|(i, &sample)| {
            let time = window.start_time + i as f64 * window.seconds_per_sample;
            Point::new(
                bounds.time_to_pixel(time),
                center_y - sample * center_y * AMPLITUDE_SCALE,
            )
        })
        .collect();

    if points.len() < 2 {
        return;
    }

    // Area fill closed down to the center line, for readability
    let area = Path::new(|builder| {
        builder.move_to(Point::new(points[0].x, center_y));
        for point in &points {
            builder.line_to(*point);
        }
        builder.line_to(Point::new(points[points.len() - 1].x, center_y));
        builder.close();
    });
    frame.fill(&area, theme::with_alpha(color, color.a * LINE_FILL_ALPHA));

    let line = Path::new(|builder| {
        builder.move_to(points[0]);
        for point in &points[1..] {
            builder.line_to(*point);
        }
    });
    frame.stroke(
        &line,
        Stroke::default()
            .with_color(color)
            .with_width(theme::stroke_width(quality)),
    );
}

/// Small filled circle per sample, connected only when spacing allows
fn paint_points(
    frame: &mut Frame,
    window: &CulledWindow,
    bounds: &ViewportBounds,
    color: Color,
    quality: RenderQuality,
    height: f32,
) {
    let center_y = height / 2.0;
    let spacing = sample_spacing(window, bounds);
    let connect = spacing > MIN_POINT_SPACING;
    let radius = (theme::stroke_width(quality) * 1.25).max(1.5);

    let mut previous: Option<Point> = None;
    for (i, &sample) in window.samples.iter().enumerate() {
        let time = window.start_time + i as f64 * window.seconds_per_sample;
        let point = Point::new(
            bounds.time_to_pixel(time),
            center_y - sample * center_y * AMPLITUDE_SCALE,
        );

        if connect {
            if let Some(prev) = previous {
                frame.stroke(
                    &Path::line(prev, point),
                    Stroke::default()
                        .with_color(theme::with_alpha(color, 0.5))
                        .with_width(1.0),
                );
            }
        }
        frame.fill(&Path::circle(point, radius), color);
        previous = Some(point);
    }
}

/// Vertical reference lines plus the horizontal center line
pub(crate) fn paint_grid(frame: &mut Frame, bounds: &ViewportBounds, width: f32, height: f32) {
    for time in grid_lines(bounds) {
        let x = bounds.time_to_pixel(time);
        frame.stroke(
            &Path::line(Point::new(x, 0.0), Point::new(x, height)),
            Stroke::default().with_color(theme::GRID_LINE).with_width(1.0),
        );
    }

    let center_y = height / 2.0;
    frame.stroke(
        &Path::line(Point::new(0.0, center_y), Point::new(width, center_y)),
        Stroke::default().with_color(theme::CENTER_LINE).with_width(1.0),
    );
}

/// Tick and marker at every detected zero crossing
pub(crate) fn paint_zero_crossings(
    frame: &mut Frame,
    crossings: &[usize],
    window: &CulledWindow,
    bounds: &ViewportBounds,
    width: f32,
    height: f32,
) {
    let center_y = height / 2.0;
    for &index in crossings {
        // The crossing sits between the pair; mark the midpoint
        let time = window.start_time + (index as f64 + 0.5) * window.seconds_per_sample;
        let x = bounds.time_to_pixel(time);
        if x < 0.0 || x > width {
            continue;
        }
        frame.stroke(
            &Path::line(
                Point::new(x, center_y - ZERO_CROSSING_TICK / 2.0),
                Point::new(x, center_y + ZERO_CROSSING_TICK / 2.0),
            ),
            Stroke::default()
                .with_color(theme::ZERO_CROSSING)
                .with_width(1.0),
        );
        frame.fill(
            &Path::circle(Point::new(x, center_y), 1.5),
            theme::ZERO_CROSSING,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(samples: Vec<f32>, start_time: f64, rate: f64) -> CulledWindow {
        let len = samples.len();
        CulledWindow {
            samples,
            start_time,
            seconds_per_sample: 1.0 / rate,
            source_len: len,
            culled: 0,
        }
    }

    fn bounds(start: f64, end: f64, pps: f64) -> ViewportBounds {
        ViewportBounds {
            start,
            end,
            pixels_per_second: pps,
        }
    }

    #[test]
    fn test_envelope_captures_column_extremes() {
        // 100 samples over 1s, 10px surface: each column spans 10 samples
        let samples: Vec<f32> = (0..100)
            .map(|i| if i % 10 == 0 { 0.8 } else { -0.2 })
            .collect();
        let window = window(samples, 0.0, 100.0);
        let columns = envelope_columns(&window, &bounds(0.0, 1.0, 10.0), 10);
        assert_eq!(columns.len(), 10);
        for &(min, max) in &columns {
            assert!((max - 0.8).abs() < 1e-6, "Every column contains one spike");
            assert!((min + 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn test_envelope_is_idempotent() {
        let samples: Vec<f32> = (0..500).map(|i| ((i as f32) * 0.13).sin()).collect();
        let window = window(samples, 2.0, 250.0);
        let viewport = bounds(2.0, 4.0, 400.0);
        let first = envelope_columns(&window, &viewport, 800);
        let second = envelope_columns(&window, &viewport, 800);
        assert_eq!(first, second, "Unchanged input yields identical geometry");
    }

    #[test]
    fn test_envelope_empty_input() {
        let window = CulledWindow::empty();
        assert!(envelope_columns(&window, &bounds(0.0, 1.0, 800.0), 800).is_empty());
    }

    #[test]
    fn test_grid_interval_buckets() {
        assert_eq!(grid_interval(400.0), 60.0);
        assert_eq!(grid_interval(100.0), 10.0);
        assert_eq!(grid_interval(30.0), 1.0);
        assert_eq!(grid_interval(5.0), 0.1);
        assert_eq!(grid_interval(0.5), 0.01);
    }

    #[test]
    fn test_grid_lines_align_to_interval() {
        let lines = grid_lines(&bounds(2.3, 7.8, 100.0));
        // 5.5s visible -> 100ms interval; first line at 2.3, last below 7.8
        assert!(!lines.is_empty());
        for time in &lines {
            let remainder = (time / 0.1).round() * 0.1 - time;
            assert!(remainder.abs() < 1e-9, "Line {} off-interval", time);
        }
        assert!(*lines.first().unwrap() >= 2.3);
        assert!(*lines.last().unwrap() < 7.8);
    }

    #[test]
    fn test_zero_crossings_strict_sign_change() {
        // 0 counts as non-negative: [0.0, 0.5] is not a crossing,
        // [0.5, -0.5] and [-0.5, 0.0] are
        assert_eq!(zero_crossings(&[0.0, 0.5]), Vec::<usize>::new());
        assert_eq!(zero_crossings(&[0.5, -0.5, 0.0, 0.5]), vec![0, 1]);
        assert_eq!(zero_crossings(&[0.2, 0.1, 0.3]), Vec::<usize>::new());
    }

    #[test]
    fn test_sample_spacing() {
        let window = window(vec![0.0; 10], 0.0, 100.0);
        // 100 samples/s at 400 px/s = 4 px per sample
        let spacing = sample_spacing(&window, &bounds(0.0, 1.0, 400.0));
        assert!((spacing - 4.0).abs() < 1e-6);
    }
}
