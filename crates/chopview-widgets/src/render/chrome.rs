//! Playback cursor and surrounding chrome
//!
//! The cursor layer carries only the playhead; the chrome layer draws the
//! frame border, the time ruler, and the zoom indicator so the frequently
//! moving cursor never forces the static trim to repaint.

use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{Frame, Path, Stroke, Text};
use iced::{Color, Point, Size};

use chopview_core::config::RenderQuality;
use chopview_core::viewport::{ViewportBounds, MAX_ZOOM};

use crate::render::waveform::grid_lines;
use crate::theme;

/// Cursor head triangle size
const CURSOR_HEAD: f32 = 6.0;

/// Ruler tick height
const RULER_TICK: f32 = 6.0;

/// Maximum zoom indicator width in pixels
const ZOOM_INDICATOR_WIDTH: f32 = 60.0;

/// Format a time in seconds as `m:ss.cc`
pub fn format_timestamp(secs: f64) -> String {
    let secs = secs.max(0.0);
    let minutes = (secs / 60.0) as u64;
    let remainder = secs - minutes as f64 * 60.0;
    format!("{}:{:05.2}", minutes, remainder)
}

/// Zoom indicator fill width, log-scaled so low zooms stay visible
pub fn zoom_indicator_width(zoom_level: f64) -> f32 {
    let zoom = zoom_level.clamp(1.0, MAX_ZOOM);
    (zoom.log10() / MAX_ZOOM.log10()) as f32 * ZOOM_INDICATOR_WIDTH
}

// =============================================================================
// Painters
// =============================================================================

pub(crate) fn paint_cursor(
    frame: &mut Frame,
    time: f64,
    playing: bool,
    bounds: &ViewportBounds,
    quality: RenderQuality,
    width: f32,
    height: f32,
    show_label: bool,
) {
    let x = bounds.time_to_pixel(time);
    if x < 0.0 || x > width {
        return;
    }

    let color = if playing {
        theme::CURSOR_PLAYING
    } else {
        theme::CURSOR
    };

    frame.stroke(
        &Path::line(Point::new(x, 0.0), Point::new(x, height)),
        Stroke::default()
            .with_color(color)
            .with_width(theme::stroke_width(quality)),
    );

    // Head triangle at the top, matching the region boundary markers
    let head = Path::new(|builder| {
        builder.move_to(Point::new(x - CURSOR_HEAD, 0.0));
        builder.line_to(Point::new(x + CURSOR_HEAD, 0.0));
        builder.line_to(Point::new(x, CURSOR_HEAD * 1.5));
        builder.close();
    });
    frame.fill(&head, color);

    if show_label {
        frame.fill_text(Text {
            content: format_timestamp(time),
            position: Point::new(x + 6.0, 14.0),
            size: 11.0.into(),
            color: theme::with_alpha(color, 0.9),
            align_x: Horizontal::Left.into(),
            align_y: Vertical::Center.into(),
            ..Text::default()
        });
    }
}

pub(crate) fn paint_chrome(
    frame: &mut Frame,
    bounds: &ViewportBounds,
    zoom_level: f64,
    width: f32,
    height: f32,
    show_ruler: bool,
    show_zoom_indicator: bool,
) {
    // Frame border
    frame.stroke(
        &Path::rectangle(Point::ORIGIN, Size::new(width, height)),
        Stroke::default().with_color(theme::CHROME).with_width(1.0),
    );

    if show_ruler {
        for time in grid_lines(bounds) {
            let x = bounds.time_to_pixel(time);
            frame.stroke(
                &Path::line(Point::new(x, height - RULER_TICK), Point::new(x, height)),
                Stroke::default().with_color(theme::CHROME).with_width(1.0),
            );
            frame.fill_text(Text {
                content: format_timestamp(time),
                position: Point::new(x + 2.0, height - RULER_TICK - 6.0),
                size: 10.0.into(),
                color: theme::with_alpha(theme::CHROME, 0.7),
                align_x: Horizontal::Left.into(),
                align_y: Vertical::Center.into(),
                ..Text::default()
            });
        }
    }

    if show_zoom_indicator {
        frame.fill_rectangle(
            Point::new(width - ZOOM_INDICATOR_WIDTH - 10.0, 5.0),
            Size::new(ZOOM_INDICATOR_WIDTH, 4.0),
            Color::from_rgba(1.0, 1.0, 1.0, 0.15),
        );
        frame.fill_rectangle(
            Point::new(width - ZOOM_INDICATOR_WIDTH - 10.0, 5.0),
            Size::new(zoom_indicator_width(zoom_level), 4.0),
            Color::from_rgba(1.0, 1.0, 1.0, 0.5),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(0.0), "0:00.00");
        assert_eq!(format_timestamp(7.5), "0:07.50");
        assert_eq!(format_timestamp(83.456), "1:23.46");
        assert_eq!(format_timestamp(-1.0), "0:00.00", "Negative clamps to zero");
    }

    #[test]
    fn test_zoom_indicator_monotonic_and_bounded() {
        assert_eq!(zoom_indicator_width(1.0), 0.0);
        let mid = zoom_indicator_width(100.0);
        let high = zoom_indicator_width(MAX_ZOOM);
        assert!(mid > 0.0 && mid < high);
        assert!((high - 60.0).abs() < 1e-3);
        assert_eq!(
            zoom_indicator_width(MAX_ZOOM * 10.0),
            high,
            "Clamped above max zoom"
        );
    }
}
