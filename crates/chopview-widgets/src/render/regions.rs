//! Chop region painting
//!
//! Regions are drawn clamped to the visible pixel range: gradient body,
//! boundary markers, label, duration readout, plus the relationship
//! annotations (overlap warning bands, adjacency connectors) computed by the
//! analysis pass.

use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{Frame, Path, Stroke, Text};
use iced::{Color, Point, Size};

use chopview_core::config::RenderQuality;
use chopview_core::types::Region;
use chopview_core::viewport::ViewportBounds;

use crate::theme;

/// Vertical gradient resolution for the region body
const GRADIENT_BANDS: usize = 8;

/// Minimum painted width before the duration readout appears
const DURATION_READOUT_MIN_WIDTH: f32 = 60.0;

/// Boundary triangle size in pixels
const BOUNDARY_TRIANGLE: f32 = 7.0;

/// Hatch line spacing for overlap warning bands
const HATCH_SPACING: f32 = 6.0;

// =============================================================================
// Scene data
// =============================================================================

/// Snapshot of one visible region, resolved at render-call time
#[derive(Debug, Clone)]
pub(crate) struct RegionVisual {
    pub region: Region,
    pub color: Color,
    pub selected: bool,
    pub hovered: bool,
    pub playing: bool,
}

/// Pre-resolved relationship annotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RelationshipVisual {
    /// Overlapping span between two regions
    Overlap { start: f64, end: f64, severe: bool },
    /// Near-touching boundary pair
    Adjacency { from: f64, to: f64 },
}

// =============================================================================
// Geometry helpers
// =============================================================================

/// Clamp a time span to the surface, returning pixel extents
///
/// `None` when the clamped width is not positive (fully outside the
/// viewport).
pub fn clamped_span(
    start_time: f64,
    end_time: f64,
    bounds: &ViewportBounds,
    surface_width: f32,
) -> Option<(f32, f32)> {
    let x0 = bounds.time_to_pixel(start_time).max(0.0);
    let x1 = bounds.time_to_pixel(end_time).min(surface_width);
    if x1 - x0 > 0.0 {
        Some((x0, x1))
    } else {
        None
    }
}

/// Body fill opacity tier: selected > hovered > default
pub fn fill_opacity(selected: bool, hovered: bool) -> f32 {
    if selected {
        0.45
    } else if hovered {
        0.32
    } else {
        0.2
    }
}

/// Extra highlight alpha for the currently playing region
///
/// `phase` advances 0..1 per pulse period; the result swings smoothly
/// between 0.1 and 0.25.
pub fn pulse_alpha(phase: f32) -> f32 {
    let wave = 0.5 - 0.5 * (phase * std::f32::consts::TAU).cos();
    0.1 + 0.15 * wave
}

// =============================================================================
// Painters
// =============================================================================

pub(crate) fn paint_region(
    frame: &mut Frame,
    visual: &RegionVisual,
    bounds: &ViewportBounds,
    quality: RenderQuality,
    width: f32,
    height: f32,
    pulse_phase: f32,
) {
    let region = &visual.region;
    let Some((x0, x1)) = clamped_span(region.start_time, region.end_time, bounds, width) else {
        return;
    };
    let span_width = x1 - x0;
    let opacity = fill_opacity(visual.selected, visual.hovered);

    // Banded vertical gradient body, brighter at the top
    let band_height = height / GRADIENT_BANDS as f32;
    for band in 0..GRADIENT_BANDS {
        let t = band as f32 / (GRADIENT_BANDS - 1) as f32;
        let alpha = opacity * (1.0 - 0.45 * t);
        frame.fill_rectangle(
            Point::new(x0, band as f32 * band_height),
            Size::new(span_width, band_height + 0.5),
            theme::with_alpha(visual.color, alpha),
        );
    }

    if visual.playing {
        frame.fill_rectangle(
            Point::new(x0, 0.0),
            Size::new(span_width, height),
            theme::with_alpha(visual.color, pulse_alpha(pulse_phase)),
        );
    }

    // Boundary lines with directional markers, only where the true edge
    // is on screen
    let stroke_width = theme::stroke_width(quality);
    let start_x = bounds.time_to_pixel(region.start_time);
    if start_x >= 0.0 && start_x <= width {
        paint_boundary(frame, start_x, height, visual.color, stroke_width, true);
    }
    let end_x = bounds.time_to_pixel(region.end_time);
    if end_x >= 0.0 && end_x <= width {
        paint_boundary(frame, end_x, height, visual.color, stroke_width, false);
    }

    paint_label(frame, visual, x0, x1, height);

    if span_width > DURATION_READOUT_MIN_WIDTH {
        frame.fill_text(Text {
            content: format!("{:.2}s", region.duration()),
            position: Point::new((x0 + x1) / 2.0, height - 8.0),
            size: 11.0.into(),
            color: theme::with_alpha(Color::WHITE, 0.7),
            align_x: Horizontal::Center.into(),
            align_y: Vertical::Center.into(),
            ..Text::default()
        });
    }
}

/// Vertical boundary line plus a triangle pointing into the region
fn paint_boundary(
    frame: &mut Frame,
    x: f32,
    height: f32,
    color: Color,
    stroke_width: f32,
    is_start: bool,
) {
    frame.stroke(
        &Path::line(Point::new(x, 0.0), Point::new(x, height)),
        Stroke::default()
            .with_color(theme::with_alpha(color, 0.9))
            .with_width(stroke_width),
    );

    let direction = if is_start { 1.0 } else { -1.0 };
    let mid_y = height / 2.0;
    let triangle = Path::new(|builder| {
        builder.move_to(Point::new(x, mid_y - BOUNDARY_TRIANGLE));
        builder.line_to(Point::new(x + direction * BOUNDARY_TRIANGLE, mid_y));
        builder.line_to(Point::new(x, mid_y + BOUNDARY_TRIANGLE));
        builder.close();
    });
    frame.fill(&triangle, color);
}

/// Centered label over a contrasting background box
fn paint_label(frame: &mut Frame, visual: &RegionVisual, x0: f32, x1: f32, height: f32) {
    let region = &visual.region;
    let label = match (&region.label, region.pad) {
        (Some(label), _) => label.clone(),
        (None, Some(pad)) => format!("P{}", pad + 1),
        (None, None) => format!("{}", region.id),
    };

    let center = Point::new((x0 + x1) / 2.0, height * 0.25);
    // Rough monospace-ish estimate keeps the box snug without text metrics
    let box_width = label.len() as f32 * 7.0 + 10.0;
    frame.fill_rectangle(
        Point::new(center.x - box_width / 2.0, center.y - 9.0),
        Size::new(box_width, 18.0),
        Color::from_rgba(0.0, 0.0, 0.0, 0.6),
    );
    frame.fill_text(Text {
        content: label,
        position: center,
        size: 12.0.into(),
        color: Color::WHITE,
        align_x: Horizontal::Center.into(),
        align_y: Vertical::Center.into(),
        ..Text::default()
    });
}

/// Paint a resolved relationship annotation
pub(crate) fn paint_relationship(
    frame: &mut Frame,
    visual: RelationshipVisual,
    bounds: &ViewportBounds,
    width: f32,
    height: f32,
) {
    match visual {
        RelationshipVisual::Overlap { start, end, severe } => {
            let Some((x0, x1)) = clamped_span(start, end, bounds, width) else {
                return;
            };
            let color = if severe {
                theme::OVERLAP_SEVERE
            } else {
                theme::OVERLAP_MILD
            };

            frame.fill_rectangle(
                Point::new(x0, 0.0),
                Size::new(x1 - x0, height),
                theme::with_alpha(color, color.a * 0.3),
            );

            // Slanted hatch, kept inside the band
            let slant = height * 0.4;
            let mut x = x0;
            while x + slant <= x1 {
                frame.stroke(
                    &Path::line(Point::new(x, 0.0), Point::new(x + slant, height)),
                    Stroke::default().with_color(color).with_width(1.0),
                );
                x += HATCH_SPACING;
            }
        }
        RelationshipVisual::Adjacency { from, to } => {
            let y = height * 0.12;
            let x_from = bounds.time_to_pixel(from);
            let x_to = bounds.time_to_pixel(to);
            if x_from.max(x_to) < 0.0 || x_from.min(x_to) > width {
                return;
            }
            frame.stroke(
                &Path::line(Point::new(x_from, y), Point::new(x_to, y)),
                Stroke::default().with_color(theme::ADJACENCY).with_width(1.5),
            );
            frame.fill(&Path::circle(Point::new(x_from, y), 2.5), theme::ADJACENCY);
            frame.fill(&Path::circle(Point::new(x_to, y), 2.5), theme::ADJACENCY);
        }
    }
}
