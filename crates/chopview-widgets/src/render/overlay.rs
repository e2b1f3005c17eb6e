//! Enhancement overlay passes
//!
//! Independently toggleable passes composited above the base waveform:
//! frequency-band coloring, amplitude-level coloring, structural section
//! bands, and accessibility textures. Each pass consumes the already-culled
//! window and the viewport mapping; none changes the base geometry. Passes
//! register against the engine's hook points by composition.

use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{Frame, Path, Stroke, Text};
use iced::{Color, Point, Size};

use chopview_core::cull::CulledWindow;
use chopview_core::viewport::ViewportBounds;

use crate::render::waveform::envelope_columns;
use crate::theme;

// =============================================================================
// Pass registry
// =============================================================================

/// Hook point an overlay pass attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStage {
    /// After the base waveform routine, before regions composite above
    PostWaveform,
    /// After the region pass
    PostRegions,
}

/// Shared drawing context handed to every pass
pub struct OverlayContext<'a> {
    pub bounds: &'a ViewportBounds,
    /// Reduced sample window of the current waveform scene, when one exists
    pub window: Option<&'a CulledWindow>,
    pub width: f32,
    pub height: f32,
}

/// One additive draw pass
pub trait OverlayPass {
    fn name(&self) -> &str;
    fn stage(&self) -> OverlayStage;
    fn paint(&self, frame: &mut Frame, ctx: &OverlayContext<'_>);
}

/// Registered passes with per-pass enable flags
#[derive(Default)]
pub struct OverlayStack {
    entries: Vec<(bool, Box<dyn OverlayPass>)>,
}

impl OverlayStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pass, enabled by default
    pub fn add(&mut self, pass: Box<dyn OverlayPass>) {
        self.entries.push((true, pass));
    }

    /// Toggle a pass by name; returns false when no pass matches
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let mut found = false;
        for (flag, pass) in &mut self.entries {
            if pass.name() == name {
                *flag = enabled;
                found = true;
            }
        }
        found
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|(flag, pass)| *flag && pass.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every enabled pass registered for a stage
    pub(crate) fn paint_stage(
        &self,
        frame: &mut Frame,
        stage: OverlayStage,
        ctx: &OverlayContext<'_>,
    ) {
        for (enabled, pass) in &self.entries {
            if *enabled && pass.stage() == stage {
                pass.paint(frame, ctx);
            }
        }
    }
}

// =============================================================================
// Color math
// =============================================================================

/// Multiply blend, channel-wise
pub fn blend_multiply(base: Color, over: Color) -> Color {
    Color::from_rgba(base.r * over.r, base.g * over.g, base.b * over.b, base.a)
}

/// Overlay blend: darkens darks, brightens brights
pub fn blend_overlay(base: Color, over: Color) -> Color {
    let channel = |b: f32, o: f32| {
        if b < 0.5 {
            2.0 * b * o
        } else {
            1.0 - 2.0 * (1.0 - b) * (1.0 - o)
        }
    };
    Color::from_rgba(
        channel(base.r, over.r),
        channel(base.g, over.g),
        channel(base.b, over.b),
        base.a,
    )
}

/// Sample a multi-stop gradient at `t` in [0, 1]
pub fn gradient_sample(stops: &[Color], t: f32) -> Color {
    debug_assert!(stops.len() >= 2);
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (stops.len() - 1) as f32;
    let index = (scaled as usize).min(stops.len() - 2);
    let local = scaled - index as f32;
    let a = stops[index];
    let b = stops[index + 1];
    Color::from_rgba(
        a.r + (b.r - a.r) * local,
        a.g + (b.g - a.g) * local,
        a.b + (b.b - a.b) * local,
        a.a + (b.a - a.a) * local,
    )
}

/// Bucket a peak magnitude into the 5-tier amplitude palette
pub fn amplitude_bucket(level: f32) -> usize {
    let level = level.abs();
    if level < 0.02 {
        0 // silent
    } else if level < 0.1 {
        1 // quiet
    } else if level < 0.3 {
        2 // moderate
    } else if level < 0.6 {
        3 // loud
    } else {
        4 // peak
    }
}

/// On/off spans for a dashed run over `[x0, x1]`
pub fn dash_segments(x0: f32, x1: f32, on: f32, off: f32) -> Vec<(f32, f32)> {
    let mut segments = Vec::new();
    let mut x = x0;
    while x < x1 {
        let end = (x + on).min(x1);
        segments.push((x, end));
        x += on + off;
    }
    segments
}

// =============================================================================
// Frequency-band coloring
// =============================================================================

/// Externally supplied per-segment frequency energy
///
/// `centroid` locates the segment on the bass(0)..treble(1) axis; `energy`
/// scales the overlay strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySegment {
    pub start: f64,
    pub end: f64,
    pub centroid: f32,
    pub energy: f32,
}

/// Tints the waveform area by frequency content, multiply-composited
pub struct FrequencyBandOverlay {
    segments: Vec<FrequencySegment>,
}

impl FrequencyBandOverlay {
    pub fn new(segments: Vec<FrequencySegment>) -> Self {
        Self { segments }
    }

    pub fn set_segments(&mut self, segments: Vec<FrequencySegment>) {
        self.segments = segments;
    }
}

impl OverlayPass for FrequencyBandOverlay {
    fn name(&self) -> &str {
        "frequency-bands"
    }

    fn stage(&self) -> OverlayStage {
        OverlayStage::PostWaveform
    }

    fn paint(&self, frame: &mut Frame, ctx: &OverlayContext<'_>) {
        for segment in &self.segments {
            if segment.end <= ctx.bounds.start || segment.start >= ctx.bounds.end {
                continue;
            }
            let x0 = ctx.bounds.time_to_pixel(segment.start).max(0.0);
            let x1 = ctx.bounds.time_to_pixel(segment.end).min(ctx.width);
            if x1 <= x0 {
                continue;
            }

            let tint = gradient_sample(&theme::FREQUENCY_STOPS, segment.centroid);
            let color = blend_multiply(theme::WAVEFORM, tint);
            let alpha = 0.15 + 0.35 * segment.energy.clamp(0.0, 1.0);
            frame.fill_rectangle(
                Point::new(x0, 0.0),
                Size::new(x1 - x0, ctx.height),
                theme::with_alpha(color, alpha),
            );
        }
    }
}

// =============================================================================
// Amplitude-level coloring
// =============================================================================

/// Colors each pixel column by its peak loudness bucket, overlay-composited
pub struct AmplitudeLevelOverlay;

impl OverlayPass for AmplitudeLevelOverlay {
    fn name(&self) -> &str {
        "amplitude-levels"
    }

    fn stage(&self) -> OverlayStage {
        OverlayStage::PostWaveform
    }

    fn paint(&self, frame: &mut Frame, ctx: &OverlayContext<'_>) {
        let Some(window) = ctx.window else {
            return;
        };
        let columns = envelope_columns(window, ctx.bounds, ctx.width as usize);
        let center_y = ctx.height / 2.0;

        for (x, &(min, max)) in columns.iter().enumerate() {
            let level = min.abs().max(max.abs());
            if level <= 0.0 {
                continue;
            }
            let bucket = amplitude_bucket(level);
            let color = blend_overlay(theme::WAVEFORM, theme::AMPLITUDE_COLORS[bucket]);
            let extent = level * center_y * 0.9;
            frame.fill_rectangle(
                Point::new(x as f32, center_y - extent),
                Size::new(1.0, extent * 2.0),
                theme::with_alpha(color, 0.3),
            );
        }
    }
}

// =============================================================================
// Structural section bands
// =============================================================================

/// Fill style for a section band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPattern {
    Solid,
    Gradient,
    Dashed,
    Dotted,
    Sparse,
}

/// One structural section (verse, chorus, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub start: f64,
    pub end: f64,
    pub label: Option<String>,
    pub color: Color,
    pub pattern: FillPattern,
}

/// Paints section bands with their fill pattern and optional label
pub struct SectionOverlay {
    sections: Vec<Section>,
}

impl SectionOverlay {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn set_sections(&mut self, sections: Vec<Section>) {
        self.sections = sections;
    }
}

impl OverlayPass for SectionOverlay {
    fn name(&self) -> &str {
        "sections"
    }

    fn stage(&self) -> OverlayStage {
        OverlayStage::PostWaveform
    }

    fn paint(&self, frame: &mut Frame, ctx: &OverlayContext<'_>) {
        for section in &self.sections {
            if section.end <= ctx.bounds.start || section.start >= ctx.bounds.end {
                continue;
            }
            let x0 = ctx.bounds.time_to_pixel(section.start).max(0.0);
            let x1 = ctx.bounds.time_to_pixel(section.end).min(ctx.width);
            if x1 <= x0 {
                continue;
            }

            paint_section_fill(frame, section, x0, x1, ctx.height);

            if let Some(label) = &section.label {
                frame.fill_text(Text {
                    content: label.clone(),
                    position: Point::new(x0 + 4.0, 10.0),
                    size: 11.0.into(),
                    color: theme::with_alpha(section.color, 0.9),
                    align_x: Horizontal::Left.into(),
                    align_y: Vertical::Center.into(),
                    ..Text::default()
                });
            }
        }
    }
}

fn paint_section_fill(frame: &mut Frame, section: &Section, x0: f32, x1: f32, height: f32) {
    let color = section.color;
    match section.pattern {
        FillPattern::Solid => {
            frame.fill_rectangle(
                Point::new(x0, 0.0),
                Size::new(x1 - x0, height),
                theme::with_alpha(color, 0.12),
            );
        }
        FillPattern::Gradient => {
            // Horizontal fade-in across the band
            let bands = 6;
            let band_width = (x1 - x0) / bands as f32;
            for band in 0..bands {
                let alpha = 0.04 + 0.12 * band as f32 / (bands - 1) as f32;
                frame.fill_rectangle(
                    Point::new(x0 + band as f32 * band_width, 0.0),
                    Size::new(band_width + 0.5, height),
                    theme::with_alpha(color, alpha),
                );
            }
        }
        FillPattern::Dashed => {
            for y in [1.0, height - 1.0] {
                for (sx, ex) in dash_segments(x0, x1, 8.0, 6.0) {
                    frame.stroke(
                        &Path::line(Point::new(sx, y), Point::new(ex, y)),
                        Stroke::default()
                            .with_color(theme::with_alpha(color, 0.7))
                            .with_width(1.5),
                    );
                }
            }
        }
        FillPattern::Dotted => {
            let mut x = x0 + 3.0;
            while x < x1 {
                frame.fill(
                    &Path::circle(Point::new(x, height - 6.0), 1.5),
                    theme::with_alpha(color, 0.8),
                );
                x += 8.0;
            }
        }
        FillPattern::Sparse => {
            let mut x = x0;
            while x < x1 {
                frame.stroke(
                    &Path::line(Point::new(x, 0.0), Point::new(x, height)),
                    Stroke::default()
                        .with_color(theme::with_alpha(color, 0.25))
                        .with_width(1.0),
                );
                x += 24.0;
            }
        }
    }
}

// =============================================================================
// Accessibility textures
// =============================================================================

/// Non-color-dependent texture kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexturePattern {
    Lines,
    Dots,
    CrossHatch,
}

/// Texture density tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDensity {
    Sparse,
    Medium,
    Dense,
    VeryDense,
}

/// Pixel spacing for a density tier
pub fn density_spacing(density: PatternDensity) -> f32 {
    match density {
        PatternDensity::Sparse => 24.0,
        PatternDensity::Medium => 16.0,
        PatternDensity::Dense => 10.0,
        PatternDensity::VeryDense => 6.0,
    }
}

/// A textured span keyed to something hue alone would otherwise encode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSpan {
    pub start: f64,
    pub end: f64,
    pub pattern: TexturePattern,
    pub density: PatternDensity,
}

/// Paints texture cues so information is not carried by hue alone
pub struct AccessibilityOverlay {
    spans: Vec<PatternSpan>,
}

impl AccessibilityOverlay {
    pub fn new(spans: Vec<PatternSpan>) -> Self {
        Self { spans }
    }

    pub fn set_spans(&mut self, spans: Vec<PatternSpan>) {
        self.spans = spans;
    }
}

impl OverlayPass for AccessibilityOverlay {
    fn name(&self) -> &str {
        "accessibility-patterns"
    }

    fn stage(&self) -> OverlayStage {
        OverlayStage::PostRegions
    }

    fn paint(&self, frame: &mut Frame, ctx: &OverlayContext<'_>) {
        let ink = theme::with_alpha(Color::WHITE, 0.35);
        for span in &self.spans {
            if span.end <= ctx.bounds.start || span.start >= ctx.bounds.end {
                continue;
            }
            let x0 = ctx.bounds.time_to_pixel(span.start).max(0.0);
            let x1 = ctx.bounds.time_to_pixel(span.end).min(ctx.width);
            if x1 <= x0 {
                continue;
            }
            let spacing = density_spacing(span.density);

            match span.pattern {
                TexturePattern::Lines => {
                    let mut x = x0;
                    while x < x1 {
                        frame.stroke(
                            &Path::line(Point::new(x, 0.0), Point::new(x, ctx.height)),
                            Stroke::default().with_color(ink).with_width(1.0),
                        );
                        x += spacing;
                    }
                }
                TexturePattern::Dots => {
                    let mut y = spacing / 2.0;
                    while y < ctx.height {
                        let mut x = x0 + spacing / 2.0;
                        while x < x1 {
                            frame.fill(&Path::circle(Point::new(x, y), 1.0), ink);
                            x += spacing;
                        }
                        y += spacing;
                    }
                }
                TexturePattern::CrossHatch => {
                    let slant = ctx.height * 0.5;
                    let mut x = x0;
                    while x + slant <= x1 {
                        frame.stroke(
                            &Path::line(Point::new(x, 0.0), Point::new(x + slant, ctx.height)),
                            Stroke::default().with_color(ink).with_width(1.0),
                        );
                        frame.stroke(
                            &Path::line(Point::new(x + slant, 0.0), Point::new(x, ctx.height)),
                            Stroke::default().with_color(ink).with_width(1.0),
                        );
                        x += spacing;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_blend() {
        let result = blend_multiply(
            Color::from_rgb(0.5, 1.0, 0.0),
            Color::from_rgb(0.5, 0.5, 0.5),
        );
        assert!((result.r - 0.25).abs() < 1e-6);
        assert!((result.g - 0.5).abs() < 1e-6);
        assert_eq!(result.b, 0.0);
    }

    #[test]
    fn test_overlay_blend_branches() {
        // Dark base doubles down, bright base pushes up
        let dark = blend_overlay(Color::from_rgb(0.25, 0.25, 0.25), Color::from_rgb(0.5, 0.5, 0.5));
        assert!((dark.r - 0.25).abs() < 1e-6);
        let bright =
            blend_overlay(Color::from_rgb(0.75, 0.75, 0.75), Color::from_rgb(0.5, 0.5, 0.5));
        assert!((bright.r - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_sample_endpoints_and_interior() {
        let stops = [Color::from_rgb(1.0, 0.0, 0.0), Color::from_rgb(0.0, 0.0, 1.0)];
        assert_eq!(gradient_sample(&stops, 0.0), stops[0]);
        assert_eq!(gradient_sample(&stops, 1.0), stops[1]);
        let mid = gradient_sample(&stops, 0.5);
        assert!((mid.r - 0.5).abs() < 1e-6 && (mid.b - 0.5).abs() < 1e-6);
        assert_eq!(gradient_sample(&stops, 2.0), stops[1], "Clamped above range");
    }

    #[test]
    fn test_amplitude_buckets() {
        assert_eq!(amplitude_bucket(0.0), 0);
        assert_eq!(amplitude_bucket(0.02), 1);
        assert_eq!(amplitude_bucket(0.1), 2);
        assert_eq!(amplitude_bucket(0.3), 3);
        assert_eq!(amplitude_bucket(0.6), 4);
        assert_eq!(amplitude_bucket(-0.7), 4, "Bucket ignores sign");
    }

    #[test]
    fn test_dash_segments_cover_the_span() {
        let segments = dash_segments(0.0, 30.0, 8.0, 6.0);
        assert_eq!(segments, vec![(0.0, 8.0), (14.0, 22.0), (28.0, 30.0)]);
    }

    #[test]
    fn test_density_spacing_is_monotonic() {
        assert!(density_spacing(PatternDensity::Sparse) > density_spacing(PatternDensity::Medium));
        assert!(density_spacing(PatternDensity::Dense) > density_spacing(PatternDensity::VeryDense));
    }

    #[test]
    fn test_stack_toggling() {
        let mut stack = OverlayStack::new();
        stack.add(Box::new(AmplitudeLevelOverlay));
        assert!(stack.is_enabled("amplitude-levels"));
        assert!(stack.set_enabled("amplitude-levels", false));
        assert!(!stack.is_enabled("amplitude-levels"));
        assert!(!stack.set_enabled("does-not-exist", true));
    }
}
