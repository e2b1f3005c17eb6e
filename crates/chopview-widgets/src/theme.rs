//! Shared theme constants for Chopview rendering
//!
//! Color schemes and visual constants used by the waveform, region, cursor,
//! and overlay painters, plus the per-region generated-color cache.

use iced::Color;
use std::collections::HashMap;

use chopview_core::config::RenderQuality;

const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Color {
    Color { r, g, b, a }
}

/// Waveform panel background
pub const BACKGROUND: Color = Color::from_rgb(0.08, 0.08, 0.1);

/// Horizontal center (zero amplitude) line
pub const CENTER_LINE: Color = rgba(0.4, 0.4, 0.45, 0.6);

/// Base waveform color
pub const WAVEFORM: Color = Color::from_rgb(0.0, 0.8, 0.8);

/// Minor grid line
pub const GRID_LINE: Color = rgba(0.4, 0.4, 0.4, 0.4);

/// Playback cursor (paused)
pub const CURSOR: Color = Color::from_rgb(1.0, 1.0, 1.0);

/// Playback cursor (playing)
pub const CURSOR_PLAYING: Color = Color::from_rgb(1.0, 0.85, 0.3);

/// Zero-crossing tick marker
pub const ZERO_CROSSING: Color = rgba(1.0, 0.6, 0.1, 0.8);

/// Chrome border and ruler ink
pub const CHROME: Color = rgba(0.7, 0.7, 0.8, 0.9);

/// Overlap warning band below the severity threshold
pub const OVERLAP_MILD: Color = rgba(1.0, 0.8, 0.2, 0.5);

/// Overlap warning band at or above the severity threshold
pub const OVERLAP_SEVERE: Color = rgba(1.0, 0.25, 0.2, 0.65);

/// Adjacency connector between near-touching regions
pub const ADJACENCY: Color = rgba(0.5, 0.9, 0.5, 0.8);

/// Amplitude-level palette: silent, quiet, moderate, loud, peak
pub const AMPLITUDE_COLORS: [Color; 5] = [
    Color::from_rgb(0.25, 0.28, 0.35), // Silent - slate
    Color::from_rgb(0.2, 0.5, 0.7),    // Quiet - blue
    Color::from_rgb(0.2, 0.75, 0.45),  // Moderate - green
    Color::from_rgb(0.95, 0.7, 0.15),  // Loud - amber
    Color::from_rgb(0.95, 0.25, 0.2),  // Peak - red
];

/// Frequency gradient stops, bass (warm) to treble (cool)
pub const FREQUENCY_STOPS: [Color; 4] = [
    Color::from_rgb(0.95, 0.4, 0.15), // Bass - warm orange
    Color::from_rgb(0.95, 0.75, 0.2), // Low-mid - yellow
    Color::from_rgb(0.3, 0.8, 0.6),   // High-mid - teal
    Color::from_rgb(0.3, 0.45, 0.95), // Treble - cool blue
];

/// Stroke width for a quality tier
pub fn stroke_width(quality: RenderQuality) -> f32 {
    match quality {
        RenderQuality::Low => 1.0,
        RenderQuality::Medium => 1.5,
        RenderQuality::High => 2.0,
    }
}

/// Dim a color towards the background, keeping its alpha
pub fn dimmed(color: Color, factor: f32) -> Color {
    Color::from_rgba(color.r * factor, color.g * factor, color.b * factor, color.a)
}

/// Same color at a different alpha
pub fn with_alpha(color: Color, alpha: f32) -> Color {
    Color::from_rgba(color.r, color.g, color.b, alpha)
}

// =============================================================================
// Deterministic Region Colors
// =============================================================================

/// Stable display color for a region id
///
/// Hashes the id to a hue and keeps saturation/value fixed, so repeated
/// calls agree and distinct ids land far apart on the wheel.
pub fn color_for_id(id: u64) -> Color {
    let hash = splitmix64(id);
    let hue = (hash % 360) as f32;
    hsv_to_rgb(hue, 0.65, 0.85)
}

/// SplitMix64 finalizer, enough mixing to scatter sequential ids
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// HSV to RGB, hue in degrees, s/v in [0, 1]
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Color {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    Color::from_rgb(r + m, g + m, b + m)
}

/// Bounded id -> color cache owned by the render engine
///
/// Entries regenerate deterministically, so hitting the capacity simply
/// flushes the map instead of tracking recency.
pub struct ColorCache {
    map: HashMap<u64, Color>,
    capacity: usize,
}

impl ColorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Color for a region id, generating and caching on first use
    pub fn color_for(&mut self, id: u64) -> Color {
        if let Some(color) = self.map.get(&id) {
            return *color;
        }
        if self.map.len() >= self.capacity {
            log::debug!("ColorCache: flushing {} entries", self.map.len());
            self.map.clear();
        }
        let color = color_for_id(id);
        self.map.insert(id, color);
        color
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_for_id_is_stable() {
        assert_eq!(color_for_id(7), color_for_id(7));
        assert_eq!(color_for_id(u64::MAX), color_for_id(u64::MAX));
    }

    #[test]
    fn test_color_for_id_scatters_sequential_ids() {
        let distinct: std::collections::HashSet<_> = (0..32u64)
            .map(|id| {
                let c = color_for_id(id);
                (
                    (c.r * 255.0) as u8,
                    (c.g * 255.0) as u8,
                    (c.b * 255.0) as u8,
                )
            })
            .collect();
        assert!(
            distinct.len() >= 28,
            "Sequential ids should rarely collide, got {} distinct",
            distinct.len()
        );
    }

    #[test]
    fn test_cache_returns_generated_color() {
        let mut cache = ColorCache::new(16);
        let first = cache.color_for(3);
        assert_eq!(first, cache.color_for(3));
        assert_eq!(first, color_for_id(3));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_is_bounded() {
        let mut cache = ColorCache::new(4);
        for id in 0..20 {
            cache.color_for(id);
        }
        assert!(cache.len() <= 4, "Cache must stay within capacity");
    }

    #[test]
    fn test_hsv_primaries() {
        let red = hsv_to_rgb(0.0, 1.0, 1.0);
        assert!((red.r - 1.0).abs() < 1e-6 && red.g < 1e-6 && red.b < 1e-6);
        let green = hsv_to_rgb(120.0, 1.0, 1.0);
        assert!(green.g > 0.99 && green.r < 1e-6);
    }
}
