//! Viewport state and time<->pixel mapping
//!
//! The viewport manager owns zoom/pan state for the waveform display and is
//! the single source of truth for the visible time range. Renderers consume
//! `ViewportBounds` snapshots; UI code mutates the viewport through the
//! methods here. Every mutation notifies registered listeners so the render
//! engine can coalesce a redraw.

use std::sync::mpsc::Sender;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Minimum zoom level (1.0 = whole track visible)
pub const MIN_ZOOM: f64 = 1.0;

/// Maximum zoom level
pub const MAX_ZOOM: f64 = 10_000.0;

/// Default canvas width used before the first resize arrives
pub const DEFAULT_CANVAS_WIDTH: f32 = 800.0;

/// Default canvas height used before the first resize arrives
pub const DEFAULT_CANVAS_HEIGHT: f32 = 200.0;

// =============================================================================
// Bounds & Rendering Configuration
// =============================================================================

/// Snapshot of the visible time range
///
/// `start`/`end` are in seconds; `pixels_per_second` is derived from the
/// canvas width and zoom level at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportBounds {
    pub start: f64,
    pub end: f64,
    pub pixels_per_second: f64,
}

impl ViewportBounds {
    /// Visible duration in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Map a time to an x position relative to the viewport left edge
    pub fn time_to_pixel(&self, time: f64) -> f32 {
        ((time - self.start) * self.pixels_per_second) as f32
    }

    /// Map an x position back to a time
    pub fn pixel_to_time(&self, pixel: f32) -> f64 {
        self.start + pixel as f64 / self.pixels_per_second
    }

    /// Whether a time falls inside the visible range
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }
}

/// Level of detail tier for the current zoom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    /// Individual samples are discernible
    Sample,
    High,
    Medium,
    Low,
    /// Whole-track overview
    Overview,
}

/// Per-zoom rendering configuration
///
/// `resolution_factor` is the RMS grouping factor applied during culling
/// (1 = no reduction). `detail_level` of `None` lets the renderer pick a
/// routine from sample density alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderingConfig {
    pub detail_level: Option<DetailLevel>,
    pub resolution_factor: u32,
    pub show_grid: bool,
    pub show_zero_crossings: bool,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            detail_level: None,
            resolution_factor: 1,
            show_grid: true,
            show_zero_crossings: false,
        }
    }
}

/// Public zoom state snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub zoom_level: f64,
}

/// Change notification pushed to listeners after every mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportChange {
    pub bounds: ViewportBounds,
}

// =============================================================================
// Viewport Manager
// =============================================================================

/// Owns zoom/pan state and the time<->pixel mapping
///
/// Zoom level 1.0 shows the whole track; higher levels narrow the visible
/// window proportionally. Listeners are mpsc senders; disconnected receivers
/// are dropped silently on the next notification.
pub struct ViewportManager {
    zoom_level: f64,
    /// Visible window start in seconds
    pan_start: f64,
    audio_duration: f64,
    canvas_width: f32,
    canvas_height: f32,
    listeners: Vec<Sender<ViewportChange>>,
}

impl ViewportManager {
    pub fn new() -> Self {
        Self {
            zoom_level: MIN_ZOOM,
            pan_start: 0.0,
            audio_duration: 0.0,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            listeners: Vec::new(),
        }
    }

    /// Register a change listener
    ///
    /// The sender receives one `ViewportChange` per mutation. Bridge the
    /// receiving end into the host's event loop to drive coalesced redraws.
    pub fn add_listener(&mut self, listener: Sender<ViewportChange>) {
        self.listeners.push(listener);
    }

    /// Current visible bounds
    pub fn bounds(&self) -> ViewportBounds {
        let duration = self.visible_duration();
        ViewportBounds {
            start: self.pan_start,
            end: self.pan_start + duration,
            pixels_per_second: self.pixels_per_second(),
        }
    }

    /// Derived pixels-per-second at the current zoom
    pub fn pixels_per_second(&self) -> f64 {
        let duration = self.visible_duration();
        if duration <= 0.0 {
            return 0.0;
        }
        self.canvas_width as f64 / duration
    }

    fn visible_duration(&self) -> f64 {
        if self.audio_duration <= 0.0 {
            return 0.0;
        }
        self.audio_duration / self.zoom_level
    }

    /// Map a time to an x position on the canvas
    pub fn time_to_pixel(&self, time: f64) -> f32 {
        self.bounds().time_to_pixel(time)
    }

    /// Map an x position on the canvas back to a time
    pub fn pixel_to_time(&self, pixel: f32) -> f64 {
        self.bounds().pixel_to_time(pixel)
    }

    /// Whether a time is currently visible
    pub fn is_time_visible(&self, time: f64) -> bool {
        self.bounds().contains(time)
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            zoom_level: self.zoom_level,
        }
    }

    pub fn canvas_dimensions(&self) -> (f32, f32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn audio_duration(&self) -> f64 {
        self.audio_duration
    }

    /// Rendering configuration for the current zoom tier
    ///
    /// The tier table trades detail for reduction: zoomed-in views keep every
    /// sample and show the fine-grained markers, zoomed-out views group
    /// samples aggressively and drop decoration.
    pub fn rendering_config(&self) -> RenderingConfig {
        let zoom = self.zoom_level;
        if zoom >= 500.0 {
            RenderingConfig {
                detail_level: Some(DetailLevel::Sample),
                resolution_factor: 1,
                show_grid: true,
                show_zero_crossings: true,
            }
        } else if zoom >= 100.0 {
            RenderingConfig {
                detail_level: Some(DetailLevel::High),
                resolution_factor: 1,
                show_grid: true,
                show_zero_crossings: true,
            }
        } else if zoom >= 20.0 {
            RenderingConfig {
                detail_level: Some(DetailLevel::Medium),
                resolution_factor: 2,
                show_grid: true,
                show_zero_crossings: false,
            }
        } else if zoom >= 5.0 {
            RenderingConfig {
                detail_level: Some(DetailLevel::Low),
                resolution_factor: 4,
                show_grid: false,
                show_zero_crossings: false,
            }
        } else {
            RenderingConfig {
                detail_level: Some(DetailLevel::Overview),
                resolution_factor: 8,
                show_grid: false,
                show_zero_crossings: false,
            }
        }
    }

    // =========================================================================
    // Mutations (each one notifies listeners)
    // =========================================================================

    /// Set the zoom level, keeping `center_time` centered when possible
    pub fn set_zoom(&mut self, level: f64, center_time: f64) {
        self.zoom_level = level.clamp(MIN_ZOOM, MAX_ZOOM);
        let duration = self.visible_duration();
        self.pan_start = center_time - duration / 2.0;
        self.clamp_pan();
        self.notify();
    }

    /// Pan so the window starts at `time`
    pub fn pan_to_time(&mut self, time: f64) {
        self.pan_start = time;
        self.clamp_pan();
        self.notify();
    }

    /// Update the track duration (re-clamps the current window)
    pub fn set_audio_duration(&mut self, duration: f64) {
        self.audio_duration = duration.max(0.0);
        self.clamp_pan();
        self.notify();
    }

    /// Update canvas dimensions (changes pixels-per-second)
    pub fn set_canvas_dimensions(&mut self, width: f32, height: f32) {
        self.canvas_width = width.max(0.0);
        self.canvas_height = height.max(0.0);
        self.notify();
    }

    fn clamp_pan(&mut self) {
        let duration = self.visible_duration();
        let max_start = (self.audio_duration - duration).max(0.0);
        self.pan_start = self.pan_start.clamp(0.0, max_start);
    }

    fn notify(&mut self) {
        let change = ViewportChange {
            bounds: self.bounds(),
        };
        // Drop listeners whose receiver is gone
        self.listeners.retain(|tx| tx.send(change).is_ok());
    }
}

impl Default for ViewportManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn manager_with_track() -> ViewportManager {
        let mut vp = ViewportManager::new();
        vp.set_canvas_dimensions(800.0, 200.0);
        vp.set_audio_duration(100.0);
        vp
    }

    #[test]
    fn test_full_track_visible_at_min_zoom() {
        let vp = manager_with_track();
        let bounds = vp.bounds();
        assert_eq!(bounds.start, 0.0);
        assert!((bounds.end - 100.0).abs() < 1e-9);
        assert!((bounds.pixels_per_second - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_centers_on_time() {
        let mut vp = manager_with_track();
        vp.set_zoom(10.0, 50.0);
        let bounds = vp.bounds();
        assert!((bounds.duration() - 10.0).abs() < 1e-9);
        assert!((bounds.start - 45.0).abs() < 1e-9, "Window centered on 50s");
    }

    #[test]
    fn test_pan_clamps_to_track() {
        let mut vp = manager_with_track();
        vp.set_zoom(10.0, 50.0);
        vp.pan_to_time(999.0);
        let bounds = vp.bounds();
        assert!((bounds.end - 100.0).abs() < 1e-9, "Window clamped to track end");

        vp.pan_to_time(-5.0);
        assert_eq!(vp.bounds().start, 0.0, "Window clamped to track start");
    }

    #[test]
    fn test_pixel_mapping_round_trip() {
        let mut vp = manager_with_track();
        vp.set_zoom(10.0, 50.0);
        let time = 47.3;
        let px = vp.time_to_pixel(time);
        assert!((vp.pixel_to_time(px) - time).abs() < 1e-6);
    }

    #[test]
    fn test_is_time_visible() {
        let mut vp = manager_with_track();
        vp.set_zoom(10.0, 50.0);
        assert!(vp.is_time_visible(46.0));
        assert!(!vp.is_time_visible(56.0));
    }

    #[test]
    fn test_config_tiers_follow_zoom() {
        let mut vp = manager_with_track();
        assert_eq!(
            vp.rendering_config().detail_level,
            Some(DetailLevel::Overview)
        );
        vp.set_zoom(600.0, 50.0);
        let config = vp.rendering_config();
        assert_eq!(config.detail_level, Some(DetailLevel::Sample));
        assert_eq!(config.resolution_factor, 1);
        assert!(config.show_zero_crossings);
    }

    #[test]
    fn test_listener_notified_on_mutation() {
        let mut vp = manager_with_track();
        let (tx, rx) = channel();
        vp.add_listener(tx);
        vp.set_zoom(4.0, 10.0);
        vp.pan_to_time(3.0);
        let changes: Vec<_> = rx.try_iter().collect();
        assert_eq!(changes.len(), 2, "One change per mutation");
    }

    #[test]
    fn test_dead_listener_is_dropped() {
        let mut vp = manager_with_track();
        let (tx, rx) = channel();
        vp.add_listener(tx);
        drop(rx);
        vp.pan_to_time(1.0);
        vp.pan_to_time(2.0);
        assert_eq!(vp.listeners.len(), 0);
    }
}
