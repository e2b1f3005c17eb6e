//! The render engine
//!
//! Public operations are idempotent given unchanged inputs and viewport, do
//! work proportional to the visible data, and never throw on absent or
//! empty input: a no-op render still records a zeroed metrics entry. Redraw
//! requests coalesce into at most one pending frame; `destroy` cancels it
//! and is safe to call repeatedly.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;
use std::time::Instant;

use iced::widget::canvas::{Canvas, Frame, Geometry, Program};
use iced::{mouse, Color, Element, Length, Rectangle, Size, Theme};

use chopview_core::config::{RenderQuality, RenderSettings};
use chopview_core::cull::{choose_routine, cull_window, visible_regions, CulledWindow, DrawRoutine};
use chopview_core::metrics::PerformanceMetrics;
use chopview_core::relationship::{analyze, RelationshipKind};
use chopview_core::types::{Region, SampleBuffer};
use chopview_core::viewport::{ViewportBounds, ViewportChange, ViewportManager};

use crate::layer::{LayerManager, LayerOptions};
use crate::render::overlay::{OverlayContext, OverlayPass, OverlayStack, OverlayStage};
use crate::render::regions::{RegionVisual, RelationshipVisual};
use crate::render::{chrome, regions, waveform};
use crate::scheduler::{FrameHandle, FrameScheduler, FrameWake};
use crate::theme::{self, ColorCache};

// =============================================================================
// Layer names
// =============================================================================

pub const LAYER_BACKGROUND: &str = "background";
pub const LAYER_WAVEFORM: &str = "waveform";
pub const LAYER_REGIONS: &str = "regions";
pub const LAYER_CURSOR: &str = "cursor";
pub const LAYER_INTERACTION: &str = "interaction";
pub const LAYER_CHROME: &str = "ui";

// =============================================================================
// Render options
// =============================================================================

/// Per-call waveform options; `None` fields defer to the viewport config
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveformOptions {
    pub color: Option<Color>,
    pub show_grid: Option<bool>,
    pub show_zero_crossings: Option<bool>,
}

/// Per-call region options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionOptions {
    /// Region under the pointer, if the host tracks hover
    pub hovered: Option<u64>,
    /// Region currently playing (gets the pulsing highlight)
    pub playing: Option<u64>,
    /// Pulse phase in [0, 1), advanced by the host per frame
    pub pulse_phase: f32,
    /// Paint overlap/adjacency annotations
    pub show_relationships: bool,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            hovered: None,
            playing: None,
            pulse_phase: 0.0,
            show_relationships: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorOptions {
    pub show_time_label: bool,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            show_time_label: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromeOptions {
    pub show_ruler: bool,
    pub show_zoom_indicator: bool,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            show_ruler: true,
            show_zoom_indicator: true,
        }
    }
}

// =============================================================================
// Scene snapshots (computed per render call, painted per dirty layer)
// =============================================================================

struct WaveformScene {
    window: CulledWindow,
    bounds: ViewportBounds,
    routine: DrawRoutine,
    color: Color,
    show_grid: bool,
    zero_crossings: Vec<usize>,
}

struct RegionScene {
    bounds: ViewportBounds,
    visuals: Vec<RegionVisual>,
    relationships: Vec<RelationshipVisual>,
    pulse_phase: f32,
}

struct CursorScene {
    bounds: ViewportBounds,
    time: f64,
    playing: bool,
    show_label: bool,
}

struct ChromeScene {
    bounds: ViewportBounds,
    zoom_level: f64,
    show_ruler: bool,
    show_zoom_indicator: bool,
}

// =============================================================================
// Engine
// =============================================================================

/// Layered waveform render engine
///
/// Single-threaded and cooperative: render calls run synchronously, the
/// engine yields to the host between frames through its `FrameScheduler`.
/// Region sets and buffers are read as stable snapshots per call.
pub struct ChopRenderer {
    layers: LayerManager,
    viewport: ViewportManager,
    viewport_changes: Receiver<ViewportChange>,
    settings: RenderSettings,
    scheduler: Box<dyn FrameScheduler>,
    pending_frame: Option<FrameHandle>,
    metrics: RefCell<PerformanceMetrics>,
    colors: ColorCache,
    overlays: OverlayStack,
    waveform_scene: Option<WaveformScene>,
    region_scene: Option<RegionScene>,
    cursor_scene: Option<CursorScene>,
    chrome_scene: Option<ChromeScene>,
    destroyed: bool,
}

impl ChopRenderer {
    /// Create the engine with its full layer stack
    pub fn new(
        settings: RenderSettings,
        scheduler: Box<dyn FrameScheduler>,
        width: f32,
        height: f32,
    ) -> Self {
        let mut layers = LayerManager::new(width, height);
        layers.create_layer(
            LAYER_BACKGROUND,
            0,
            LayerOptions {
                opaque: true,
                ..LayerOptions::default()
            },
        );
        layers.create_layer(LAYER_WAVEFORM, 10, LayerOptions::default());
        layers.create_layer(LAYER_REGIONS, 20, LayerOptions::default());
        layers.create_layer(LAYER_CURSOR, 30, LayerOptions::default());
        layers.create_layer(LAYER_INTERACTION, 40, LayerOptions::default());
        layers.create_layer(
            LAYER_CHROME,
            50,
            LayerOptions {
                deferred_commit: true,
                ..LayerOptions::default()
            },
        );
        layers.enable_interaction(LAYER_INTERACTION);

        let (tx, viewport_changes) = std::sync::mpsc::channel();
        let mut viewport = ViewportManager::new();
        viewport.set_canvas_dimensions(width, height);
        viewport.add_listener(tx);

        let color_capacity = settings.color_cache_capacity;
        Self {
            layers,
            viewport,
            viewport_changes,
            settings,
            scheduler,
            pending_frame: None,
            metrics: RefCell::new(PerformanceMetrics::new()),
            colors: ColorCache::new(color_capacity),
            overlays: OverlayStack::new(),
            waveform_scene: None,
            region_scene: None,
            cursor_scene: None,
            chrome_scene: None,
            destroyed: false,
        }
    }

    // =========================================================================
    // Collaborator access
    // =========================================================================

    pub fn viewport(&self) -> &ViewportManager {
        &self.viewport
    }

    /// Mutable viewport access for the controlling UI
    ///
    /// Changes are picked up (and coalesced into one redraw) on the next
    /// engine call; call [`ChopRenderer::process_viewport_events`] to apply
    /// them immediately.
    pub fn viewport_mut(&mut self) -> &mut ViewportManager {
        &mut self.viewport
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Register an overlay pass at its hook point
    pub fn add_overlay(&mut self, pass: Box<dyn OverlayPass>) {
        self.overlays.add(pass);
        self.layers.mark_dirty(LAYER_WAVEFORM);
        self.layers.mark_dirty(LAYER_REGIONS);
        self.request_redraw();
    }

    /// Toggle an overlay pass by name
    pub fn set_overlay_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let found = self.overlays.set_enabled(name, enabled);
        if found {
            self.layers.mark_dirty(LAYER_WAVEFORM);
            self.layers.mark_dirty(LAYER_REGIONS);
            self.request_redraw();
        }
        found
    }

    // =========================================================================
    // Frame scheduling
    // =========================================================================

    /// Drain pending viewport-change notifications
    ///
    /// Any change dirties every layer and schedules one coalesced redraw,
    /// however many notifications were queued.
    pub fn process_viewport_events(&mut self) {
        let mut changed = false;
        while self.viewport_changes.try_recv().is_ok() {
            changed = true;
        }
        if changed {
            self.layers.mark_all_dirty();
            self.request_redraw();
        }
    }

    fn request_redraw(&mut self) {
        if self.destroyed {
            return;
        }
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.scheduler.request_frame());
        }
    }

    /// Accept a scheduler wakeup; true when a repaint should happen
    ///
    /// Stale wakes (cancelled or already consumed) return false.
    pub fn frame_fired(&mut self, wake: FrameWake) -> bool {
        if self.destroyed {
            return false;
        }
        if self.pending_frame == Some(wake.handle) {
            self.pending_frame = None;
            true
        } else {
            false
        }
    }

    // =========================================================================
    // Public render operations
    // =========================================================================

    /// Cull, reduce, and stage the waveform for painting
    pub fn render_waveform(&mut self, buffer: &SampleBuffer, options: &WaveformOptions) {
        if self.destroyed {
            return;
        }
        self.process_viewport_events();
        let started = Instant::now();

        let bounds = self.viewport.bounds();
        if buffer.is_empty() || bounds.duration() <= 0.0 {
            self.waveform_scene = None;
            self.layers.clear_layer(LAYER_WAVEFORM);
            let mut metrics = self.metrics.borrow_mut();
            metrics.set_culled_elements(0);
            metrics.record_op("waveform", started.elapsed());
            drop(metrics);
            self.request_redraw();
            return;
        }

        let mut config = self.viewport.rendering_config();
        if let Some(show_grid) = options.show_grid {
            config.show_grid = show_grid;
        }
        if let Some(show_zc) = options.show_zero_crossings {
            config.show_zero_crossings = show_zc;
        }

        let window = cull_window(
            buffer,
            &bounds,
            config.resolution_factor,
            self.settings.guard_band_secs,
            self.settings.culling_enabled,
        );
        self.metrics.borrow_mut().set_culled_elements(window.culled);

        let (width, _) = self.layers.dimensions();
        let routine = choose_routine(&window, config.detail_level, width);
        let zero_crossings = if config.show_zero_crossings {
            waveform::zero_crossings(&window.samples)
        } else {
            Vec::new()
        };

        self.waveform_scene = Some(WaveformScene {
            window,
            bounds,
            routine,
            color: options.color.unwrap_or(theme::WAVEFORM),
            show_grid: config.show_grid,
            zero_crossings,
        });
        self.layers.clear_layer(LAYER_WAVEFORM);
        self.metrics
            .borrow_mut()
            .record_op("waveform", started.elapsed());
        self.request_redraw();
    }

    /// Stage the visible regions and their relationship annotations
    pub fn render_regions(
        &mut self,
        all_regions: &[Region],
        selected: Option<u64>,
        options: &RegionOptions,
    ) {
        if self.destroyed {
            return;
        }
        self.process_viewport_events();
        let started = Instant::now();

        let bounds = self.viewport.bounds();
        if all_regions.is_empty() || bounds.duration() <= 0.0 {
            self.region_scene = None;
            self.layers.clear_layer(LAYER_REGIONS);
            let mut metrics = self.metrics.borrow_mut();
            metrics.set_culled_elements(0);
            metrics.record_op("regions", started.elapsed());
            drop(metrics);
            self.request_redraw();
            return;
        }

        let visible = visible_regions(all_regions, &bounds);
        self.metrics
            .borrow_mut()
            .set_culled_elements(all_regions.len() - visible.len());

        let visuals: Vec<RegionVisual> = visible
            .iter()
            .map(|&index| {
                let region = all_regions[index].clone();
                let color = match region.color {
                    Some([r, g, b]) => Color::from_rgb(r, g, b),
                    None => self.colors.color_for(region.id),
                };
                RegionVisual {
                    selected: selected == Some(region.id),
                    hovered: options.hovered == Some(region.id),
                    playing: options.playing == Some(region.id),
                    color,
                    region,
                }
            })
            .collect();

        let relationships = if options.show_relationships {
            self.resolve_relationships(all_regions, &visible)
        } else {
            Vec::new()
        };

        self.region_scene = Some(RegionScene {
            bounds,
            visuals,
            relationships,
            pulse_phase: options.pulse_phase,
        });
        self.layers.clear_layer(LAYER_REGIONS);
        self.metrics
            .borrow_mut()
            .record_op("regions", started.elapsed());
        self.request_redraw();
    }

    /// Stage the playback cursor
    pub fn render_cursor(&mut self, time: f64, is_playing: bool, options: &CursorOptions) {
        if self.destroyed {
            return;
        }
        self.process_viewport_events();
        let started = Instant::now();

        self.cursor_scene = Some(CursorScene {
            bounds: self.viewport.bounds(),
            time,
            playing: is_playing,
            show_label: options.show_time_label,
        });
        self.layers.clear_layer(LAYER_CURSOR);
        self.metrics
            .borrow_mut()
            .record_op("cursor", started.elapsed());
        self.request_redraw();
    }

    /// Stage the border, ruler, and zoom indicator
    pub fn render_chrome(&mut self, options: &ChromeOptions) {
        if self.destroyed {
            return;
        }
        self.process_viewport_events();
        let started = Instant::now();

        self.chrome_scene = Some(ChromeScene {
            bounds: self.viewport.bounds(),
            zoom_level: self.viewport.state().zoom_level,
            show_ruler: options.show_ruler,
            show_zoom_indicator: options.show_zoom_indicator,
        });
        self.layers.clear_layer(LAYER_CHROME);
        self.metrics
            .borrow_mut()
            .record_op("chrome", started.elapsed());
        self.request_redraw();
    }

    /// Resize every layer and the viewport mapping
    pub fn resize(&mut self, width: f32, height: f32) {
        if self.destroyed {
            return;
        }
        self.layers.update_dimensions(width, height);
        self.viewport.set_canvas_dimensions(width, height);
        self.process_viewport_events();
    }

    /// Change the quality tier (stroke widths only, never geometry)
    pub fn set_quality(&mut self, quality: RenderQuality) {
        if self.destroyed || self.settings.quality == quality {
            return;
        }
        self.settings.quality = quality;
        self.layers.mark_all_dirty();
        self.request_redraw();
    }

    /// Enable or disable viewport culling
    ///
    /// Disabling still produces a correct image on the next waveform render,
    /// just from the whole buffer.
    pub fn set_culling(&mut self, enabled: bool) {
        if self.destroyed {
            return;
        }
        self.settings.culling_enabled = enabled;
        self.layers.mark_dirty(LAYER_WAVEFORM);
        self.request_redraw();
    }

    /// Snapshot of the performance counters
    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.borrow().clone()
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.borrow_mut().reset();
    }

    /// Cancel any pending frame and tear down the layer stack
    ///
    /// Safe to call multiple times; every later operation is a no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.waveform_scene = None;
        self.region_scene = None;
        self.cursor_scene = None;
        self.chrome_scene = None;
        self.layers.destroy();
        self.destroyed = true;
    }

    // =========================================================================
    // Relationship resolution
    // =========================================================================

    /// Analyze visible regions against the full set and dedup pairs
    fn resolve_relationships(
        &self,
        all_regions: &[Region],
        visible: &[usize],
    ) -> Vec<RelationshipVisual> {
        let config = self.settings.relationship_config();
        let by_id: HashMap<u64, &Region> = all_regions.iter().map(|r| (r.id, r)).collect();
        let mut seen: HashSet<(u64, u64)> = HashSet::new();
        let mut resolved = Vec::new();

        for &index in visible {
            let region = &all_regions[index];
            for relationship in analyze(region, all_regions, &config) {
                let key = (
                    region.id.min(relationship.partner),
                    region.id.max(relationship.partner),
                );
                if !seen.insert(key) {
                    continue;
                }
                let Some(partner) = by_id.get(&relationship.partner) else {
                    continue;
                };
                let visual = match relationship.kind {
                    RelationshipKind::Overlap { severity } => RelationshipVisual::Overlap {
                        start: region.start_time.max(partner.start_time),
                        end: region.end_time.min(partner.end_time),
                        severe: severity >= config.severe_overlap_threshold,
                    },
                    RelationshipKind::AdjacentAfter { .. } => RelationshipVisual::Adjacency {
                        from: region.end_time,
                        to: partner.start_time,
                    },
                    RelationshipKind::AdjacentBefore { .. } => RelationshipVisual::Adjacency {
                        from: partner.end_time,
                        to: region.start_time,
                    },
                };
                resolved.push(visual);
            }
        }

        resolved
    }

    // =========================================================================
    // Painting (runs inside the canvas composite)
    // =========================================================================

    /// Paint every layer in z-order, reusing cached geometry where clean
    pub fn draw_layers(&self, renderer: &iced::Renderer, size: Size) -> Vec<Geometry> {
        if self.destroyed {
            return Vec::new();
        }
        let frame_start = Instant::now();

        let geometries = self
            .layers
            .iter()
            .map(|layer| {
                let geometry = layer.cache().draw(renderer, size, |frame| {
                    let paint_start = Instant::now();
                    self.paint_layer(layer.name(), frame);
                    self.metrics
                        .borrow_mut()
                        .record_op(&format!("paint.{}", layer.name()), paint_start.elapsed());
                });
                layer.mark_clean();
                geometry
            })
            .collect();

        self.metrics.borrow_mut().record_frame(frame_start.elapsed());
        geometries
    }

    fn paint_layer(&self, name: &str, frame: &mut Frame) {
        let (width, height) = self.layers.dimensions();
        match name {
            LAYER_BACKGROUND => {
                frame.fill_rectangle(iced::Point::ORIGIN, frame.size(), theme::BACKGROUND);
            }
            LAYER_WAVEFORM => {
                let Some(scene) = &self.waveform_scene else {
                    return;
                };
                if scene.show_grid {
                    waveform::paint_grid(frame, &scene.bounds, width, height);
                }
                waveform::paint(
                    frame,
                    &scene.window,
                    &scene.bounds,
                    scene.routine,
                    scene.color,
                    self.settings.quality,
                    width,
                    height,
                );
                if !scene.zero_crossings.is_empty() {
                    waveform::paint_zero_crossings(
                        frame,
                        &scene.zero_crossings,
                        &scene.window,
                        &scene.bounds,
                        width,
                        height,
                    );
                }
                self.overlays.paint_stage(
                    frame,
                    OverlayStage::PostWaveform,
                    &OverlayContext {
                        bounds: &scene.bounds,
                        window: Some(&scene.window),
                        width,
                        height,
                    },
                );
            }
            LAYER_REGIONS => {
                let Some(scene) = &self.region_scene else {
                    return;
                };
                for visual in &scene.visuals {
                    regions::paint_region(
                        frame,
                        visual,
                        &scene.bounds,
                        self.settings.quality,
                        width,
                        height,
                        scene.pulse_phase,
                    );
                }
                for &relationship in &scene.relationships {
                    regions::paint_relationship(frame, relationship, &scene.bounds, width, height);
                }
                self.overlays.paint_stage(
                    frame,
                    OverlayStage::PostRegions,
                    &OverlayContext {
                        bounds: &scene.bounds,
                        window: self.waveform_scene.as_ref().map(|s| &s.window),
                        width,
                        height,
                    },
                );
            }
            LAYER_CURSOR => {
                let Some(scene) = &self.cursor_scene else {
                    return;
                };
                chrome::paint_cursor(
                    frame,
                    scene.time,
                    scene.playing,
                    &scene.bounds,
                    self.settings.quality,
                    width,
                    height,
                    scene.show_label,
                );
            }
            LAYER_CHROME => {
                let Some(scene) = &self.chrome_scene else {
                    return;
                };
                chrome::paint_chrome(
                    frame,
                    &scene.bounds,
                    scene.zoom_level,
                    width,
                    height,
                    scene.show_ruler,
                    scene.show_zoom_indicator,
                );
            }
            // The interaction layer is reserved for host-drawn gesture
            // feedback; the engine leaves it empty
            _ => {}
        }
    }
}

// =============================================================================
// Canvas integration
// =============================================================================

/// Canvas program compositing the engine's layers
pub struct ChopCanvas<'a> {
    pub engine: &'a ChopRenderer,
}

impl<'a, Message> Program<Message> for ChopCanvas<'a> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        self.engine.draw_layers(renderer, bounds.size())
    }
}

/// Create the waveform canvas element for a host view
pub fn chop_view<'a, Message>(engine: &'a ChopRenderer) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    Canvas::new(ChopCanvas { engine })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}
