//! Named, z-ordered drawing layers
//!
//! Each layer pairs an iced geometry cache with a dirty flag and compositing
//! options. The engine repaints a layer's cache only after the layer was
//! marked dirty; clean layers reuse their cached geometry when the canvas
//! composites. Layers are created once at engine construction and destroyed
//! together.

use iced::widget::canvas;
use std::cell::Cell;
use thiserror::Error;

/// Layer lookup failures
///
/// Never crosses the public render API: a missing surface skips that draw
/// for the current frame and self-heals once the layer exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("Layer not found: {0}")]
    Missing(String),

    #[error("Layer stack already destroyed")]
    Destroyed,
}

/// Compositing options fixed at layer creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerOptions {
    /// Layer has no alpha channel of its own (painted fully opaque)
    pub opaque: bool,
    /// Commit may lag a frame behind (non-critical chrome)
    pub deferred_commit: bool,
    /// Layer receives pointer events
    pub interactive: bool,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            opaque: false,
            deferred_commit: false,
            interactive: false,
        }
    }
}

/// One named drawing surface
#[derive(Debug)]
pub struct RenderLayer {
    name: String,
    z_index: i32,
    options: LayerOptions,
    cache: canvas::Cache,
    dirty: Cell<bool>,
}

impl RenderLayer {
    fn new(name: impl Into<String>, z_index: i32, options: LayerOptions) -> Self {
        Self {
            name: name.into(),
            z_index,
            options,
            cache: canvas::Cache::new(),
            dirty: Cell::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn options(&self) -> LayerOptions {
        self.options
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Invalidate cached geometry; the next composite repaints this layer
    pub fn mark_dirty(&self) {
        self.dirty.set(true);
        self.cache.clear();
    }

    pub fn mark_clean(&self) {
        self.dirty.set(false);
    }

    /// The geometry cache to paint through
    pub fn cache(&self) -> &canvas::Cache {
        &self.cache
    }
}

/// Owns the layer stack and its shared dimensions
pub struct LayerManager {
    layers: Vec<RenderLayer>,
    width: f32,
    height: f32,
    destroyed: bool,
}

impl LayerManager {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            layers: Vec::new(),
            width,
            height,
            destroyed: false,
        }
    }

    /// Create a layer; replaces an existing layer of the same name
    pub fn create_layer(&mut self, name: &str, z_index: i32, options: LayerOptions) {
        if self.destroyed {
            log::warn!("create_layer: stack already destroyed, ignoring {:?}", name);
            return;
        }
        if let Some(pos) = self.layers.iter().position(|l| l.name == name) {
            log::debug!("create_layer: replacing existing layer {:?}", name);
            self.layers.remove(pos);
        }
        self.layers.push(RenderLayer::new(name, z_index, options));
        self.layers.sort_by_key(|l| l.z_index);
    }

    /// Look up a layer by name
    pub fn layer(&self, name: &str) -> Result<&RenderLayer, LayerError> {
        if self.destroyed {
            return Err(LayerError::Destroyed);
        }
        self.layers
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| LayerError::Missing(name.to_string()))
    }

    /// Drop a layer's content (next composite starts from an empty surface)
    pub fn clear_layer(&self, name: &str) {
        if let Ok(layer) = self.layer(name) {
            layer.mark_dirty();
        }
    }

    pub fn mark_dirty(&self, name: &str) {
        if let Ok(layer) = self.layer(name) {
            layer.mark_dirty();
        }
    }

    pub fn mark_clean(&self, name: &str) {
        if let Ok(layer) = self.layer(name) {
            layer.mark_clean();
        }
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.layer(name).map(|l| l.is_dirty()).unwrap_or(false)
    }

    pub fn mark_all_dirty(&self) {
        for layer in &self.layers {
            layer.mark_dirty();
        }
    }

    /// Shared surface dimensions
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Resize all layers; invalidates everything
    pub fn update_dimensions(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.mark_all_dirty();
    }

    /// Flag a layer as pointer-event receiver
    pub fn enable_interaction(&mut self, name: &str) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.name == name) {
            layer.options.interactive = true;
        }
    }

    /// Layers in compositing order (back to front)
    pub fn iter(&self) -> impl Iterator<Item = &RenderLayer> {
        self.layers.iter()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tear down all layers; safe to call repeatedly
    pub fn destroy(&mut self) {
        self.layers.clear();
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> LayerManager {
        let mut layers = LayerManager::new(800.0, 200.0);
        layers.create_layer("background", 0, LayerOptions { opaque: true, ..Default::default() });
        layers.create_layer("waveform", 10, LayerOptions::default());
        layers.create_layer("cursor", 30, LayerOptions::default());
        layers.create_layer("regions", 20, LayerOptions::default());
        layers
    }

    #[test]
    fn test_layers_iterate_in_z_order() {
        let layers = stack();
        let names: Vec<_> = layers.iter().map(|l| l.name().to_string()).collect();
        assert_eq!(names, ["background", "waveform", "regions", "cursor"]);
    }

    #[test]
    fn test_new_layers_start_dirty() {
        let layers = stack();
        assert!(layers.is_dirty("waveform"));
    }

    #[test]
    fn test_dirty_bookkeeping() {
        let layers = stack();
        layers.mark_clean("waveform");
        assert!(!layers.is_dirty("waveform"));
        layers.mark_dirty("waveform");
        assert!(layers.is_dirty("waveform"));
    }

    #[test]
    fn test_mark_all_dirty() {
        let layers = stack();
        for layer in layers.iter() {
            layer.mark_clean();
        }
        layers.mark_all_dirty();
        assert!(layers.iter().all(|l| l.is_dirty()));
    }

    #[test]
    fn test_missing_layer_reports_error() {
        let layers = stack();
        assert_eq!(
            layers.layer("nope").unwrap_err(),
            LayerError::Missing("nope".to_string())
        );
        assert!(!layers.is_dirty("nope"));
    }

    #[test]
    fn test_resize_invalidates_all() {
        let mut layers = stack();
        for layer in layers.iter() {
            layer.mark_clean();
        }
        layers.update_dimensions(1024.0, 300.0);
        assert_eq!(layers.dimensions(), (1024.0, 300.0));
        assert!(layers.iter().all(|l| l.is_dirty()));
    }

    #[test]
    fn test_enable_interaction() {
        let mut layers = stack();
        layers.enable_interaction("cursor");
        assert!(layers.layer("cursor").unwrap().options().interactive);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut layers = stack();
        layers.destroy();
        layers.destroy();
        assert!(layers.is_destroyed());
        assert_eq!(layers.layer("waveform").unwrap_err(), LayerError::Destroyed);
    }
}
