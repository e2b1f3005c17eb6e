//! Layered waveform rendering
//!
//! `ChopRenderer` is the engine: it owns the layer stack, the viewport, the
//! metrics, and the per-layer scene snapshots. Render calls do the
//! data-proportional work (culling, LOD selection, relationship analysis)
//! up front; painting happens once per dirty layer when the canvas
//! composites.

pub mod chrome;
pub mod overlay;
pub mod regions;
pub mod waveform;

mod engine;

pub use engine::{
    chop_view, ChopCanvas, ChopRenderer, ChromeOptions, CursorOptions, RegionOptions,
    WaveformOptions, LAYER_BACKGROUND, LAYER_CHROME, LAYER_CURSOR, LAYER_INTERACTION,
    LAYER_REGIONS, LAYER_WAVEFORM,
};
