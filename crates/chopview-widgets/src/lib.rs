//! Layered iced canvas rendering for Chopview
//!
//! This crate draws the waveform, chop regions, playback cursor, and chrome
//! of a sample-chopping tool onto named, z-ordered layers, keeping per-frame
//! work proportional to the visible data.
//!
//! ## Architecture (iced 0.14 patterns)
//!
//! Following idiomatic iced patterns, rendering is split into:
//!
//! - **Scenes**: per-layer snapshots computed by the engine's render calls
//!   (culling, LOD selection, relationship analysis)
//! - **Painters**: thin functions that turn a scene into canvas geometry,
//!   one per drawing routine
//! - **Canvas Program** (`ChopCanvas`): composites the layer stack into the
//!   host's view
//!
//! ## Scheduling
//!
//! The engine is cooperative: render calls stage work and request one
//! coalesced frame through a [`scheduler::FrameScheduler`]; the host fires
//! the wake (bridge the channel with [`scheduler::poll_subscription`]) and
//! repaints the canvas.

pub mod layer;
pub mod render;
pub mod scheduler;
pub mod theme;

pub use layer::{LayerError, LayerManager, LayerOptions, RenderLayer};
pub use render::{
    chop_view, ChopCanvas, ChopRenderer, ChromeOptions, CursorOptions, RegionOptions,
    WaveformOptions,
};
pub use scheduler::{ChannelScheduler, FrameHandle, FrameScheduler, FrameWake, ManualScheduler};
pub use theme::{color_for_id, ColorCache};

// Overlay passes for hosts that opt into the enhancement layers
pub use render::overlay::{
    AccessibilityOverlay, AmplitudeLevelOverlay, FillPattern, FrequencyBandOverlay,
    FrequencySegment, OverlayPass, OverlayStage, PatternDensity, PatternSpan, Section,
    SectionOverlay, TexturePattern,
};
