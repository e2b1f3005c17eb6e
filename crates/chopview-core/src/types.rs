//! Common types for Chopview
//!
//! This module contains the fundamental data types shared by the culling,
//! analysis, and rendering layers: the display sample buffer produced by the
//! audio pipeline and the user-defined chop regions drawn over it.

/// Audio sample type (32-bit float, normalized to [-1, 1] for display)
pub type Sample = f32;

/// Default sample rate assumed when the audio pipeline does not report one
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// How the display samples were produced by the audio pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMethod {
    /// Full decode of the source audio
    FullDecode,
    /// Downsampled preview extracted without a full decode
    Preview,
    /// Procedurally generated placeholder (no source audio available)
    Procedural,
}

/// Fidelity tier of the analysis that produced the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisQuality {
    Draft,
    Standard,
    Precise,
}

/// Provenance metadata attached by the audio pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    pub method: AnalysisMethod,
    pub quality: AnalysisQuality,
}

/// Immutable display buffer handed over by the audio pipeline
///
/// Samples are mono-mixed amplitudes in [-1, 1]; `channels` records how many
/// source channels were mixed down. The renderer only ever reads this buffer,
/// and a new one may be supplied on any call (hot-swappable).
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Normalized amplitude values in [-1, 1]
    pub samples: Vec<Sample>,
    /// Sample rate of the display data in Hz
    pub sample_rate: u32,
    /// Channel count of the source audio (display data is mono-mixed)
    pub channels: u16,
    /// Optional provenance metadata from the analysis stage
    pub provenance: Option<Provenance>,
}

impl SampleBuffer {
    /// Create a buffer from mono-mixed samples
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate: if sample_rate == 0 {
                DEFAULT_SAMPLE_RATE
            } else {
                sample_rate
            },
            channels: 1,
            provenance: None,
        }
    }

    /// Attach provenance metadata
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Duration of the display data in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// A user-defined chop region over the waveform
///
/// Owned and mutated by the UI layer; the renderer treats the set passed to
/// each call as a stable snapshot and never writes back. `start_time <
/// end_time` is the caller's invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Stable identifier, unique within a region set
    pub id: u64,
    /// Start of the region in seconds
    pub start_time: f64,
    /// End of the region in seconds (exclusive)
    pub end_time: f64,
    /// Optional display label (falls back to the id)
    pub label: Option<String>,
    /// Optional pad assignment (0-15 on a 4x4 pad grid)
    pub pad: Option<u8>,
    /// Optional explicit display color as linear RGB; when absent the
    /// renderer derives a stable color from the id
    pub color: Option<[f32; 3]>,
}

impl Region {
    /// Create a region spanning `[start_time, end_time)`
    pub fn new(id: u64, start_time: f64, end_time: f64) -> Self {
        Self {
            id,
            start_time,
            end_time,
            label: None,
            pad: None,
            color: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Region length in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether a time falls inside the region
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }
}
