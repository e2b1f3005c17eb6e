//! Render settings with YAML persistence
//!
//! The hand-tuned constants of the engine (guard band, adjacency tolerance,
//! overlap warning threshold, target refresh rate) live here so deployments
//! can calibrate them without a rebuild. Loading is forgiving: a missing or
//! unparsable file falls back to defaults with a warning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Visual quality tier
///
/// Affects stroke widths and smoothing only, never the geometry of what is
/// drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    Low,
    Medium,
    High,
}

/// Engine settings, persisted as YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub quality: RenderQuality,
    /// Restrict processing to the visible window (disabling is correct but
    /// slower)
    pub culling_enabled: bool,
    /// Extra time culled on each side of the viewport, in seconds
    pub guard_band_secs: f64,
    /// Regions closer than this count as adjacent, in seconds
    pub adjacency_tolerance_secs: f64,
    /// Overlap severity at or above this gets the stronger warning
    pub overlap_warn_severity: f64,
    /// Refresh rate the frame budget is derived from
    pub target_fps: u32,
    /// Upper bound on cached per-region generated colors
    pub color_cache_capacity: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            quality: RenderQuality::High,
            culling_enabled: true,
            guard_band_secs: crate::cull::DEFAULT_GUARD_BAND_SECS,
            adjacency_tolerance_secs: 0.05,
            overlap_warn_severity: 0.5,
            target_fps: 60,
            color_cache_capacity: 256,
        }
    }
}

impl RenderSettings {
    /// Relationship thresholds derived from these settings
    pub fn relationship_config(&self) -> crate::relationship::RelationshipConfig {
        crate::relationship::RelationshipConfig {
            adjacency_tolerance_secs: self.adjacency_tolerance_secs,
            severe_overlap_threshold: self.overlap_warn_severity,
        }
    }
}

/// Default settings file location: `~/.config/chopview/render.yaml`
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chopview")
        .join("render.yaml")
}

/// Load settings from a YAML file
///
/// A missing file is normal (first run); an invalid one logs a warning.
/// Both cases return defaults.
pub fn load_settings(path: &Path) -> RenderSettings {
    if !path.exists() {
        log::info!("load_settings: {:?} does not exist, using defaults", path);
        return RenderSettings::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<RenderSettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("load_settings: failed to parse {:?}: {}, using defaults", path, e);
                RenderSettings::default()
            }
        },
        Err(e) => {
            log::warn!("load_settings: failed to read {:?}: {}, using defaults", path, e);
            RenderSettings::default()
        }
    }
}

/// Save settings to a YAML file, creating parent directories as needed
pub fn save_settings(settings: &RenderSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
    }

    let yaml =
        serde_yaml::to_string(settings).context("Failed to serialize settings to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write settings file: {:?}", path))?;

    log::info!("save_settings: saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let settings = load_settings(Path::new("/nonexistent/path/render.yaml"));
        assert_eq!(settings, RenderSettings::default());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.yaml");

        let settings = RenderSettings {
            quality: RenderQuality::Low,
            culling_enabled: false,
            adjacency_tolerance_secs: 0.08,
            ..RenderSettings::default()
        };

        save_settings(&settings, &path).unwrap();
        let loaded = load_settings(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_invalid_yaml_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.yaml");
        std::fs::write(&path, "quality: [not, a, tier]").unwrap();
        assert_eq!(load_settings(&path), RenderSettings::default());
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.yaml");
        std::fs::write(&path, "target_fps: 30\n").unwrap();
        let loaded = load_settings(&path);
        assert_eq!(loaded.target_fps, 30);
        assert_eq!(loaded.quality, RenderSettings::default().quality);
    }

    #[test]
    fn test_relationship_config_mirrors_settings() {
        let settings = RenderSettings {
            adjacency_tolerance_secs: 0.02,
            overlap_warn_severity: 0.8,
            ..RenderSettings::default()
        };
        let config = settings.relationship_config();
        assert_eq!(config.adjacency_tolerance_secs, 0.02);
        assert_eq!(config.severe_overlap_threshold, 0.8);
    }

    #[test]
    fn test_default_path_ends_with_render_yaml() {
        assert!(default_settings_path().ends_with("chopview/render.yaml"));
    }
}
