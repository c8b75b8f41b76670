use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::analysis::scene::SceneChangeDetector;
use crate::encode::FrameEncoder;

/// Tunable parameters for one keyframe selection pass.
///
/// Every field has a default, so a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// Lower bound of the global change-rate band.
    pub min_threshold: f64,
    /// Upper bound of the global change-rate band. A block changing by more
    /// than 0.8x this value also counts as a scene change.
    pub max_threshold: f64,
    /// Minimum seconds between two accepted scene changes.
    pub min_interval_seconds: f64,
    /// Frames searched on each side of a detected change.
    pub window_radius: u32,
    /// Compare every Nth decoded frame (1 = every frame).
    pub sample_stride: u32,
    /// Blocks per side of the block-change grid.
    pub grid_size: u32,
    /// Maximum keyframes returned.
    pub output_cap: usize,
    pub target_width: u32,
    pub jpeg_quality: u8,
    /// Directory to write annotated frames for each accepted change, or None to skip.
    pub debug_frames_dir: Option<PathBuf>,
    /// TrueType font used for debug frame text.
    pub debug_font: Option<PathBuf>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_threshold: 0.10,
            max_threshold: 0.90,
            min_interval_seconds: 0.3,
            window_radius: 30,
            sample_stride: 2,
            grid_size: 4,
            output_cap: 6,
            target_width: 1280,
            jpeg_quality: 95,
            debug_frames_dir: None,
            debug_font: None,
        }
    }
}

impl SelectionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: SelectionConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.min_threshold) || !in_unit(self.max_threshold) {
            return Err(ConfigError::Invalid(format!(
                "thresholds must be within [0, 1], got {}..{}",
                self.min_threshold, self.max_threshold
            )));
        }
        if self.min_threshold > self.max_threshold {
            return Err(ConfigError::Invalid(format!(
                "min_threshold {} exceeds max_threshold {}",
                self.min_threshold, self.max_threshold
            )));
        }
        if self.min_interval_seconds.is_nan() || self.min_interval_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_interval_seconds must be >= 0, got {}",
                self.min_interval_seconds
            )));
        }
        for (name, value) in [
            ("sample_stride", self.sample_stride as usize),
            ("grid_size", self.grid_size as usize),
            ("output_cap", self.output_cap),
            ("target_width", self.target_width as usize),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be >= 1")));
            }
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    pub fn detector(&self) -> SceneChangeDetector {
        SceneChangeDetector {
            min_threshold: self.min_threshold,
            max_threshold: self.max_threshold,
            grid_size: self.grid_size,
        }
    }

    pub fn encoder(&self) -> FrameEncoder {
        FrameEncoder {
            target_width: self.target_width,
            quality: self.jpeg_quality,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SelectionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.output_cap, 6);
        assert_eq!(config.window_radius, 30);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: SelectionConfig =
            toml::from_str("output_cap = 3\nmin_interval_seconds = 1.5\n").unwrap();
        assert_eq!(config.output_cap, 3);
        assert_eq!(config.min_interval_seconds, 1.5);
        assert_eq!(config.target_width, 1280);
        assert_eq!(config.jpeg_quality, 95);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<SelectionConfig>("outputcap = 3\n").is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            SelectionConfig { sample_stride: 0, ..Default::default() },
            SelectionConfig { output_cap: 0, ..Default::default() },
            SelectionConfig { jpeg_quality: 0, ..Default::default() },
            SelectionConfig { min_threshold: 0.5, max_threshold: 0.4, ..Default::default() },
            SelectionConfig { max_threshold: 1.5, ..Default::default() },
            SelectionConfig { min_interval_seconds: -1.0, ..Default::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "expected rejection for {config:?}"
            );
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = SelectionConfig::load(Path::new("/nonexistent/sharpcut.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile(..)));
    }
}
