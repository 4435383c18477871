//! Renderer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resample::LANCZOS_A;

/// Errors loading or interpreting a [`RendererConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid color for {field}: {value}")]
    Color { field: &'static str, value: String },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        field: &'static str,
        value: f64,
        min: f64,
    },
}

/// Tunables for the spectrogram and waveform renderers.
///
/// Widths and margins are CSS pixels; the renderers scale them by the
/// viewport's device pixel ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub line_width: f32,
    pub border_width: f32,
    /// Extra samples beyond each visible edge, in CSS px.
    pub wav_margin_px: f32,
    /// Margin requested from the backend around spectrogram fetches, in CSS px.
    pub spectrogram_margin_px: u32,
    pub line_color: String,
    pub border_color: String,
    pub border_for_line: bool,
    pub border_for_envelope: bool,
    /// Minimum interval between issued backend fetches.
    pub fetch_interval_ms: u64,
    /// Quiet period before the high-quality resampling tier runs.
    pub quiet_period_ms: u64,
    /// Optional cap on the Lanczos support radius, in source texels. Unset,
    /// the support widens to `3 / scale` however far the view zooms out;
    /// a cap trades anti-aliasing at extreme ratios for fewer taps.
    pub max_support_radius: Option<f64>,
    pub high_quality: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            line_width: 1.75,
            border_width: 1.5,
            wav_margin_px: 10.0,
            spectrogram_margin_px: 64,
            line_color: "#ff8c00".to_string(),
            border_color: "#000000".to_string(),
            border_for_line: true,
            border_for_envelope: true,
            fetch_interval_ms: 100,
            quiet_period_ms: 120,
            max_support_radius: None,
            high_quality: true,
        }
    }
}

impl RendererConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.line_width > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "line_width",
                value: self.line_width as f64,
            });
        }
        // never below the native radius used when upsampling
        if let Some(radius) = self.max_support_radius.filter(|r| !(*r >= LANCZOS_A)) {
            return Err(ConfigError::BelowMinimum {
                field: "max_support_radius",
                value: radius,
                min: LANCZOS_A,
            });
        }
        if !(self.border_width >= 0.0) {
            return Err(ConfigError::NonPositive {
                field: "border_width",
                value: self.border_width as f64,
            });
        }
        self.line_rgba()?;
        self.border_rgba()?;
        Ok(())
    }

    pub fn line_rgba(&self) -> Result<[f32; 4], ConfigError> {
        parse_hex_color(&self.line_color).ok_or_else(|| ConfigError::Color {
            field: "line_color",
            value: self.line_color.clone(),
        })
    }

    pub fn border_rgba(&self) -> Result<[f32; 4], ConfigError> {
        parse_hex_color(&self.border_color).ok_or_else(|| ConfigError::Color {
            field: "border_color",
            value: self.border_color.clone(),
        })
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

/// Parse a hex color to RGBA floats (`#rrggbb` or `#rrggbbaa`, `#` optional).
pub fn parse_hex_color(hex: &str) -> Option<[f32; 4]> {
    let hex = hex.trim_start_matches('#');
    if (hex.len() != 6 && hex.len() != 8) || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|v| v as f32 / 255.0);
    let a = if hex.len() == 8 { channel(6)? } else { 1.0 };
    Some([channel(0)?, channel(2)?, channel(4)?, a])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#00ff88"), Some([0.0, 1.0, 136.0 / 255.0, 1.0]));
        assert_eq!(parse_hex_color("ffffff"), Some([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color("#00000000"), Some([0.0, 0.0, 0.0, 0.0]));
        assert_eq!(parse_hex_color("invalid"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.line_width, 1.75);
        assert_eq!(config.border_width, 1.5);
        assert_eq!(config.wav_margin_px, 10.0);
        assert_eq!(config.quiet_period(), Duration::from_millis(120));
        assert_eq!(config.max_support_radius, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RendererConfig::from_json(r#"{"line_width": 3.0, "high_quality": false}"#)
            .unwrap();
        assert_eq!(config.line_width, 3.0);
        assert!(!config.high_quality);
        assert_eq!(config.fetch_interval_ms, 100);
    }

    #[test]
    fn test_from_json_rejects_bad_color() {
        let err = RendererConfig::from_json(r#"{"line_color": "orange"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Color { field: "line_color", .. }));
    }

    #[test]
    fn test_from_json_rejects_zero_width() {
        let err = RendererConfig::from_json(r#"{"line_width": 0.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositive { field: "line_width", .. }));
    }

    #[test]
    fn test_support_radius_cap_below_native_is_rejected() {
        let err = RendererConfig::from_json(r#"{"max_support_radius": 2.5}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BelowMinimum {
                field: "max_support_radius",
                ..
            }
        ));
        let config = RendererConfig::from_json(r#"{"max_support_radius": 3.0}"#).unwrap();
        assert_eq!(config.max_support_radius, Some(3.0));
        let config = RendererConfig::from_json(r#"{"max_support_radius": null}"#).unwrap();
        assert_eq!(config.max_support_radius, None);
    }

    #[test]
    fn test_json_round_trip() {
        let config = RendererConfig {
            border_for_line: false,
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(RendererConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.json");
        std::fs::write(&path, r#"{"quiet_period_ms": 250}"#).unwrap();
        let config = RendererConfig::from_path(&path).unwrap();
        assert_eq!(config.quiet_period_ms, 250);
    }
}
