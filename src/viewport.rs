//! Viewport / draw-state model shared by the spectrogram and waveform renderers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Violations of the viewport invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewportError {
    #[error("px_per_sec must be positive and finite, got {0}")]
    PxPerSec(f64),
    #[error("hz range must be increasing, got [{0}, {1}]")]
    HzRange(f32, f32),
    #[error("amplitude range must be increasing, got [{0}, {1}]")]
    AmpRange(f32, f32),
    #[error("blend must lie in [0, 1], got {0}")]
    Blend(f32),
    #[error("device pixel ratio must be positive, got {0}")]
    DevicePixelRatio(f32),
    #[error("start_sec must be finite, got {0}")]
    StartSec(f64),
}

/// The visible time/frequency/amplitude window plus display scale.
///
/// `width_px`, `height_px` and `px_per_sec` are CSS pixels. Render targets
/// and the decimator work in device pixels (`css * device_pixel_ratio`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub start_sec: f64,
    pub px_per_sec: f64,
    pub hz_range: (f32, f32),
    pub amp_range: (f32, f32),
    pub blend: f32,
    pub device_pixel_ratio: f32,
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            start_sec: 0.0,
            px_per_sec: 100.0,
            hz_range: (0.0, 22_050.0),
            amp_range: (-1.0, 1.0),
            blend: 0.5,
            device_pixel_ratio: 1.0,
            width_px: 800,
            height_px: 200,
        }
    }
}

impl Viewport {
    /// Check the invariants: `px_per_sec > 0`, `hz_range.0 < hz_range.1`,
    /// `amp_range.0 < amp_range.1`, `blend` in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ViewportError> {
        if !(self.px_per_sec > 0.0 && self.px_per_sec.is_finite()) {
            return Err(ViewportError::PxPerSec(self.px_per_sec));
        }
        if !self.start_sec.is_finite() {
            return Err(ViewportError::StartSec(self.start_sec));
        }
        if !(self.hz_range.0 < self.hz_range.1) {
            return Err(ViewportError::HzRange(self.hz_range.0, self.hz_range.1));
        }
        if !(self.amp_range.0 < self.amp_range.1) {
            return Err(ViewportError::AmpRange(self.amp_range.0, self.amp_range.1));
        }
        if !(0.0..=1.0).contains(&self.blend) {
            return Err(ViewportError::Blend(self.blend));
        }
        if !(self.device_pixel_ratio > 0.0 && self.device_pixel_ratio.is_finite()) {
            return Err(ViewportError::DevicePixelRatio(self.device_pixel_ratio));
        }
        Ok(())
    }

    /// Render-target size in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let dpr = self.device_pixel_ratio as f64;
        (
            (self.width_px as f64 * dpr).round() as u32,
            (self.height_px as f64 * dpr).round() as u32,
        )
    }

    /// Device pixels per second.
    #[inline]
    pub fn canvas_px_per_sec(&self) -> f64 {
        self.px_per_sec * self.device_pixel_ratio as f64
    }

    /// Seconds covered by the visible width.
    #[inline]
    pub fn duration_sec(&self) -> f64 {
        self.width_px as f64 / self.px_per_sec
    }

    #[inline]
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec()
    }

    /// Device-pixel x coordinate of a time.
    #[inline]
    pub fn sec_to_x(&self, sec: f64) -> f64 {
        (sec - self.start_sec) * self.canvas_px_per_sec()
    }

    /// Hash of every field, used as the "inputs changed" check of the
    /// renderers in place of comparing previous values field by field.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.start_sec.to_bits().hash(&mut hasher);
        self.px_per_sec.to_bits().hash(&mut hasher);
        self.hz_range.0.to_bits().hash(&mut hasher);
        self.hz_range.1.to_bits().hash(&mut hasher);
        self.amp_range.0.to_bits().hash(&mut hasher);
        self.amp_range.1.to_bits().hash(&mut hasher);
        self.blend.to_bits().hash(&mut hasher);
        self.device_pixel_ratio.to_bits().hash(&mut hasher);
        self.width_px.hash(&mut hasher);
        self.height_px.hash(&mut hasher);
        hasher.finish()
    }

    /// Pan by a number of CSS pixels (positive moves later in time).
    pub fn pan_px(&mut self, dx: f64) {
        self.start_sec += dx / self.px_per_sec;
    }

    /// Zoom by `factor` around the CSS x coordinate `anchor_px`, keeping the
    /// time under the anchor fixed.
    pub fn zoom_at(&mut self, factor: f64, anchor_px: f64) {
        if !(factor > 0.0 && factor.is_finite()) {
            return;
        }
        let anchor_sec = self.start_sec + anchor_px / self.px_per_sec;
        self.px_per_sec *= factor;
        self.start_sec = anchor_sec - anchor_px / self.px_per_sec;
    }

    /// Set the blend factor, clamped into `[0, 1]`.
    pub fn set_blend(&mut self, blend: f32) {
        self.blend = blend.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport_is_valid() {
        assert!(Viewport::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_px_per_sec() {
        let vp = Viewport {
            px_per_sec: 0.0,
            ..Default::default()
        };
        assert_eq!(vp.validate(), Err(ViewportError::PxPerSec(0.0)));
    }

    #[test]
    fn test_validate_rejects_inverted_hz_range() {
        let vp = Viewport {
            hz_range: (1000.0, 1000.0),
            ..Default::default()
        };
        assert!(matches!(vp.validate(), Err(ViewportError::HzRange(..))));
    }

    #[test]
    fn test_validate_rejects_blend_out_of_range() {
        let vp = Viewport {
            blend: 1.5,
            ..Default::default()
        };
        assert!(matches!(vp.validate(), Err(ViewportError::Blend(_))));
    }

    #[test]
    fn test_physical_size_scales_with_dpr() {
        let vp = Viewport {
            width_px: 300,
            height_px: 100,
            device_pixel_ratio: 2.0,
            ..Default::default()
        };
        assert_eq!(vp.physical_size(), (600, 200));
        assert_eq!(vp.canvas_px_per_sec(), 200.0);
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let a = Viewport::default();
        let mut b = a;
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.pan_px(1.0);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_zoom_keeps_anchor_time() {
        let mut vp = Viewport {
            start_sec: 10.0,
            px_per_sec: 100.0,
            ..Default::default()
        };
        let anchor_sec = vp.start_sec + 200.0 / vp.px_per_sec;
        vp.zoom_at(4.0, 200.0);
        assert_eq!(vp.px_per_sec, 400.0);
        assert!((vp.start_sec + 200.0 / vp.px_per_sec - anchor_sec).abs() < 1e-12);
    }

    #[test]
    fn test_set_blend_clamps() {
        let mut vp = Viewport::default();
        vp.set_blend(-0.3);
        assert_eq!(vp.blend, 0.0);
        vp.set_blend(3.0);
        assert_eq!(vp.blend, 1.0);
    }
}
