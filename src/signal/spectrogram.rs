//! Spectrogram luminance textures and their mapping onto a viewport.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::viewport::Viewport;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Errors building a luminance texture.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextureError {
    #[error("texture data has {got} values, expected {width}x{height}")]
    SizeMismatch { width: u32, height: u32, got: usize },
    #[error("texture must not be empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("texture density must be positive, got {0} px/s")]
    Density(f64),
}

/// Where a texture sits in time and frequency.
///
/// Margins are extra texels kept beyond the visible window so resampling has
/// valid neighbours at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Time of the first content column (right after the left margin).
    pub start_sec: f64,
    /// Columns per second the texture was rendered at.
    pub px_per_sec: f64,
    pub left_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    /// Frequency span of the content rows; row 0 is the highest frequency.
    pub hz_range: (f32, f32),
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            start_sec: 0.0,
            px_per_sec: 100.0,
            left_margin: 0.0,
            right_margin: 0.0,
            top_margin: 0.0,
            bottom_margin: 0.0,
            hz_range: (0.0, 22_050.0),
        }
    }
}

/// Fractional source rectangle, in texels, selected by a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropWindow {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.left.is_finite() && self.top.is_finite())
    }
}

/// Single-channel float magnitude image (normalized 0..1), row-major.
#[derive(Debug, Clone)]
pub struct LuminanceTexture {
    id: u64,
    data: Vec<f32>,
    width: u32,
    height: u32,
    pub placement: Placement,
}

impl LuminanceTexture {
    pub fn new(
        data: Vec<f32>,
        width: u32,
        height: u32,
        placement: Placement,
    ) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        if data.len() != width as usize * height as usize {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                got: data.len(),
            });
        }
        if !(placement.px_per_sec > 0.0) {
            return Err(TextureError::Density(placement.px_per_sec));
        }
        Ok(Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            data,
            width,
            height,
            placement,
        })
    }

    /// Build a texture from a function of `(column, row)`.
    pub fn from_fn(
        width: u32,
        height: u32,
        placement: Placement,
        mut f: impl FnMut(u32, u32) -> f32,
    ) -> Result<Self, TextureError> {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(data, width, height, placement)
    }

    /// Unique per constructed texture; a new id means "data replaced".
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Texel with clamped (not wrapped) coordinates.
    #[inline]
    pub fn texel_clamped(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[y * self.width as usize + x]
    }

    /// Content rows (without top/bottom margins).
    pub fn content_height(&self) -> f64 {
        self.height as f64 - self.placement.top_margin - self.placement.bottom_margin
    }

    /// Fractional column of a time.
    pub fn sec_to_column(&self, sec: f64) -> f64 {
        self.placement.left_margin + (sec - self.placement.start_sec) * self.placement.px_per_sec
    }

    /// Fractional row of a frequency (row 0 is the highest frequency).
    pub fn hz_to_row(&self, hz: f32) -> f64 {
        let (lo, hi) = self.placement.hz_range;
        let span = (hi - lo).max(f32::EPSILON) as f64;
        self.placement.top_margin + (hi - hz) as f64 / span * self.content_height()
    }

    /// Source rectangle covered by `viewport`.
    pub fn crop_window(&self, viewport: &Viewport) -> CropWindow {
        let left = self.sec_to_column(viewport.start_sec);
        let right = self.sec_to_column(viewport.end_sec());
        let top = self.hz_to_row(viewport.hz_range.1);
        let bottom = self.hz_to_row(viewport.hz_range.0);
        CropWindow {
            left,
            top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Whether the texture can still serve `viewport` without a refetch.
    ///
    /// False once the crop leaves the texture (margins exhausted) or the
    /// zoom drifted more than 2x away from the density it was rendered at.
    pub fn covers(&self, viewport: &Viewport) -> bool {
        const EPS: f64 = 1e-6;
        let crop = self.crop_window(viewport);
        if crop.is_degenerate() {
            return false;
        }
        let inside = crop.left >= -EPS
            && crop.top >= -EPS
            && crop.right() <= self.width as f64 + EPS
            && crop.bottom() <= self.height as f64 + EPS;
        let ratio = self.placement.px_per_sec / viewport.canvas_px_per_sec();
        inside && (0.5..=2.0).contains(&ratio)
    }
}
