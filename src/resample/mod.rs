//! Resampling of luminance textures.
//!
//! - `kernel`: the Lanczos-3 evaluator and per-axis tap geometry
//! - `cpu`: reference two-pass separable resampler
//!
//! The GPU counterpart lives in `gpu::resampler`.

pub mod cpu;
pub mod kernel;

use serde::{Deserialize, Serialize};

use crate::signal::CropWindow;

pub use kernel::{support_radius, weight, AxisMapping, LANCZOS_A};

/// Resampling quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    /// Two-tap linear interpolation, used for immediate feedback.
    Bilinear,
    /// Full Lanczos-3 with a widened support when downsampling.
    Lanczos3,
}

impl Quality {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bilinear => "bilinear",
            Self::Lanczos3 => "lanczos3",
        }
    }
}

/// Errors shared by the CPU and GPU resamplers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResampleError {
    #[error("invalid {what} dimensions {width}x{height}")]
    InvalidDimension {
        what: &'static str,
        width: f64,
        height: f64,
    },
}

/// Source rows pass 1 must produce so pass 2 has every vertical tap:
/// `[floor(top) - pad, ceil(bottom) + pad)` clamped to the texture, with
/// `pad = ceil(radius) + 1`. Returns `(first_row, row_count)`.
pub fn intermediate_rows(crop: &CropWindow, radius: f64, texture_height: u32) -> (i64, u32) {
    let pad = radius.ceil() as i64 + 1;
    let first = (crop.top.floor() as i64 - pad).clamp(0, texture_height as i64 - 1);
    let end = (crop.bottom().ceil() as i64 + pad).clamp(first + 1, texture_height as i64);
    (first, (end - first) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intermediate_rows_pads_and_clamps() {
        let crop = CropWindow {
            left: 0.0,
            top: 10.5,
            width: 4.0,
            height: 20.0,
        };
        assert_eq!(intermediate_rows(&crop, 3.0, 100), (6, 29));
        assert_eq!(intermediate_rows(&crop, 3.0, 25), (6, 19));
    }

    #[test]
    fn test_intermediate_rows_outside_texture_keeps_one_row() {
        let crop = CropWindow {
            left: 0.0,
            top: 200.0,
            width: 4.0,
            height: 20.0,
        };
        let (first, rows) = intermediate_rows(&crop, 3.0, 50);
        assert_eq!(first, 49);
        assert_eq!(rows, 1);
    }
}
