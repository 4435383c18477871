//! CPU reference of the separable two-pass resampler.
//!
//! Mirrors `gpu/shaders/resample.wgsl` step for step: pass 1 filters
//! horizontally while cropping rows, pass 2 filters the intermediate
//! vertically. Used by the in-memory backend and as the reference for the
//! GPU path in tests.

use super::kernel::{weight, AxisMapping, WEIGHT_SUM_EPSILON};
use super::{intermediate_rows, Quality, ResampleError};
use crate::signal::{CropWindow, LuminanceTexture};

/// Filter one destination pixel along one axis.
///
/// `fetch` must clamp its index to the valid range.
#[inline]
pub fn filter_tap(fetch: impl Fn(i64) -> f32, axis: &AxisMapping, d: u32, quality: Quality) -> f32 {
    let s = axis.source_position(d);
    match quality {
        Quality::Bilinear => {
            let j0 = s.floor();
            let t = (s - j0) as f32;
            let a = fetch(j0 as i64);
            let b = fetch(j0 as i64 + 1);
            a + (b - a) * t
        }
        Quality::Lanczos3 => {
            let radius = axis.effective_radius();
            let step = axis.kernel_step();
            let lo = (s - radius).ceil() as i64;
            let hi = (s + radius).floor() as i64;
            let mut sum_w = 0.0f64;
            let mut sum_v = 0.0f64;
            for j in lo..=hi {
                let w = weight((j as f64 - s) * step);
                sum_w += w;
                sum_v += w * fetch(j) as f64;
            }
            // all taps vanished: nearest sample
            weighted_mean(sum_v, sum_w).unwrap_or_else(|| fetch(s.round() as i64))
        }
    }
}

/// `sum_v / sum_w`, or `None` when the weights cancel out.
#[inline]
fn weighted_mean(sum_v: f64, sum_w: f64) -> Option<f32> {
    (sum_w.abs() >= WEIGHT_SUM_EPSILON).then(|| (sum_v / sum_w) as f32)
}

/// Resample the `crop` window of `texture` into a `dst_width x dst_height`
/// row-major image.
pub fn resample(
    texture: &LuminanceTexture,
    crop: &CropWindow,
    dst_width: u32,
    dst_height: u32,
    quality: Quality,
    max_radius: Option<f64>,
) -> Result<Vec<f32>, ResampleError> {
    if dst_width == 0 || dst_height == 0 {
        return Err(ResampleError::InvalidDimension {
            what: "destination",
            width: dst_width as f64,
            height: dst_height as f64,
        });
    }
    if crop.is_degenerate() {
        return Err(ResampleError::InvalidDimension {
            what: "source crop",
            width: crop.width,
            height: crop.height,
        });
    }

    let horizontal = AxisMapping::new(crop.left, crop.width, dst_width, max_radius);
    let vertical = AxisMapping::new(crop.top, crop.height, dst_height, max_radius);
    let (row0, rows) = intermediate_rows(crop, vertical.effective_radius(), texture.height());

    // pass 1: srcW -> dstW, rows [row0, row0 + rows)
    let mut intermediate = Vec::with_capacity(dst_width as usize * rows as usize);
    for r in 0..rows as i64 {
        let y = row0 + r;
        for x in 0..dst_width {
            intermediate.push(filter_tap(
                |j| texture.texel_clamped(j, y),
                &horizontal,
                x,
                quality,
            ));
        }
    }

    // pass 2: srcH -> dstH over the intermediate
    let vertical = AxisMapping::new(crop.top - row0 as f64, crop.height, dst_height, max_radius);
    let stride = dst_width as usize;
    let last_row = rows as i64 - 1;
    let mut out = vec![0.0f32; dst_width as usize * dst_height as usize];
    for x in 0..dst_width as usize {
        for y in 0..dst_height {
            out[y as usize * stride + x] = filter_tap(
                |j| intermediate[j.clamp(0, last_row) as usize * stride + x],
                &vertical,
                y,
                quality,
            );
        }
    }
    Ok(out)
}
