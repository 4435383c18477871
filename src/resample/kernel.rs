//! Lanczos-3 windowed-sinc kernel.
//!
//! The same evaluator backs both resampling passes, on the CPU here and in
//! `gpu/shaders/resample.wgsl` on the GPU.

use std::f64::consts::PI;

/// Lobes of the Lanczos window (`a` in `sinc(x)·sinc(x/a)`).
pub const LANCZOS_A: f64 = 3.0;

/// Below this the tap weights are treated as summing to zero.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

#[inline]
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    let pi_x = PI * x;
    pi_x.sin() / pi_x
}

/// Lanczos-3 weight at distance `x` (in kernel units).
///
/// `weight(0) == 1`, `weight(x) == 0` for `|x| >= 3`.
#[inline]
pub fn weight(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    if x.abs() >= LANCZOS_A {
        return 0.0;
    }
    sinc(x) * sinc(x / LANCZOS_A)
}

/// Support radius in source texels for a destination/source `scale`.
///
/// Downsampling (`scale < 1`) widens the kernel to `3 / scale` so it acts as
/// a low-pass filter; upsampling keeps the native radius of 3.
#[inline]
pub fn support_radius(scale: f64) -> f64 {
    LANCZOS_A / scale.min(1.0)
}

/// One axis of a resample: where a destination pixel lands in the source and
/// which source texels contribute to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMapping {
    /// Source origin of the crop, in texels.
    pub src_origin: f64,
    /// Source extent of the crop, in texels (may be fractional).
    pub src_extent: f64,
    /// Destination extent in pixels.
    pub dst_extent: u32,
    /// Optional cap on the support radius in source texels. `None` keeps
    /// the full `3 / scale` support at any downsampling ratio.
    pub max_radius: Option<f64>,
}

impl AxisMapping {
    pub fn new(src_origin: f64, src_extent: f64, dst_extent: u32, max_radius: Option<f64>) -> Self {
        Self {
            src_origin,
            src_extent,
            dst_extent,
            max_radius,
        }
    }

    /// Destination over source size along this axis.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.dst_extent as f64 / self.src_extent
    }

    /// Source position (texel-center coordinates) of destination pixel `d`.
    #[inline]
    pub fn source_position(&self, d: u32) -> f64 {
        self.src_origin + (d as f64 + 0.5) * self.src_extent / self.dst_extent as f64 - 0.5
    }

    /// Kernel support actually used, capped by `max_radius` if set.
    #[inline]
    pub fn effective_radius(&self) -> f64 {
        let radius = support_radius(self.scale());
        match self.max_radius {
            Some(cap) => radius.min(cap.max(LANCZOS_A)),
            None => radius,
        }
    }

    /// Factor mapping a source distance into kernel units.
    #[inline]
    pub fn kernel_step(&self) -> f64 {
        LANCZOS_A / self.effective_radius()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_at_zero_is_one() {
        assert_eq!(weight(0.0), 1.0);
        assert_eq!(weight(-0.0), 1.0);
    }

    #[test]
    fn test_weight_vanishes_outside_support() {
        for x in [3.0, -3.0, 3.0001, 4.5, -7.25, 100.0] {
            assert_eq!(weight(x), 0.0, "weight({x}) should be zero");
        }
    }

    #[test]
    fn test_weight_is_zero_at_integers() {
        for x in [1.0, 2.0, -1.0, -2.0] {
            assert!(weight(x).abs() < 1e-12, "weight({x}) = {}", weight(x));
        }
    }

    #[test]
    fn test_weight_is_stable_near_zero() {
        let w = weight(1e-12);
        assert!((w - 1.0).abs() < 1e-9);
        assert!(w.is_finite());
    }

    #[test]
    fn test_weight_symmetric() {
        for i in 1..30 {
            let x = i as f64 * 0.1;
            assert!((weight(x) - weight(-x)).abs() < 1e-15);
        }
    }

    #[test]
    fn test_support_radius_upsampling_is_native() {
        for scale in [1.0, 1.5, 2.0, 10.0, 1000.0] {
            assert_eq!(support_radius(scale), 3.0);
        }
    }

    #[test]
    fn test_support_radius_widens_when_downsampling() {
        assert_eq!(support_radius(0.5), 6.0);
        assert_eq!(support_radius(0.25), 12.0);
    }

    #[test]
    fn test_axis_mapping_identity_lands_on_texel_centers() {
        let axis = AxisMapping::new(4.0, 8.0, 8, None);
        for d in 0..8 {
            assert!((axis.source_position(d) - (4.0 + d as f64)).abs() < 1e-12);
        }
        assert_eq!(axis.effective_radius(), 3.0);
        assert!((axis.kernel_step() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_axis_mapping_radius_is_uncapped_by_default() {
        let axis = AxisMapping::new(0.0, 16_384.0, 64, None);
        assert_eq!(axis.effective_radius(), 768.0);
        assert!((axis.kernel_step() - 1.0 / 256.0).abs() < 1e-15);
    }

    #[test]
    fn test_axis_mapping_opt_in_cap() {
        let axis = AxisMapping::new(0.0, 10_000.0, 10, Some(64.0));
        assert_eq!(axis.effective_radius(), 64.0);
        // the native radius of 3 is never shrunk
        let upsample = AxisMapping::new(0.0, 10.0, 100, Some(1.0));
        assert_eq!(upsample.effective_radius(), 3.0);
    }
}
