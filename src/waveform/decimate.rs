//! Column-wise waveform decimation.
//!
//! Samples are grouped by the device-pixel column their x coordinate falls
//! in. Columns are counted from t = 0 rather than from the viewport edge, so
//! a sub-pixel pan moves the path without regrouping its samples. A column
//! whose vertical spread is wider than half the stroke joins an envelope
//! polygon; every other column contributes one polyline vertex at its
//! center. When there is at most one sample per column the samples are
//! emitted as they are.

use super::path::{DecimatedPath, Envelope, Polyline};
use crate::config::RendererConfig;
use crate::viewport::Viewport;

/// Inputs of one decimation, all in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecimateParams {
    pub start_sec: f64,
    /// Time of the first sample handed to [`decimate`].
    pub sample_start_sec: f64,
    /// Device pixels per second.
    pub px_per_sec: f64,
    pub width: f32,
    pub height: f32,
    pub offset_y: f32,
    pub amp_range: (f32, f32),
    /// Extra clipping applied together with `amp_range`.
    pub clip_values: Option<(f32, f32)>,
    pub stroke_width: f32,
    /// Samples are covered this far beyond each visible edge.
    pub margin_px: f32,
    pub border_for_line: bool,
    pub border_for_envelope: bool,
}

impl DecimateParams {
    pub fn from_viewport(viewport: &Viewport, config: &RendererConfig) -> Self {
        let dpr = viewport.device_pixel_ratio;
        let (width, height) = viewport.physical_size();
        Self {
            start_sec: viewport.start_sec,
            sample_start_sec: 0.0,
            px_per_sec: viewport.canvas_px_per_sec(),
            width: width as f32,
            height: height as f32,
            offset_y: 0.0,
            amp_range: viewport.amp_range,
            clip_values: None,
            stroke_width: config.line_width * dpr,
            margin_px: config.wav_margin_px * dpr,
            border_for_line: config.border_for_line,
            border_for_envelope: config.border_for_envelope,
        }
    }

    /// Decimate a buffer whose first sample lies at `sample_start_sec`.
    pub fn with_sample_start(mut self, sample_start_sec: f64) -> Self {
        self.sample_start_sec = sample_start_sec;
        self
    }

    pub fn with_clip_values(mut self, clip_values: Option<(f32, f32)>) -> Self {
        self.clip_values = clip_values;
        self
    }

    /// Clamp bounds: `amp_range` intersected with `clip_values`.
    fn clamp_bounds(&self) -> (f32, f32) {
        let (lo, hi) = self.amp_range;
        match self.clip_values {
            Some((c_lo, c_hi)) => (lo.max(c_lo), hi.min(c_hi).max(lo.max(c_lo))),
            None => (lo, hi),
        }
    }

    /// Half-open range of sample indices that covers the viewport plus margins.
    pub fn sample_range(&self, sample_rate: u32, len: usize) -> std::ops::Range<usize> {
        let sr = sample_rate as f64;
        let margin_sec = self.margin_px as f64 / self.px_per_sec;
        let first = ((self.start_sec - margin_sec - self.sample_start_sec) * sr).floor().max(0.0);
        let end_sec = self.start_sec + self.width as f64 / self.px_per_sec + margin_sec;
        let last = ((end_sec - self.sample_start_sec) * sr).ceil().max(0.0);
        let end = (last as usize).min(len);
        (first as usize).min(end)..end
    }
}

/// Sample value to device-pixel y, clipped as a pure clamp.
struct YMapping {
    lo: f32,
    hi: f32,
    amp_hi: f32,
    scale: f32,
    offset_y: f32,
}

impl YMapping {
    fn new(params: &DecimateParams) -> Self {
        let (lo, hi) = params.clamp_bounds();
        let span = (params.amp_range.1 - params.amp_range.0).max(1e-8);
        Self {
            lo,
            hi,
            amp_hi: params.amp_range.1,
            scale: params.height / span,
            offset_y: params.offset_y,
        }
    }

    #[inline]
    fn clip(&self, v: f32) -> f32 {
        v.max(self.lo).min(self.hi)
    }

    #[inline]
    fn y(&self, v: f32) -> f32 {
        self.offset_y + (self.amp_hi - self.clip(v)) * self.scale
    }
}

/// Decimate `samples` for one viewport.
///
/// Pure: identical inputs give an identical path.
pub fn decimate(samples: &[f32], sample_rate: u32, params: &DecimateParams) -> DecimatedPath {
    let mut path = DecimatedPath {
        line: Polyline {
            points: Vec::new(),
            border: params.border_for_line,
        },
        envelopes: Vec::new(),
    };
    if sample_rate == 0 || !(params.px_per_sec > 0.0) {
        return path;
    }
    let range = params.sample_range(sample_rate, samples.len());
    if range.is_empty() {
        return path;
    }

    let ymap = YMapping::new(params);
    let sr = sample_rate as f64;
    let origin_x = params.sample_start_sec * params.px_per_sec;
    let offset_x = params.start_sec * params.px_per_sec;
    // x measured from t = 0
    let abs_x = |i: usize| i as f64 * params.px_per_sec / sr + origin_x;

    if params.px_per_sec >= sr {
        path.line.points = range
            .map(|i| [(abs_x(i) - offset_x) as f32, ymap.y(samples[i])])
            .collect();
        return path;
    }

    let threshold = params.stroke_width / 2.0;
    let mut open: Option<Envelope> = None;
    let mut last_left = 0.0f32;

    let mut i = range.start;
    while i < range.end {
        let column = abs_x(i).floor();
        let mut j = i + 1;
        while j < range.end && abs_x(j).floor() == column {
            j += 1;
        }

        let (min_v, max_v) = samples[i..j]
            .iter()
            .map(|&v| ymap.clip(v))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let top = ymap.y(max_v);
        let bottom = ymap.y(min_v);
        let left = (column - offset_x) as f32;
        let mid = left + 0.5;
        let first_y = ymap.y(samples[i]);
        let prev_y = if i > 0 { ymap.y(samples[i - 1]) } else { first_y };

        if bottom - top > threshold {
            let env = open.get_or_insert_with(|| {
                path.line.points.push([mid, first_y]);
                let mut env = Envelope {
                    border: params.border_for_envelope,
                    ..Default::default()
                };
                // pinch the start at the previous sample
                env.push(left, prev_y, prev_y);
                env
            });
            env.push(mid, top, bottom);
        } else if let Some(mut env) = open.take() {
            env.push(left, first_y, first_y);
            path.envelopes.push(env);
            path.line.points.push([left, prev_y]);
        }
        path.line.points.push([mid, (top + bottom) / 2.0]);

        last_left = left;
        i = j;
    }

    if let Some(mut env) = open.take() {
        let right = last_left + 1.0;
        let last_y = ymap.y(samples[range.end - 1]);
        env.push(right, last_y, last_y);
        path.envelopes.push(env);
        path.line.points.push([right, last_y]);
    }

    log::trace!(
        "decimated {} samples into {} line points and {} envelopes",
        range.len(),
        path.line.points.len(),
        path.envelopes.len()
    );
    path
}
