//! Boundary to the data-producing backend.
//!
//! The renderer never computes spectrograms or decodes audio itself: it asks a
//! [`Backend`] for textures and sample buffers and tolerates the latency of
//! those calls.

pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::colormap::{ColorMap, ColorMapError};
use crate::resample::ResampleError;
use crate::signal::{LuminanceTexture, TextureError, WaveformBuffer};

pub use memory::{MemoryBackend, MemoryChannel};

/// Identifies one channel of one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    pub track: u32,
    pub channel: u32,
}

impl ChannelKey {
    pub fn new(track: u32, channel: u32) -> Self {
        Self { track, channel }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.track, self.channel)
    }
}

/// A spectrogram texture for a time window at a given density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramRequest {
    pub key: ChannelKey,
    pub time_range_sec: (f64, f64),
    pub hz_range: (f32, f32),
    /// Columns per second of the returned texture.
    pub px_per_sec: f64,
    /// Content rows covering `hz_range`.
    pub height_px: u32,
    /// Extra columns (and rows) beyond each edge.
    pub margin_px: u32,
}

impl SpectrogramRequest {
    pub fn validate(&self) -> Result<(), BackendError> {
        let (start, end) = self.time_range_sec;
        if !(start.is_finite() && end.is_finite() && start < end) {
            return Err(BackendError::InvalidRange { start, end });
        }
        if !(self.px_per_sec > 0.0) || self.height_px == 0 || !(self.hz_range.0 < self.hz_range.1) {
            return Err(BackendError::InvalidRequest(format!(
                "{}x{} rows at {} px/s over {:?} Hz",
                self.key, self.height_px, self.px_per_sec, self.hz_range
            )));
        }
        Ok(())
    }
}

/// Errors surfaced by a backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Unknown channel: {0}")]
    UnknownChannel(ChannelKey),
    #[error("Invalid time range [{start}, {end})")]
    InvalidRange { start: f64, end: f64 },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),
    #[error("Resample error: {0}")]
    Resample(#[from] ResampleError),
    #[error("Invalid colormap ramp: {0}")]
    ColorMap(#[from] ColorMapError),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Data-producing calls the renderer consumes. Calls may suspend.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Texture covering the requested window plus margins.
    async fn get_spectrogram(
        &self,
        request: &SpectrogramRequest,
    ) -> Result<LuminanceTexture, BackendError>;

    /// Read-only sample snapshot of a channel that covers `time_range_sec`
    /// clipped to the track. The buffer carries its own start time and the
    /// track length, so it may hold more than was asked for.
    async fn get_waveform(
        &self,
        key: ChannelKey,
        time_range_sec: (f64, f64),
    ) -> Result<WaveformBuffer, BackendError>;

    /// Colormap ramp as RGB byte triples.
    async fn get_colormap(&self) -> Result<Vec<u8>, BackendError>;
}

/// Fetch the backend ramp and build the lookup table from it.
pub async fn load_colormap<B: Backend>(backend: &B) -> Result<ColorMap, BackendError> {
    let ramp = backend.get_colormap().await?;
    Ok(ColorMap::from_ramp_bytes(&ramp)?)
}
