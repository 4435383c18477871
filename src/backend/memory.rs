//! In-memory backend serving precomputed channels.

use std::collections::HashMap;

use super::{Backend, BackendError, ChannelKey, SpectrogramRequest};
use crate::colormap::ColorMap;
use crate::resample::{cpu, Quality};
use crate::signal::{CropWindow, LuminanceTexture, Placement, WaveformBuffer};

/// Largest texture edge the backend will produce.
pub const MAX_TEXTURE_DIM: u32 = 16_384;

/// Full-resolution magnitude grid and samples of one channel.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    /// One column per STFT frame, row 0 the highest bin.
    pub magnitudes: LuminanceTexture,
    pub waveform: WaveformBuffer,
}

impl MemoryChannel {
    /// Wrap a magnitude grid with `frames_per_sec` columns per second spanning
    /// `0..sample_rate/2` Hz.
    pub fn new(
        magnitudes: Vec<f32>,
        frames: u32,
        bins: u32,
        frames_per_sec: f64,
        waveform: WaveformBuffer,
    ) -> Result<Self, BackendError> {
        let placement = Placement {
            px_per_sec: frames_per_sec,
            hz_range: (0.0, waveform.sample_rate() as f32 / 2.0),
            ..Default::default()
        };
        Ok(Self {
            magnitudes: LuminanceTexture::new(magnitudes, frames, bins, placement)?,
            waveform,
        })
    }
}

/// Backend over channels held in memory. Textures are produced at the
/// requested density with the Lanczos-3 CPU resampler.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    channels: HashMap<ChannelKey, MemoryChannel>,
    colormap: Vec<u8>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            colormap: ColorMap::default_ramp_bytes(),
        }
    }

    pub fn with_colormap(mut self, ramp: Vec<u8>) -> Self {
        self.colormap = ramp;
        self
    }

    pub fn insert(&mut self, key: ChannelKey, channel: MemoryChannel) {
        log::debug!(
            "backend: channel {key} ({}x{} grid, {} samples)",
            channel.magnitudes.width(),
            channel.magnitudes.height(),
            channel.waveform.len()
        );
        self.channels.insert(key, channel);
    }

    pub fn remove(&mut self, key: ChannelKey) -> Option<MemoryChannel> {
        self.channels.remove(&key)
    }

    pub fn channel(&self, key: ChannelKey) -> Result<&MemoryChannel, BackendError> {
        self.channels.get(&key).ok_or(BackendError::UnknownChannel(key))
    }

    fn render_spectrogram(
        &self,
        request: &SpectrogramRequest,
    ) -> Result<LuminanceTexture, BackendError> {
        request.validate()?;
        let source = &self.channel(request.key)?.magnitudes;
        let (start, end) = request.time_range_sec;
        let pps = request.px_per_sec;
        let margin = request.margin_px as f64;

        let content_width = ((end - start) * pps).ceil();
        let width = content_width + 2.0 * margin;
        let height = request.height_px as f64 + 2.0 * margin;
        if width > MAX_TEXTURE_DIM as f64 || height > MAX_TEXTURE_DIM as f64 {
            return Err(BackendError::InvalidRequest(format!(
                "texture {width}x{height} exceeds {MAX_TEXTURE_DIM}"
            )));
        }

        let (lo, hi) = request.hz_range;
        let hz_per_row = (hi - lo) / request.height_px as f32;
        let margin_hz = margin as f32 * hz_per_row;
        let left = source.sec_to_column(start - margin / pps);
        let top = source.hz_to_row(hi + margin_hz);
        let crop = CropWindow {
            left,
            top,
            width: width / pps * source.placement.px_per_sec,
            height: source.hz_to_row(lo - margin_hz) - top,
        };
        let data = cpu::resample(
            source,
            &crop,
            width as u32,
            height as u32,
            Quality::Lanczos3,
            None,
        )?;

        let placement = Placement {
            start_sec: start,
            px_per_sec: pps,
            left_margin: margin,
            right_margin: width - margin - (end - start) * pps,
            top_margin: margin,
            bottom_margin: margin,
            hz_range: request.hz_range,
        };
        Ok(LuminanceTexture::new(data, width as u32, height as u32, placement)?)
    }
}

impl Backend for MemoryBackend {
    async fn get_spectrogram(
        &self,
        request: &SpectrogramRequest,
    ) -> Result<LuminanceTexture, BackendError> {
        self.render_spectrogram(request)
    }

    async fn get_waveform(
        &self,
        key: ChannelKey,
        time_range_sec: (f64, f64),
    ) -> Result<WaveformBuffer, BackendError> {
        let (start, end) = time_range_sec;
        if !(start.is_finite() && end.is_finite() && start < end) {
            return Err(BackendError::InvalidRange { start, end });
        }
        Ok(self.channel(key)?.waveform.window(start, end))
    }

    async fn get_colormap(&self) -> Result<Vec<u8>, BackendError> {
        Ok(self.colormap.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::synth;

    fn backend() -> MemoryBackend {
        let wav = WaveformBuffer::new(synth::generate_sine(440.0, 8000, 2.0, 0.5), 8000);
        let channel = MemoryChannel::new(vec![0.3; 200 * 64], 200, 64, 100.0, wav).unwrap();
        let mut backend = MemoryBackend::new();
        backend.insert(ChannelKey::new(0, 0), channel);
        backend
    }

    fn request() -> SpectrogramRequest {
        SpectrogramRequest {
            key: ChannelKey::new(0, 0),
            time_range_sec: (0.5, 1.5),
            hz_range: (0.0, 4000.0),
            px_per_sec: 50.0,
            height_px: 32,
            margin_px: 8,
        }
    }

    #[test]
    fn test_spectrogram_has_requested_geometry() {
        let tex = pollster::block_on(backend().get_spectrogram(&request())).unwrap();
        assert_eq!(tex.width(), 50 + 16);
        assert_eq!(tex.height(), 32 + 16);
        assert_eq!(tex.placement.left_margin, 8.0);
        assert_eq!(tex.content_height(), 32.0);
        assert!(tex.data().iter().all(|v| (v - 0.3).abs() < 1e-5));
    }

    #[test]
    fn test_spectrogram_covers_requested_viewport() {
        let tex = pollster::block_on(backend().get_spectrogram(&request())).unwrap();
        let vp = crate::viewport::Viewport {
            start_sec: 0.5,
            px_per_sec: 50.0,
            width_px: 50,
            height_px: 32,
            hz_range: (0.0, 4000.0),
            ..Default::default()
        };
        assert!(tex.covers(&vp));
    }

    #[test]
    fn test_unknown_channel() {
        let mut req = request();
        req.key = ChannelKey::new(9, 9);
        let err = pollster::block_on(backend().get_spectrogram(&req)).unwrap_err();
        assert!(matches!(err, BackendError::UnknownChannel(_)));
    }

    #[test]
    fn test_waveform_and_colormap() {
        let backend = backend();
        let wav = pollster::block_on(backend.get_waveform(ChannelKey::new(0, 0), (0.5, 1.0))).unwrap();
        assert_eq!(wav.sample_rate(), 8000);
        assert_eq!(wav.len(), 4000);
        assert_eq!(wav.start_sec(), 0.5);
        assert_eq!(wav.track_sec(), 2.0);
        assert!(wav.covers(0.5, 1.0));
        assert!(!wav.covers(0.0, 1.0));
        let ramp = pollster::block_on(backend.get_colormap()).unwrap();
        assert_eq!(ramp.len(), 257 * 3);
        assert!(pollster::block_on(backend.get_waveform(ChannelKey::new(0, 0), (1.0, 0.0))).is_err());
    }
}
