//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use sigscope::backend::{ChannelKey, MemoryBackend, MemoryChannel};
use sigscope::gpu::{GpuContext, InitError, SpectrogramRenderer};
use sigscope::RendererConfig;
use sigscope::signal::{synth, LuminanceTexture, Placement, WaveformBuffer};
use sigscope::viewport::Viewport;

pub const SAMPLE_RATE: u32 = 8000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// GPU context, or `None` on machines without an adapter.
pub async fn gpu_context() -> Option<GpuContext> {
    init_logging();
    GpuContext::new().await.ok()
}

/// `Some` on success, `None` when the device cannot render the resample
/// passes at all. Any other init failure is a bug and panics.
pub fn supported<T>(result: Result<T, InitError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err @ InitError::NoRenderableFormat { .. }) => {
            log::warn!("skipping: {err}");
            None
        }
        Err(err) => panic!("renderer init failed: {err}"),
    }
}

pub fn renderer_on(ctx: GpuContext, config: RendererConfig) -> Option<SpectrogramRenderer> {
    supported(SpectrogramRenderer::new(ctx, config))
}

pub async fn renderer(config: RendererConfig) -> Option<SpectrogramRenderer> {
    renderer_on(gpu_context().await?, config)
}

/// Largest GPU/CPU difference expected for the renderer's pass format.
/// 8-bit pass targets quantize each pass and clamp ringing to `[0, 1]`.
pub fn pass_tolerance(renderer: &SpectrogramRenderer) -> f32 {
    match renderer.pass_format() {
        Some(wgpu::TextureFormat::R32Float) => 5e-3,
        _ => 3e-2,
    }
}

/// CPU reference values as a pass target in `renderer`'s format holds them.
pub fn as_stored(renderer: &SpectrogramRenderer, values: Vec<f32>) -> Vec<f32> {
    match renderer.pass_format() {
        Some(wgpu::TextureFormat::R32Float) => values,
        _ => values.into_iter().map(|v| v.clamp(0.0, 1.0)).collect(),
    }
}

/// 100 columns per second over 0..1000 Hz, no margins.
pub fn placement() -> Placement {
    Placement {
        start_sec: 0.0,
        px_per_sec: 100.0,
        hz_range: (0.0, 1000.0),
        ..Default::default()
    }
}

pub fn chirp_texture(width: u32, height: u32) -> LuminanceTexture {
    LuminanceTexture::new(synth::chirp_grid(width, height), width, height, placement()).unwrap()
}

pub fn constant_texture(width: u32, height: u32, value: f32) -> LuminanceTexture {
    LuminanceTexture::from_fn(width, height, placement(), |_, _| value).unwrap()
}

/// 2 s viewport window at 100 px/s over the texture's frequency range.
pub fn viewport() -> Viewport {
    Viewport {
        start_sec: 0.5,
        px_per_sec: 100.0,
        hz_range: (0.0, 1000.0),
        amp_range: (-1.0, 1.0),
        blend: 0.5,
        device_pixel_ratio: 1.0,
        width_px: 200,
        height_px: 50,
    }
}

pub fn channel_key() -> ChannelKey {
    ChannelKey::new(0, 0)
}

/// One channel: 4 s of a 440 Hz sine with a 400-frame chirp spectrogram.
pub fn memory_backend() -> MemoryBackend {
    let samples = synth::generate_sine(440.0, SAMPLE_RATE, 4.0, 0.8);
    let waveform = WaveformBuffer::new(samples, SAMPLE_RATE);
    let channel = MemoryChannel::new(synth::chirp_grid(400, 128), 400, 128, 100.0, waveform).unwrap();
    let mut backend = MemoryBackend::new();
    backend.insert(channel_key(), channel);
    backend
}

/// RGBA texel at `(x, y)` of a tightly packed image `width` texels wide.
pub fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
}
