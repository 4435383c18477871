//! Render one channel through a short pan and save the frames as PNGs.
//!
//! Usage: cargo run --example render_viewport --features demo [OUT_DIR]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use sigscope::backend::{load_colormap, ChannelKey, MemoryBackend, MemoryChannel};
use sigscope::signal::{synth, WaveformBuffer};
use sigscope::{ChannelView, GpuContext, RendererConfig, Viewport};

const SAMPLE_RATE: u32 = 16_000;
const FRAMES_PER_SEC: f64 = 100.0;

fn backend(key: ChannelKey) -> Result<MemoryBackend> {
    let duration = 10.0;
    let mut samples = synth::generate_sine(220.0, SAMPLE_RATE, duration, 0.5);
    let noise = synth::generate_white_noise(samples.len(), 0.1, 3);
    for (s, n) in samples.iter_mut().zip(noise) {
        *s += n;
    }
    let frames = (duration as f64 * FRAMES_PER_SEC) as u32;
    let bins = 256;
    let channel = MemoryChannel::new(
        synth::chirp_grid(frames, bins),
        frames,
        bins,
        FRAMES_PER_SEC,
        WaveformBuffer::new(samples, SAMPLE_RATE),
    )?;
    let mut backend = MemoryBackend::new();
    backend.insert(key, channel);
    Ok(backend)
}

fn save(pixels: Vec<u8>, (width, height): (u32, u32), path: PathBuf) -> Result<()> {
    let Some(image) = image::RgbaImage::from_raw(width, height, pixels) else {
        bail!("readback of {width}x{height} has the wrong length");
    };
    image.save(&path).with_context(|| format!("writing {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "frames".to_string()));
    std::fs::create_dir_all(&out_dir)?;

    let key = ChannelKey::new(0, 0);
    let backend = backend(key)?;
    let config = RendererConfig::default();
    let quiet = config.quiet_period();

    let ctx = GpuContext::new().await.context("no GPU adapter")?;
    log::info!("adapter: {}", ctx.adapter_info().name);
    let mut view = ChannelView::new(ctx, key, config)?;
    view.set_colormap(&load_colormap(&backend).await?);

    let mut viewport = Viewport {
        start_sec: 1.0,
        px_per_sec: 120.0,
        hz_range: (0.0, SAMPLE_RATE as f32 / 2.0),
        blend: 0.5,
        width_px: 960,
        height_px: 240,
        ..Default::default()
    };
    let (width, height) = viewport.physical_size();
    view.resize(width, height)?;
    view.fetch_now(&backend, &viewport).await?;

    // pan at 60 fps; fetches go through the throttle
    let start = Instant::now();
    for frame in 0..30u32 {
        let now = start + Duration::from_millis(16 * frame as u64);
        viewport.pan_px(8.0);
        if view.request_data(&viewport) {
            if let Some(job) = view.poll_fetch(now) {
                let result = job.run(&backend).await;
                if let Err(err) = view.apply(result) {
                    log::warn!("frame {frame}: {err}");
                }
            }
        }
        let outcome = view.render_at(&viewport, now);
        log::debug!("frame {frame}: {outcome:?}");
    }
    save(
        view.spectrogram_renderer().read_pixels()?,
        (width, height),
        out_dir.join("spectrogram_moving.png"),
    )?;

    // settle: the next frame after the quiet period upgrades to Lanczos
    let settled = start + Duration::from_millis(16 * 30) + quiet + Duration::from_millis(1);
    let outcome = view.render_at(&viewport, settled);
    log::info!("settled frame: {outcome:?}");
    view.spectrogram_renderer()
        .to_image()?
        .save(out_dir.join("spectrogram_settled.png"))?;
    save(
        view.waveform_layer().read_pixels()?,
        (width, height),
        out_dir.join("waveform.png"),
    )?;

    log::info!("resources: {:?}", view.stats());
    view.dispose();
    Ok(())
}
