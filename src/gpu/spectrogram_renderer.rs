//! Headless spectrogram renderer: resample, colormap, read back.
//!
//! Every viewport change is drawn immediately with the bilinear tier. Once
//! the viewport has been still for the configured quiet period, the next
//! `render` redraws the same frame with Lanczos-3.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use super::compositor::{Compositor, Scissor, OUTPUT_FORMAT};
use super::context::GpuContext;
use super::error::{InitError, RenderError};
use super::resampler::TwoPassResampler;
use super::resources::{ResourceStats, ScopedTarget, SourceTexture, StatsSnapshot};
use super::textures::{decode_pass_texels, select_pass_format, ReadbackBuffer};
use crate::colormap::{overlay_alpha, ColorMap};
use crate::config::RendererConfig;
use crate::resample::Quality;
use crate::scheduler::Debounce;
use crate::signal::{CropWindow, LuminanceTexture};
use crate::viewport::{Viewport, ViewportError};

/// Why a frame drew nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Zero-area destination.
    ZeroSize,
    /// No spectrogram has been received yet.
    NoData,
    /// The viewport maps to an empty source rectangle.
    DegenerateCrop,
    InvalidViewport(ViewportError),
}

/// Work a frame needs, decided before touching the GPU.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePlan {
    Skip(SkipReason),
    /// Spectrogram hidden: black over the track span, nothing else.
    ClearOnly { scissor: Scissor },
    Resample {
        crop: CropWindow,
        scissor: Scissor,
        overlay_alpha: f32,
    },
}

/// Result of one `render` call. Failures are absorbed here; the previous
/// output stays in the target.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Inputs unchanged and nothing left to upgrade.
    Unchanged,
    Skipped(SkipReason),
    Cleared,
    Drawn(Quality),
    Failed(RenderError),
}

/// Device-pixel columns `[x(0 s), x(track_sec))` clipped to the target.
/// Without a known track length the whole width is used.
pub fn track_span(viewport: &Viewport, track_sec: Option<f64>, width: u32, height: u32) -> Scissor {
    let w = width as f64;
    let x0 = viewport.sec_to_x(0.0).clamp(0.0, w);
    let x1 = track_sec.map_or(w, |sec| viewport.sec_to_x(sec).clamp(0.0, w));
    let x = x0.floor();
    let end = x1.ceil().max(x);
    Scissor {
        x: x as u32,
        width: (end - x) as u32,
        height,
    }
}

/// Decide what a frame must do for `viewport`.
pub fn plan_frame(
    viewport: &Viewport,
    source: Option<&LuminanceTexture>,
    track_sec: Option<f64>,
) -> FramePlan {
    if let Err(err) = viewport.validate() {
        return FramePlan::Skip(SkipReason::InvalidViewport(err));
    }
    let (width, height) = viewport.physical_size();
    if width == 0 || height == 0 {
        return FramePlan::Skip(SkipReason::ZeroSize);
    }
    let scissor = track_span(viewport, track_sec, width, height);
    if viewport.blend <= 0.0 {
        return FramePlan::ClearOnly { scissor };
    }
    let Some(source) = source else {
        return FramePlan::Skip(SkipReason::NoData);
    };
    let crop = source.crop_window(viewport);
    if crop.is_degenerate() {
        return FramePlan::Skip(SkipReason::DegenerateCrop);
    }
    FramePlan::Resample {
        crop,
        scissor,
        overlay_alpha: overlay_alpha(viewport.blend),
    }
}

/// GPU objects owned by one render surface.
///
/// Created by [`GpuResourceSet::open`], torn down by [`GpuResourceSet::close`]
/// or on drop. Per-call pass targets never outlive the call.
pub struct GpuResourceSet {
    ctx: GpuContext,
    stats: Arc<ResourceStats>,
    resampler: TwoPassResampler,
    compositor: Compositor,
    output: Option<ScopedTarget>,
    source: Option<SourceTexture>,
    closed: bool,
}

impl GpuResourceSet {
    pub fn open(
        ctx: GpuContext,
        stats: Arc<ResourceStats>,
        config: &RendererConfig,
        colormap: &ColorMap,
    ) -> Result<Self, InitError> {
        let pass_format = select_pass_format(|format| ctx.adapter.get_texture_format_features(format).allowed_usages)
            .ok_or_else(|| InitError::NoRenderableFormat {
                pass: "resample",
                adapter: ctx.adapter_info().name,
            })?;
        log::debug!("resample passes render to {pass_format:?}");
        let resampler = TwoPassResampler::new(&ctx.device, pass_format, config.max_support_radius)?;
        let compositor = Compositor::new(&ctx.device, &ctx.queue, colormap)?;
        Ok(Self {
            ctx,
            stats,
            resampler,
            compositor,
            output: None,
            source: None,
            closed: false,
        })
    }

    pub fn stats(&self) -> &Arc<ResourceStats> {
        &self.stats
    }

    pub fn output_size(&self) -> Option<(u32, u32)> {
        self.output.as_ref().map(ScopedTarget::size)
    }

    /// Texture format of the resample pass targets.
    pub fn pass_format(&self) -> wgpu::TextureFormat {
        self.resampler.format()
    }

    /// (Re)allocate the output target. A zero size releases it.
    ///
    /// The new target replaces the old one only once it exists, so a failed
    /// resize keeps the previous frame.
    pub fn resize_output(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if self.output_size() == Some((width, height)) {
            return Ok(());
        }
        if width == 0 || height == 0 {
            self.output = None;
            return Ok(());
        }
        let output = ScopedTarget::acquire(&self.ctx.device, &self.stats, "output", width, height, OUTPUT_FORMAT)?;
        self.output = Some(output);
        Ok(())
    }

    fn upload_if_changed(&mut self, luminance: &LuminanceTexture) -> Result<(), RenderError> {
        if self.source.as_ref().map(SourceTexture::source_id) == Some(luminance.id()) {
            return Ok(());
        }
        // release the old texture before creating the new one
        self.source = None;
        self.source = Some(SourceTexture::upload(
            &self.ctx.device,
            &self.ctx.queue,
            &self.stats,
            luminance,
        )?);
        Ok(())
    }

    pub fn set_colormap(&self, colormap: &ColorMap) {
        self.compositor.set_colormap(&self.ctx.queue, colormap);
    }

    /// Blacken `scissor` of the output without binding any resampling state.
    pub fn clear(&mut self, scissor: Scissor) -> Result<(), RenderError> {
        let output = self.output.as_ref().ok_or(RenderError::InvalidDimension {
            what: "output",
            width: 0.0,
            height: 0.0,
        })?;
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear_encoder"),
            });
        self.compositor
            .encode_clear(&mut encoder, &self.stats, output.view(), scissor);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Resample `crop` of `luminance` into the output and colorize it.
    pub fn draw(
        &mut self,
        luminance: &LuminanceTexture,
        crop: &CropWindow,
        quality: Quality,
        overlay_alpha: f32,
        scissor: Scissor,
    ) -> Result<(), RenderError> {
        self.upload_if_changed(luminance)?;
        let (Some(output), Some(source)) = (self.output.as_ref(), self.source.as_ref()) else {
            return Err(RenderError::InvalidDimension {
                what: "output",
                width: 0.0,
                height: 0.0,
            });
        };
        let (width, height) = output.size();
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("spectrogram_encoder"),
            });
        let resampled = self.resampler.encode(
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &self.stats,
            source,
            crop,
            width,
            height,
            quality,
        )?;
        self.compositor.encode_composite(
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &self.stats,
            resampled.filtered.view(),
            output.view(),
            overlay_alpha,
            scissor,
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        // pass targets are released here, after submission
        drop(resampled);
        Ok(())
    }

    /// Resample without colorizing and read the filtered values back.
    pub fn resample_to_vec(
        &mut self,
        luminance: &LuminanceTexture,
        crop: &CropWindow,
        width: u32,
        height: u32,
        quality: Quality,
    ) -> Result<Vec<f32>, RenderError> {
        self.upload_if_changed(luminance)?;
        let source = self.source.as_ref().ok_or(RenderError::Disposed)?;
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("resample_readback_encoder"),
            });
        let resampled = self.resampler.encode(
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &self.stats,
            source,
            crop,
            width,
            height,
            quality,
        )?;
        let readback = ReadbackBuffer::new(&self.ctx.device, width, height);
        readback.copy_from(&mut encoder, resampled.filtered.target().texture());
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        drop(resampled);
        decode_pass_texels(self.resampler.format(), &readback.read_bytes(&self.ctx.device)?)
    }

    /// Read the RGBA output back to the CPU.
    pub fn read_output(&self) -> Result<Vec<u8>, RenderError> {
        let output = self.output.as_ref().ok_or(RenderError::InvalidDimension {
            what: "output",
            width: 0.0,
            height: 0.0,
        })?;
        let (width, height) = output.size();
        let readback = ReadbackBuffer::new(&self.ctx.device, width, height);
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("output_readback_encoder"),
            });
        readback.copy_from(&mut encoder, output.target().texture());
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        readback.read_bytes(&self.ctx.device)
    }

    /// Release every texture and buffer. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.output = None;
        self.source = None;
        self.resampler.destroy();
        self.compositor.destroy();
        self.closed = true;
        log::debug!("gpu resource set closed: {:?}", self.stats.snapshot());
    }
}

impl Drop for GpuResourceSet {
    fn drop(&mut self) {
        self.close();
    }
}

/// Spectrogram layer of one render surface.
pub struct SpectrogramRenderer {
    resources: Option<GpuResourceSet>,
    stats: Arc<ResourceStats>,
    config: RendererConfig,
    spectrogram: Option<LuminanceTexture>,
    track_sec: Option<f64>,
    colormap_version: u64,
    debounce: Debounce,
    last_key: Option<u64>,
    drawn: Option<Quality>,
}

impl SpectrogramRenderer {
    pub fn new(ctx: GpuContext, config: RendererConfig) -> Result<Self, InitError> {
        Self::with_stats(ctx, config, Arc::new(ResourceStats::default()))
    }

    /// Create a renderer that reports into shared counters.
    pub fn with_stats(
        ctx: GpuContext,
        config: RendererConfig,
        stats: Arc<ResourceStats>,
    ) -> Result<Self, InitError> {
        config.validate()?;
        let resources = GpuResourceSet::open(ctx, Arc::clone(&stats), &config, &ColorMap::default())?;
        Ok(Self {
            resources: Some(resources),
            stats,
            debounce: Debounce::new(config.quiet_period()),
            config,
            spectrogram: None,
            track_sec: None,
            colormap_version: 0,
            last_key: None,
            drawn: None,
        })
    }

    /// Create a renderer on a fresh headless GPU context.
    pub async fn headless(config: RendererConfig) -> Result<Self, InitError> {
        let ctx = GpuContext::new().await?;
        Self::new(ctx, config)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Texture format the resample passes render into on this device.
    pub fn pass_format(&self) -> Option<wgpu::TextureFormat> {
        self.resources.as_ref().map(GpuResourceSet::pass_format)
    }

    /// Replace the luminance source. It is uploaded on the next draw.
    pub fn set_spectrogram(&mut self, spectrogram: LuminanceTexture) {
        self.spectrogram = Some(spectrogram);
    }

    pub fn spectrogram(&self) -> Option<&LuminanceTexture> {
        self.spectrogram.as_ref()
    }

    pub fn clear_spectrogram(&mut self) {
        self.spectrogram = None;
    }

    pub fn set_colormap(&mut self, colormap: &ColorMap) {
        if let Some(resources) = &self.resources {
            resources.set_colormap(colormap);
        }
        self.colormap_version += 1;
    }

    /// Length of the track in seconds; bounds the painted span.
    pub fn set_track_duration(&mut self, track_sec: Option<f64>) {
        self.track_sec = track_sec;
    }

    /// Reallocate the output for a `width x height` device-pixel surface.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let resources = self.resources.as_mut().ok_or(RenderError::Disposed)?;
        resources.resize_output(width, height)?;
        self.last_key = None;
        Ok(())
    }

    /// Release all GPU resources. Later renders fail with `Disposed`.
    pub fn dispose(&mut self) {
        if let Some(mut resources) = self.resources.take() {
            resources.close();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.resources.is_none()
    }

    /// Quality currently shown, if a frame has been drawn for the inputs.
    pub fn drawn_quality(&self) -> Option<Quality> {
        self.drawn
    }

    pub fn render(&mut self, viewport: &Viewport) -> FrameOutcome {
        self.render_at(viewport, Instant::now())
    }

    /// Render with an explicit clock.
    pub fn render_at(&mut self, viewport: &Viewport, now: Instant) -> FrameOutcome {
        if self.resources.is_none() {
            return FrameOutcome::Failed(RenderError::Disposed);
        }
        let key = self.frame_key(viewport);
        let quality = if self.last_key != Some(key) {
            self.debounce.touch(now);
            self.last_key = Some(key);
            self.drawn = None;
            Quality::Bilinear
        } else if self.drawn == Some(Quality::Bilinear)
            && self.config.high_quality
            && self.debounce.poll(now)
        {
            Quality::Lanczos3
        } else {
            return FrameOutcome::Unchanged;
        };

        let plan = plan_frame(viewport, self.spectrogram.as_ref(), self.track_sec);
        let outcome = self.execute(viewport, &plan, quality);
        match &outcome {
            FrameOutcome::Failed(err) => {
                log::warn!("spectrogram frame failed ({}): {err}", quality.name());
                if quality == Quality::Bilinear {
                    // retry on the next frame
                    self.last_key = None;
                }
            }
            FrameOutcome::Skipped(reason) => log::debug!("spectrogram frame skipped: {reason:?}"),
            FrameOutcome::Drawn(q) => {
                log::debug!("spectrogram frame drawn ({})", q.name());
                self.drawn = Some(*q);
            }
            FrameOutcome::Cleared | FrameOutcome::Unchanged => {}
        }
        outcome
    }

    fn execute(&mut self, viewport: &Viewport, plan: &FramePlan, quality: Quality) -> FrameOutcome {
        let Some(resources) = self.resources.as_mut() else {
            return FrameOutcome::Failed(RenderError::Disposed);
        };
        let result = match plan {
            FramePlan::Skip(reason) => return FrameOutcome::Skipped(reason.clone()),
            FramePlan::ClearOnly { scissor } => {
                let (width, height) = viewport.physical_size();
                resources
                    .resize_output(width, height)
                    .and_then(|_| resources.clear(*scissor))
                    .map(|_| FrameOutcome::Cleared)
            }
            FramePlan::Resample {
                crop,
                scissor,
                overlay_alpha,
            } => {
                let Some(spectrogram) = self.spectrogram.as_ref() else {
                    return FrameOutcome::Skipped(SkipReason::NoData);
                };
                let (width, height) = viewport.physical_size();
                resources
                    .resize_output(width, height)
                    .and_then(|_| resources.draw(spectrogram, crop, quality, *overlay_alpha, *scissor))
                    .map(|_| FrameOutcome::Drawn(quality))
            }
        };
        result.unwrap_or_else(FrameOutcome::Failed)
    }

    fn frame_key(&self, viewport: &Viewport) -> u64 {
        let mut hasher = DefaultHasher::new();
        viewport.fingerprint().hash(&mut hasher);
        self.spectrogram.as_ref().map(LuminanceTexture::id).hash(&mut hasher);
        self.track_sec.map(f64::to_bits).hash(&mut hasher);
        self.colormap_version.hash(&mut hasher);
        hasher.finish()
    }

    /// RGBA bytes of the current output.
    pub fn read_pixels(&self) -> Result<Vec<u8>, RenderError> {
        self.resources
            .as_ref()
            .ok_or(RenderError::Disposed)?
            .read_output()
    }

    pub fn to_image(&self) -> Result<image::RgbaImage, RenderError> {
        let resources = self.resources.as_ref().ok_or(RenderError::Disposed)?;
        let (width, height) = resources.output_size().ok_or(RenderError::InvalidDimension {
            what: "output",
            width: 0.0,
            height: 0.0,
        })?;
        let pixels = resources.read_output()?;
        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::Readback("pixel buffer does not match output size".into()))
    }

    /// Resample through the GPU passes and return the filtered values.
    pub fn resample_to_vec(
        &mut self,
        luminance: &LuminanceTexture,
        crop: &CropWindow,
        width: u32,
        height: u32,
        quality: Quality,
    ) -> Result<Vec<f32>, RenderError> {
        self.resources
            .as_mut()
            .ok_or(RenderError::Disposed)?
            .resample_to_vec(luminance, crop, width, height, quality)
    }
}

impl Drop for SpectrogramRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}
