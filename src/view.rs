//! One render surface per (track, channel): spectrogram plus waveform.
//!
//! Rendering only ever reads data already received. Fetching is split off
//! into [`FetchJob`]s that own their inputs, so several can be in flight and
//! complete in any order; [`ChannelView::apply`] keeps only the newest.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use crate::backend::{Backend, BackendError, ChannelKey, SpectrogramRequest};
use crate::colormap::ColorMap;
use crate::config::RendererConfig;
use crate::gpu::{
    FrameOutcome, GpuContext, InitError, RenderError, ResourceStats, SpectrogramRenderer,
    StatsSnapshot, WaveformLayer,
};
use crate::scheduler::{DataFeed, FetchTicket, Throttle};
use crate::signal::{LuminanceTexture, WaveformBuffer};
use crate::viewport::Viewport;
use crate::waveform::{decimate, DecimateParams, DecimatedPath, WaveformStyle};

/// What happened to the waveform layer in one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum WaveformOutcome {
    Unchanged,
    NoData,
    Drawn { envelopes: usize },
    Failed(RenderError),
}

/// Outcome of both layers of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewFrame {
    pub spectrogram: FrameOutcome,
    pub waveform: WaveformOutcome,
}

/// Backend calls for one throttled fetch, detached from the view.
#[derive(Debug, Clone)]
pub struct FetchJob {
    key: ChannelKey,
    spectrogram: Option<(FetchTicket, SpectrogramRequest)>,
    waveform: Option<(FetchTicket, (f64, f64))>,
}

/// Responses of a [`FetchJob`], tagged with the tickets they were issued with.
#[derive(Debug)]
pub struct FetchResult {
    spectrogram: Option<(FetchTicket, Result<LuminanceTexture, BackendError>)>,
    waveform: Option<(FetchTicket, Result<WaveformBuffer, BackendError>)>,
}

impl FetchJob {
    pub fn key(&self) -> ChannelKey {
        self.key
    }

    pub fn spectrogram_request(&self) -> Option<&SpectrogramRequest> {
        self.spectrogram.as_ref().map(|(_, request)| request)
    }

    pub fn wants_waveform(&self) -> bool {
        self.waveform.is_some()
    }

    pub async fn run<B: Backend>(self, backend: &B) -> FetchResult {
        let spectrogram = match self.spectrogram {
            Some((ticket, request)) => Some((ticket, backend.get_spectrogram(&request).await)),
            None => None,
        };
        let waveform = match self.waveform {
            Some((ticket, range)) => Some((ticket, backend.get_waveform(self.key, range).await)),
            None => None,
        };
        FetchResult {
            spectrogram,
            waveform,
        }
    }
}

/// Spectrogram and waveform layers of one channel.
pub struct ChannelView {
    key: ChannelKey,
    config: RendererConfig,
    stats: Arc<ResourceStats>,
    spectrogram: SpectrogramRenderer,
    waveform: WaveformLayer,
    base_style: WaveformStyle,
    spectrogram_feed: DataFeed<LuminanceTexture>,
    waveform_feed: DataFeed<WaveformBuffer>,
    throttle: Throttle<Viewport>,
    clip_values: Option<(f32, f32)>,
    path: Option<DecimatedPath>,
    path_key: Option<u64>,
}

impl ChannelView {
    pub fn new(ctx: GpuContext, key: ChannelKey, config: RendererConfig) -> Result<Self, InitError> {
        let stats = Arc::new(ResourceStats::default());
        let base_style = WaveformStyle::from_config(&config, 1.0)?;
        let spectrogram = SpectrogramRenderer::with_stats(ctx.clone(), config.clone(), Arc::clone(&stats))?;
        let waveform = WaveformLayer::new(ctx, Arc::clone(&stats))?;
        log::debug!("channel view {key} created");
        Ok(Self {
            key,
            throttle: Throttle::new(config.fetch_interval()),
            config,
            stats,
            spectrogram,
            waveform,
            base_style,
            spectrogram_feed: DataFeed::new("spectrogram"),
            waveform_feed: DataFeed::new("waveform"),
            clip_values: None,
            path: None,
            path_key: None,
        })
    }

    pub fn key(&self) -> ChannelKey {
        self.key
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn spectrogram_renderer(&self) -> &SpectrogramRenderer {
        &self.spectrogram
    }

    pub fn waveform_layer(&self) -> &WaveformLayer {
        &self.waveform
    }

    /// Path decimated for the last drawn waveform frame.
    pub fn path(&self) -> Option<&DecimatedPath> {
        self.path.as_ref()
    }

    pub fn set_clip_values(&mut self, clip_values: Option<(f32, f32)>) {
        self.clip_values = clip_values;
        self.path_key = None;
    }

    pub fn set_colormap(&mut self, colormap: &ColorMap) {
        self.spectrogram.set_colormap(colormap);
    }

    /// Queue a fetch when the cached data cannot serve `viewport`.
    /// Returns whether a request was queued.
    pub fn request_data(&mut self, viewport: &Viewport) -> bool {
        if viewport.validate().is_err() {
            return false;
        }
        if self.needs_spectrogram(viewport) || self.needs_waveform(viewport) {
            self.throttle.request(*viewport);
            return true;
        }
        false
    }

    fn needs_spectrogram(&self, viewport: &Viewport) -> bool {
        let cached = self
            .spectrogram_feed
            .current()
            .or_else(|| self.spectrogram.spectrogram());
        viewport.blend > 0.0 && cached.map_or(true, |texture| !texture.covers(viewport))
    }

    fn needs_waveform(&self, viewport: &Viewport) -> bool {
        let (start, end) = self.waveform_span(viewport, 0.0);
        self.waveform_feed
            .current()
            .map_or(true, |buffer| !buffer.covers(start, end))
    }

    /// Seconds decimation reads for `viewport`, widened by `slack` screen
    /// widths on each side.
    fn waveform_span(&self, viewport: &Viewport, slack: f64) -> (f64, f64) {
        let pad = self.config.wav_margin_px as f64 / viewport.px_per_sec + slack * viewport.duration_sec();
        (viewport.start_sec - pad, viewport.end_sec() + pad)
    }

    /// Release the pending fetch once the throttle interval has passed.
    pub fn poll_fetch(&mut self, now: Instant) -> Option<FetchJob> {
        let viewport = self.throttle.poll(now)?;
        self.build_job(&viewport)
    }

    fn build_job(&mut self, viewport: &Viewport) -> Option<FetchJob> {
        let spectrogram = if self.needs_spectrogram(viewport) {
            let (_, height) = viewport.physical_size();
            let request = SpectrogramRequest {
                key: self.key,
                time_range_sec: (viewport.start_sec, viewport.end_sec()),
                hz_range: viewport.hz_range,
                px_per_sec: viewport.canvas_px_per_sec(),
                height_px: height,
                margin_px: self.config.spectrogram_margin_px,
            };
            match request.validate() {
                Ok(()) => Some((self.spectrogram_feed.issue(), request)),
                Err(err) => {
                    log::debug!("{}: not fetching spectrogram: {err}", self.key);
                    None
                }
            }
        } else {
            None
        };
        let waveform = if self.needs_waveform(viewport) {
            // half a screen of slack each side so small pans need no refetch
            let (start, end) = self.waveform_span(viewport, 0.5);
            let range = (start.max(0.0), end.max(start.max(0.0) + 1.0 / viewport.px_per_sec));
            Some((self.waveform_feed.issue(), range))
        } else {
            None
        };
        if spectrogram.is_none() && waveform.is_none() {
            return None;
        }
        Some(FetchJob {
            key: self.key,
            spectrogram,
            waveform,
        })
    }

    /// Apply a completed fetch. Stale responses are dropped; the first backend
    /// error is returned after everything else has been applied.
    pub fn apply(&mut self, result: FetchResult) -> Result<(), BackendError> {
        let mut first_error = None;
        if let Some((ticket, response)) = result.spectrogram {
            match response {
                Ok(texture) => {
                    self.spectrogram_feed.apply(ticket, texture);
                }
                Err(err) => first_error = first_error.or(Some(err)),
            }
        }
        if let Some((ticket, response)) = result.waveform {
            match response {
                Ok(buffer) => {
                    self.waveform_feed.apply(ticket, buffer);
                }
                Err(err) => first_error = first_error.or(Some(err)),
            }
        }
        match first_error {
            Some(err) => {
                log::warn!("{}: fetch failed: {err}", self.key);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Issue, await and apply one fetch for `viewport`, bypassing the
    /// throttle. Used for the first frame and by headless callers.
    pub async fn fetch_now<B: Backend>(
        &mut self,
        backend: &B,
        viewport: &Viewport,
    ) -> Result<(), BackendError> {
        if viewport.validate().is_err() {
            return Ok(());
        }
        let Some(job) = self.build_job(viewport) else {
            return Ok(());
        };
        let result = job.run(backend).await;
        self.apply(result)
    }

    /// Reallocate the targets for a `width x height` device-pixel surface.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.spectrogram.resize(width, height)?;
        self.path_key = None;
        Ok(())
    }

    pub fn render(&mut self, viewport: &Viewport) -> ViewFrame {
        self.render_at(viewport, Instant::now())
    }

    /// Draw both layers from the data received so far.
    pub fn render_at(&mut self, viewport: &Viewport, now: Instant) -> ViewFrame {
        if self.spectrogram_feed.take_dirty() {
            if let Some(texture) = self.spectrogram_feed.take() {
                self.spectrogram.set_spectrogram(texture);
            }
        }
        if self.waveform_feed.take_dirty() {
            let duration = self.waveform_feed.current().map(WaveformBuffer::track_sec);
            self.spectrogram.set_track_duration(duration);
            self.path_key = None;
        }
        ViewFrame {
            spectrogram: self.spectrogram.render_at(viewport, now),
            waveform: self.render_waveform(viewport),
        }
    }

    fn render_waveform(&mut self, viewport: &Viewport) -> WaveformOutcome {
        if self.spectrogram.is_disposed() {
            return WaveformOutcome::Failed(RenderError::Disposed);
        }
        let Some(buffer) = self.waveform_feed.current() else {
            return WaveformOutcome::NoData;
        };
        let mut hasher = DefaultHasher::new();
        viewport.fingerprint().hash(&mut hasher);
        buffer.id().hash(&mut hasher);
        let key = hasher.finish();
        if self.path_key == Some(key) {
            return WaveformOutcome::Unchanged;
        }
        if viewport.validate().is_err() {
            return WaveformOutcome::Failed(RenderError::InvalidDimension {
                what: "viewport",
                width: viewport.width_px as f64,
                height: viewport.height_px as f64,
            });
        }

        let params = DecimateParams::from_viewport(viewport, &self.config)
            .with_sample_start(buffer.start_sec())
            .with_clip_values(self.clip_values);
        let path = decimate(buffer.samples(), buffer.sample_rate(), &params);
        let dpr = viewport.device_pixel_ratio;
        let style = WaveformStyle {
            stroke_width: self.base_style.stroke_width * dpr,
            border_width: self.base_style.border_width * dpr,
            ..self.base_style
        };
        let (width, height) = viewport.physical_size();
        match self.waveform.render(&path, &style, width, height) {
            Ok(()) => {
                let envelopes = path.envelopes.len();
                self.path = Some(path);
                self.path_key = Some(key);
                WaveformOutcome::Drawn { envelopes }
            }
            Err(err) => {
                log::warn!("{}: waveform frame failed: {err}", self.key);
                WaveformOutcome::Failed(err)
            }
        }
    }

    /// Release every GPU resource of the surface.
    pub fn dispose(&mut self) {
        self.spectrogram.dispose();
        self.waveform.dispose();
        self.path = None;
        self.path_key = None;
        log::debug!("channel view {} disposed: {:?}", self.key, self.stats.snapshot());
    }
}

impl Drop for ChannelView {
    fn drop(&mut self) {
        self.dispose();
    }
}
