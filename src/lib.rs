//! Sigscope Core
//!
//! Adaptive renderer for very large time-indexed signals: spectrogram
//! magnitude grids and audio waveforms drawn into a pannable, zoomable
//! viewport.
//!
//! # Features
//!
//! - Lanczos-3 resampling, separable in two passes, on the GPU via wgpu
//!   (bilinear while interacting, Lanczos once the view settles)
//! - CPU reference resampler with identical tap geometry
//! - 256-entry colormap compositing with a blend-driven black overlay
//! - Column-wise waveform decimation into polylines and envelope polygons
//! - Throttled, generation-tagged data fetching from an async backend

pub mod backend;
pub mod colormap;
pub mod config;
pub mod gpu;
pub mod resample;
pub mod scheduler;
pub mod signal;
pub mod view;
pub mod viewport;
pub mod waveform;

// Re-export commonly used types
pub use backend::{Backend, BackendError, ChannelKey, MemoryBackend, MemoryChannel, SpectrogramRequest};
pub use colormap::{colorize, overlay_alpha, ColorMap};
pub use config::{parse_hex_color, ConfigError, RendererConfig};
pub use gpu::{
    FrameOutcome, GpuContext, GpuResourceSet, InitError, RenderError, SpectrogramRenderer,
    StatsSnapshot, WaveformLayer,
};
pub use resample::Quality;
pub use scheduler::{DataFeed, Debounce, FetchTicket, Throttle};
pub use signal::{CropWindow, LuminanceTexture, Placement, WaveformBuffer};
pub use view::{ChannelView, FetchJob, FetchResult, ViewFrame, WaveformOutcome};
pub use viewport::{Viewport, ViewportError};
pub use waveform::{decimate, DecimateParams, DecimatedPath};
