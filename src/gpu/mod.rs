//! GPU rendering using wgpu.
//!
//! Provides the headless spectrogram pipeline (two-pass resample, then
//! colormap) and the waveform layer. All GPU objects of a surface are owned
//! by a [`GpuResourceSet`] and released explicitly.

pub mod compositor;
pub mod context;
pub mod error;
pub mod layouts;
pub mod pipelines;
pub mod resampler;
pub mod resources;
pub mod shader;
pub mod spectrogram_renderer;
pub mod textures;
pub mod waveform_layer;

pub use compositor::{Compositor, Scissor};
pub use context::{ContextOptions, GpuContext, GpuError};
pub use error::{InitError, RenderError};
pub use resampler::TwoPassResampler;
pub use resources::{ResourceStats, StatsSnapshot};
pub use spectrogram_renderer::{
    plan_frame, track_span, FrameOutcome, FramePlan, GpuResourceSet, SkipReason, SpectrogramRenderer,
};
pub use waveform_layer::WaveformLayer;
