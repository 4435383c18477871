//! Signal data served by the backend: spectrogram luminance textures and
//! waveform sample buffers, plus synthetic generators for tests.

pub mod spectrogram;
pub mod synth;
pub mod waveform;

pub use spectrogram::{CropWindow, LuminanceTexture, Placement, TextureError};
pub use waveform::WaveformBuffer;
