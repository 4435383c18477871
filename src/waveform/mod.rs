//! Waveform decimation into vector paths and their tessellation.
//!
//! - `decimate`: samples + viewport -> [`DecimatedPath`]
//! - `path`: the polyline/envelope output types
//! - `tessellate`: triangle meshes for the GPU waveform layer

pub mod decimate;
pub mod path;
pub mod tessellate;

pub use decimate::{decimate, DecimateParams};
pub use path::{DecimatedPath, Envelope, Polyline};
pub use tessellate::{tessellate, WaveVertex, WaveformStyle};
