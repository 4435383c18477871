//! Error taxonomy of the GPU renderers.

use super::context::GpuError;

/// Initialization failures. The renderer is unusable until re-created.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Shader `{label}` failed to compile:\n{message}")]
    ShaderCompile { label: &'static str, message: String },
    #[error("Shader `{label}` failed to link:\n{message}")]
    ProgramLink { label: &'static str, message: String },
    #[error("No renderable format for {pass} targets on {adapter}")]
    NoRenderableFormat { pass: &'static str, adapter: String },
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Invalid renderer config: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Per-frame failures. The frame is skipped and the previous output kept.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("Framebuffer incomplete in {pass}: {reason}")]
    FramebufferIncomplete { pass: &'static str, reason: String },
    #[error("Invalid {what} dimensions {width}x{height}")]
    InvalidDimension {
        what: &'static str,
        width: f64,
        height: f64,
    },
    #[error("Readback failed: {0}")]
    Readback(String),
    #[error("Renderer has been disposed")]
    Disposed,
}

impl From<crate::resample::ResampleError> for RenderError {
    fn from(err: crate::resample::ResampleError) -> Self {
        match err {
            crate::resample::ResampleError::InvalidDimension {
                what,
                width,
                height,
            } => Self::InvalidDimension {
                what,
                width,
                height,
            },
        }
    }
}
