//! Shared wgpu device for every render surface.

use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

/// Failures while acquiring a device.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// Adapter selection. `WGPU_BACKEND` and `WGPU_POWER_PREF` override the
/// defaults when set.
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Use the software adapter (llvmpipe, WARP) even when hardware exists.
    pub force_fallback_adapter: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::METAL | wgpu::Backends::VULKAN | wgpu::Backends::GL,
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}

impl ContextOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backends: wgpu::Backends::from_env().unwrap_or(defaults.backends),
            power_preference: wgpu::PowerPreference::from_env().unwrap_or(defaults.power_preference),
            ..defaults
        }
    }
}

/// Device and queue shared by the spectrogram and waveform layers.
///
/// Cheap to clone; clones share one device.
#[derive(Clone)]
pub struct GpuContext {
    pub instance: Arc<Instance>,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

impl GpuContext {
    /// Headless context with [`ContextOptions::from_env`].
    pub async fn new() -> Result<Self, GpuError> {
        Self::with_options(ContextOptions::from_env()).await
    }

    pub async fn with_options(options: ContextOptions) -> Result<Self, GpuError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                force_fallback_adapter: options.force_fallback_adapter,
                compatible_surface: None,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        // spectrogram textures can be as wide as the adapter allows
        let required_limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sigscope"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let info = adapter.get_info();
        log::info!(
            "GPU adapter: {} ({:?}, max texture {})",
            info.name,
            info.backend,
            device.limits().max_texture_dimension_2d
        );

        Ok(Self {
            instance: Arc::new(instance),
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Largest width or height of a 2D texture on this device.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_allow_gl_fallback() {
        let options = ContextOptions::default();
        assert!(options.backends.contains(wgpu::Backends::GL));
        assert!(!options.force_fallback_adapter);
    }

    #[tokio::test]
    async fn test_context_is_shared_between_clones() {
        // no adapter on CI machines without a GPU
        let Ok(ctx) = GpuContext::new().await else {
            return;
        };
        assert!(!ctx.adapter_info().name.is_empty());
        assert!(ctx.max_texture_dimension() >= 2048);
        let shared = ctx.clone();
        assert!(Arc::ptr_eq(&shared.device, &ctx.device));
    }
}
