//! Owned GPU resources of one render surface.
//!
//! Every texture created here is released explicitly: per-call pass targets
//! through [`ScopedTarget`]'s `Drop`, long-lived ones when the owning set is
//! disposed. [`ResourceStats`] counts both sides so leaks show up in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use wgpu::{Device, Queue, TextureFormat};

use super::error::RenderError;
use super::textures::RenderTarget;
use crate::signal::LuminanceTexture;

/// GPU work counters shared by the renderers of one surface.
#[derive(Debug, Default)]
pub struct ResourceStats {
    textures_created: AtomicU64,
    textures_released: AtomicU64,
    render_passes: AtomicU64,
    scissored_clears: AtomicU64,
    draws: AtomicU64,
}

/// Point-in-time copy of [`ResourceStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub textures_created: u64,
    pub textures_released: u64,
    pub render_passes: u64,
    pub scissored_clears: u64,
    pub draws: u64,
}

impl StatsSnapshot {
    /// Textures currently alive.
    pub fn live_textures(&self) -> u64 {
        self.textures_created - self.textures_released
    }

    /// Counter growth from `earlier` to `self`.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            textures_created: self.textures_created - earlier.textures_created,
            textures_released: self.textures_released - earlier.textures_released,
            render_passes: self.render_passes - earlier.render_passes,
            scissored_clears: self.scissored_clears - earlier.scissored_clears,
            draws: self.draws - earlier.draws,
        }
    }
}

impl ResourceStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            textures_created: self.textures_created.load(Ordering::Relaxed),
            textures_released: self.textures_released.load(Ordering::Relaxed),
            render_passes: self.render_passes.load(Ordering::Relaxed),
            scissored_clears: self.scissored_clears.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn texture_created(&self) {
        self.textures_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn texture_released(&self) {
        self.textures_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn render_pass(&self) {
        self.render_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn scissored_clear(&self) {
        self.scissored_clears.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn draw(&self) {
        self.draws.fetch_add(1, Ordering::Relaxed);
    }
}

/// Check that a `width x height` attachment can be created on a device whose
/// 2D texture limit is `max_dimension`.
pub fn check_attachment(
    pass: &'static str,
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::FramebufferIncomplete {
            pass,
            reason: format!("empty attachment {width}x{height}"),
        });
    }
    if width > max_dimension || height > max_dimension {
        return Err(RenderError::FramebufferIncomplete {
            pass,
            reason: format!("attachment {width}x{height} exceeds device limit {max_dimension}"),
        });
    }
    Ok(())
}

/// A render target that is destroyed, and counted as released, when dropped.
pub struct ScopedTarget {
    target: RenderTarget,
    stats: Arc<ResourceStats>,
}

impl ScopedTarget {
    /// Validate the attachment and create a pass target.
    pub fn acquire(
        device: &Device,
        stats: &Arc<ResourceStats>,
        pass: &'static str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Self, RenderError> {
        check_attachment(pass, width, height, device.limits().max_texture_dimension_2d)?;
        let target = RenderTarget::for_pass(device, pass, width, height, format);
        stats.texture_created();
        Ok(Self {
            target,
            stats: Arc::clone(stats),
        })
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn view(&self) -> &wgpu::TextureView {
        self.target.view()
    }

    pub fn size(&self) -> (u32, u32) {
        self.target.size()
    }
}

impl Drop for ScopedTarget {
    fn drop(&mut self) {
        self.target.destroy();
        self.stats.texture_released();
    }
}

/// A luminance texture uploaded as `R32Float`, tagged with the id of the
/// CPU texture it came from.
pub struct SourceTexture {
    texture: RenderTarget,
    source_id: u64,
    stats: Arc<ResourceStats>,
}

impl SourceTexture {
    pub fn upload(
        device: &Device,
        queue: &Queue,
        stats: &Arc<ResourceStats>,
        luminance: &LuminanceTexture,
    ) -> Result<Self, RenderError> {
        let (width, height) = (luminance.width(), luminance.height());
        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(RenderError::InvalidDimension {
                what: "source texture",
                width: width as f64,
                height: height as f64,
            });
        }
        let texture =
            RenderTarget::for_upload(device, "luminance_texture", width, height, TextureFormat::R32Float);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: texture.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(luminance.data()),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        stats.texture_created();
        log::debug!("uploaded luminance texture {} ({width}x{height})", luminance.id());
        Ok(Self {
            texture,
            source_id: luminance.id(),
            stats: Arc::clone(stats),
        })
    }

    pub fn source_id(&self) -> u64 {
        self.source_id
    }

    pub fn view(&self) -> &wgpu::TextureView {
        self.texture.view()
    }

    pub fn size(&self) -> (u32, u32) {
        self.texture.size()
    }
}

impl Drop for SourceTexture {
    fn drop(&mut self) {
        self.texture.destroy();
        self.stats.texture_released();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_attachment() {
        assert!(check_attachment("pass", 1, 1, 8192).is_ok());
        assert!(check_attachment("pass", 8192, 8192, 8192).is_ok());
        assert!(matches!(
            check_attachment("pass", 0, 10, 8192),
            Err(RenderError::FramebufferIncomplete { pass: "pass", .. })
        ));
        assert!(matches!(
            check_attachment("resample_pass2", 8193, 10, 8192),
            Err(RenderError::FramebufferIncomplete { pass: "resample_pass2", .. })
        ));
    }

    #[test]
    fn test_stats_snapshot_delta() {
        let stats = ResourceStats::default();
        stats.texture_created();
        let before = stats.snapshot();
        stats.texture_created();
        stats.texture_released();
        stats.render_pass();
        stats.draw();
        let delta = stats.snapshot().since(&before);
        assert_eq!(delta.textures_created, 1);
        assert_eq!(delta.textures_released, 1);
        assert_eq!(delta.render_passes, 1);
        assert_eq!(stats.snapshot().live_textures(), 1);
    }
}
