//! Render targets and CPU readback of pass outputs.

use wgpu::{Device, Texture, TextureFormat, TextureUsages, TextureView};

use super::error::RenderError;

/// Formats the resample passes may render into, most precise first.
/// `Rgba8Unorm` is renderable everywhere; the value lives in the red
/// channel, clamped to `[0, 1]` and quantized to 8 bits.
pub const PASS_FORMATS: [TextureFormat; 2] = [TextureFormat::R32Float, TextureFormat::Rgba8Unorm];

/// Usages every pass target needs.
pub const PASS_USAGES: TextureUsages = TextureUsages::RENDER_ATTACHMENT
    .union(TextureUsages::TEXTURE_BINDING)
    .union(TextureUsages::COPY_SRC);

/// First of [`PASS_FORMATS`] whose allowed usages, as reported by
/// `allowed_usages`, cover [`PASS_USAGES`].
pub fn select_pass_format(allowed_usages: impl Fn(TextureFormat) -> TextureUsages) -> Option<TextureFormat> {
    PASS_FORMATS
        .into_iter()
        .find(|&format| allowed_usages(format).contains(PASS_USAGES))
}

/// A render target that owns both texture and view.
/// The texture must outlive its view, so we keep them together.
pub struct RenderTarget {
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Create a new render target with the specified usage flags.
    pub fn new(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Intermediate pass target: rendered into, then sampled by the next pass.
    /// `COPY_SRC` allows reading it back for inspection.
    pub fn for_pass(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self::new(
            device,
            label,
            width,
            height,
            format,
            PASS_USAGES,
        )
    }

    /// Data texture uploaded from the CPU and only sampled.
    pub fn for_upload(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self::new(
            device,
            label,
            width,
            height,
            format,
            TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        )
    }

    /// Get the texture view for rendering or sampling.
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// Get the underlying texture (for copy operations).
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Release the GPU memory now instead of when the handle is dropped.
    pub fn destroy(&self) {
        self.texture.destroy();
    }
}

/// Readback buffer for copying GPU texture data to CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    /// Create a new readback buffer for a 4-byte-per-texel texture
    /// (any of [`PASS_FORMATS`]).
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let bytes_per_pixel = 4u32;
        let unpadded_row_bytes = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row_bytes * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    /// Get the padded bytes per row (for texture copy).
    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    /// Record a copy of the whole of `texture` into this buffer.
    pub fn copy_from(&self, encoder: &mut wgpu::CommandEncoder, texture: &Texture) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Read texels from the mapped buffer, removing row padding.
    /// The copy must already have been submitted.
    pub fn read_bytes(&self, device: &Device) -> Result<Vec<u8>, RenderError> {
        let buffer_slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RenderError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        let pixels = {
            let data = buffer_slice.get_mapped_range();
            let mut pixels = Vec::with_capacity((self.unpadded_row_bytes * self.height) as usize);
            for row in 0..self.height {
                let start = (row * self.padded_row_bytes) as usize;
                let end = start + self.unpadded_row_bytes as usize;
                pixels.extend_from_slice(&data[start..end]);
            }
            pixels
        };
        self.buffer.unmap();
        Ok(pixels)
    }
}

impl Drop for ReadbackBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

/// Reinterpret little-endian `R32Float` texels.
pub fn bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Values of a pass target read back in `format`.
pub fn decode_pass_texels(format: TextureFormat, bytes: &[u8]) -> Result<Vec<f32>, RenderError> {
    match format {
        TextureFormat::R32Float => Ok(bytes_to_f32(bytes)),
        TextureFormat::Rgba8Unorm => Ok(bytes.chunks_exact(4).map(|b| b[0] as f32 / 255.0).collect()),
        other => Err(RenderError::Readback(format!("cannot decode {other:?} texels"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;

    #[test]
    fn test_bytes_to_f32() {
        let bytes: Vec<u8> = [0.5f32, -2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(bytes_to_f32(&bytes), vec![0.5, -2.0]);
    }

    #[test]
    fn test_select_pass_format_prefers_float() {
        let all = |_| TextureUsages::all();
        assert_eq!(select_pass_format(all), Some(TextureFormat::R32Float));
    }

    #[test]
    fn test_select_pass_format_without_float_color_buffers() {
        // GLES without EXT_color_buffer_float
        let gles = |format| match format {
            TextureFormat::R32Float => {
                TextureUsages::COPY_SRC
                    | TextureUsages::COPY_DST
                    | TextureUsages::TEXTURE_BINDING
                    | TextureUsages::STORAGE_BINDING
            }
            _ => TextureUsages::all(),
        };
        assert_eq!(select_pass_format(gles), Some(TextureFormat::Rgba8Unorm));
    }

    #[test]
    fn test_select_pass_format_none_renderable() {
        let sample_only = |_| TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_SRC;
        assert_eq!(select_pass_format(sample_only), None);
    }

    #[test]
    fn test_decode_pass_texels() {
        let unorm = [255u8, 0, 0, 255, 51, 9, 9, 255];
        let values = decode_pass_texels(TextureFormat::Rgba8Unorm, &unorm).unwrap();
        assert_eq!(values, vec![1.0, 0.2]);
        assert!(matches!(
            decode_pass_texels(TextureFormat::Rg16Float, &unorm),
            Err(RenderError::Readback(_))
        ));
    }

    #[tokio::test]
    async fn test_render_target_creation() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let target = RenderTarget::for_pass(&ctx.device, "test", 256, 64, TextureFormat::Rgba8Unorm);
        assert_eq!(target.size(), (256, 64));
        target.destroy();
    }

    #[tokio::test]
    async fn test_readback_buffer_creation() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let buffer = ReadbackBuffer::new(&ctx.device, 100, 3);
        assert!(buffer.padded_row_bytes() >= 100 * 4);
        assert_eq!(buffer.padded_row_bytes() % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
    }
}
