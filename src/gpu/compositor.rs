//! Colormap compositing of the resampled luminance into the RGBA output.

use wgpu::{
    BindGroupLayout, Buffer, Device, Queue, RenderPipeline, Sampler, TextureFormat, TextureView,
};

use super::error::InitError;
use super::layouts::create_colormap_layout;
use super::pipelines::RenderPipelineBuilder;
use super::resources::ResourceStats;
use super::shader::{create_shader, COLORMAP};
use super::textures::RenderTarget;
use crate::colormap::{ColorMap, LUT_SIZE};

/// Output pixel format of the compositor.
pub const OUTPUT_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ColormapUniforms {
    overlay_alpha: f32,
    _padding: [f32; 3],
}

/// Horizontal span of the output that receives pixels: `[x, x + width)`
/// across the full height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scissor {
    pub x: u32,
    pub width: u32,
    pub height: u32,
}

impl Scissor {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Maps luminance through the LUT, or fills with black when hidden.
pub struct Compositor {
    colormap_pipeline: RenderPipeline,
    fill_pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    uniforms: Buffer,
    lut: RenderTarget,
    lut_sampler: Sampler,
}

impl Compositor {
    pub fn new(device: &Device, queue: &Queue, colormap: &ColorMap) -> Result<Self, InitError> {
        let shader = create_shader(device, &COLORMAP)?;
        let bind_group_layout = create_colormap_layout(device);
        let colormap_pipeline = RenderPipelineBuilder::new("colormap_pipeline", &shader, OUTPUT_FORMAT)
            .bind_groups(&[&bind_group_layout])
            .build(device)?;
        let fill_pipeline = RenderPipelineBuilder::new("fill_pipeline", &shader, OUTPUT_FORMAT)
            .fragment_entry("fs_fill")
            .build(device)?;

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("colormap_uniforms"),
            size: std::mem::size_of::<ColormapUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lut = RenderTarget::for_upload(device, "colormap_lut", LUT_SIZE as u32, 1, TextureFormat::Rgba8Unorm);
        let lut_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("colormap_lut_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        let compositor = Self {
            colormap_pipeline,
            fill_pipeline,
            bind_group_layout,
            uniforms,
            lut,
            lut_sampler,
        };
        compositor.set_colormap(queue, colormap);
        Ok(compositor)
    }

    /// Upload a new lookup table.
    pub fn set_colormap(&self, queue: &Queue, colormap: &ColorMap) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: self.lut.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            colormap.lut_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(LUT_SIZE as u32 * 4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: LUT_SIZE as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Encode the colormap pass: clear `output` to transparent, then write
    /// colorized `luminance` inside `scissor`.
    #[allow(clippy::too_many_arguments)]
    pub fn encode_composite(
        &self,
        device: &Device,
        queue: &Queue,
        encoder: &mut wgpu::CommandEncoder,
        stats: &ResourceStats,
        luminance: &TextureView,
        output: &TextureView,
        overlay_alpha: f32,
        scissor: Scissor,
    ) {
        let uniforms = ColormapUniforms {
            overlay_alpha,
            _padding: [0.0; 3],
        };
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("colormap_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(luminance),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(self.lut.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.lut_sampler),
                },
            ],
        });

        let mut pass = begin_output_pass(encoder, output, "colormap_pass");
        stats.render_pass();
        if scissor.is_empty() {
            return;
        }
        pass.set_scissor_rect(scissor.x, 0, scissor.width, scissor.height);
        pass.set_pipeline(&self.colormap_pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
        stats.draw();
    }

    /// Encode the hidden-spectrogram pass: clear `output` to transparent and
    /// fill `scissor` with opaque black. Touches no luminance texture.
    pub fn encode_clear(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        stats: &ResourceStats,
        output: &TextureView,
        scissor: Scissor,
    ) {
        let mut pass = begin_output_pass(encoder, output, "clear_pass");
        stats.render_pass();
        if scissor.is_empty() {
            return;
        }
        pass.set_scissor_rect(scissor.x, 0, scissor.width, scissor.height);
        pass.set_pipeline(&self.fill_pipeline);
        pass.draw(0..3, 0..1);
        stats.scissored_clear();
        stats.draw();
    }

    /// Release the LUT texture and uniform buffer.
    pub fn destroy(&self) {
        self.lut.destroy();
        self.uniforms.destroy();
    }
}

fn begin_output_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    output: &TextureView,
    label: &'static str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: output,
            resolve_target: None,
            depth_slice: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}
