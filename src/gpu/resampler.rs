//! Separable two-pass resampler on the GPU.
//!
//! Pass 1 filters horizontally (`srcW -> dstW`) over just the source rows the
//! vertical kernel will touch; pass 2 filters that intermediate vertically
//! (`srcH -> dstH`). Both passes run `shaders/resample.wgsl` and write
//! targets in the device's pass format that live only for the call.

use std::sync::Arc;

use wgpu::{BindGroupLayout, Buffer, Device, Queue, RenderPipeline, TextureFormat, TextureView};

use super::error::{InitError, RenderError};
use super::layouts::create_resample_layout;
use super::pipelines::RenderPipelineBuilder;
use super::resources::{ResourceStats, ScopedTarget, SourceTexture};
use super::shader::{create_shader, RESAMPLE};
use crate::resample::{intermediate_rows, AxisMapping, Quality};
use crate::signal::CropWindow;

/// Uniform data for one resample pass. Mirrors `ResampleParams` in the shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ResampleUniforms {
    src_origin: f32,
    src_extent: f32,
    dst_extent: f32,
    radius: f32,
    kernel_step: f32,
    quality: u32,
    direction: u32,
    row_offset: i32,
    src_size: [i32; 2],
    _padding: [u32; 2],
}

impl ResampleUniforms {
    fn new(axis: &AxisMapping, quality: Quality, direction: u32, row_offset: i64, src_size: (u32, u32)) -> Self {
        Self {
            src_origin: axis.src_origin as f32,
            src_extent: axis.src_extent as f32,
            dst_extent: axis.dst_extent as f32,
            radius: axis.effective_radius() as f32,
            kernel_step: axis.kernel_step() as f32,
            quality: match quality {
                Quality::Bilinear => 0,
                Quality::Lanczos3 => 1,
            },
            direction,
            row_offset: row_offset as i32,
            src_size: [src_size.0 as i32, src_size.1 as i32],
            _padding: [0; 2],
        }
    }
}

/// Targets produced by one resample. Dropping it releases both.
pub struct ResampleOutput {
    pub filtered: ScopedTarget,
    _intermediate: ScopedTarget,
}

/// GPU two-pass resampler.
pub struct TwoPassResampler {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    // one buffer per pass: queue writes land before the whole submission
    pass_uniforms: [Buffer; 2],
    format: TextureFormat,
    max_radius: Option<f64>,
}

impl TwoPassResampler {
    /// `format` must be renderable; see [`super::textures::select_pass_format`].
    pub fn new(device: &Device, format: TextureFormat, max_radius: Option<f64>) -> Result<Self, InitError> {
        let shader = create_shader(device, &RESAMPLE)?;
        let bind_group_layout = create_resample_layout(device);
        let pipeline = RenderPipelineBuilder::new("resample_pipeline", &shader, format)
            .bind_groups(&[&bind_group_layout])
            .blend(None)
            .build(device)?;
        let uniform_buffer = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<ResampleUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Ok(Self {
            pipeline,
            bind_group_layout,
            pass_uniforms: [uniform_buffer("resample_pass1_uniforms"), uniform_buffer("resample_pass2_uniforms")],
            format,
            max_radius,
        })
    }

    /// Texture format of both pass targets.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Encode both passes resampling `crop` of `source` to `dst_width x dst_height`.
    ///
    /// Attachments are validated before anything is recorded, so an error
    /// leaves `encoder` untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        device: &Device,
        queue: &Queue,
        encoder: &mut wgpu::CommandEncoder,
        stats: &Arc<ResourceStats>,
        source: &SourceTexture,
        crop: &CropWindow,
        dst_width: u32,
        dst_height: u32,
        quality: Quality,
    ) -> Result<ResampleOutput, RenderError> {
        if dst_width == 0 || dst_height == 0 {
            return Err(RenderError::InvalidDimension {
                what: "destination",
                width: dst_width as f64,
                height: dst_height as f64,
            });
        }
        if crop.is_degenerate() {
            return Err(RenderError::InvalidDimension {
                what: "source crop",
                width: crop.width,
                height: crop.height,
            });
        }

        let src_size = source.size();
        let horizontal = AxisMapping::new(crop.left, crop.width, dst_width, self.max_radius);
        let vertical = AxisMapping::new(crop.top, crop.height, dst_height, self.max_radius);
        let (row0, rows) = intermediate_rows(crop, vertical.effective_radius(), src_size.1);

        let intermediate =
            ScopedTarget::acquire(device, stats, "resample_pass1", dst_width, rows, self.format)?;
        let filtered =
            ScopedTarget::acquire(device, stats, "resample_pass2", dst_width, dst_height, self.format)?;

        let pass1 = ResampleUniforms::new(&horizontal, quality, 0, row0, src_size);
        let vertical = AxisMapping::new(crop.top - row0 as f64, crop.height, dst_height, self.max_radius);
        let pass2 = ResampleUniforms::new(&vertical, quality, 1, 0, (dst_width, rows));
        queue.write_buffer(&self.pass_uniforms[0], 0, bytemuck::bytes_of(&pass1));
        queue.write_buffer(&self.pass_uniforms[1], 0, bytemuck::bytes_of(&pass2));

        self.pass(device, encoder, stats, 0, source.view(), intermediate.view(), "resample_pass1");
        self.pass(device, encoder, stats, 1, intermediate.view(), filtered.view(), "resample_pass2");

        log::debug!(
            "resample {:?}: crop {:.1}x{:.1} -> {dst_width}x{dst_height} via {dst_width}x{rows}",
            quality,
            crop.width,
            crop.height
        );
        Ok(ResampleOutput {
            filtered,
            _intermediate: intermediate,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn pass(
        &self,
        device: &Device,
        encoder: &mut wgpu::CommandEncoder,
        stats: &ResourceStats,
        index: usize,
        input_view: &TextureView,
        output_view: &TextureView,
        label: &'static str,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.pass_uniforms[index].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input_view),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
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
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
        stats.render_pass();
        stats.draw();
    }

    /// Release the uniform buffers.
    pub fn destroy(&self) {
        for buffer in &self.pass_uniforms {
            buffer.destroy();
        }
    }
}
