//! GPU layer that draws a tessellated [`DecimatedPath`] into a transparent
//! RGBA target, to be stacked over the spectrogram by the host compositor.

use std::sync::Arc;

use wgpu::{Buffer, Device, RenderPipeline};

use super::compositor::OUTPUT_FORMAT;
use super::context::GpuContext;
use super::error::{InitError, RenderError};
use super::pipelines::RenderPipelineBuilder;
use super::resources::{ResourceStats, ScopedTarget};
use super::shader::{create_shader, WAVEFORM};
use super::textures::ReadbackBuffer;
use crate::waveform::{tessellate, DecimatedPath, WaveVertex, WaveformStyle};

const INITIAL_VERTEX_CAPACITY: usize = 4096;

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<WaveVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    }
}

fn create_vertex_buffer(device: &Device, capacity: usize) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("waveform_vertices"),
        size: (std::mem::size_of::<WaveVertex>() * capacity) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Alpha-blended waveform layer with its own output target.
pub struct WaveformLayer {
    ctx: GpuContext,
    stats: Arc<ResourceStats>,
    pipeline: RenderPipeline,
    vertex_buffer: Buffer,
    vertex_capacity: usize,
    target: Option<ScopedTarget>,
    disposed: bool,
}

impl WaveformLayer {
    pub fn new(ctx: GpuContext, stats: Arc<ResourceStats>) -> Result<Self, InitError> {
        let shader = create_shader(&ctx.device, &WAVEFORM)?;
        let pipeline = RenderPipelineBuilder::new("waveform_pipeline", &shader, OUTPUT_FORMAT)
            .vertex_buffers(vec![vertex_layout()])
            .blend(Some(wgpu::BlendState::ALPHA_BLENDING))
            .build(&ctx.device)?;
        let vertex_buffer = create_vertex_buffer(&ctx.device, INITIAL_VERTEX_CAPACITY);
        Ok(Self {
            ctx,
            stats,
            pipeline,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTEX_CAPACITY,
            target: None,
            disposed: false,
        })
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.target.as_ref().map(ScopedTarget::size)
    }

    /// Draw `path` into a `width x height` transparent target.
    ///
    /// A zero size releases the target and draws nothing.
    pub fn render(
        &mut self,
        path: &DecimatedPath,
        style: &WaveformStyle,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        if width == 0 || height == 0 {
            self.target = None;
            return Ok(());
        }
        if self.size() != Some((width, height)) {
            self.target = None;
            self.target = Some(ScopedTarget::acquire(
                &self.ctx.device,
                &self.stats,
                "waveform_layer",
                width,
                height,
                OUTPUT_FORMAT,
            )?);
        }

        let vertices = tessellate(path, style, width, height);
        if vertices.len() > self.vertex_capacity {
            let capacity = vertices.len().next_power_of_two();
            self.vertex_buffer.destroy();
            self.vertex_buffer = create_vertex_buffer(&self.ctx.device, capacity);
            self.vertex_capacity = capacity;
        }
        if !vertices.is_empty() {
            self.ctx
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }

        let Some(target) = self.target.as_ref() else {
            return Ok(());
        };
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("waveform_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("waveform_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
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
            self.stats.render_pass();
            if !vertices.is_empty() {
                pass.set_pipeline(&self.pipeline);
                pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                pass.draw(0..vertices.len() as u32, 0..1);
                self.stats.draw();
            }
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        log::trace!("waveform layer: {} vertices", vertices.len());
        Ok(())
    }

    /// RGBA bytes of the last drawn layer.
    pub fn read_pixels(&self) -> Result<Vec<u8>, RenderError> {
        let target = self.target.as_ref().ok_or(RenderError::InvalidDimension {
            what: "waveform layer",
            width: 0.0,
            height: 0.0,
        })?;
        let (width, height) = target.size();
        let readback = ReadbackBuffer::new(&self.ctx.device, width, height);
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("waveform_readback_encoder"),
            });
        readback.copy_from(&mut encoder, target.target().texture());
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        readback.read_bytes(&self.ctx.device)
    }

    /// Release the target and vertex buffer.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.target = None;
        self.vertex_buffer.destroy();
        self.disposed = true;
    }
}

impl Drop for WaveformLayer {
    fn drop(&mut self) {
        self.dispose();
    }
}
