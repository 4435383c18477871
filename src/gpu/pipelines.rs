//! Render pipeline construction.
//!
//! Every pass in the crate draws one color target. The resample and
//! colormap passes are a fullscreen triangle from `vs_main`; the waveform
//! layer feeds a vertex buffer.

use wgpu::{
    BindGroupLayout, BlendState, ColorTargetState, Device, RenderPipeline, ShaderModule,
    TextureFormat, VertexBufferLayout,
};

use super::error::InitError;

/// Builder for the single-target render pipelines of this crate.
///
/// The pipeline layout is created from the bind group layouts given to
/// [`Self::bind_groups`]; none means an empty layout, so a draw needs no
/// bind group at all.
///
/// [`Self::build`] runs inside a validation error scope, so a target format
/// or layout the device rejects comes back as [`InitError::ProgramLink`].
pub struct RenderPipelineBuilder<'a> {
    label: &'static str,
    shader: &'a ShaderModule,
    bind_groups: &'a [&'a BindGroupLayout],
    fragment_entry: &'static str,
    vertex_buffers: Vec<VertexBufferLayout<'static>>,
    format: TextureFormat,
    blend: Option<BlendState>,
}

impl<'a> RenderPipelineBuilder<'a> {
    pub fn new(label: &'static str, shader: &'a ShaderModule, format: TextureFormat) -> Self {
        Self {
            label,
            shader,
            bind_groups: &[],
            fragment_entry: "fs_main",
            vertex_buffers: Vec::new(),
            format,
            blend: Some(BlendState::REPLACE),
        }
    }

    pub fn bind_groups(mut self, layouts: &'a [&'a BindGroupLayout]) -> Self {
        self.bind_groups = layouts;
        self
    }

    pub fn fragment_entry(mut self, entry: &'static str) -> Self {
        self.fragment_entry = entry;
        self
    }

    pub fn vertex_buffers(mut self, buffers: Vec<VertexBufferLayout<'static>>) -> Self {
        self.vertex_buffers = buffers;
        self
    }

    /// `None` writes fragments unblended, which `R32Float` targets require.
    pub fn blend(mut self, blend: Option<BlendState>) -> Self {
        self.blend = blend;
        self
    }

    pub fn build(self, device: &Device) -> Result<RenderPipeline, InitError> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.create(device);
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(InitError::ProgramLink {
                label: self.label,
                message: err.to_string(),
            });
        }
        Ok(pipeline)
    }

    fn create(&self, device: &Device) -> RenderPipeline {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(self.label),
            bind_group_layouts: self.bind_groups,
            immediate_size: 0,
        });
        log::trace!(
            "pipeline {}: {} bind group(s), {:?} target",
            self.label,
            self.bind_groups.len(),
            self.format
        );
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: self.shader,
                entry_point: Some("vs_main"),
                buffers: &self.vertex_buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: self.shader,
                entry_point: Some(self.fragment_entry),
                targets: &[Some(ColorTargetState {
                    format: self.format,
                    blend: self.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::layouts::create_resample_layout;
    use crate::gpu::shader::{create_shader, COLORMAP, RESAMPLE};
    use crate::gpu::GpuContext;

    #[tokio::test]
    async fn test_float_target_pipeline_reports_unrenderable_format() {
        let Ok(ctx) = GpuContext::new().await else {
            return;
        };
        let shader = create_shader(&ctx.device, &RESAMPLE).unwrap();
        let layout = create_resample_layout(&ctx.device);
        let pipeline = RenderPipelineBuilder::new("test_resample", &shader, TextureFormat::R32Float)
            .bind_groups(&[&layout])
            .blend(None)
            .build(&ctx.device);
        let renderable = ctx
            .adapter
            .get_texture_format_features(TextureFormat::R32Float)
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT);
        // GL without float color buffers rejects the target instead of panicking
        assert_eq!(pipeline.is_ok(), renderable);
    }

    #[tokio::test]
    async fn test_pipeline_without_bind_groups() {
        let Ok(ctx) = GpuContext::new().await else {
            return;
        };
        let shader = create_shader(&ctx.device, &COLORMAP).unwrap();
        let pipeline = RenderPipelineBuilder::new("test_fill", &shader, TextureFormat::Rgba8Unorm)
            .fragment_entry("fs_fill")
            .build(&ctx.device);
        assert!(pipeline.is_ok());
    }
}
