//! Bind group layouts of the resample and colormap passes.
//!
//! Both passes bind fragment-stage resources only, with bindings numbered
//! in the order they are added.

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, BindingType, Device, ShaderStages};

/// Fragment-stage bind group layout builder with sequential bindings.
pub struct BindGroupLayoutBuilder {
    label: &'static str,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Vec::new(),
        }
    }

    fn push(mut self, ty: BindingType) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding: self.entries.len() as u32,
            visibility: ShaderStages::FRAGMENT,
            ty,
            count: None,
        });
        self
    }

    pub fn uniform(self) -> Self {
        self.push(BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        })
    }

    /// 2D float texture. `R32Float` luminance is not filterable and is
    /// read with `textureLoad`; the colormap LUT is sampled linearly.
    pub fn texture_2d(self, filterable: bool) -> Self {
        self.push(BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        })
    }

    pub fn filtering_sampler(self) -> Self {
        self.push(BindingType::Sampler(wgpu::SamplerBindingType::Filtering))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(self.label),
            entries: &self.entries,
        })
    }
}

/// 0: pass uniforms, 1: source luminance.
pub fn create_resample_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("resample_bind_group_layout")
        .uniform()
        .texture_2d(false)
        .build(device)
}

/// 0: colormap uniforms, 1: filtered luminance, 2: LUT, 3: LUT sampler.
pub fn create_colormap_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("colormap_bind_group_layout")
        .uniform()
        .texture_2d(false)
        .texture_2d(true)
        .filtering_sampler()
        .build(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;

    #[test]
    fn test_bindings_are_sequential() {
        let builder = BindGroupLayoutBuilder::new("test")
            .uniform()
            .texture_2d(false)
            .filtering_sampler();
        assert_eq!(builder.len(), 3);
        let bindings: Vec<u32> = builder.entries.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2]);
        assert!(builder
            .entries
            .iter()
            .all(|e| e.visibility == ShaderStages::FRAGMENT));
    }

    #[tokio::test]
    async fn test_resample_and_colormap_layouts() {
        let Ok(ctx) = GpuContext::new().await else {
            return;
        };
        let _resample = create_resample_layout(&ctx.device);
        let _colormap = create_colormap_layout(&ctx.device);
    }
}
