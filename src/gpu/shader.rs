//! WGSL shader loading.
//!
//! Sources are parsed and validated with naga before they reach the device,
//! so a broken shader is reported as an [`InitError`] value instead of an
//! uncaptured device error.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::ShaderStage;
use wgpu::Device;

use super::error::InitError;

/// A shader source plus the entry points pipelines will reference.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSpec {
    pub label: &'static str,
    pub source: &'static str,
    pub entry_points: &'static [(&'static str, ShaderStage)],
}

pub const RESAMPLE: ShaderSpec = ShaderSpec {
    label: "resample_shader",
    source: include_str!("shaders/resample.wgsl"),
    entry_points: &[("vs_main", ShaderStage::Vertex), ("fs_main", ShaderStage::Fragment)],
};

pub const COLORMAP: ShaderSpec = ShaderSpec {
    label: "colormap_shader",
    source: include_str!("shaders/colormap.wgsl"),
    entry_points: &[
        ("vs_main", ShaderStage::Vertex),
        ("fs_main", ShaderStage::Fragment),
        ("fs_fill", ShaderStage::Fragment),
    ],
};

pub const WAVEFORM: ShaderSpec = ShaderSpec {
    label: "waveform_shader",
    source: include_str!("shaders/waveform.wgsl"),
    entry_points: &[("vs_main", ShaderStage::Vertex), ("fs_main", ShaderStage::Fragment)],
};

/// Parse (compile) and validate (link) a shader without a device.
pub fn validate(spec: &ShaderSpec) -> Result<naga::Module, InitError> {
    let module = naga::front::wgsl::parse_str(spec.source).map_err(|e| InitError::ShaderCompile {
        label: spec.label,
        message: e.emit_to_string(spec.source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| InitError::ProgramLink {
            label: spec.label,
            message: e.emit_to_string(spec.source),
        })?;

    for &(name, stage) in spec.entry_points {
        let found = module
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage);
        if !found {
            return Err(InitError::ProgramLink {
                label: spec.label,
                message: format!("missing {stage:?} entry point `{name}`"),
            });
        }
    }
    Ok(module)
}

/// Validate `spec` and create the shader module.
pub fn create_shader(device: &Device, spec: &ShaderSpec) -> Result<wgpu::ShaderModule, InitError> {
    validate(spec)?;
    log::debug!("compiled {}", spec.label);
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(spec.label),
        source: wgpu::ShaderSource::Wgsl(spec.source.into()),
    }))
}
