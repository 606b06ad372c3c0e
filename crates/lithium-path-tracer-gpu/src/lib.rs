//! wgpu implementation of the path tracing kernels.
//!
//! The WGSL in `assets/shaders` mirrors the host kernels of
//! `lithium-path-tracer` line for line, the scene is limited to
//! [`lithium_path_tracer::SphereScene`].

use lithium_wgpu::wgpu;

mod accumulate_pass;
mod backend;
mod scene_resources;
mod shader;
mod spawn_pass;
mod trace_pass;

pub use backend::*;
pub use scene_resources::{pack_scene, PackedSky, PackedSphere};
pub use shader::kernel_source;

pub(crate) fn buffer_layout_entry(
    binding: u32,
    ty: wgpu::BufferBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
