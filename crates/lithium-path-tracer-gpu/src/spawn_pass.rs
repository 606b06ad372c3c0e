use std::sync::Arc;

use anyhow::Result;
use lithium_path_tracer::Kernel;
use lithium_wgpu::{
    pipeline_database::PipelineDatabase, wgpu, ComputePipelineDescriptorExtensions,
};

use crate::{buffer_layout_entry, shader::kernel_source};

pub struct SpawnPassParameters<'a> {
    pub constants: &'a wgpu::Buffer,
    pub lanes: &'a wgpu::Buffer,
    pub grid: (u32, u32),
}

pub fn pipeline(
    device: &wgpu::Device,
    pipeline_database: &mut PipelineDatabase,
    group_width: u32,
) -> Result<Arc<wgpu::ComputePipeline>> {
    let label = format!("lithium-path-tracer-gpu::spawn[{}]", group_width);
    let shader = pipeline_database.shader_from_src(
        device,
        &label,
        &kernel_source(Kernel::Spawn, group_width),
    );

    pipeline_database.compute_pipeline(
        device,
        wgpu::ComputePipelineDescriptor {
            label: Some(label.as_str()),
            ..wgpu::ComputePipelineDescriptor::partial_default(&shader)
        },
        || {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label.as_str()),
                bind_group_layouts: &[&device.create_bind_group_layout(
                    &wgpu::BindGroupLayoutDescriptor {
                        label: None,
                        entries: &[
                            buffer_layout_entry(0, wgpu::BufferBindingType::Uniform),
                            buffer_layout_entry(
                                1,
                                wgpu::BufferBindingType::Storage { read_only: false },
                            ),
                        ],
                    },
                )],
                push_constant_ranges: &[],
            })
        },
    )
}

pub fn encode(
    parameters: &SpawnPassParameters,
    device: &wgpu::Device,
    command_encoder: &mut wgpu::CommandEncoder,
    pipeline: &wgpu::ComputePipeline,
) {
    let bind_group_layout = pipeline.get_bind_group_layout(0);
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: None,
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: parameters.constants.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: parameters.lanes.as_entire_binding(),
            },
        ],
    });

    let mut cpass = command_encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("lithium-path-tracer-gpu::spawn"),
        timestamp_writes: None,
    });
    cpass.set_pipeline(pipeline);
    cpass.set_bind_group(0, &bind_group, &[]);
    cpass.insert_debug_marker("lithium-path-tracer-gpu::spawn");
    cpass.dispatch_workgroups(parameters.grid.0, parameters.grid.1, 1);
}
