use anyhow::{anyhow, Context as _, Result};
use futures::channel::oneshot;

pub use wgpu;

pub mod pipeline_database;

/// Headless device, compute only.
pub struct Context {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Context {
    pub async fn init() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| anyhow!("No compatible gpu adapter found"))?;

        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?})", info.name, info.backend);

        // Lane buffers are sized against these limits.
        let required_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("lithium"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("Failed to create device")?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured wgpu error: {}", error);
        }));

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    pub fn init_blocking() -> Result<Self> {
        futures::executor::block_on(Self::init())
    }
}

/// Copies `buffer` into host memory, blocking until the gpu has finished every
/// submission that writes to it. `buffer` must have `MAP_READ` usage.
pub fn readback_buffer(buffer: &wgpu::Buffer, device: &wgpu::Device) -> Result<Vec<u8>> {
    puffin::profile_function!();

    let slice = buffer.slice(..);
    let (sender, receiver) = oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    futures::executor::block_on(receiver)
        .context("Buffer map callback dropped")?
        .context("Failed to map buffer for readback")?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(data)
}

pub trait ComputePipelineDescriptorExtensions<'a> {
    fn partial_default(module: &'a wgpu::ShaderModule) -> Self;
}

impl<'a> ComputePipelineDescriptorExtensions<'a> for wgpu::ComputePipelineDescriptor<'a> {
    fn partial_default(module: &'a wgpu::ShaderModule) -> Self {
        Self {
            label: None,
            layout: None,
            module,
            entry_point: None,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        }
    }
}
