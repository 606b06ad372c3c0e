use std::sync::Arc;

use parking_lot::Mutex;

use lithium_path_tracer::{
    BackendError, ComputeBackend, DispatchDescriptor, FrameConstants, Kernel, SphereScene,
};
use lithium_wgpu::{pipeline_database::PipelineDatabase, readback_buffer, wgpu, Context};

use crate::{
    accumulate_pass::{self, AccumulatePassParameters},
    scene_resources::SceneResources,
    spawn_pass::{self, SpawnPassParameters},
    trace_pass::{self, TracePassParameters},
};

pub const WGPU_DEFAULT_GROUP_WIDTH: u32 = 64;

const CONSTANTS_SIZE: u64 = std::mem::size_of::<FrameConstants>() as u64;
/// Allocations are rounded up to whole `vec4<f32>`s.
const BUFFER_ALIGNMENT: u64 = 16;

pub struct WgpuPipeline {
    kernel: Kernel,
    group_width: u32,
    pipeline: Arc<wgpu::ComputePipeline>,
}

impl WgpuPipeline {
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }
}

pub struct WgpuBuffer {
    id: u64,
    label: String,
    size: u64,
    buffer: wgpu::Buffer,
}

impl WgpuBuffer {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Set from the device lost callback, which wgpu may run on any thread.
#[derive(Debug, Clone, Default)]
struct DeviceLoss(Arc<Mutex<Option<String>>>);

impl DeviceLoss {
    fn record(&self, reason: impl std::fmt::Debug, message: &str) {
        log::warn!("wgpu device lost ({:?}): {}", reason, message);
        self.0
            .lock()
            .get_or_insert_with(|| format!("{:?}: {}", reason, message));
    }

    fn check(&self, stage: &str) -> Result<(), BackendError> {
        match self.0.lock().as_ref() {
            Some(cause) => Err(BackendError::Device(format!(
                "device lost during {}, {}",
                stage, cause
            ))),
            None => Ok(()),
        }
    }
}

/// Runs the WGSL kernels on a wgpu device against an uploaded [`SphereScene`].
///
/// Every dispatch is submitted on its own, [`ComputeBackend::await_completion`]
/// waits for the latest submission.
pub struct WgpuBackend {
    ctx: Context,
    pipeline_database: PipelineDatabase,
    scene_resources: SceneResources,
    group_width: u32,
    next_buffer_id: u64,
    pending: Option<wgpu::SubmissionIndex>,
    device_loss: DeviceLoss,
}

impl WgpuBackend {
    pub fn new(ctx: Context, scene: &SphereScene) -> Self {
        let scene_resources = SceneResources::new(scene, &ctx.device);
        log::info!(
            "Uploaded {} spheres to the gpu",
            scene_resources.sphere_count()
        );

        let device_loss = DeviceLoss::default();
        let lost = device_loss.clone();
        ctx.device
            .set_device_lost_callback(move |reason, message| lost.record(reason, &message));

        let mut backend = Self {
            ctx,
            pipeline_database: PipelineDatabase::new(),
            scene_resources,
            group_width: WGPU_DEFAULT_GROUP_WIDTH,
            next_buffer_id: 0,
            pending: None,
            device_loss,
        };
        backend.group_width = backend.clamp_group_width(WGPU_DEFAULT_GROUP_WIDTH);
        backend
    }

    /// Overrides the workgroup size, clamped to what the device supports.
    pub fn with_group_width(mut self, group_width: u32) -> Self {
        self.group_width = self.clamp_group_width(group_width);
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    fn clamp_group_width(&self, group_width: u32) -> u32 {
        let limits = self.ctx.device.limits();
        group_width
            .min(limits.max_compute_workgroup_size_x)
            .min(limits.max_compute_invocations_per_workgroup)
            .max(1)
    }

    /// Runs `f` inside validation and out of memory error scopes.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> Result<T, wgpu::Error> {
        self.ctx
            .device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.ctx
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f(self);

        let validation = futures::executor::block_on(self.ctx.device.pop_error_scope());
        let out_of_memory = futures::executor::block_on(self.ctx.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }

    fn device_error(error: impl std::fmt::Display) -> BackendError {
        BackendError::Device(error.to_string())
    }
}

impl ComputeBackend for WgpuBackend {
    type Pipeline = WgpuPipeline;
    type Buffer = WgpuBuffer;

    fn name(&self) -> &str {
        "wgpu"
    }

    fn preferred_group_width(&self) -> u32 {
        self.group_width
    }

    fn max_buffer_size(&self) -> u64 {
        let limits = self.ctx.device.limits();
        limits
            .max_buffer_size
            .min(limits.max_storage_buffer_binding_size as u64)
    }

    fn compile_kernel(&mut self, kernel: Kernel) -> Result<WgpuPipeline, BackendError> {
        puffin::profile_function!(kernel.name());

        let group_width = self.group_width;
        let pipeline = self
            .scoped(|backend| {
                let device = &backend.ctx.device;
                let pipeline_database = &mut backend.pipeline_database;
                match kernel {
                    Kernel::Spawn => spawn_pass::pipeline(device, pipeline_database, group_width),
                    Kernel::Trace => trace_pass::pipeline(
                        device,
                        pipeline_database,
                        group_width,
                        &backend.scene_resources,
                    ),
                    Kernel::Accumulate => {
                        accumulate_pass::pipeline(device, pipeline_database, group_width)
                    }
                }
            })
            .map_err(|error| {
                // The cache may now hold a module or pipeline that failed validation.
                self.pipeline_database.clear();
                BackendError::Compile {
                    kernel: kernel.name(),
                    message: error.to_string(),
                }
            })?
            .map_err(|error| BackendError::Compile {
                kernel: kernel.name(),
                message: format!("{:#}", error),
            })?;

        Ok(WgpuPipeline {
            kernel,
            group_width,
            pipeline,
        })
    }

    fn allocate_buffer(&mut self, label: &str, size: u64) -> Result<WgpuBuffer, BackendError> {
        let limit = self.max_buffer_size();
        if size > limit {
            return Err(BackendError::Allocation {
                label: label.to_owned(),
                requested: size,
                limit,
            });
        }

        let padded_size = size.div_ceil(BUFFER_ALIGNMENT).max(1) * BUFFER_ALIGNMENT;
        let buffer = self
            .scoped(|backend| {
                backend.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size: padded_size,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::UNIFORM
                        | wgpu::BufferUsages::COPY_SRC
                        | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .map_err(Self::device_error)?;

        self.next_buffer_id += 1;
        Ok(WgpuBuffer {
            id: self.next_buffer_id,
            label: label.to_owned(),
            size,
            buffer,
        })
    }

    fn write_buffer(&mut self, buffer: &WgpuBuffer, data: &[u8]) -> Result<(), BackendError> {
        if data.len() as u64 > buffer.size {
            return Err(BackendError::WriteOutOfBounds {
                label: buffer.label.clone(),
                size: data.len() as u64,
            });
        }

        // Queue writes must cover whole words.
        let mut padded = data.to_vec();
        padded.resize(data.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize), 0);

        self.scoped(|backend| backend.ctx.queue.write_buffer(&buffer.buffer, 0, &padded))
            .map_err(Self::device_error)
    }

    fn read_buffer(&mut self, buffer: &WgpuBuffer) -> Result<Vec<u8>, BackendError> {
        puffin::profile_function!();

        let copy_size = buffer.buffer.size();
        let staging = self
            .scoped(|backend| {
                let staging = backend.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("lithium-path-tracer-gpu readback"),
                    size: copy_size,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                let mut command_encoder =
                    backend
                        .ctx
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("lithium-path-tracer-gpu readback"),
                        });
                command_encoder.copy_buffer_to_buffer(&buffer.buffer, 0, &staging, 0, copy_size);
                backend.ctx.queue.submit(Some(command_encoder.finish()));
                staging
            })
            .map_err(Self::device_error)?;

        let data = readback_buffer(&staging, &self.ctx.device);
        self.device_loss.check("readback")?;
        let mut data = data.map_err(|error| Self::device_error(format!("{:#}", error)))?;
        self.pending = None;
        data.truncate(buffer.size as usize);
        Ok(data)
    }

    fn dispatch(
        &mut self,
        pipeline: &WgpuPipeline,
        bindings: &[&WgpuBuffer],
        descriptor: &DispatchDescriptor,
    ) -> Result<(), BackendError> {
        puffin::profile_function!(pipeline.kernel.name());

        let kernel = pipeline.kernel;
        if bindings.len() != kernel.binding_count() {
            return Err(BackendError::Bindings {
                kernel: kernel.name(),
                expected: kernel.binding_count(),
                actual: bindings.len(),
            });
        }
        if descriptor.lanes_per_group != pipeline.group_width {
            return Err(BackendError::GroupWidth {
                kernel: kernel.name(),
                expected: pipeline.group_width,
                actual: descriptor.lanes_per_group,
            });
        }
        for (i, a) in bindings.iter().enumerate() {
            if bindings[..i].iter().any(|b| a.id == b.id) {
                return Err(BackendError::AliasedBinding {
                    kernel: kernel.name(),
                    label: a.label.clone(),
                });
            }
        }
        if bindings[0].size < CONSTANTS_SIZE {
            return Err(BackendError::BufferTooSmall {
                kernel: kernel.name(),
                label: bindings[0].label.clone(),
                size: bindings[0].size,
                required: CONSTANTS_SIZE,
            });
        }

        if descriptor.launched_lanes() < descriptor.lane_count as u64 {
            return Err(BackendError::LaunchTooSmall {
                kernel: kernel.name(),
                launched: descriptor.launched_lanes(),
                required: descriptor.lane_count as u64,
            });
        }

        let max_groups = self.ctx.device.limits().max_compute_workgroups_per_dimension;
        let grid = descriptor
            .grid(max_groups)
            .ok_or(BackendError::GridTooLarge {
                group_count: descriptor.group_count,
            })?;

        let submission = self
            .scoped(|backend| {
                let device = &backend.ctx.device;
                let mut command_encoder =
                    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some(kernel.name()),
                    });

                match kernel {
                    Kernel::Spawn => spawn_pass::encode(
                        &SpawnPassParameters {
                            constants: &bindings[0].buffer,
                            lanes: &bindings[1].buffer,
                            grid,
                        },
                        device,
                        &mut command_encoder,
                        &pipeline.pipeline,
                    ),
                    Kernel::Trace => trace_pass::encode(
                        &TracePassParameters {
                            constants: &bindings[0].buffer,
                            lanes: &bindings[1].buffer,
                            scene_resources: &backend.scene_resources,
                            grid,
                        },
                        device,
                        &mut command_encoder,
                        &pipeline.pipeline,
                    ),
                    Kernel::Accumulate => accumulate_pass::encode(
                        &AccumulatePassParameters {
                            constants: &bindings[0].buffer,
                            lanes: &bindings[1].buffer,
                            pixels: &bindings[2].buffer,
                            grid,
                        },
                        device,
                        &mut command_encoder,
                        &pipeline.pipeline,
                    ),
                }

                backend.ctx.queue.submit(Some(command_encoder.finish()))
            })
            .map_err(Self::device_error)?;

        log::trace!(
            "wgpu dispatch {}: {} lanes in a {}x{} grid of {}",
            kernel,
            descriptor.lane_count,
            grid.0,
            grid.1,
            descriptor.lanes_per_group
        );

        self.pending = Some(submission);
        Ok(())
    }

    fn await_completion(&mut self) -> Result<(), BackendError> {
        puffin::profile_function!();

        if let Some(submission) = self.pending.take() {
            self.ctx
                .device
                .poll(wgpu::Maintain::wait_for(submission));
        }

        self.device_loss.check("await_completion")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_loss_names_the_failing_stage() {
        let loss = DeviceLoss::default();
        assert_eq!(loss.check("await_completion"), Ok(()));

        let callback = loss.clone();
        callback.record(wgpu::DeviceLostReason::Unknown, "driver reset");
        callback.record(wgpu::DeviceLostReason::Destroyed, "dropped");

        match loss.check("await_completion") {
            Err(BackendError::Device(message)) => {
                assert!(message.starts_with("device lost during await_completion"));
                assert!(message.contains("driver reset"));
                assert!(!message.contains("dropped"));
            }
            other => panic!("expected a device error, got {:?}", other),
        }
    }
}
