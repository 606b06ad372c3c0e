use std::sync::Arc;

use glam::Vec4;
use parking_lot::RwLock;
use rayon::prelude::*;

use crate::{
    accumulator::accumulate_lane,
    dispatch::{DispatchDescriptor, Kernel},
    error::BackendError,
    frame::FrameConstants,
    lanes::{LaneRecord, LANE_RECORD_SIZE, PIXEL_SIZE},
    path_integrator::trace_lane,
    scene::Scene,
    spawner::spawn_lane,
};

use super::ComputeBackend;

pub const CPU_DEFAULT_GROUP_WIDTH: u32 = 64;
pub const CPU_DEFAULT_MAX_BUFFER_SIZE: u64 = 1 << 31;

const CONSTANTS_SIZE: u64 = std::mem::size_of::<FrameConstants>() as u64;
const WORD_SIZE: u64 = std::mem::size_of::<Vec4>() as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuPipeline {
    kernel: Kernel,
    group_width: u32,
}

impl CpuPipeline {
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }
}

/// Host memory buffer, stored as `Vec4` words so it can be viewed as lane
/// records or pixels without realignment.
#[derive(Debug, Clone)]
pub struct CpuBuffer {
    label: String,
    size: u64,
    words: Arc<RwLock<Vec<Vec4>>>,
}

impl CpuBuffer {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn ensure_size(&self, kernel: Kernel, required: u64) -> Result<(), BackendError> {
        if self.size < required {
            return Err(BackendError::BufferTooSmall {
                kernel: kernel.name(),
                label: self.label.clone(),
                size: self.size,
                required,
            });
        }

        Ok(())
    }
}

/// Runs the kernels on the rayon thread pool, one parallel task per group.
///
/// Dispatches complete before `dispatch` returns, so the barrier in
/// [`ComputeBackend::await_completion`] is free.
pub struct CpuBackend<S: Scene> {
    scene: S,
    group_width: u32,
    max_buffer_size: u64,
}

impl<S: Scene> CpuBackend<S> {
    pub fn new(scene: S) -> Self {
        Self {
            scene,
            group_width: CPU_DEFAULT_GROUP_WIDTH,
            max_buffer_size: CPU_DEFAULT_MAX_BUFFER_SIZE,
        }
    }

    /// Lanes per group, clamped to at least 1. A width of 1 runs every lane
    /// as its own task.
    pub fn with_group_width(mut self, group_width: u32) -> Self {
        self.group_width = group_width.max(1);
        self
    }

    pub fn with_max_buffer_size(mut self, max_buffer_size: u64) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    fn read_constants(buffer: &CpuBuffer) -> FrameConstants {
        let words = buffer.words.read();
        let bytes: &[u8] = bytemuck::cast_slice(&words[..]);
        bytemuck::pod_read_unaligned(&bytes[..CONSTANTS_SIZE as usize])
    }

    fn spawn(
        &self,
        constants: &FrameConstants,
        lanes: &CpuBuffer,
        group_width: usize,
        group_count: usize,
    ) {
        let mut words = lanes.words.write();
        let records = lane_records_mut(&mut words);

        records
            .par_chunks_mut(group_width)
            .enumerate()
            .take(group_count)
            .for_each(|(group, records)| {
                for (i, record) in records.iter_mut().enumerate() {
                    let lane_index = (group * group_width + i) as u32;
                    if lane_index >= constants.lane_count {
                        return;
                    }
                    *record = spawn_lane(constants, lane_index);
                }
            });
    }

    fn trace(
        &self,
        constants: &FrameConstants,
        lanes: &CpuBuffer,
        group_width: usize,
        group_count: usize,
    ) {
        let mut words = lanes.words.write();
        let records = lane_records_mut(&mut words);

        records
            .par_chunks_mut(group_width)
            .enumerate()
            .take(group_count)
            .for_each(|(group, records)| {
                puffin::profile_scope!("trace_group");
                for (i, record) in records.iter_mut().enumerate() {
                    let lane_index = (group * group_width + i) as u32;
                    if lane_index >= constants.lane_count {
                        return;
                    }
                    trace_lane(constants, lane_index, record, &self.scene);
                }
            });
    }

    fn accumulate(
        &self,
        constants: &FrameConstants,
        lanes: &CpuBuffer,
        pixels: &CpuBuffer,
        group_width: usize,
        group_count: usize,
    ) {
        let lane_words = lanes.words.read();
        let records: &[LaneRecord] =
            bytemuck::cast_slice(&lane_words[..lane_words.len() / 2 * 2]);
        let mut pixel_words = pixels.words.write();

        pixel_words[..]
            .par_chunks_mut(group_width)
            .enumerate()
            .take(group_count)
            .for_each(|(group, pixels)| {
                for (i, pixel) in pixels.iter_mut().enumerate() {
                    let pixel_index = (group * group_width + i) as u32;
                    if pixel_index >= constants.pixel_count {
                        return;
                    }
                    accumulate_lane(constants, pixel_index, records, pixel);
                }
            });
    }
}

/// Two words per record, a trailing odd word is not part of any record.
fn lane_records_mut(words: &mut [Vec4]) -> &mut [LaneRecord] {
    let len = words.len() / 2 * 2;
    bytemuck::cast_slice_mut(&mut words[..len])
}

impl<S: Scene> ComputeBackend for CpuBackend<S> {
    type Pipeline = CpuPipeline;
    type Buffer = CpuBuffer;

    fn name(&self) -> &str {
        "cpu"
    }

    fn preferred_group_width(&self) -> u32 {
        self.group_width
    }

    fn max_buffer_size(&self) -> u64 {
        self.max_buffer_size
    }

    fn compile_kernel(&mut self, kernel: Kernel) -> Result<CpuPipeline, BackendError> {
        Ok(CpuPipeline {
            kernel,
            group_width: self.group_width,
        })
    }

    fn allocate_buffer(&mut self, label: &str, size: u64) -> Result<CpuBuffer, BackendError> {
        if size > self.max_buffer_size {
            return Err(BackendError::Allocation {
                label: label.to_owned(),
                requested: size,
                limit: self.max_buffer_size,
            });
        }

        let word_count = size.div_ceil(WORD_SIZE) as usize;
        Ok(CpuBuffer {
            label: label.to_owned(),
            size,
            words: Arc::new(RwLock::new(vec![Vec4::ZERO; word_count])),
        })
    }

    fn write_buffer(&mut self, buffer: &CpuBuffer, data: &[u8]) -> Result<(), BackendError> {
        if data.len() as u64 > buffer.size {
            return Err(BackendError::WriteOutOfBounds {
                label: buffer.label.clone(),
                size: data.len() as u64,
            });
        }

        let mut words = buffer.words.write();
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words[..]);
        bytes[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &CpuBuffer) -> Result<Vec<u8>, BackendError> {
        let words = buffer.words.read();
        let bytes: &[u8] = bytemuck::cast_slice(&words[..]);
        Ok(bytes[..buffer.size as usize].to_vec())
    }

    fn dispatch(
        &mut self,
        pipeline: &CpuPipeline,
        bindings: &[&CpuBuffer],
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
            if bindings[..i].iter().any(|b| Arc::ptr_eq(&a.words, &b.words)) {
                return Err(BackendError::AliasedBinding {
                    kernel: kernel.name(),
                    label: a.label.clone(),
                });
            }
        }

        bindings[0].ensure_size(kernel, CONSTANTS_SIZE)?;
        let constants = Self::read_constants(bindings[0]);
        bindings[1].ensure_size(kernel, constants.lane_count as u64 * LANE_RECORD_SIZE)?;

        let active = match kernel {
            Kernel::Spawn | Kernel::Trace => constants.lane_count,
            Kernel::Accumulate => {
                bindings[2].ensure_size(kernel, constants.pixel_count as u64 * PIXEL_SIZE)?;
                constants.pixel_count
            }
        };
        // Only the launched groups run, so a short launch would skip lanes.
        if descriptor.launched_lanes() < active as u64 {
            return Err(BackendError::LaunchTooSmall {
                kernel: kernel.name(),
                launched: descriptor.launched_lanes(),
                required: active as u64,
            });
        }

        let group_width = pipeline.group_width as usize;
        let group_count = descriptor.group_count as usize;
        match kernel {
            Kernel::Spawn => self.spawn(&constants, bindings[1], group_width, group_count),
            Kernel::Trace => self.trace(&constants, bindings[1], group_width, group_count),
            Kernel::Accumulate => {
                self.accumulate(&constants, bindings[1], bindings[2], group_width, group_count)
            }
        }

        log::trace!(
            "cpu dispatch {}: {} lanes in {} groups of {}",
            kernel,
            descriptor.lane_count,
            descriptor.group_count,
            descriptor.lanes_per_group
        );

        Ok(())
    }

    fn await_completion(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use lithium_camera::CameraBasis;

    use super::*;
    use crate::{
        config::RenderConfig,
        dispatch::SampleBatch,
        lanes::{LANE_STATE_CONTRIBUTION, LANE_STATE_EMPTY, LANE_STATE_RAY},
        scene::{HitRecord, Ray},
    };

    struct Sky;

    impl Scene for Sky {
        fn trace(&self, _ray: &Ray) -> HitRecord {
            HitRecord::miss(Vec3::ONE)
        }
    }

    fn setup(
        backend: &mut CpuBackend<Sky>,
        config: &RenderConfig,
        lane_capacity: u64,
    ) -> (FrameConstants, CpuBuffer, CpuBuffer) {
        let basis = CameraBasis::new(Vec3::Z, Vec3::ZERO, 60.0, 1.0, 0.0, 1.0).unwrap();
        let constants = FrameConstants::new(
            config,
            &basis,
            &SampleBatch {
                sample_offset: 0,
                sample_count: config.sample_count,
            },
        );

        let constants_buffer = backend.allocate_buffer("constants", CONSTANTS_SIZE).unwrap();
        backend
            .write_buffer(&constants_buffer, bytemuck::bytes_of(&constants))
            .unwrap();
        let lanes = backend
            .allocate_buffer("lanes", lane_capacity * LANE_RECORD_SIZE)
            .unwrap();
        (constants, constants_buffer, lanes)
    }

    fn read_records(backend: &mut CpuBackend<Sky>, lanes: &CpuBuffer) -> Vec<LaneRecord> {
        bytemuck::pod_collect_to_vec(&backend.read_buffer(lanes).unwrap())
    }

    #[test]
    fn inactive_tail_lanes_are_untouched() {
        let mut backend = CpuBackend::new(Sky).with_group_width(8);
        let config = RenderConfig::new(3, 1, 1, 0);
        let (constants, constants_buffer, lanes) = setup(&mut backend, &config, 8);

        let spawn = backend.compile_kernel(Kernel::Spawn).unwrap();
        let descriptor = DispatchDescriptor::new(constants.lane_count, 8);
        backend
            .dispatch(&spawn, &[&constants_buffer, &lanes], &descriptor)
            .unwrap();
        backend.await_completion().unwrap();

        let records = read_records(&mut backend, &lanes);
        assert!(records[..3].iter().all(|r| r.state() == LANE_STATE_RAY));
        assert!(records[3..].iter().all(|r| r.state() == LANE_STATE_EMPTY));

        let trace = backend.compile_kernel(Kernel::Trace).unwrap();
        backend
            .dispatch(&trace, &[&constants_buffer, &lanes], &descriptor)
            .unwrap();
        let records = read_records(&mut backend, &lanes);
        assert!(records[..3]
            .iter()
            .all(|r| r.state() == LANE_STATE_CONTRIBUTION));
        assert!(records[3..].iter().all(|r| r.state() == LANE_STATE_EMPTY));
    }

    #[test]
    fn rejects_bad_bindings() {
        let mut backend = CpuBackend::new(Sky).with_group_width(4);
        let config = RenderConfig::new(4, 4, 2, 0);
        let (constants, constants_buffer, lanes) = setup(&mut backend, &config, 32);
        let accumulate = backend.compile_kernel(Kernel::Accumulate).unwrap();
        let descriptor = DispatchDescriptor::new(constants.pixel_count, 4);

        assert!(matches!(
            backend.dispatch(&accumulate, &[&constants_buffer, &lanes], &descriptor),
            Err(BackendError::Bindings { expected: 3, actual: 2, .. })
        ));
        assert!(matches!(
            backend.dispatch(&accumulate, &[&constants_buffer, &lanes, &lanes], &descriptor),
            Err(BackendError::AliasedBinding { .. })
        ));

        let small = backend.allocate_buffer("pixels", PIXEL_SIZE).unwrap();
        assert!(matches!(
            backend.dispatch(&accumulate, &[&constants_buffer, &lanes, &small], &descriptor),
            Err(BackendError::BufferTooSmall { required: 256, .. })
        ));

        let wide = DispatchDescriptor::new(constants.pixel_count, 16);
        assert!(matches!(
            backend.dispatch(&accumulate, &[&constants_buffer, &lanes, &small], &wide),
            Err(BackendError::GroupWidth { expected: 4, actual: 16, .. })
        ));
    }

    #[test]
    fn launches_must_cover_every_active_lane() {
        let mut backend = CpuBackend::new(Sky).with_group_width(8);
        let config = RenderConfig::new(10, 10, 1, 0);
        let (constants, constants_buffer, lanes) = setup(&mut backend, &config, 100);
        let spawn = backend.compile_kernel(Kernel::Spawn).unwrap();

        let short = DispatchDescriptor {
            lane_count: 100,
            group_count: 1,
            lanes_per_group: 8,
        };
        assert!(matches!(
            backend.dispatch(&spawn, &[&constants_buffer, &lanes], &short),
            Err(BackendError::LaunchTooSmall {
                launched: 8,
                required: 100,
                ..
            })
        ));
        assert!(read_records(&mut backend, &lanes)
            .iter()
            .all(|r| r.state() == LANE_STATE_EMPTY));

        let full = DispatchDescriptor::new(constants.lane_count, 8);
        backend
            .dispatch(&spawn, &[&constants_buffer, &lanes], &full)
            .unwrap();
        assert!(read_records(&mut backend, &lanes)
            .iter()
            .all(|r| r.state() == LANE_STATE_RAY));
    }

    #[test]
    fn allocation_respects_the_buffer_limit() {
        let mut backend = CpuBackend::new(Sky).with_max_buffer_size(64);
        assert!(backend.allocate_buffer("fits", 64).is_ok());
        assert!(matches!(
            backend.allocate_buffer("lanes", 65),
            Err(BackendError::Allocation { requested: 65, limit: 64, .. })
        ));

        let buffer = backend.allocate_buffer("small", 16).unwrap();
        assert!(matches!(
            backend.write_buffer(&buffer, &[0; 17]),
            Err(BackendError::WriteOutOfBounds { size: 17, .. })
        ));
    }
}
