use std::time::Instant;

use lithium_camera::CameraConfig;

use crate::{
    backend::ComputeBackend,
    config::RenderConfig,
    dispatch::{plan_batches, DispatchDescriptor, Kernel},
    error::{BackendError, ConfigError, RenderError, Stage},
    film::Film,
    frame::FrameConstants,
    lanes::{LANE_RECORD_SIZE, PIXEL_SIZE},
};

const CONSTANTS_SIZE: u64 = std::mem::size_of::<FrameConstants>() as u64;

/// Sequences the spawn, trace and accumulate stages on a [`ComputeBackend`].
///
/// Every dispatch is followed by [`ComputeBackend::await_completion`], so a
/// stage only ever observes the completed writes of the one before it.
pub struct PathTracer<B: ComputeBackend> {
    backend: B,
}

impl<B: ComputeBackend> PathTracer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Renders one image. Blocks until the film is complete, on failure no
    /// partial image is returned.
    pub fn render(
        &mut self,
        config: &RenderConfig,
        camera: &CameraConfig,
    ) -> Result<Film, RenderError> {
        puffin::profile_function!();

        config.validate()?;
        let basis = camera.basis(config.aspect_ratio())?;

        let pixel_count = config.pixel_count();
        let max_batch_lanes = config
            .max_batch_lanes
            .unwrap_or(u64::MAX)
            .min(self.backend.max_buffer_size() / LANE_RECORD_SIZE)
            .min(u32::MAX as u64);
        let batches = plan_batches(pixel_count, config.sample_count, max_batch_lanes);
        let Some(largest_batch) = batches.first() else {
            return Err(ConfigError::BatchTooSmall {
                pixel_count,
                max_batch_lanes,
            }
            .into());
        };

        let group_width = self.backend.preferred_group_width();
        log::info!(
            "Rendering {}x{} with {} samples and {} bounces on {} ({} batches, groups of {})",
            config.width,
            config.height,
            config.sample_count,
            config.bounce_count,
            self.backend.name(),
            batches.len(),
            group_width
        );
        let start = Instant::now();

        let (spawn, trace, accumulate) = {
            puffin::profile_scope!("compile_kernels");
            (
                self.backend
                    .compile_kernel(Kernel::Spawn)
                    .map_err(RenderError::backend(Stage::Setup))?,
                self.backend
                    .compile_kernel(Kernel::Trace)
                    .map_err(RenderError::backend(Stage::Setup))?,
                self.backend
                    .compile_kernel(Kernel::Accumulate)
                    .map_err(RenderError::backend(Stage::Setup))?,
            )
        };

        let lane_capacity = pixel_count as u64 * largest_batch.sample_count as u64;
        let constants_buffer = self
            .backend
            .allocate_buffer("frame_constants", CONSTANTS_SIZE)
            .map_err(RenderError::backend(Stage::Setup))?;
        let lanes = self
            .backend
            .allocate_buffer("lanes", lane_capacity * LANE_RECORD_SIZE)
            .map_err(RenderError::backend(Stage::Setup))?;
        let pixels = self
            .backend
            .allocate_buffer("pixels", pixel_count as u64 * PIXEL_SIZE)
            .map_err(RenderError::backend(Stage::Setup))?;

        let pixel_dispatch = DispatchDescriptor::new(pixel_count, group_width);
        for batch in &batches {
            puffin::profile_scope!("batch");

            let constants = FrameConstants::new(config, &basis, batch);
            let lane_dispatch = DispatchDescriptor::new(constants.lane_count, group_width);
            log::debug!(
                "Batch of samples {}..{}: {} lanes in {} groups",
                batch.sample_offset,
                batch.sample_offset + batch.sample_count,
                lane_dispatch.lane_count,
                lane_dispatch.group_count
            );

            self.backend
                .write_buffer(&constants_buffer, bytemuck::bytes_of(&constants))
                .map_err(RenderError::backend(Stage::Spawn))?;

            self.run_stage(
                Stage::Spawn,
                &spawn,
                &[&constants_buffer, &lanes],
                &lane_dispatch,
            )?;
            self.run_stage(
                Stage::Trace,
                &trace,
                &[&constants_buffer, &lanes],
                &lane_dispatch,
            )?;
            self.run_stage(
                Stage::Accumulate,
                &accumulate,
                &[&constants_buffer, &lanes, &pixels],
                &pixel_dispatch,
            )?;
        }

        let film = {
            puffin::profile_scope!("readback");
            let bytes = self
                .backend
                .read_buffer(&pixels)
                .map_err(RenderError::backend(Stage::Readback))?;
            Film::from_bytes(config.width, config.height, &bytes).ok_or_else(|| {
                RenderError::Backend {
                    stage: Stage::Readback,
                    source: BackendError::Readback {
                        label: "pixels".to_owned(),
                        expected: pixel_count as u64 * PIXEL_SIZE,
                        actual: bytes.len() as u64,
                    },
                }
            })?
        };

        log::info!("Rendered in {:.2?}", start.elapsed());
        Ok(film)
    }

    fn run_stage(
        &mut self,
        stage: Stage,
        pipeline: &B::Pipeline,
        bindings: &[&B::Buffer],
        descriptor: &DispatchDescriptor,
    ) -> Result<(), RenderError> {
        puffin::profile_function!(stage.to_string());
        let start = Instant::now();

        self.backend
            .dispatch(pipeline, bindings, descriptor)
            .map_err(RenderError::backend(stage))?;
        self.backend
            .await_completion()
            .map_err(RenderError::backend(stage))?;

        log::trace!("{} stage took {:.2?}", stage, start.elapsed());
        Ok(())
    }
}
