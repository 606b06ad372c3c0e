use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use lithium_camera::CameraBasis;

use crate::{config::RenderConfig, dispatch::SampleBatch};

/// `russian_roulette_depth` value that disables Russian roulette.
pub const RUSSIAN_ROULETTE_DISABLED: u32 = u32::MAX;

/// Everything a kernel needs to know about the frame and the current batch.
/// Mirrors `Constants` in `lane.wgsl`, every row is 16 bytes.
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct FrameConstants {
    pub width: u32,
    pub height: u32,
    pub pixel_count: u32,
    pub sample_count: u32,

    pub bounce_count: u32,
    pub seed: u32,
    /// Global index of the first sample in this batch.
    pub sample_offset: u32,
    /// Samples per pixel in this batch.
    pub batch_sample_count: u32,

    /// Samples per pixel already merged into the pixel buffer.
    pub accumulated_sample_count: u32,
    /// Active lanes in this batch, `pixel_count * batch_sample_count`.
    pub lane_count: u32,
    pub russian_roulette_depth: u32,
    pub _padding0: u32,

    pub origin: Vec3,
    pub lens_radius: f32,
    pub u: Vec3,
    pub half_width: f32,
    pub v: Vec3,
    pub half_height: f32,
    pub w: Vec3,
    pub focus_distance: f32,
}

impl FrameConstants {
    pub fn new(config: &RenderConfig, basis: &CameraBasis, batch: &SampleBatch) -> Self {
        let pixel_count = config.width * config.height;

        Self {
            width: config.width,
            height: config.height,
            pixel_count,
            sample_count: config.sample_count,
            bounce_count: config.bounce_count,
            seed: config.seed,
            sample_offset: batch.sample_offset,
            batch_sample_count: batch.sample_count,
            accumulated_sample_count: batch.sample_offset,
            lane_count: pixel_count * batch.sample_count,
            russian_roulette_depth: config
                .russian_roulette_depth
                .unwrap_or(RUSSIAN_ROULETTE_DISABLED),
            _padding0: 0,
            origin: basis.origin,
            lens_radius: basis.lens_radius,
            u: basis.u,
            half_width: basis.half_width,
            v: basis.v,
            half_height: basis.half_height,
            w: basis.w,
            focus_distance: basis.focus_distance,
        }
    }

    pub fn camera_basis(&self) -> CameraBasis {
        CameraBasis {
            origin: self.origin,
            u: self.u,
            v: self.v,
            w: self.w,
            lens_radius: self.lens_radius,
            half_height: self.half_height,
            half_width: self.half_width,
            focus_distance: self.focus_distance,
        }
    }

    /// Splits a lane index of the current batch into its pixel and global
    /// sample index.
    pub fn lane_coordinates(&self, lane_index: u32) -> (u32, u32) {
        let pixel_index = lane_index / self.batch_sample_count;
        let sample_index = self.sample_offset + lane_index % self.batch_sample_count;
        (pixel_index, sample_index)
    }

    pub fn russian_roulette_depth(&self) -> Option<u32> {
        (self.russian_roulette_depth != RUSSIAN_ROULETTE_DISABLED)
            .then_some(self.russian_roulette_depth)
    }
}
