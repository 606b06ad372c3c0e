//! Per pixel reduction of sample contributions. Mirrored by `accumulate.wgsl`.

use glam::{Vec3, Vec4, Vec4Swizzles};

use crate::{frame::FrameConstants, lanes::LaneRecord};

/// Mean of the contributions held by `pixel_index`'s lanes in the current
/// batch, merged with `previous`, the mean over the samples of earlier
/// batches. The result stays linear, only non-finite and negative channels
/// are clamped.
pub fn accumulate_pixel(
    constants: &FrameConstants,
    pixel_index: u32,
    lanes: &[LaneRecord],
    previous: Vec4,
) -> Vec4 {
    let first_lane = pixel_index as usize * constants.batch_sample_count as usize;
    let last_lane = (first_lane + constants.batch_sample_count as usize)
        .min(constants.lane_count as usize)
        .min(lanes.len());

    let mut mean = Vec3::ZERO;
    let mut count = 0u32;
    for lane in lanes.get(first_lane..last_lane).unwrap_or_default() {
        let Some(contribution) = lane.contribution() else {
            continue;
        };

        // Running mean, exact when every sample carries the same value.
        count += 1;
        mean += (clamp_radiance(contribution.xyz()) - mean) / count as f32;
    }

    let previous = clamp_radiance(previous.xyz());
    if count == 0 {
        return previous.extend(1.0);
    }

    let merged = if constants.accumulated_sample_count == 0 {
        mean
    } else {
        let weight =
            count as f32 / (constants.accumulated_sample_count as f32 + count as f32);
        previous + (mean - previous) * weight
    };

    clamp_radiance(merged).extend(1.0)
}

fn clamp_radiance(radiance: Vec3) -> Vec3 {
    let finite = |x: f32| if x.is_finite() { x.max(0.0) } else { 0.0 };
    Vec3::new(finite(radiance.x), finite(radiance.y), finite(radiance.z))
}

/// Body of the accumulate kernel for one pixel.
pub fn accumulate_lane(
    constants: &FrameConstants,
    pixel_index: u32,
    lanes: &[LaneRecord],
    pixel: &mut Vec4,
) {
    *pixel = accumulate_pixel(constants, pixel_index, lanes, *pixel);
}
