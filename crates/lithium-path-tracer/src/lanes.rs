use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4, Vec4Swizzles};

use crate::scene::Ray;

/// Record has not been written by any stage yet.
pub const LANE_STATE_EMPTY: u32 = 0;
/// `payload.xyz` holds the ray direction.
pub const LANE_STATE_RAY: u32 = 1;
/// `payload` holds the RGBA radiance estimate.
pub const LANE_STATE_CONTRIBUTION: u32 = 2;

/// One sample lane as stored in the lane buffer, layout shared with `lane.wgsl`.
///
/// The spawn stage writes a ray, the trace stage overwrites the same slot
/// with its contribution, so tracing needs no second lane sized buffer.
/// `state` tags which of the two the payload currently holds.
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct LaneRecord {
    origin: Vec3,
    state: u32,
    payload: Vec4,
}

impl Default for LaneRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl LaneRecord {
    pub fn from_ray(ray: &Ray) -> Self {
        Self {
            origin: ray.origin,
            state: LANE_STATE_RAY,
            payload: ray.direction.extend(0.0),
        }
    }

    pub fn from_contribution(radiance: Vec3) -> Self {
        Self {
            origin: Vec3::ZERO,
            state: LANE_STATE_CONTRIBUTION,
            payload: radiance.extend(1.0),
        }
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn ray(&self) -> Option<Ray> {
        (self.state == LANE_STATE_RAY).then(|| Ray::new(self.origin, self.payload.xyz()))
    }

    pub fn contribution(&self) -> Option<Vec4> {
        (self.state == LANE_STATE_CONTRIBUTION).then_some(self.payload)
    }

    /// Turns a ray record into a contribution record in place.
    pub fn store_contribution(&mut self, radiance: Vec3) {
        *self = Self::from_contribution(radiance);
    }
}

/// Bytes per record in the lane buffer.
pub const LANE_RECORD_SIZE: u64 = std::mem::size_of::<LaneRecord>() as u64;
/// Bytes per pixel in the pixel buffer, RGBA `f32`.
pub const PIXEL_SIZE: u64 = std::mem::size_of::<Vec4>() as u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_wgsl() {
        assert_eq!(LANE_RECORD_SIZE, 32);
        assert_eq!(PIXEL_SIZE, 16);
    }

    #[test]
    fn typed_views_follow_the_state_tag() {
        let ray = Ray::new(Vec3::ONE, Vec3::Z);
        let mut record = LaneRecord::from_ray(&ray);
        assert_eq!(record.ray(), Some(ray));
        assert_eq!(record.contribution(), None);

        record.store_contribution(Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(record.ray(), None);
        assert_eq!(record.contribution(), Some(Vec4::new(0.1, 0.2, 0.3, 1.0)));

        assert_eq!(LaneRecord::default().state(), LANE_STATE_EMPTY);
    }
}
