//! Primary ray generation, one ray per sample lane. Mirrored by `spawn.wgsl`.

use glam::Vec2;

use crate::{
    frame::FrameConstants,
    lanes::LaneRecord,
    math::random::{LaneRng, SPAWN_STREAM},
    sampling::sample_uniform_disk_concentric,
    scene::Ray,
};

/// Thin lens ray for `pixel_index`, jittered inside the pixel by `film_u` and
/// across the lens by `lens_u`, both in [0, 1)^2.
pub fn generate_ray(
    constants: &FrameConstants,
    pixel_index: u32,
    film_u: Vec2,
    lens_u: Vec2,
) -> Ray {
    let basis = constants.camera_basis();

    let x = pixel_index % constants.width;
    let y = pixel_index / constants.width;
    let s = (x as f32 + film_u.x) / constants.width as f32;
    let t = (y as f32 + film_u.y) / constants.height as f32;

    // Exactly zero for a pinhole, so every sample of a pixel shares the origin.
    let lens = basis.lens_radius * sample_uniform_disk_concentric(lens_u);
    let origin = basis.origin + basis.u * lens.x + basis.v * lens.y;

    let focus_point = basis.focus_plane_point(s, t);
    let direction = (focus_point - origin).try_normalize().unwrap_or(-basis.w);

    Ray::new(origin, direction)
}

/// Body of the spawn kernel for one lane.
pub fn spawn_lane(constants: &FrameConstants, lane_index: u32) -> LaneRecord {
    let (pixel_index, sample_index) = constants.lane_coordinates(lane_index);

    let mut rng = LaneRng::new(pixel_index, sample_index, constants.seed, SPAWN_STREAM);
    let film_u = rng.next_2d();
    let lens_u = rng.next_2d();

    LaneRecord::from_ray(&generate_ray(constants, pixel_index, film_u, lens_u))
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use lithium_camera::CameraBasis;

    use super::*;
    use crate::{config::RenderConfig, dispatch::SampleBatch};

    fn constants(aperture: f32) -> FrameConstants {
        let config = RenderConfig::new(4, 2, 8, 1);
        let basis =
            CameraBasis::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, 90.0, 2.0, aperture, 2.0)
                .unwrap();
        FrameConstants::new(
            &config,
            &basis,
            &SampleBatch {
                sample_offset: 0,
                sample_count: 8,
            },
        )
    }

    #[test]
    fn pixel_centers_map_onto_the_focus_plane() {
        let constants = constants(0.0);

        // Top left pixel of a 4x2 image, center of the pixel.
        let ray = generate_ray(&constants, 0, Vec2::splat(0.5), Vec2::ZERO);
        let t = 2.0 / -ray.direction.z;
        let hit = ray.at(t);
        assert!(hit.abs_diff_eq(Vec3::new(-3.0, 1.0, 0.0), 1e-4), "{hit}");
    }

    #[test]
    fn lens_offsets_stay_within_the_aperture() {
        let constants = constants(0.25);
        for lane in 0..constants.lane_count {
            let ray = spawn_lane(&constants, lane).ray().unwrap();
            let offset = ray.origin - Vec3::new(0.0, 0.0, 2.0);
            assert!(offset.length() <= 0.25 + 1e-5);
            assert!(offset.z.abs() < 1e-6);
        }
    }

    #[test]
    fn spawning_is_deterministic() {
        let constants = constants(0.1);
        assert_eq!(spawn_lane(&constants, 5), spawn_lane(&constants, 5));
        assert_ne!(spawn_lane(&constants, 5), spawn_lane(&constants, 6));
    }
}
