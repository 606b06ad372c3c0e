use glam::Vec3;

use crate::{
    frame::FrameConstants,
    lanes::LaneRecord,
    math::random::{LaneRng, TRACE_STREAM},
    scene::{Ray, Scene},
};

/// Offset along the normal for rays leaving a surface.
pub const RAY_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub radiance: Vec3,
    /// Scatter events performed, never more than the bounce count.
    pub bounces: u32,
}

/// Throughput weighted emission estimator, mirrored by `trace.wgsl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathIntegrator {
    max_bounces: u32,
    russian_roulette_depth: Option<u32>,
}

impl PathIntegrator {
    pub fn new(max_bounces: u32) -> Self {
        Self {
            max_bounces,
            russian_roulette_depth: None,
        }
    }

    pub fn from_constants(constants: &FrameConstants) -> Self {
        Self {
            max_bounces: constants.bounce_count,
            russian_roulette_depth: constants.russian_roulette_depth(),
        }
    }

    pub fn with_russian_roulette(mut self, depth: u32) -> Self {
        self.russian_roulette_depth = Some(depth);
        self
    }

    pub fn li<S: Scene + ?Sized>(&self, mut ray: Ray, rng: &mut LaneRng, scene: &S) -> PathSample {
        let mut l = Vec3::ZERO;
        let mut throughput = Vec3::ONE;
        let mut bounces = 0;

        for depth in 0..=self.max_bounces {
            let hit = scene.trace(&ray);
            l += throughput * hit.emission;

            if !hit.did_hit || depth == self.max_bounces {
                break;
            }

            let wo = -ray.direction;
            let u = rng.next_2d();
            let uc = rng.next_f32();
            let Some(sample) = hit.material.sample(wo, hit.normal, u, uc) else {
                break;
            };
            if !sample.weight.is_finite() || !sample.direction.is_finite() {
                break;
            }

            throughput *= sample.weight;
            bounces += 1;
            if throughput.max_element() <= 0.0 {
                break;
            }

            if self
                .russian_roulette_depth
                .is_some_and(|rr_depth| bounces >= rr_depth)
            {
                let survival = throughput.max_element().min(1.0);
                if rng.next_f32() >= survival {
                    break;
                }
                throughput /= survival;
            }

            let side = if sample.direction.dot(hit.normal) < 0.0 {
                -1.0
            } else {
                1.0
            };
            ray = Ray::new(
                hit.position + hit.normal * (RAY_EPSILON * side),
                sample.direction,
            );
        }

        PathSample {
            radiance: Vec3::new(sanitize(l.x), sanitize(l.y), sanitize(l.z)),
            bounces,
        }
    }
}

fn sanitize(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Body of the trace kernel for one lane, overwrites the ray in place with its
/// radiance estimate. Lanes that do not hold a ray are left untouched.
pub fn trace_lane<S: Scene + ?Sized>(
    constants: &FrameConstants,
    lane_index: u32,
    lane: &mut LaneRecord,
    scene: &S,
) {
    let Some(ray) = lane.ray() else {
        return;
    };

    let (pixel_index, sample_index) = constants.lane_coordinates(lane_index);
    let mut rng = LaneRng::new(pixel_index, sample_index, constants.seed, TRACE_STREAM);

    let sample = PathIntegrator::from_constants(constants).li(ray, &mut rng, scene);
    lane.store_contribution(sample.radiance);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::scene::{HitRecord, Material};

    /// Every ray hits a white diffuse wall.
    struct Wall {
        traces: AtomicU32,
        emission: Vec3,
    }

    impl Scene for Wall {
        fn trace(&self, ray: &Ray) -> HitRecord {
            self.traces.fetch_add(1, Ordering::Relaxed);
            HitRecord::hit(
                ray.origin + ray.direction,
                -ray.direction,
                Material::diffuse(Vec3::ONE),
                self.emission,
            )
        }
    }

    fn wall(emission: Vec3) -> Wall {
        Wall {
            traces: AtomicU32::new(0),
            emission,
        }
    }

    #[test]
    fn always_hit_scene_is_bounded() {
        for max_bounces in [0, 1, 5, 32] {
            let scene = wall(Vec3::splat(0.1));
            let mut rng = LaneRng::new(0, 0, 0, TRACE_STREAM);
            let sample = PathIntegrator::new(max_bounces).li(
                Ray::new(Vec3::ZERO, Vec3::Z),
                &mut rng,
                &scene,
            );

            assert!(sample.bounces <= max_bounces);
            assert_eq!(scene.traces.load(Ordering::Relaxed), max_bounces + 1);
            // Lossless wall, each trace adds the full emission.
            assert!((sample.radiance.x - 0.1 * (max_bounces + 1) as f32).abs() < 1e-4);
        }
    }

    #[test]
    fn zero_reflectance_stops_after_first_hit() {
        struct Black(AtomicU32);
        impl Scene for Black {
            fn trace(&self, ray: &Ray) -> HitRecord {
                self.0.fetch_add(1, Ordering::Relaxed);
                HitRecord::hit(
                    ray.origin + ray.direction,
                    -ray.direction,
                    Material::BLACK,
                    Vec3::new(1.0, 2.0, 3.0),
                )
            }
        }

        let scene = Black(AtomicU32::new(0));
        let mut rng = LaneRng::new(0, 0, 0, TRACE_STREAM);
        let sample = PathIntegrator::new(8).li(Ray::new(Vec3::ZERO, Vec3::Z), &mut rng, &scene);

        assert_eq!(sample.radiance, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(scene.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn russian_roulette_keeps_paths_bounded() {
        let scene = wall(Vec3::ZERO);
        let integrator = PathIntegrator::new(16).with_russian_roulette(1);
        let mut rng = LaneRng::new(3, 4, 5, TRACE_STREAM);
        let sample = integrator.li(Ray::new(Vec3::ZERO, Vec3::Z), &mut rng, &scene);
        assert!(sample.bounces <= 16);
        assert_eq!(sample.radiance, Vec3::ZERO);
    }

    #[test]
    fn non_finite_emission_is_clamped() {
        let scene = wall(Vec3::new(f32::NAN, f32::INFINITY, 0.5));
        let mut rng = LaneRng::new(0, 0, 0, TRACE_STREAM);
        let sample = PathIntegrator::new(0).li(Ray::new(Vec3::ZERO, Vec3::Z), &mut rng, &scene);
        assert_eq!(sample.radiance, Vec3::new(0.0, 0.0, 0.5));
    }
}
