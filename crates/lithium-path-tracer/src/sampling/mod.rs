use core::f32::consts::{FRAC_1_PI, FRAC_PI_2, FRAC_PI_4, PI};

use glam::{Vec2, Vec3};

use crate::math::{safe_sqrt, sqr};

/// Maps the unit square onto the unit disk while keeping strata intact.
pub fn sample_uniform_disk_concentric(u: Vec2) -> Vec2 {
    let u_offset = 2.0 * u - Vec2::ONE;
    if u_offset == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, FRAC_PI_4 * (u_offset.y / u_offset.x))
    } else {
        (
            u_offset.y,
            FRAC_PI_2 - FRAC_PI_4 * (u_offset.x / u_offset.y),
        )
    };

    Vec2::new(theta.cos(), theta.sin()) * r
}

/// Cosine weighted direction around +Z.
pub fn sample_cosine_hemisphere(u: Vec2) -> Vec3 {
    let d = sample_uniform_disk_concentric(u);
    let z = safe_sqrt(1.0 - sqr(d.x) - sqr(d.y));
    Vec3::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta * FRAC_1_PI
}

/// Uniform direction on the unit sphere.
pub fn sample_uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = safe_sqrt(1.0 - sqr(z));
    let phi = 2.0 * PI * u.y;

    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concentric_disk_stays_inside_unit_disk() {
        for i in 0..32 {
            for j in 0..32 {
                let u = Vec2::new(i as f32 / 32.0, j as f32 / 32.0);
                assert!(sample_uniform_disk_concentric(u).length() <= 1.0 + 1e-5);
            }
        }
    }

    #[test]
    fn concentric_disk_center_maps_to_origin() {
        assert_eq!(sample_uniform_disk_concentric(Vec2::splat(0.5)), Vec2::ZERO);
    }

    #[test]
    fn concentric_disk_corners_reach_the_rim() {
        let p = sample_uniform_disk_concentric(Vec2::new(1.0, 0.5));
        assert!((p.length() - 1.0).abs() < 1e-5);
        assert!(p.abs_diff_eq(Vec2::X, 1e-5));
    }

    #[test]
    fn cosine_hemisphere_is_upper_and_unit() {
        for i in 0..16 {
            for j in 0..16 {
                let u = Vec2::new(i as f32 / 16.0, j as f32 / 16.0);
                let w = sample_cosine_hemisphere(u);
                assert!(w.z >= 0.0);
                assert!((w.length() - 1.0).abs() < 1e-4);
            }
        }
    }
}
