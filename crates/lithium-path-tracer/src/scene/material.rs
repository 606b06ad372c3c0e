use glam::{Vec2, Vec3};

use crate::{
    math::{safe_sqrt, sqr, CoordSystem},
    sampling::{cosine_hemisphere_pdf, sample_cosine_hemisphere, sample_uniform_sphere},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Lambertian reflector.
    Diffuse { albedo: Vec3 },
    /// Mirror, perturbed by `roughness` times a random unit vector.
    Conductor { albedo: Vec3, roughness: f32 },
    /// Smooth glass with index of refraction `ior`.
    Dielectric { ior: f32 },
}

impl Material {
    /// Absorbs everything.
    pub const BLACK: Self = Self::Diffuse { albedo: Vec3::ZERO };

    pub fn diffuse(albedo: Vec3) -> Self {
        Self::Diffuse { albedo }
    }

    pub fn conductor(albedo: Vec3, roughness: f32) -> Self {
        Self::Conductor {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }

    pub fn dielectric(ior: f32) -> Self {
        Self::Dielectric { ior }
    }

    /// Samples an incident direction for outgoing direction `wo` (pointing
    /// away from the surface). The returned weight is `f * |cos| / pdf`.
    pub fn sample(&self, wo: Vec3, normal: Vec3, u: Vec2, uc: f32) -> Option<ScatterSample> {
        match *self {
            Self::Diffuse { albedo } => {
                let n = face_forward(normal, wo);
                let local = sample_cosine_hemisphere(u);
                let pdf = cosine_hemisphere_pdf(local.z);
                if pdf <= 0.0 {
                    return None;
                }

                Some(ScatterSample {
                    direction: CoordSystem::new(n).to_world(local),
                    // (albedo / pi) * cos / (cos / pi)
                    weight: albedo,
                })
            }
            Self::Conductor { albedo, roughness } => {
                let n = face_forward(normal, wo);
                let direction = (reflect(wo, n) + roughness * sample_uniform_sphere(u))
                    .try_normalize()?;
                if direction.dot(n) <= 0.0 {
                    return None;
                }

                Some(ScatterSample {
                    direction,
                    weight: albedo,
                })
            }
            Self::Dielectric { ior } => {
                let cos_theta_o = wo.dot(normal);
                let reflectance = fresnel_dielectric(cos_theta_o, ior);

                let direction = if uc < reflectance {
                    reflect(wo, normal)
                } else {
                    refract(wo, normal, ior).unwrap_or_else(|| reflect(wo, normal))
                };

                Some(ScatterSample {
                    direction: direction.try_normalize()?,
                    weight: Vec3::ONE,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterSample {
    pub direction: Vec3,
    pub weight: Vec3,
}

fn face_forward(n: Vec3, v: Vec3) -> Vec3 {
    if n.dot(v) < 0.0 {
        -n
    } else {
        n
    }
}

pub fn reflect(wo: Vec3, n: Vec3) -> Vec3 {
    -wo + 2.0 * wo.dot(n) * n
}

/// Refracts `wi` through a surface with outward normal `n` and relative index
/// of refraction `eta`, `None` on total internal reflection.
pub fn refract(wi: Vec3, mut n: Vec3, mut eta: f32) -> Option<Vec3> {
    let mut cos_theta_i = n.dot(wi);
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
        n = -n;
    }

    let sin_2_theta_i = (1.0 - sqr(cos_theta_i)).max(0.0);
    let sin_2_theta_t = sin_2_theta_i / sqr(eta);
    if sin_2_theta_t >= 1.0 {
        None
    } else {
        let cos_theta_t = safe_sqrt(1.0 - sin_2_theta_t);
        Some(-wi / eta + (cos_theta_i / eta - cos_theta_t) * n)
    }
}

pub fn fresnel_dielectric(mut cos_theta_i: f32, mut eta: f32) -> f32 {
    cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
    }

    let sin_2_theta_i = 1.0 - sqr(cos_theta_i);
    let sin_2_theta_t = sin_2_theta_i / sqr(eta);
    if sin_2_theta_t >= 1.0 {
        1.0
    } else {
        let cos_theta_t = safe_sqrt(1.0 - sin_2_theta_t);

        let r_parl = (eta * cos_theta_i - cos_theta_t) / (eta * cos_theta_i + cos_theta_t);
        let r_perp = (cos_theta_i - eta * cos_theta_t) / (cos_theta_i + eta * cos_theta_t);
        (sqr(r_parl) + sqr(r_perp)) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffuse_scatters_into_the_viewer_hemisphere() {
        let material = Material::diffuse(Vec3::splat(0.5));
        let wo = Vec3::new(0.2, 0.9, 0.1).normalize();

        for i in 0..8 {
            for j in 0..8 {
                let u = Vec2::new(i as f32 / 8.0 + 0.01, j as f32 / 8.0 + 0.01);
                let sample = material.sample(wo, Vec3::Y, u, 0.5).unwrap();
                assert!(sample.direction.y >= 0.0);
                assert_eq!(sample.weight, Vec3::splat(0.5));
            }
        }
    }

    #[test]
    fn smooth_conductor_is_a_mirror() {
        let material = Material::conductor(Vec3::ONE, 0.0);
        let wo = Vec3::new(1.0, 1.0, 0.0).normalize();
        let sample = material.sample(wo, Vec3::Y, Vec2::ZERO, 0.0).unwrap();
        assert!(sample
            .direction
            .abs_diff_eq(Vec3::new(-1.0, 1.0, 0.0).normalize(), 1e-5));
    }

    #[test]
    fn dielectric_passes_straight_through_at_normal_incidence() {
        let material = Material::dielectric(1.5);
        // uc above the ~4% normal incidence reflectance forces refraction.
        let sample = material.sample(Vec3::Y, Vec3::Y, Vec2::ZERO, 0.99).unwrap();
        assert!(sample.direction.abs_diff_eq(-Vec3::Y, 1e-5));
    }

    #[test]
    fn total_internal_reflection() {
        assert_eq!(fresnel_dielectric(-0.1, 1.5), 1.0);
        assert!(refract(Vec3::new(0.995, -0.1, 0.0).normalize(), Vec3::Y, 1.5).is_none());
    }
}
