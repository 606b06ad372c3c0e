use glam::Vec3;

use super::{HitRecord, Material, Ray, Scene};

/// Hits closer than this are ignored, spawned rays are already offset.
pub const SPHERE_T_MIN: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: Material,
    pub emission: Vec3,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: Material) -> Self {
        Self {
            center,
            radius,
            material,
            emission: Vec3::ZERO,
        }
    }

    pub fn with_emission(mut self, emission: Vec3) -> Self {
        self.emission = emission;
        self
    }

    /// Closest ray parameter in `[t_min, t_max)`.
    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<f32> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let half_b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        [(-half_b - sqrt_d) / a, (-half_b + sqrt_d) / a]
            .into_iter()
            .find(|t| *t >= t_min && *t < t_max)
    }
}

/// Vertical gradient between the horizon and the zenith.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sky {
    pub horizon: Vec3,
    pub zenith: Vec3,
}

impl Default for Sky {
    fn default() -> Self {
        Self {
            horizon: Vec3::ONE,
            zenith: Vec3::new(0.5, 0.7, 1.0),
        }
    }
}

impl Sky {
    pub fn constant(radiance: Vec3) -> Self {
        Self {
            horizon: radiance,
            zenith: radiance,
        }
    }

    pub fn radiance(&self, direction: Vec3) -> Vec3 {
        let t = 0.5 * (direction.normalize_or_zero().y + 1.0);
        self.horizon.lerp(self.zenith, t)
    }
}

/// Analytic sphere scene, traced by brute force. Also understood by the wgpu
/// backend, which uploads it as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SphereScene {
    pub spheres: Vec<Sphere>,
    pub sky: Sky,
}

impl SphereScene {
    pub fn new(sky: Sky) -> Self {
        Self {
            spheres: Vec::new(),
            sky,
        }
    }

    pub fn with_sphere(mut self, sphere: Sphere) -> Self {
        self.spheres.push(sphere);
        self
    }

    /// Ground plane, a diffuse, a metal and a glass sphere under a blue sky,
    /// plus a small light. Looks right from `(0, 1, 4)` towards `(0, 0.5, 0)`.
    pub fn showcase() -> Self {
        Self::new(Sky::default())
            .with_sphere(Sphere::new(
                Vec3::new(0.0, -1000.0, 0.0),
                1000.0,
                Material::diffuse(Vec3::new(0.5, 0.5, 0.45)),
            ))
            .with_sphere(Sphere::new(
                Vec3::new(0.0, 0.5, 0.0),
                0.5,
                Material::diffuse(Vec3::new(0.7, 0.25, 0.2)),
            ))
            .with_sphere(Sphere::new(
                Vec3::new(-1.1, 0.5, 0.0),
                0.5,
                Material::dielectric(1.5),
            ))
            .with_sphere(Sphere::new(
                Vec3::new(1.1, 0.5, 0.0),
                0.5,
                Material::conductor(Vec3::new(0.8, 0.7, 0.5), 0.05),
            ))
            .with_sphere(
                Sphere::new(Vec3::new(0.0, 2.2, -0.6), 0.3, Material::BLACK)
                    .with_emission(Vec3::splat(6.0)),
            )
    }
}

impl Scene for SphereScene {
    fn trace(&self, ray: &Ray) -> HitRecord {
        let mut closest: Option<(f32, &Sphere)> = None;
        for sphere in &self.spheres {
            let t_max = closest.map_or(f32::INFINITY, |(t, _)| t);
            if let Some(t) = sphere.intersect(ray, SPHERE_T_MIN, t_max) {
                closest = Some((t, sphere));
            }
        }

        match closest {
            Some((t, sphere)) => {
                let position = ray.at(t);
                let normal = ((position - sphere.center) / sphere.radius).normalize_or_zero();
                HitRecord::hit(position, normal, sphere.material, sphere.emission)
            }
            None => HitRecord::miss(self.sky.radiance(ray.direction)),
        }
    }
}
