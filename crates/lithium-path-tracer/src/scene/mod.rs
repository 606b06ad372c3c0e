use glam::Vec3;

mod material;
pub use material::*;
mod sphere_scene;
pub use sphere_scene::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of tracing a single ray through a [`Scene`].
///
/// On a miss `emission` carries the background radiance seen along the ray,
/// the remaining fields are meaningless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    pub did_hit: bool,
    pub position: Vec3,
    /// Outward facing geometric normal.
    pub normal: Vec3,
    pub material: Material,
    pub emission: Vec3,
}

impl HitRecord {
    pub fn hit(position: Vec3, normal: Vec3, material: Material, emission: Vec3) -> Self {
        Self {
            did_hit: true,
            position,
            normal,
            material,
            emission,
        }
    }

    pub fn miss(background: Vec3) -> Self {
        Self {
            did_hit: false,
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            material: Material::BLACK,
            emission: background,
        }
    }
}

/// Scene intersection and shading, treated as an opaque collaborator.
///
/// `trace` must be a pure function of the ray with bounded cost, it is called
/// concurrently from every lane of the trace stage.
pub trait Scene: Send + Sync {
    fn trace(&self, ray: &Ray) -> HitRecord;
}

impl<S: Scene + ?Sized> Scene for &S {
    fn trace(&self, ray: &Ray) -> HitRecord {
        (**self).trace(ray)
    }
}

impl<S: Scene + ?Sized> Scene for std::sync::Arc<S> {
    fn trace(&self, ray: &Ray) -> HitRecord {
        (**self).trace(ray)
    }
}
