use glam::Vec3;

use super::sqr;

/// Orthonormal frame around a unit vector, used to bring local hemisphere
/// samples into world space.
pub struct CoordSystem {
    right: Vec3,
    up: Vec3,
    forward: Vec3,
}

impl CoordSystem {
    /// Branchless construction from Duff et al., `forward` must be normalized.
    pub fn new(forward: Vec3) -> Self {
        let sign = 1.0f32.copysign(forward.z);
        let a = -1.0 / (sign + forward.z);
        let b = forward.x * forward.y * a;

        let right = Vec3::new(1.0 + sign * sqr(forward.x) * a, sign * b, -sign * forward.x);
        let up = Vec3::new(b, sign + sqr(forward.y) * a, -forward.y);

        Self { right, up, forward }
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.right * local.x + self.up * local.y + self.forward * local.z
    }
}
