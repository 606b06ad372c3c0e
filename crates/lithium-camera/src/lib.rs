use glam::Vec3;
use thiserror::Error;

pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera origin and target coincide at {0}, the view direction is undefined")]
    DegenerateBasis(Vec3),
    #[error("vertical field of view must lie in (0, 180) degrees, got {0}")]
    FieldOfView(f32),
    #[error("focus distance must be positive, got {0}")]
    FocusDistance(f32),
    #[error("aperture radius must not be negative, got {0}")]
    Aperture(f32),
    #[error("aspect ratio must be positive, got {0}")]
    AspectRatio(f32),
    #[error("camera parameter `{0}` is not finite")]
    NonFinite(&'static str),
}

/// User facing camera description, as it comes out of the configuration surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub origin: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub vertical_fov: f32,
    /// Distance to the plane in perfect focus, `None` focuses on `target`.
    pub focus_distance: Option<f32>,
    /// Radius of the thin lens, 0 disables defocus blur.
    pub aperture_radius: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            vertical_fov: 60.0,
            focus_distance: None,
            aperture_radius: 0.0,
        }
    }
}

impl CameraConfig {
    pub fn new(origin: Vec3, target: Vec3, vertical_fov: f32) -> Self {
        Self {
            origin,
            target,
            vertical_fov,
            ..Default::default()
        }
    }

    pub fn with_focus_distance(mut self, focus_distance: f32) -> Self {
        self.focus_distance = Some(focus_distance);
        self
    }

    pub fn with_aperture_radius(mut self, aperture_radius: f32) -> Self {
        self.aperture_radius = aperture_radius;
        self
    }

    pub fn focus_distance(&self) -> f32 {
        self.focus_distance
            .unwrap_or_else(|| self.origin.distance(self.target))
    }

    pub fn basis(&self, aspect_ratio: f32) -> Result<CameraBasis, CameraError> {
        // The default focus distance is 0 here, report the cause instead.
        if self.origin == self.target {
            return Err(CameraError::DegenerateBasis(self.origin));
        }

        CameraBasis::new(
            self.origin,
            self.target,
            self.vertical_fov,
            self.focus_distance(),
            self.aperture_radius,
            aspect_ratio,
        )
    }
}

/// Orthonormal thin lens basis used to generate primary rays.
///
/// `half_width` and `half_height` describe the image plane at unit distance
/// along `-w`, ray generation scales them by `focus_distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub origin: Vec3,
    /// Right.
    pub u: Vec3,
    /// Up.
    pub v: Vec3,
    /// Backwards, pointing from the target towards the origin.
    pub w: Vec3,
    pub lens_radius: f32,
    pub half_height: f32,
    pub half_width: f32,
    pub focus_distance: f32,
}

impl CameraBasis {
    pub fn new(
        origin: Vec3,
        target: Vec3,
        vertical_fov: f32,
        focus_distance: f32,
        aperture_radius: f32,
        aspect_ratio: f32,
    ) -> Result<Self, CameraError> {
        if !origin.is_finite() {
            return Err(CameraError::NonFinite("origin"));
        }
        if !target.is_finite() {
            return Err(CameraError::NonFinite("target"));
        }
        if !vertical_fov.is_finite() || vertical_fov <= 0.0 || vertical_fov >= 180.0 {
            return Err(CameraError::FieldOfView(vertical_fov));
        }
        if !focus_distance.is_finite() || focus_distance <= 0.0 {
            return Err(CameraError::FocusDistance(focus_distance));
        }
        if !aperture_radius.is_finite() || aperture_radius < 0.0 {
            return Err(CameraError::Aperture(aperture_radius));
        }
        if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return Err(CameraError::AspectRatio(aspect_ratio));
        }

        let w = (origin - target)
            .try_normalize()
            .ok_or(CameraError::DegenerateBasis(origin))?;

        // Looking straight up or down leaves the world up vector without a
        // usable cross product, pick the next axis instead.
        let up = if w.cross(UP).length_squared() < 1e-8 {
            log::debug!("View direction is parallel to +Y, using +Z as the up vector");
            FORWARD
        } else {
            UP
        };

        let u = up.cross(w).normalize();
        let v = w.cross(u);

        let half_height = (vertical_fov * 0.5).to_radians().tan();
        let half_width = aspect_ratio * half_height;

        Ok(Self {
            origin,
            u,
            v,
            w,
            lens_radius: aperture_radius,
            half_height,
            half_width,
            focus_distance,
        })
    }

    /// Point on the plane of focus for normalized screen coordinates, `(0, 0)`
    /// being the top left corner of the image.
    pub fn focus_plane_point(&self, s: f32, t: f32) -> Vec3 {
        self.origin
            + self.focus_distance
                * ((2.0 * s - 1.0) * self.half_width * self.u
                    + (1.0 - 2.0 * t) * self.half_height * self.v
                    - self.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "{a} != {b}");
    }

    #[test]
    fn basis_is_orthonormal() {
        let basis =
            CameraBasis::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 45.0, 2.0, 0.1, 1.5).unwrap();

        assert!((basis.u.length() - 1.0).abs() < 1e-5);
        assert!((basis.v.length() - 1.0).abs() < 1e-5);
        assert!((basis.w.length() - 1.0).abs() < 1e-5);
        assert!(basis.u.dot(basis.v).abs() < 1e-5);
        assert!(basis.u.dot(basis.w).abs() < 1e-5);
        assert!(basis.v.dot(basis.w).abs() < 1e-5);
    }

    #[test]
    fn looking_down_negative_z() {
        let basis = CameraBasis::new(Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO, 90.0, 1.0, 0.0, 2.0)
            .unwrap();

        assert_close(basis.w, Vec3::Z);
        assert_close(basis.u, Vec3::X);
        assert_close(basis.v, Vec3::Y);
        assert!((basis.half_height - 1.0).abs() < 1e-5);
        assert!((basis.half_width - 2.0).abs() < 1e-5);
        assert_close(basis.focus_plane_point(0.5, 0.5), Vec3::ZERO);
        assert_close(basis.focus_plane_point(0.0, 0.0), Vec3::new(-2.0, 1.0, 0.0));
    }

    #[test]
    fn vertical_view_direction_uses_fallback_up() {
        let basis = CameraBasis::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, 60.0, 5.0, 0.0, 1.0)
            .unwrap();

        assert!(basis.u.is_finite() && basis.v.is_finite());
        assert!(basis.u.dot(basis.w).abs() < 1e-5);
    }

    #[test]
    fn rejects_degenerate_configurations() {
        assert_eq!(
            CameraBasis::new(Vec3::ONE, Vec3::ONE, 60.0, 1.0, 0.0, 1.0),
            Err(CameraError::DegenerateBasis(Vec3::ONE))
        );
        assert_eq!(
            CameraBasis::new(Vec3::Z, Vec3::ZERO, 180.0, 1.0, 0.0, 1.0),
            Err(CameraError::FieldOfView(180.0))
        );
        assert_eq!(
            CameraBasis::new(Vec3::Z, Vec3::ZERO, 0.0, 1.0, 0.0, 1.0),
            Err(CameraError::FieldOfView(0.0))
        );
        assert_eq!(
            CameraBasis::new(Vec3::Z, Vec3::ZERO, 60.0, 0.0, 0.0, 1.0),
            Err(CameraError::FocusDistance(0.0))
        );
        assert_eq!(
            CameraBasis::new(Vec3::Z, Vec3::ZERO, 60.0, 1.0, -0.5, 1.0),
            Err(CameraError::Aperture(-0.5))
        );
    }

    #[test]
    fn coinciding_origin_and_target_is_degenerate() {
        let config = CameraConfig::new(Vec3::ONE, Vec3::ONE, 60.0);
        assert_eq!(config.basis(1.0), Err(CameraError::DegenerateBasis(Vec3::ONE)));
        assert_eq!(
            config.with_focus_distance(2.0).basis(1.0),
            Err(CameraError::DegenerateBasis(Vec3::ONE))
        );
    }

    #[test]
    fn focus_distance_defaults_to_target_distance() {
        let config = CameraConfig::new(Vec3::new(0.0, 3.0, 4.0), Vec3::ZERO, 40.0);
        assert_eq!(config.focus_distance(), 5.0);
        assert_eq!(config.with_focus_distance(2.0).focus_distance(), 2.0);
    }
}
