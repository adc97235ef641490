//! The main scene camera.
//!
//! Projection kind is a tagged variant chosen at construction. Everything that
//! needs to know how much of the world is visible (the transition overlay, the
//! custom cursor, click rings) goes through [`Camera::frustum_size`] rather than
//! branching on the kind.

use glam::{Mat4, Quat, Vec2, Vec3};

/// How the camera maps view space to clip space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Perspective projection with a vertical field of view in radians.
    Perspective { fov_y: f32, near: f32, far: f32 },
    /// Orthographic projection. `half_height` is half the visible world height;
    /// the width follows the viewport aspect ratio.
    Orthographic { half_height: f32, near: f32, far: f32 },
}

/// A camera with position, orientation and projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            projection: Projection::Perspective {
                fov_y: 50f32.to_radians(),
                near: 0.1,
                far: 1000.0,
            },
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orthographic camera looking down -Z showing `half_height * 2` world units vertically.
    pub fn orthographic(half_height: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                half_height,
                near: 0.1,
                far: 1000.0,
            },
            ..Self::default()
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        let forward = (target - self.position).normalize_or_zero();
        if forward != Vec3::ZERO {
            self.forward = forward;
        }
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        if let Projection::Perspective { near, far, .. } = self.projection {
            self.projection = Projection::Perspective {
                fov_y: fov_degrees.to_radians(),
                near,
                far,
            };
        }
        self
    }

    /// Compute the right vector from forward and up.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    /// Recompute up to be orthogonal to forward and right.
    pub fn orthogonal_up(&self) -> Vec3 {
        self.right().cross(self.forward).normalize_or_zero()
    }

    /// Rotation that turns a quad in the XY plane to face the camera.
    pub fn billboard_rotation(&self) -> Quat {
        let rotation = Mat4::look_to_rh(Vec3::ZERO, self.forward, self.up).inverse();
        Quat::from_mat4(&rotation)
    }

    pub fn near(&self) -> f32 {
        match self.projection {
            Projection::Perspective { near, .. } | Projection::Orthographic { near, .. } => near,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y, near, far } => {
                Mat4::perspective_rh(fov_y, aspect, near, far)
            }
            Projection::Orthographic {
                half_height,
                near,
                far,
            } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far)
            }
        }
    }

    /// Visible world-space width and height of a plane `distance` units in
    /// front of the camera.
    pub fn frustum_size(&self, distance: f32, aspect: f32) -> Vec2 {
        let height = match self.projection {
            Projection::Perspective { fov_y, .. } => 2.0 * distance * (fov_y * 0.5).tan(),
            Projection::Orthographic { half_height, .. } => 2.0 * half_height,
        };
        Vec2::new(height * aspect, height)
    }

    /// World-space point `distance` units in front of the camera under the
    /// given normalized device coordinate.
    pub fn point_at_ndc(&self, ndc: Vec2, distance: f32, aspect: f32) -> Vec3 {
        let size = self.frustum_size(distance, aspect);
        self.position
            + self.forward * distance
            + self.right() * (ndc.x * size.x * 0.5)
            + self.orthogonal_up() * (ndc.y * size.y * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_frustum_grows_with_distance() {
        let camera = Camera::new().with_fov(90.0);
        let near = camera.frustum_size(1.0, 1.0);
        let far = camera.frustum_size(2.0, 1.0);
        assert!((near.y - 2.0).abs() < 1e-4);
        assert!((far.y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn orthographic_frustum_ignores_distance() {
        let camera = Camera::orthographic(3.0);
        assert_eq!(camera.frustum_size(1.0, 2.0), Vec2::new(12.0, 6.0));
        assert_eq!(camera.frustum_size(50.0, 2.0), Vec2::new(12.0, 6.0));
    }

    #[test]
    fn ndc_corners_land_on_frustum_edges() {
        let camera = Camera::new().with_fov(90.0);
        let point = camera.point_at_ndc(Vec2::new(1.0, 1.0), 1.0, 1.0);
        assert!((point - Vec3::new(1.0, 1.0, 4.0)).length() < 1e-4);
    }
}
