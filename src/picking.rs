//! Ray picking against scene graph nodes.
//!
//! - [`Ray`]: a 3D ray with origin and direction
//! - [`Collider`]: box or sphere shape carried by solid nodes
//! - [`Intersection`]: one hit, with the sprite UV when the hit was on a quad
//! - [`raycast`]: all hits in a graph, nearest first
//!
//! Sprites are tested against their quad in the node's local XY plane, which
//! yields the UV the alpha tester samples. Solids are tested against their
//! collider and carry no UV.
//!
//! # Example
//!
//! ```ignore
//! let ray = Ray::from_ndc(ndc, &camera, viewport.aspect());
//! for hit in raycast(&graph, &ray, PickFilter::CLICK) {
//!     println!("{:?} at {} (uv {:?})", hit.entity, hit.distance, hit.uv);
//! }
//! ```

use glam::{Vec2, Vec3, Vec4};
use hecs::Entity;

use crate::camera::Camera;
use crate::graph::{Layers, Role, SceneGraph, Solid, Sprite, Visible};
use crate::mesh::Transform;

/// A ray in 3D space, used for raycasting and picking.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// The starting point of the ray.
    pub origin: Vec3,
    /// The normalized direction of the ray.
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray through a normalized device coordinate (`-1..1` on both axes, +Y up)
    /// from the camera's near plane.
    pub fn from_ndc(ndc: Vec2, camera: &Camera, aspect: f32) -> Self {
        let near_clip = Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far_clip = Vec4::new(ndc.x, ndc.y, 1.0, 1.0);

        let inv_view_proj = (camera.projection_matrix(aspect) * camera.view_matrix()).inverse();

        let near_world = inv_view_proj * near_clip;
        let far_world = inv_view_proj * far_clip;

        // Perspective divide
        let near_point = near_world.truncate() / near_world.w;
        let far_point = far_world.truncate() / far_world.w;

        Self {
            origin: near_point,
            direction: (far_point - near_point).normalize_or_zero(),
        }
    }

    /// Get a point along the ray at the given distance from the origin.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Test intersection with an axis-aligned bounding box.
    ///
    /// Returns the distance to the nearest positive intersection.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for i in 0..3 {
            let origin = self.origin[i];
            let dir = self.direction[i];

            if dir.abs() < f32::EPSILON {
                // Parallel to this slab
                if origin < min[i] || origin > max[i] {
                    return None;
                }
            } else {
                let inv_dir = 1.0 / dir;
                let mut t1 = (min[i] - origin) * inv_dir;
                let mut t2 = (max[i] - origin) * inv_dir;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }

    /// Test intersection with a sphere.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let a = self.direction.dot(self.direction);
        let b = 2.0 * oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);

        if t1 > 0.0 {
            Some(t1)
        } else if t2 > 0.0 {
            Some(t2)
        } else {
            None
        }
    }

    /// Test intersection with a quad of `size` lying in the transform's local
    /// XY plane. Both faces are hit.
    ///
    /// Returns the distance and the UV of the hit point, with `(0, 0)` at the
    /// quad's bottom-left corner and `(1, 1)` at its top-right.
    pub fn intersect_quad(&self, transform: &Transform, size: Vec2) -> Option<(f32, Vec2)> {
        let normal = transform.rotation * Vec3::Z;
        let denom = self.direction.dot(normal);
        if denom.abs() < f32::EPSILON {
            return None;
        }

        let t = (transform.position - self.origin).dot(normal) / denom;
        if t <= 0.0 {
            return None;
        }

        let local = transform.rotation.inverse() * (self.point_at(t) - transform.position);
        let extent = size * transform.scale.truncate();
        if extent.x == 0.0 || extent.y == 0.0 {
            return None;
        }

        let uv = local.truncate() / extent + Vec2::splat(0.5);
        if (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y) {
            Some((t, uv))
        } else {
            None
        }
    }
}

/// A collision shape for picking solid nodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collider {
    /// Axis-aligned box defined by half-extents.
    Box { half_extents: Vec3 },
    /// Sphere defined by radius.
    Sphere { radius: f32 },
}

impl Collider {
    /// Box collider from full dimensions, centered on the node.
    pub fn box_collider(size: Vec3) -> Self {
        Self::Box {
            half_extents: size * 0.5,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Test a ray against this collider placed at `position` with `scale`.
    pub fn intersect(&self, ray: &Ray, position: Vec3, scale: Vec3) -> Option<f32> {
        match self {
            Collider::Box { half_extents } => {
                let scaled_half = *half_extents * scale;
                ray.intersect_aabb(position - scaled_half, position + scaled_half)
            }
            Collider::Sphere { radius } => {
                let avg_scale = (scale.x + scale.y + scale.z) / 3.0;
                ray.intersect_sphere(position, radius * avg_scale)
            }
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::box_collider(Vec3::ONE)
    }
}

/// One ray hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub entity: Entity,
    /// Distance from the ray origin.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// Texture coordinate on a sprite quad. `None` for solids.
    pub uv: Option<Vec2>,
}

/// Which nodes a raycast considers.
///
/// Nodes must be visible, share a layer with the filter, and have a pickable
/// [`Role`]. Cursor, background, particle, overlay and effect nodes (click
/// rings) never take part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickFilter {
    pub layers: Layers,
}

impl PickFilter {
    /// Clicks see every layer.
    pub const CLICK: PickFilter = PickFilter {
        layers: Layers::ALL,
    };

    /// Hover is restricted to the default layer so the cursor never hits itself.
    pub const HOVER: PickFilter = PickFilter {
        layers: Layers::DEFAULT,
    };

    fn accepts(&self, role: Role, layers: Layers, visible: bool) -> bool {
        visible && role.is_pickable() && self.layers.intersects(layers)
    }
}

/// Cast a ray against every sprite and solid in the graph.
///
/// Returns all hits sorted by distance, closest first.
pub fn raycast(graph: &SceneGraph, ray: &Ray, filter: PickFilter) -> Vec<Intersection> {
    let mut hits = Vec::new();

    let mut query = graph.world().query::<(
        &Transform,
        &Role,
        &Layers,
        &Visible,
        Option<&Sprite>,
        Option<&Solid>,
    )>();

    for (entity, (transform, role, layers, visible, sprite, solid)) in query.iter() {
        if !filter.accepts(*role, *layers, visible.0) {
            continue;
        }

        if let Some(sprite) = sprite {
            if let Some((distance, uv)) = ray.intersect_quad(transform, sprite.size) {
                hits.push(Intersection {
                    entity,
                    distance,
                    point: ray.point_at(distance),
                    uv: Some(uv),
                });
            }
        } else if let Some(solid) = solid {
            if let Some(distance) = solid
                .collider
                .intersect(ray, transform.position, transform.scale)
            {
                hits.push(Intersection {
                    entity,
                    distance,
                    point: ray.point_at(distance),
                    uv: None,
                });
            }
        }
    }

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}
