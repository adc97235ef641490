//! Per-scene node graph.
//!
//! Each scene owns a [`SceneGraph`], a thin wrapper around a `hecs::World`.
//! Nodes are entities carrying a [`Transform`], a [`Role`], render [`Layers`]
//! and one visual component:
//!
//! - [`Sprite`]: textured quad in the node's local XY plane (alpha tested)
//! - [`Solid`]: model or box geometry (accepted without alpha test)
//! - [`Ring`]: procedural ring, used by click feedback
//! - [`Glow`]: soft disc, used by the custom cursor
//! - [`OverlayQuad`]: the transition overlay
//!
//! # Example
//!
//! ```ignore
//! let mut graph = SceneGraph::new();
//! let door = graph
//!     .node("door")
//!     .sprite(assets.load_texture("art/door.png"), Vec2::new(1.0, 2.0))
//!     .at(Vec3::new(0.5, 0.0, 0.0))
//!     .spawn();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec2, Vec3};
use hecs::{Entity, EntityBuilder, World};

use crate::color::Color;
use crate::geometry::Model;
use crate::mesh::Transform;
use crate::picking::Collider;
use crate::render::CaptureId;
use crate::texture::Texture;

/// Render layer bitmask. Raycasts and cameras only see nodes whose layers
/// intersect their mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layers(pub u32);

impl Layers {
    pub const NONE: Layers = Layers(0);
    pub const DEFAULT: Layers = Layers(1);
    pub const CURSOR: Layers = Layers(1 << 1);
    pub const ALL: Layers = Layers(u32::MAX);

    pub fn intersects(self, other: Layers) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: Layers) -> Layers {
        Layers(self.0 | other.0)
    }
}

impl Default for Layers {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What a node is for. Only [`Role::Content`] nodes take part in picking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    Content,
    Background,
    Particles,
    Cursor,
    Overlay,
    Effect,
}

impl Role {
    pub fn is_pickable(self) -> bool {
        matches!(self, Role::Content)
    }
}

/// Script-facing node name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name(pub String);

/// Whether the node is drawn and pickable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visible(pub bool);

/// Draw order among quads; higher draws later.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderOrder(pub i32);

/// Textured quad of `size` world units centered on the node.
#[derive(Clone, Debug)]
pub struct Sprite {
    pub texture: Arc<Texture>,
    pub size: Vec2,
    pub tint: Color,
}

/// Opaque geometry. Without a model it renders as a box matching the collider.
#[derive(Clone, Debug)]
pub struct Solid {
    pub model: Option<Arc<Model>>,
    pub collider: Collider,
    pub color: Color,
}

/// Procedural ring on a unit quad. `thickness` is a fraction of the radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ring {
    pub color: Color,
    pub thickness: f32,
    pub opacity: f32,
}

/// Soft glowing disc on a unit quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glow {
    pub color: Color,
    pub intensity: f32,
}

/// Flat-color fade material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FadeMaterial {
    pub color: Color,
    pub opacity: f32,
}

/// Glitch material: distorts a captured frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlitchMaterial {
    /// Seconds since the transition started.
    pub time: f32,
    /// Eased effect strength, 0 to 1.
    pub intensity: f32,
    /// Captured frame sampled by the shader.
    pub source: Option<CaptureId>,
}

/// Material bound to the transition overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverlayMaterial {
    Fade(FadeMaterial),
    Glitch(GlitchMaterial),
}

/// Full-frustum quad drawn on top of everything but the cursor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayQuad {
    pub size: Vec2,
    pub material: OverlayMaterial,
}

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a scene graph. Entity handles are only meaningful in the
/// graph they were spawned in, and hecs reuses entity ids across worlds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A scene's node graph.
pub struct SceneGraph {
    id: GraphId,
    world: World,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self {
            id: GraphId::next(),
            world: World::new(),
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Start building a named node.
    pub fn node(&mut self, name: impl Into<String>) -> NodeBuilder<'_> {
        NodeBuilder::new(self, Some(name.into()))
    }

    /// Start building an anonymous node.
    pub fn anonymous(&mut self) -> NodeBuilder<'_> {
        NodeBuilder::new(self, None)
    }

    /// Remove a node. Returns `false` if it was already gone.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.world.despawn(entity).is_ok()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    pub fn len(&self) -> u32 {
        self.world.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// First node with the given name.
    pub fn find(&self, name: &str) -> Option<Entity> {
        self.world
            .query::<&Name>()
            .iter()
            .find(|(_, n)| n.0 == name)
            .map(|(entity, _)| entity)
    }

    pub fn name(&self, entity: Entity) -> Option<String> {
        self.world.get::<&Name>(entity).ok().map(|n| n.0.clone())
    }

    pub fn role(&self, entity: Entity) -> Option<Role> {
        self.world.get::<&Role>(entity).ok().map(|r| *r)
    }

    pub fn is_visible(&self, entity: Entity) -> bool {
        self.world
            .get::<&Visible>(entity)
            .map(|v| v.0)
            .unwrap_or(false)
    }

    pub fn set_visible(&mut self, entity: Entity, visible: bool) {
        if let Ok(mut v) = self.world.get::<&mut Visible>(entity) {
            v.0 = visible;
        }
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) {
        if let Ok(mut t) = self.world.get::<&mut Transform>(entity) {
            *t = transform;
        }
    }

    pub fn sprite_texture(&self, entity: Entity) -> Option<Arc<Texture>> {
        self.world
            .get::<&Sprite>(entity)
            .ok()
            .map(|s| Arc::clone(&s.texture))
    }

    pub fn is_solid(&self, entity: Entity) -> bool {
        self.world.satisfies::<&Solid>(entity).unwrap_or(false)
    }
}

/// Fluent builder for scene graph nodes.
pub struct NodeBuilder<'a> {
    graph: &'a mut SceneGraph,
    builder: EntityBuilder,
    transform: Transform,
    role: Role,
    layers: Layers,
    visible: bool,
    order: RenderOrder,
}

impl<'a> NodeBuilder<'a> {
    fn new(graph: &'a mut SceneGraph, name: Option<String>) -> Self {
        let mut builder = EntityBuilder::new();
        if let Some(name) = name {
            builder.add(Name(name));
        }
        Self {
            graph,
            builder,
            transform: Transform::new(),
            role: Role::Content,
            layers: Layers::DEFAULT,
            visible: true,
            order: RenderOrder::default(),
        }
    }

    pub fn sprite(mut self, texture: Arc<Texture>, size: Vec2) -> Self {
        self.builder.add(Sprite {
            texture,
            size,
            tint: Color::WHITE,
        });
        self
    }

    /// Sprite sized from the texture's pixel dimensions at `pixels_per_unit`.
    pub fn sprite_native(self, texture: Arc<Texture>, pixels_per_unit: f32) -> Self {
        let size = Vec2::new(texture.width() as f32, texture.height() as f32) / pixels_per_unit;
        self.sprite(texture, size)
    }

    pub fn solid_box(mut self, size: Vec3, color: Color) -> Self {
        self.builder.add(Solid {
            model: None,
            collider: Collider::box_collider(size),
            color,
        });
        self
    }

    /// Model geometry with a box collider fitted to its bounds.
    pub fn model(mut self, model: Arc<Model>, color: Color) -> Self {
        let (min, max) = model.bounds();
        let collider = Collider::box_collider(max - min);
        self.builder.add(Solid {
            model: Some(model),
            collider,
            color,
        });
        self
    }

    pub fn ring(mut self, ring: Ring) -> Self {
        self.builder.add(ring);
        self
    }

    pub fn glow(mut self, glow: Glow) -> Self {
        self.builder.add(glow);
        self
    }

    pub fn overlay(mut self, overlay: OverlayQuad) -> Self {
        self.builder.add(overlay);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = RenderOrder(order);
        self
    }

    pub fn spawn(mut self) -> Entity {
        self.builder.add(self.transform);
        self.builder.add(self.role);
        self.builder.add(self.layers);
        self.builder.add(Visible(self.visible));
        self.builder.add(self.order);
        self.graph.world.spawn(self.builder.build())
    }
}
