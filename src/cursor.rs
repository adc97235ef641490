//! The custom cursor.
//!
//! A glowing disc that follows the pointer on its own render layer, so hover
//! raycasts never hit it. It changes color while the pointer is over
//! something interactive. The registry tells it when scenes change, and it
//! moves itself into the new scene's graph.

use glam::{Vec2, Vec3};
use hecs::Entity;

use crate::camera::Camera;
use crate::color::Color;
use crate::graph::{Glow, GraphId, Layers, Role, SceneGraph};
use crate::mesh::Transform;
use crate::render::Viewport;
use crate::scene::{SceneError, SceneId, SceneObserver};

/// Distance past the near plane the cursor is drawn at.
const CURSOR_DEPTH: f32 = 0.1;

/// Pointer indicator that survives scene switches.
#[derive(Debug)]
pub struct CursorIndicator {
    attached: Option<(SceneId, GraphId, Entity)>,
    hovering: bool,
    /// Diameter as a fraction of the visible height.
    size: f32,
    transform: Transform,
    enabled: bool,
}

impl Default for CursorIndicator {
    fn default() -> Self {
        Self::new(0.035)
    }
}

impl CursorIndicator {
    pub fn new(size: f32) -> Self {
        Self {
            attached: None,
            hovering: false,
            size,
            transform: Transform::new(),
            enabled: true,
        }
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    pub fn attached_to(&self) -> Option<&SceneId> {
        self.attached.as_ref().map(|(scene, _, _)| scene)
    }

    pub fn entity(&self) -> Option<Entity> {
        self.attached.as_ref().map(|(_, _, entity)| *entity)
    }

    /// The cursor's entity, if it lives in `graph`.
    fn entity_in(&self, graph: &SceneGraph) -> Option<Entity> {
        self.attached
            .as_ref()
            .filter(|(_, owner, _)| *owner == graph.id())
            .map(|(_, _, entity)| *entity)
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    fn glow(&self) -> Glow {
        if self.hovering {
            Glow {
                color: Color::CURSOR_HOVER,
                intensity: 1.0,
            }
        } else {
            Glow {
                color: Color::CURSOR_IDLE,
                intensity: 0.6,
            }
        }
    }

    /// Spawn the cursor into `graph`, leaving any previous graph behind.
    pub fn attach(&mut self, scene: &SceneId, graph: &mut SceneGraph) {
        if !self.enabled {
            return;
        }
        let entity = graph
            .node("cursor")
            .glow(self.glow())
            .transform(self.transform)
            .role(Role::Cursor)
            .layers(Layers::CURSOR)
            .spawn();
        self.attached = Some((scene.clone(), graph.id(), entity));
    }

    /// Despawn the cursor from `graph` if it lives there. A replaced graph
    /// for the same scene just drops the handle.
    pub fn detach(&mut self, scene: &SceneId, graph: &mut SceneGraph) {
        let Some((owner, _, _)) = &self.attached else {
            return;
        };
        if owner != scene {
            return;
        }
        if let Some(entity) = self.entity_in(graph) {
            graph.despawn(entity);
        }
        self.attached = None;
    }

    /// Detach for good. Later scene changes won't bring the cursor back.
    pub fn disable(&mut self, scene: &SceneId, graph: &mut SceneGraph) {
        self.detach(scene, graph);
        self.enabled = false;
    }

    pub fn set_hover(&mut self, graph: &mut SceneGraph, hovering: bool) {
        if self.hovering == hovering {
            return;
        }
        self.hovering = hovering;
        let glow = self.glow();
        if let Some(entity) = self.entity_in(graph) {
            if let Ok(mut current) = graph.world_mut().get::<&mut Glow>(entity) {
                *current = glow;
            }
        }
    }

    /// Place the cursor under the pointer at `ndc`.
    pub fn move_to(&mut self, graph: &mut SceneGraph, camera: &Camera, viewport: Viewport, ndc: Vec2) {
        let distance = camera.near() + CURSOR_DEPTH;
        let aspect = viewport.aspect();
        let diameter = camera.frustum_size(distance, aspect).y * self.size;
        self.transform = Transform::new()
            .position(camera.point_at_ndc(ndc, distance, aspect))
            .rotation(camera.billboard_rotation())
            .scale(Vec3::splat(diameter));
        if let Some(entity) = self.entity_in(graph) {
            graph.set_transform(entity, self.transform);
        }
    }
}

impl SceneObserver for CursorIndicator {
    fn scene_exiting(&mut self, scene: &SceneId, graph: &mut SceneGraph) -> Result<(), SceneError> {
        self.detach(scene, graph);
        Ok(())
    }

    fn scene_changed(&mut self, scene: &SceneId, graph: &mut SceneGraph) -> Result<(), SceneError> {
        // The previous graph may already be gone.
        self.attached = None;
        self.attach(scene, graph);
        Ok(())
    }
}
