//! The transition overlay.
//!
//! A single full-view quad with one fade material and one glitch material.
//! Exactly one material is bound at a time. The quad is spawned into a scene
//! graph only while a transition runs, and despawned afterwards.

use glam::Vec2;
use hecs::Entity;

use super::scene::SceneId;
use crate::camera::Camera;
use crate::color::Color;
use crate::graph::{
    FadeMaterial, GlitchMaterial, GraphId, Layers, OverlayMaterial, OverlayQuad, Role, SceneGraph,
};
use crate::mesh::Transform;
use crate::render::{CaptureId, Viewport};

/// Overlay quads are drawn this far past the near plane.
const NEAR_OFFSET: f32 = 0.05;
/// Overlay covers a little more than the frustum so edges never show.
const OVERSCAN: f32 = 1.02;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundMaterial {
    Fade,
    Glitch,
}

/// Where the spawned quad lives.
#[derive(Debug)]
struct Attachment {
    scene: SceneId,
    graph: GraphId,
    entity: Entity,
}

/// Long-lived overlay state shared by every transition.
#[derive(Debug)]
pub struct TransitionOverlay {
    fade: FadeMaterial,
    glitch: GlitchMaterial,
    bound: BoundMaterial,
    size: Vec2,
    transform: Transform,
    attached: Option<Attachment>,
}

impl TransitionOverlay {
    pub fn new(camera: &Camera, viewport: Viewport) -> Self {
        let mut overlay = Self {
            fade: FadeMaterial {
                color: Color::BLACK,
                opacity: 0.0,
            },
            glitch: GlitchMaterial {
                time: 0.0,
                intensity: 0.0,
                source: None,
            },
            bound: BoundMaterial::Fade,
            size: Vec2::ONE,
            transform: Transform::new(),
            attached: None,
        };
        overlay.fit(camera, viewport);
        overlay
    }

    pub fn material(&self) -> OverlayMaterial {
        match self.bound {
            BoundMaterial::Fade => OverlayMaterial::Fade(self.fade),
            BoundMaterial::Glitch => OverlayMaterial::Glitch(self.glitch),
        }
    }

    pub fn bound(&self) -> BoundMaterial {
        self.bound
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Scene whose graph currently holds the overlay quad.
    pub fn attached_to(&self) -> Option<&SceneId> {
        self.attached.as_ref().map(|a| &a.scene)
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// The quad's entity, if it lives in `graph`.
    fn entity_in(&self, graph: &SceneGraph) -> Option<Entity> {
        self.attached
            .as_ref()
            .filter(|a| a.graph == graph.id())
            .map(|a| a.entity)
    }

    /// Size and place the quad to cover the camera's view.
    pub fn fit(&mut self, camera: &Camera, viewport: Viewport) {
        let distance = camera.near() + NEAR_OFFSET;
        self.size = camera.frustum_size(distance, viewport.aspect()) * OVERSCAN;
        self.transform = Transform::new()
            .position(camera.position + camera.forward * distance)
            .rotation(camera.billboard_rotation());
    }

    /// Spawn the quad into `graph`. Does nothing if it's already attached somewhere.
    pub fn attach(&mut self, scene: &SceneId, graph: &mut SceneGraph) {
        if self.attached.is_some() {
            return;
        }
        let entity = graph
            .node("transition-overlay")
            .overlay(OverlayQuad {
                size: self.size,
                material: self.material(),
            })
            .transform(self.transform)
            .role(Role::Overlay)
            .layers(Layers::ALL)
            .spawn();
        self.attached = Some(Attachment {
            scene: scene.clone(),
            graph: graph.id(),
            entity,
        });
    }

    /// Despawn the quad from `graph` if it lives there.
    ///
    /// If `scene` owns the quad but `graph` is a replacement graph, the quad
    /// is forgotten without touching `graph`.
    pub fn detach(&mut self, scene: &SceneId, graph: &mut SceneGraph) {
        let Some(attachment) = &self.attached else {
            return;
        };
        if &attachment.scene != scene {
            return;
        }
        if attachment.graph == graph.id() {
            graph.despawn(attachment.entity);
        }
        self.attached = None;
    }

    /// Forget the quad without despawning it, for when its graph is gone.
    pub fn forget(&mut self) {
        self.attached = None;
    }

    pub fn set_visible(&self, graph: &mut SceneGraph, visible: bool) {
        if let Some(entity) = self.entity_in(graph) {
            graph.set_visible(entity, visible);
        }
    }

    /// Bind the fade material with a new color and opacity.
    pub fn set_fade(&mut self, graph: &mut SceneGraph, color: Color, opacity: f32) {
        self.bound = BoundMaterial::Fade;
        self.fade = FadeMaterial { color, opacity };
        self.sync(graph);
    }

    /// Bind the glitch material sampling `source`.
    pub fn set_glitch(
        &mut self,
        graph: &mut SceneGraph,
        source: CaptureId,
        time: f32,
        intensity: f32,
    ) {
        self.bound = BoundMaterial::Glitch;
        self.glitch = GlitchMaterial {
            time,
            intensity,
            source: Some(source),
        };
        self.sync(graph);
    }

    /// Return to the idle state: fade material bound, fully transparent.
    pub fn reset(&mut self) {
        self.bound = BoundMaterial::Fade;
        self.fade.opacity = 0.0;
        self.glitch = GlitchMaterial {
            time: 0.0,
            intensity: 0.0,
            source: None,
        };
    }

    /// Push the bound material, size and placement to the spawned quad.
    /// Graphs that don't hold the quad are left alone.
    pub fn sync(&self, graph: &mut SceneGraph) {
        let Some(entity) = self.entity_in(graph) else {
            return;
        };
        if let Ok(mut quad) = graph.world_mut().get::<&mut OverlayQuad>(entity) {
            quad.size = self.size;
            quad.material = self.material();
        }
        graph.set_transform(entity, self.transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_covers_the_frustum() {
        let camera = Camera::new();
        let viewport = Viewport::new(1600, 900);
        let overlay = TransitionOverlay::new(&camera, viewport);
        let distance = camera.near() + NEAR_OFFSET;
        let frustum = camera.frustum_size(distance, viewport.aspect());
        assert!(overlay.size().x >= frustum.x);
        assert!(overlay.size().y >= frustum.y);
    }

    #[test]
    fn attach_and_detach_follow_the_owner() {
        let camera = Camera::new();
        let mut overlay = TransitionOverlay::new(&camera, Viewport::new(800, 600));
        let hall = SceneId::new("hall");
        let gallery = SceneId::new("gallery");
        let mut graph = SceneGraph::new();

        overlay.attach(&hall, &mut graph);
        assert_eq!(overlay.attached_to(), Some(&hall));
        assert_eq!(graph.len(), 1);

        overlay.detach(&gallery, &mut graph);
        assert!(overlay.is_attached());

        overlay.detach(&hall, &mut graph);
        assert!(!overlay.is_attached());
        assert!(graph.is_empty());
    }

    #[test]
    fn other_graphs_are_never_written() {
        let camera = Camera::new();
        let mut overlay = TransitionOverlay::new(&camera, Viewport::new(800, 600));
        let hall = SceneId::new("hall");
        let mut hall_graph = SceneGraph::new();
        let mut other = SceneGraph::new();
        let door = other.node("door").at(glam::Vec3::new(1.0, 2.0, 0.0)).spawn();

        overlay.attach(&hall, &mut hall_graph);
        overlay.set_fade(&mut other, Color::BLACK, 1.0);
        overlay.set_visible(&mut other, false);
        assert_eq!(
            other.transform(door).map(|t| t.position),
            Some(glam::Vec3::new(1.0, 2.0, 0.0))
        );
        assert!(other.is_visible(door));

        // Same owner name, replacement graph: forgotten, not despawned.
        overlay.detach(&hall, &mut other);
        assert!(!overlay.is_attached());
        assert!(other.contains(door));
        assert_eq!(hall_graph.len(), 1);
    }

    #[test]
    fn materials_sync_to_the_quad() {
        let camera = Camera::new();
        let mut overlay = TransitionOverlay::new(&camera, Viewport::new(800, 600));
        let scene = SceneId::new("hall");
        let mut graph = SceneGraph::new();
        overlay.attach(&scene, &mut graph);

        overlay.set_fade(&mut graph, Color::WHITE, 0.5);
        let entity = graph.find("transition-overlay").unwrap();
        let material = graph.world().get::<&OverlayQuad>(entity).unwrap().material;
        assert_eq!(
            material,
            OverlayMaterial::Fade(FadeMaterial {
                color: Color::WHITE,
                opacity: 0.5
            })
        );

        overlay.set_glitch(&mut graph, CaptureId(3), 0.2, 0.7);
        assert_eq!(overlay.bound(), BoundMaterial::Glitch);

        overlay.reset();
        assert_eq!(overlay.bound(), BoundMaterial::Fade);
        assert_eq!(
            overlay.material(),
            OverlayMaterial::Fade(FadeMaterial {
                color: Color::WHITE,
                opacity: 0.0
            })
        );
    }
}
