//! Pointer and keyboard dispatch.
//!
//! Turns window-space pointer events into alpha-tested raycasts against the
//! current scene, forwards hits to the scene, drives the custom cursor's
//! hover state and spawns click rings.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use glam::{Vec2, Vec3};
use hecs::Entity;
use winit::keyboard::KeyCode;

use crate::alpha::AlphaTester;
use crate::color::Color;
use crate::cursor::CursorIndicator;
use crate::debug::DebugOverlay;
use crate::easing::Easing;
use crate::graph::{GraphId, Layers, Ring, Role, SceneGraph};
use crate::mesh::Transform;
use crate::picking::{Intersection, PickFilter, Ray, raycast};
use crate::render::Viewport;
use crate::scene::{SceneContext, SceneId, SceneRegistry};

/// Click rings are drawn this far past the near plane.
const RING_DEPTH: f32 = 0.2;

/// Dispatcher settings.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchConfig {
    /// Sound played on every click, hit or miss.
    pub click_sound: Option<String>,
    pub click_volume: f32,
    pub debug_key: KeyCode,
    pub ring_duration: Duration,
    /// Final ring diameter as a fraction of the visible height.
    pub ring_size: f32,
    pub ring_color: Color,
    pub alpha_threshold: f32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            click_sound: Some("ui-click".to_string()),
            click_volume: 0.6,
            debug_key: KeyCode::Backquote,
            ring_duration: Duration::from_millis(450),
            ring_size: 0.08,
            ring_color: Color::WHITE,
            alpha_threshold: crate::alpha::DEFAULT_ALPHA_THRESHOLD,
        }
    }
}

/// Expanding, fading ring left where the user clicked.
#[derive(Clone, Debug, PartialEq)]
pub struct ClickRing {
    pub scene: SceneId,
    pub entity: Entity,
    pub elapsed: f32,
    pub duration: f32,
    pub start_scale: f32,
    pub end_scale: f32,
    pub start_opacity: f32,
    pub end_opacity: f32,
    pub easing: Easing,
    graph: GraphId,
    base: Transform,
}

impl ClickRing {
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    pub fn scale(&self) -> f32 {
        self.easing
            .lerp(self.start_scale, self.end_scale, self.progress())
    }

    pub fn opacity(&self) -> f32 {
        self.easing
            .lerp(self.start_opacity, self.end_opacity, self.progress())
    }

    /// Push the current scale and opacity to the ring node.
    fn apply(&self, graph: &mut SceneGraph) {
        let transform = Transform {
            scale: self.base.scale * self.scale(),
            ..self.base
        };
        graph.set_transform(self.entity, transform);
        if let Ok(mut ring) = graph.world_mut().get::<&mut Ring>(self.entity) {
            ring.opacity = self.opacity();
        }
    }
}

type MoveObserver = Box<dyn FnMut(Vec2)>;

/// Routes pointer and key events to the current scene.
pub struct InputDispatcher {
    config: DispatchConfig,
    alpha: AlphaTester,
    cursor: Rc<RefCell<CursorIndicator>>,
    debug: DebugOverlay,
    rings: Vec<ClickRing>,
    move_observers: Vec<MoveObserver>,
    pointer: Vec2,
    hovering: bool,
    disposed: bool,
}

/// Window pixel position to normalized device coordinates, y up.
pub fn to_ndc(position: Vec2, viewport: Viewport) -> Vec2 {
    let width = viewport.width.max(1) as f32;
    let height = viewport.height.max(1) as f32;
    Vec2::new(position.x / width * 2.0 - 1.0, 1.0 - position.y / height * 2.0)
}

impl InputDispatcher {
    pub fn new(config: DispatchConfig, cursor: Rc<RefCell<CursorIndicator>>) -> Self {
        Self {
            alpha: AlphaTester::new(config.alpha_threshold),
            config,
            cursor,
            debug: DebugOverlay::new(),
            rings: Vec::new(),
            move_observers: Vec::new(),
            pointer: Vec2::ZERO,
            hovering: false,
            disposed: false,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    /// Last pointer position in normalized device coordinates.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn rings(&self) -> &[ClickRing] {
        &self.rings
    }

    pub fn debug(&self) -> &DebugOverlay {
        &self.debug
    }

    pub fn debug_mut(&mut self) -> &mut DebugOverlay {
        &mut self.debug
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Called with the pointer's NDC on every move.
    pub fn add_move_observer(&mut self, observer: impl FnMut(Vec2) + 'static) {
        self.move_observers.push(Box::new(observer));
    }

    fn pick(
        &mut self,
        graph: &SceneGraph,
        ctx: &SceneContext,
        ndc: Vec2,
        filter: PickFilter,
    ) -> Vec<Intersection> {
        let ray = Ray::from_ndc(ndc, &*ctx.camera, ctx.viewport.aspect());
        let hits = raycast(graph, &ray, filter);
        self.alpha.filter(graph, hits)
    }

    /// Pointer moved to `position` in window pixels.
    pub fn on_pointer_move(
        &mut self,
        position: Vec2,
        registry: &mut SceneRegistry,
        ctx: &mut SceneContext,
    ) {
        if self.disposed {
            return;
        }
        let ndc = to_ndc(position, ctx.viewport);
        self.pointer = ndc;
        for observer in &mut self.move_observers {
            observer(ndc);
        }

        let Some(scene) = registry.current_scene_mut() else {
            return;
        };
        let (graph, behavior) = scene.parts_mut();

        let hits = self.pick(graph, ctx, ndc, PickFilter::HOVER);
        self.hovering = !hits.is_empty();

        {
            let mut cursor = self.cursor.borrow_mut();
            cursor.set_hover(graph, self.hovering);
            cursor.move_to(graph, ctx.camera, ctx.viewport, ndc);
        }

        behavior.on_pointer_move(graph, ctx, &hits);
    }

    /// Primary button pressed at `position` in window pixels.
    ///
    /// Returns the hits forwarded to the scene, empty on a miss.
    pub fn on_click(
        &mut self,
        position: Vec2,
        registry: &mut SceneRegistry,
        ctx: &mut SceneContext,
    ) -> Vec<Intersection> {
        if self.disposed {
            return Vec::new();
        }
        if let Some(name) = &self.config.click_sound {
            if let Err(err) = ctx.sounds.play_sound(name, self.config.click_volume) {
                log::warn!("click sound: {}", err);
            }
        }

        let ndc = to_ndc(position, ctx.viewport);
        self.pointer = ndc;

        let Some(scene) = registry.current_scene_mut() else {
            log::warn!("click with no active scene");
            return Vec::new();
        };
        let id = scene.id().clone();
        let (graph, behavior) = scene.parts_mut();

        let hits = self.pick(graph, ctx, ndc, PickFilter::CLICK);
        if hits.is_empty() {
            return hits;
        }

        log::debug!("click on '{}': {} hit(s)", id, hits.len());
        behavior.on_click(graph, ctx, &hits);
        self.spawn_ring(id, graph, ctx, ndc);
        hits
    }

    fn spawn_ring(&mut self, scene: SceneId, graph: &mut SceneGraph, ctx: &SceneContext, ndc: Vec2) {
        let camera = &*ctx.camera;
        let distance = camera.near() + RING_DEPTH;
        let aspect = ctx.viewport.aspect();
        let diameter = camera.frustum_size(distance, aspect).y * self.config.ring_size;
        let base = Transform::new()
            .position(camera.point_at_ndc(ndc, distance, aspect))
            .rotation(camera.billboard_rotation())
            .scale(Vec3::splat(diameter));

        let entity = graph
            .node("click-ring")
            .ring(Ring {
                color: self.config.ring_color,
                thickness: 0.12,
                opacity: 1.0,
            })
            .transform(base)
            .role(Role::Effect)
            .layers(Layers::DEFAULT)
            .spawn();

        let ring = ClickRing {
            scene,
            entity,
            elapsed: 0.0,
            duration: self.config.ring_duration.as_secs_f32(),
            start_scale: 0.2,
            end_scale: 1.0,
            start_opacity: 1.0,
            end_opacity: 0.0,
            easing: Easing::EaseOutCubic,
            graph: graph.id(),
            base,
        };
        ring.apply(graph);
        self.rings.push(ring);
    }

    /// Handle a key press. The debug key toggles the debug overlay; digits
    /// reach the overlay while it's open. Everything else is ignored here.
    pub fn on_key_down(&mut self, key: KeyCode) -> bool {
        if self.disposed || key != self.config.debug_key {
            return false;
        }
        self.debug.toggle();
        true
    }

    /// Advance click rings, despawning finished ones.
    pub fn update(&mut self, dt: f32, registry: &mut SceneRegistry) {
        self.rings.retain_mut(|ring| {
            ring.elapsed += dt;
            let Some(scene) = registry.scene_mut(ring.scene.as_str()) else {
                return false;
            };
            let graph = scene.graph_mut();
            if graph.id() != ring.graph {
                // The scene was replaced; the ring went with its old graph.
                return false;
            }
            if ring.progress() >= 1.0 {
                graph.despawn(ring.entity);
                false
            } else {
                ring.apply(graph);
                true
            }
        });
    }

    /// Stop handling events and clean up everything this dispatcher spawned.
    ///
    /// Returns `true`: the OS cursor should be shown again.
    pub fn dispose(&mut self, registry: &mut SceneRegistry) -> bool {
        self.move_observers.clear();
        for ring in self.rings.drain(..) {
            if let Some(scene) = registry.scene_mut(ring.scene.as_str()) {
                let graph = scene.graph_mut();
                if graph.id() == ring.graph {
                    graph.despawn(ring.entity);
                }
            }
        }

        let mut cursor = self.cursor.borrow_mut();
        if let Some(owner) = cursor.attached_to().cloned() {
            if let Some(scene) = registry.scene_mut(owner.as_str()) {
                cursor.disable(&owner, scene.graph_mut());
            }
        }

        self.hovering = false;
        self.debug.hide();
        self.disposed = true;
        log::debug!("input dispatcher disposed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetProvider;
    use crate::camera::Camera;
    use crate::scene::{Scene, SceneObserver};
    use crate::sound::{SoundError, Sounds};
    use crate::texture::Texture;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recording(Vec<String>);

    impl Sounds for Recording {
        fn load_sound(&mut self, _: &str, _: &std::path::Path, _: bool) -> Result<(), SoundError> {
            Ok(())
        }

        fn play_sound(&mut self, name: &str, _volume: f32) -> Result<(), SoundError> {
            self.0.push(name.to_string());
            Ok(())
        }

        fn play_background(&mut self, _name: &str, _volume: f32) -> Result<(), SoundError> {
            Ok(())
        }

        fn stop_all_background(&mut self) {}
    }

    /// Left half transparent, right half opaque.
    fn half_transparent() -> Arc<Texture> {
        let mut data = Vec::new();
        for _y in 0..4 {
            for x in 0..4 {
                let alpha = if x < 2 { 0 } else { 255 };
                data.extend_from_slice(&[255, 255, 255, alpha]);
            }
        }
        Arc::new(Texture::from_rgba("half", 4, 4, data).unwrap())
    }

    struct Fixture {
        registry: SceneRegistry,
        dispatcher: InputDispatcher,
        cursor: Rc<RefCell<CursorIndicator>>,
        clicks: Rc<RefCell<Vec<usize>>>,
        camera: Camera,
        sounds: Recording,
        assets: AssetProvider,
    }

    impl Fixture {
        fn new() -> Self {
            let clicks = Rc::new(RefCell::new(Vec::new()));
            let seen = Rc::clone(&clicks);
            let texture = half_transparent();

            let mut registry = SceneRegistry::new();
            registry.register(
                Scene::builder("hall")
                    .on_init(move |graph, _| {
                        graph
                            .node("door")
                            .sprite(Arc::clone(&texture), Vec2::new(4.0, 4.0))
                            .spawn();
                        Ok(())
                    })
                    .on_click(move |_, _, hits| seen.borrow_mut().push(hits.len()))
                    .build(),
            );

            let cursor = Rc::new(RefCell::new(CursorIndicator::default()));
            registry.add_observer(cursor.clone());
            let dispatcher = InputDispatcher::new(DispatchConfig::default(), Rc::clone(&cursor));

            Self {
                registry,
                dispatcher,
                cursor,
                clicks,
                camera: Camera::new(),
                sounds: Recording::default(),
                assets: AssetProvider::new("."),
            }
        }
    }

    fn with_ctx<R>(
        f: &mut Fixture,
        run: impl FnOnce(&mut InputDispatcher, &mut SceneRegistry, &mut SceneContext) -> R,
    ) -> R {
        let mut ctx = SceneContext::new(
            &mut f.camera,
            &mut f.sounds,
            &mut f.assets,
            Viewport::new(800, 800),
            0.0,
        );
        run(&mut f.dispatcher, &mut f.registry, &mut ctx)
    }

    fn ready() -> Fixture {
        let mut f = Fixture::new();
        with_ctx(&mut f, |_, registry, ctx| {
            registry.activate("hall", ctx);
        });
        f
    }

    // Camera at z=5 looking down -Z; the sprite fills the center of the view.
    const OPAQUE_SIDE: Vec2 = Vec2::new(440.0, 400.0);
    const CLEAR_SIDE: Vec2 = Vec2::new(360.0, 400.0);

    #[test]
    fn ndc_has_y_up() {
        let viewport = Viewport::new(200, 100);
        assert_eq!(to_ndc(Vec2::new(0.0, 0.0), viewport), Vec2::new(-1.0, 1.0));
        assert_eq!(to_ndc(Vec2::new(200.0, 100.0), viewport), Vec2::new(1.0, -1.0));
        assert_eq!(to_ndc(Vec2::new(100.0, 50.0), viewport), Vec2::ZERO);
    }

    #[test]
    fn transparent_pixels_are_not_forwarded() {
        let mut f = ready();
        let hits = with_ctx(&mut f, |d, r, ctx| d.on_click(CLEAR_SIDE, r, ctx));
        assert!(hits.is_empty());
        assert!(f.clicks.borrow().is_empty());
        assert!(f.dispatcher.rings().is_empty());
        // The acknowledgment sound plays on a miss too.
        assert_eq!(f.sounds.0, vec!["ui-click".to_string()]);

        let hits = with_ctx(&mut f, |d, r, ctx| d.on_click(OPAQUE_SIDE, r, ctx));
        assert_eq!(hits.len(), 1);
        assert_eq!(*f.clicks.borrow(), vec![1]);
        assert_eq!(f.dispatcher.rings().len(), 1);
        assert_eq!(f.sounds.0.len(), 2);
    }

    #[test]
    fn rings_are_not_clickable() {
        let mut f = ready();
        with_ctx(&mut f, |d, r, ctx| d.on_click(OPAQUE_SIDE, r, ctx));
        let hits = with_ctx(&mut f, |d, r, ctx| d.on_click(OPAQUE_SIDE, r, ctx));
        assert_eq!(hits.len(), 1);
        let graph = f.registry.scene("hall").unwrap().graph();
        assert_eq!(graph.name(hits[0].entity).as_deref(), Some("door"));
    }

    #[test]
    fn rings_despawn_after_their_duration() {
        let mut f = ready();
        with_ctx(&mut f, |d, r, ctx| d.on_click(OPAQUE_SIDE, r, ctx));
        let entity = f.dispatcher.rings()[0].entity;

        f.dispatcher.update(0.2, &mut f.registry);
        assert_eq!(f.dispatcher.rings().len(), 1);
        let opacity = f.dispatcher.rings()[0].opacity();
        assert!(opacity > 0.0 && opacity < 1.0);

        f.dispatcher.update(0.3, &mut f.registry);
        assert!(f.dispatcher.rings().is_empty());
        assert!(!f.registry.scene("hall").unwrap().graph().contains(entity));
    }

    #[test]
    fn hover_follows_opaque_pixels() {
        let mut f = ready();
        with_ctx(&mut f, |d, r, ctx| d.on_pointer_move(OPAQUE_SIDE, r, ctx));
        assert!(f.dispatcher.is_hovering());
        assert!(f.cursor.borrow().is_hovering());

        with_ctx(&mut f, |d, r, ctx| d.on_pointer_move(CLEAR_SIDE, r, ctx));
        assert!(!f.dispatcher.is_hovering());
        assert!(!f.cursor.borrow().is_hovering());
    }

    #[test]
    fn move_observers_get_ndc() {
        let mut f = ready();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        f.dispatcher.add_move_observer(move |ndc| sink.borrow_mut().push(ndc));
        with_ctx(&mut f, |d, r, ctx| d.on_pointer_move(Vec2::new(400.0, 400.0), r, ctx));
        assert_eq!(*seen.borrow(), vec![Vec2::ZERO]);
    }

    #[test]
    fn only_the_debug_key_is_handled() {
        let mut f = ready();
        assert!(!f.dispatcher.on_key_down(KeyCode::KeyA));
        assert!(f.dispatcher.on_key_down(KeyCode::Backquote));
        assert!(f.dispatcher.debug().is_visible());
        assert!(f.dispatcher.on_key_down(KeyCode::Backquote));
        assert!(!f.dispatcher.debug().is_visible());
    }

    #[test]
    fn dispose_cleans_up() {
        let mut f = ready();
        with_ctx(&mut f, |d, r, ctx| d.on_click(OPAQUE_SIDE, r, ctx));
        assert!(f.registry.scene("hall").unwrap().graph().find("cursor").is_some());

        assert!(f.dispatcher.dispose(&mut f.registry));
        let graph = f.registry.scene("hall").unwrap().graph();
        assert!(graph.find("cursor").is_none());
        assert!(graph.find("click-ring").is_none());
        assert!(f.dispatcher.rings().is_empty());

        let hits = with_ctx(&mut f, |d, r, ctx| d.on_click(OPAQUE_SIDE, r, ctx));
        assert!(hits.is_empty());

        // Later scene changes don't bring the cursor back.
        let mut observer = f.cursor.borrow_mut();
        let scene = f.registry.scene_mut("hall").unwrap();
        let id = scene.id().clone();
        observer.scene_changed(&id, scene.graph_mut()).unwrap();
        assert!(scene.graph().find("cursor").is_none());
    }
}
