//! Scene registry and transition engine.
//!
//! The registry owns every scene, tracks which one is current, and runs at
//! most one transition at a time. A transition moves through
//! `TransitioningOut → Switching → TransitioningIn → Idle`, advanced once per
//! tick by [`SceneRegistry::update`].
//!
//! # Lifecycle ordering
//!
//! On activation: the outgoing scene's `on_exit`, exit observers, the swap,
//! `init` (first activation only), scene-changed observers, then the incoming
//! scene's `on_enter`. Hook and observer errors are logged and never stop an
//! activation.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::overlay::TransitionOverlay;
use super::scene::{Scene, SceneContext, SceneError, SceneId};
use super::transition::{
    ActiveTransition, Transition, TransitionKind, TransitionOutcome, TransitionRequest,
    TransitionState,
};
use crate::camera::Camera;
use crate::graph::SceneGraph;
use crate::render::{RenderError, Renderer, Viewport};

/// Notified around scene switches.
#[allow(unused_variables)]
pub trait SceneObserver {
    /// The current scene is about to be replaced. Runs after its `on_exit`.
    fn scene_exiting(&mut self, scene: &SceneId, graph: &mut SceneGraph) -> Result<(), SceneError> {
        Ok(())
    }

    /// A new scene became current. Runs after `init`, before `on_enter`.
    fn scene_changed(&mut self, scene: &SceneId, graph: &mut SceneGraph) -> Result<(), SceneError> {
        Ok(())
    }

    /// A transition ended, successfully or not.
    fn transition_finished(&mut self, target: &SceneId, outcome: &TransitionOutcome) {}
}

/// Shared handle to an observer.
pub type ObserverHandle = Rc<RefCell<dyn SceneObserver>>;

/// Run `f` on every observer, logging failures and carrying on.
fn notify<F>(observers: &[ObserverHandle], what: &str, mut f: F)
where
    F: FnMut(&mut dyn SceneObserver) -> Result<(), SceneError>,
{
    for observer in observers {
        match observer.try_borrow_mut() {
            Ok(mut observer) => {
                if let Err(err) = f(&mut *observer) {
                    log::error!("{} observer failed: {}", what, err);
                }
            }
            Err(_) => log::warn!("{} observer is busy, skipped", what),
        }
    }
}

/// Name → scene map with the current scene and the transition engine.
pub struct SceneRegistry {
    scenes: HashMap<SceneId, Scene>,
    order: Vec<SceneId>,
    initialized: HashSet<SceneId>,
    current: Option<SceneId>,
    pending: Option<SceneId>,
    active: Option<ActiveTransition>,
    overlay: Option<TransitionOverlay>,
    observers: Vec<ObserverHandle>,
}

impl Default for SceneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self {
            scenes: HashMap::new(),
            order: Vec::new(),
            initialized: HashSet::new(),
            current: None,
            pending: None,
            active: None,
            overlay: None,
            observers: Vec::new(),
        }
    }

    /// Set up the transition overlay. Until this is called, every transition
    /// switches instantly.
    pub fn init_transitions(&mut self, camera: &Camera, viewport: Viewport) {
        self.overlay = Some(TransitionOverlay::new(camera, viewport));
        log::debug!("transition overlay ready");
    }

    pub fn has_transitions(&self) -> bool {
        self.overlay.is_some()
    }

    /// Register a scene under its id. Replacing a scene logs a warning and
    /// resets its initialized flag.
    pub fn register(&mut self, scene: Scene) {
        let id = scene.id.clone();
        if let Some(old) = self.scenes.insert(id.clone(), scene) {
            log::warn!("scene '{}' registered twice, replacing", id);
            self.initialized.remove(&id);
            if let Some(overlay) = &mut self.overlay {
                if overlay.attached_to() == Some(&old.id) {
                    overlay.forget();
                }
            }
        } else {
            log::debug!("registered scene '{}'", id);
            self.order.push(id);
        }
    }

    pub fn add_observer(&mut self, observer: ObserverHandle) {
        self.observers.push(observer);
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scenes.contains_key(&SceneId::from(name))
    }

    /// Scene names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &SceneId> {
        self.order.iter()
    }

    /// The first registered scene.
    pub fn default_scene(&self) -> Option<&SceneId> {
        self.order.first()
    }

    pub fn current(&self) -> Option<&SceneId> {
        self.current.as_ref()
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current.as_ref().and_then(|id| self.scenes.get(id))
    }

    pub fn current_scene_mut(&mut self) -> Option<&mut Scene> {
        self.current.as_ref().and_then(|id| self.scenes.get_mut(id))
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(&SceneId::from(name))
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(&SceneId::from(name))
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.initialized.contains(&SceneId::from(name))
    }

    pub fn is_transitioning(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> TransitionState {
        self.active
            .as_ref()
            .map_or(TransitionState::Idle, |active| active.state)
    }

    /// Target of the transition in flight.
    pub fn pending_target(&self) -> Option<&SceneId> {
        self.pending.as_ref()
    }

    pub fn overlay(&self) -> Option<&TransitionOverlay> {
        self.overlay.as_ref()
    }

    /// Make `name` the current scene right away.
    ///
    /// Unknown names are logged and leave the current scene unchanged.
    pub fn activate(&mut self, name: &str, ctx: &mut SceneContext) -> bool {
        let id = SceneId::from(name);
        if !self.scenes.contains_key(&id) {
            log::warn!("cannot activate unknown scene '{}'", id);
            return false;
        }

        // A transition overlay covering the outgoing scene follows the switch.
        let mut carry_overlay = false;

        if let Some(outgoing) = self.current.clone() {
            if let Some(scene) = self.scenes.get_mut(&outgoing) {
                let (graph, behavior) = scene.parts_mut();
                if let Err(err) = behavior.on_exit(graph, ctx) {
                    log::error!("scene '{}' on_exit failed: {}", outgoing, err);
                }
                notify(&self.observers, "scene exit", |observer| {
                    observer.scene_exiting(&outgoing, graph)
                });
                if let Some(overlay) = self.overlay.as_mut() {
                    if overlay.attached_to() == Some(&outgoing) {
                        overlay.detach(&outgoing, graph);
                        carry_overlay = true;
                    }
                }
            }
        }

        self.current = Some(id.clone());
        let Some(scene) = self.scenes.get_mut(&id) else {
            return false;
        };
        let (graph, behavior) = scene.parts_mut();

        if self.initialized.insert(id.clone()) {
            log::debug!("initializing scene '{}'", id);
            if let Err(err) = behavior.init(graph, ctx) {
                log::error!("scene '{}' init failed: {}", id, err);
            }
        }

        notify(&self.observers, "scene change", |observer| {
            observer.scene_changed(&id, graph)
        });

        if let Err(err) = behavior.on_enter(graph, ctx) {
            log::error!("scene '{}' on_enter failed: {}", id, err);
        }

        if carry_overlay {
            if let Some(overlay) = self.overlay.as_mut() {
                overlay.attach(&id, graph);
                overlay.sync(graph);
            }
        }

        log::info!("scene '{}' active", id);
        true
    }

    /// Request an animated switch to `name`.
    ///
    /// The transitioning state is set before this returns, so a second request
    /// in the same frame sees it.
    pub fn transition(
        &mut self,
        name: &str,
        transition: Transition,
        ctx: &mut SceneContext,
    ) -> TransitionRequest {
        let id = SceneId::from(name);

        if self.active.is_some() {
            if self.pending.as_ref() == Some(&id) {
                log::debug!("transition to '{}' already in flight", id);
                return TransitionRequest::Duplicate;
            }
            log::warn!(
                "transition to '{}' rejected: '{}' in flight",
                id,
                self.pending.as_ref().map_or("?", SceneId::as_str)
            );
            return TransitionRequest::Rejected;
        }

        if !self.scenes.contains_key(&id) {
            log::warn!("cannot transition to unknown scene '{}'", id);
            return TransitionRequest::UnknownScene;
        }

        let Some(overlay) = self.overlay.as_mut() else {
            log::warn!("transitions not initialized, switching to '{}' instantly", id);
            self.activate(name, ctx);
            return TransitionRequest::Immediate;
        };

        log::debug!("transition to '{}' started ({:?})", id, transition.kind);
        self.pending = Some(id.clone());
        let mut active = ActiveTransition::new(id, transition);

        match self.current.as_ref().and_then(|current| {
            self.scenes
                .get_mut(current)
                .map(|scene| (current, &mut scene.graph))
        }) {
            Some((current, graph)) => {
                overlay.fit(ctx.camera, ctx.viewport);
                overlay.attach(current, graph);
                if let TransitionKind::Fade { color } = transition.kind {
                    overlay.set_fade(graph, color, 0.0);
                }
            }
            // Nothing to cover: go straight to the switch.
            None => active.enter(TransitionState::Switching),
        }

        self.active = Some(active);
        TransitionRequest::Started
    }

    /// Advance the transition in flight by `dt` seconds.
    pub fn update(&mut self, dt: f32, renderer: &mut dyn Renderer, ctx: &mut SceneContext) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if self.step(&mut active, dt, renderer, ctx) {
            self.finish(active, renderer);
        } else {
            self.active = Some(active);
        }
    }

    /// Returns `true` when the transition is over.
    fn step(
        &mut self,
        active: &mut ActiveTransition,
        dt: f32,
        renderer: &mut dyn Renderer,
        ctx: &mut SceneContext,
    ) -> bool {
        match active.state {
            TransitionState::TransitioningOut => {
                let progress = active.advance(dt);
                if let Err(err) = self.apply_effect(active, renderer, ctx.camera) {
                    log::error!("transition to '{}' failed: {}", active.target, err);
                    active.failure = Some(err.to_string());
                    self.switch_scene(active, ctx);
                    return true;
                }
                if progress >= 1.0 {
                    active.enter(TransitionState::Switching);
                }
                false
            }
            TransitionState::Switching => {
                self.switch_scene(active, ctx);
                active.enter(TransitionState::TransitioningIn);
                if let Err(err) = self.apply_effect(active, renderer, ctx.camera) {
                    log::error!("transition to '{}' failed: {}", active.target, err);
                    active.failure = Some(err.to_string());
                    return true;
                }
                false
            }
            TransitionState::TransitioningIn => {
                let progress = active.advance(dt);
                if let Err(err) = self.apply_effect(active, renderer, ctx.camera) {
                    log::error!("transition to '{}' failed: {}", active.target, err);
                    active.failure = Some(err.to_string());
                    return true;
                }
                progress >= 1.0
            }
            TransitionState::Idle => true,
        }
    }

    /// Activate the target and move the overlay into its graph.
    fn switch_scene(&mut self, active: &mut ActiveTransition, ctx: &mut SceneContext) {
        if active.switched {
            return;
        }
        active.switched = true;

        if let (Some(overlay), Some(current)) = (self.overlay.as_mut(), self.current.as_ref()) {
            if let Some(scene) = self.scenes.get_mut(current) {
                overlay.detach(current, &mut scene.graph);
            }
        }

        let target = active.target.clone();
        self.activate(target.as_str(), ctx);

        if active.failure.is_some() {
            return;
        }
        if let (Some(overlay), Some(scene)) =
            (self.overlay.as_mut(), self.scenes.get_mut(&target))
        {
            overlay.attach(&target, &mut scene.graph);
        }
    }

    /// Drive the overlay for the current phase value, in the graph that holds it.
    fn apply_effect(
        &mut self,
        active: &mut ActiveTransition,
        renderer: &mut dyn Renderer,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        let value = active.effect_value();
        let Some(overlay) = self.overlay.as_mut() else {
            return Ok(());
        };
        let Some(owner) = overlay.attached_to() else {
            return Ok(());
        };
        let Some(scene) = self.scenes.get_mut(owner) else {
            return Ok(());
        };
        let graph = &mut scene.graph;

        match active.transition.kind {
            TransitionKind::Fade { color } => {
                overlay.set_fade(graph, color, value);
                Ok(())
            }
            TransitionKind::Glitch => {
                let target = match active.capture {
                    Some(target) => target,
                    None => {
                        let target = renderer.create_capture()?;
                        active.capture = Some(target);
                        target
                    }
                };

                overlay.set_visible(graph, false);
                let captured = renderer.capture(graph, camera, target);
                overlay.set_visible(graph, true);
                captured?;

                overlay.set_glitch(graph, target, active.elapsed, value);
                Ok(())
            }
        }
    }

    /// Tear down whatever the transition left behind. Runs on every exit path.
    fn finish(&mut self, active: ActiveTransition, renderer: &mut dyn Renderer) {
        if let Some(overlay) = self.overlay.as_mut() {
            if let Some(owner) = overlay.attached_to().cloned() {
                match self.scenes.get_mut(&owner) {
                    Some(scene) => overlay.detach(&owner, &mut scene.graph),
                    None => overlay.forget(),
                }
            }
            overlay.reset();
        }

        if let Some(target) = active.capture {
            renderer.release_capture(target);
        }

        self.pending = None;
        self.active = None;

        let outcome = active.outcome();
        match &outcome {
            TransitionOutcome::Completed => log::info!("transition to '{}' complete", active.target),
            TransitionOutcome::EffectFailed(message) => {
                log::warn!("transition to '{}' ended early: {}", active.target, message)
            }
        }
        notify(&self.observers, "transition", |observer| {
            observer.transition_finished(&active.target, &outcome);
            Ok(())
        });
    }

    /// Re-fit the overlay after the viewport or camera changed.
    pub fn resize(&mut self, camera: &Camera, viewport: Viewport) {
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };
        overlay.fit(camera, viewport);
        if let Some(owner) = overlay.attached_to() {
            if let Some(scene) = self.scenes.get_mut(owner) {
                overlay.sync(&mut scene.graph);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetProvider;
    use crate::render::HeadlessRenderer;
    use crate::scene::SceneBehavior;
    use crate::sound::SilentSounds;
    use std::time::Duration;

    #[derive(Default)]
    struct Counts {
        init: u32,
        enter: u32,
        exit: u32,
    }

    struct Counting(Rc<RefCell<Counts>>);

    impl SceneBehavior for Counting {
        fn init(&mut self, _: &mut SceneGraph, _: &mut SceneContext) -> Result<(), SceneError> {
            self.0.borrow_mut().init += 1;
            Ok(())
        }

        fn on_enter(&mut self, _: &mut SceneGraph, _: &mut SceneContext) -> Result<(), SceneError> {
            self.0.borrow_mut().enter += 1;
            Ok(())
        }

        fn on_exit(&mut self, _: &mut SceneGraph, _: &mut SceneContext) -> Result<(), SceneError> {
            self.0.borrow_mut().exit += 1;
            Err(SceneError::failed("exit hook broke"))
        }
    }

    struct Harness {
        camera: Camera,
        sounds: SilentSounds,
        assets: AssetProvider,
        renderer: HeadlessRenderer,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                camera: Camera::new(),
                sounds: SilentSounds,
                assets: AssetProvider::new("."),
                renderer: HeadlessRenderer::new(Viewport::new(800, 600)),
            }
        }

        fn ctx(&mut self) -> (SceneContext<'_>, &mut HeadlessRenderer) {
            let viewport = self.renderer.viewport();
            (
                SceneContext::new(
                    &mut self.camera,
                    &mut self.sounds,
                    &mut self.assets,
                    viewport,
                    0.0,
                ),
                &mut self.renderer,
            )
        }
    }

    fn registry_with(names: &[&str]) -> (SceneRegistry, HashMap<String, Rc<RefCell<Counts>>>) {
        let mut registry = SceneRegistry::new();
        let mut counts = HashMap::new();
        for name in names {
            let c = Rc::new(RefCell::new(Counts::default()));
            registry.register(Scene::new(*name, Counting(Rc::clone(&c))));
            counts.insert(name.to_string(), c);
        }
        (registry, counts)
    }

    fn run_until_idle(registry: &mut SceneRegistry, harness: &mut Harness) -> u32 {
        let mut frames = 0;
        while registry.is_transitioning() && frames < 1000 {
            let (mut ctx, renderer) = harness.ctx();
            registry.update(1.0 / 60.0, renderer, &mut ctx);
            frames += 1;
        }
        frames
    }

    #[test]
    fn init_runs_once_and_enter_every_time() {
        let (mut registry, counts) = registry_with(&["a", "b"]);
        let mut harness = Harness::new();
        let (mut ctx, _) = harness.ctx();

        assert!(registry.activate("a", &mut ctx));
        assert!(registry.activate("b", &mut ctx));
        assert!(registry.activate("a", &mut ctx));

        let a = counts["a"].borrow();
        assert_eq!(a.init, 1);
        assert_eq!(a.enter, 2);
        assert_eq!(a.exit, 1);
        assert!(registry.is_initialized("a"));
        assert_eq!(registry.current(), Some(&SceneId::new("a")));
    }

    #[test]
    fn unknown_activation_keeps_current() {
        let (mut registry, _) = registry_with(&["a"]);
        let mut harness = Harness::new();
        let (mut ctx, _) = harness.ctx();

        registry.activate("a", &mut ctx);
        assert!(!registry.activate("missing", &mut ctx));
        assert_eq!(registry.current(), Some(&SceneId::new("a")));
    }

    #[test]
    fn first_registered_is_default() {
        let (registry, _) = registry_with(&["intro", "hall", "gallery"]);
        assert_eq!(registry.default_scene(), Some(&SceneId::new("intro")));
        let names: Vec<_> = registry.names().map(SceneId::as_str).collect();
        assert_eq!(names, vec!["intro", "hall", "gallery"]);
    }

    #[test]
    fn without_resources_transitions_are_immediate() {
        let (mut registry, _) = registry_with(&["a", "b"]);
        let mut harness = Harness::new();
        let (mut ctx, _) = harness.ctx();

        registry.activate("a", &mut ctx);
        let result = registry.transition("b", Transition::fade(Duration::from_millis(200)), &mut ctx);
        assert_eq!(result, TransitionRequest::Immediate);
        assert_eq!(registry.current(), Some(&SceneId::new("b")));
        assert!(!registry.is_transitioning());
    }

    #[test]
    fn duplicate_and_conflicting_requests() {
        let (mut registry, counts) = registry_with(&["a", "b", "c"]);
        let mut harness = Harness::new();
        {
            let (mut ctx, _) = harness.ctx();
            registry.init_transitions(ctx.camera, ctx.viewport);
            registry.activate("a", &mut ctx);

            let fade = Transition::fade(Duration::from_millis(100));
            assert_eq!(registry.transition("b", fade, &mut ctx), TransitionRequest::Started);
            assert_eq!(registry.transition("b", fade, &mut ctx), TransitionRequest::Duplicate);
            assert_eq!(registry.transition("c", fade, &mut ctx), TransitionRequest::Rejected);
            assert_eq!(registry.state(), TransitionState::TransitioningOut);
            assert_eq!(registry.pending_target(), Some(&SceneId::new("b")));
        }

        run_until_idle(&mut registry, &mut harness);

        assert_eq!(registry.current(), Some(&SceneId::new("b")));
        assert_eq!(counts["b"].borrow().enter, 1);
        assert_eq!(counts["c"].borrow().enter, 0);
        assert_eq!(registry.pending_target(), None);
        assert_eq!(registry.state(), TransitionState::Idle);
    }

    #[test]
    fn fade_detaches_overlay_when_done() {
        let (mut registry, _) = registry_with(&["a", "b"]);
        let mut harness = Harness::new();
        {
            let (mut ctx, _) = harness.ctx();
            registry.init_transitions(ctx.camera, ctx.viewport);
            registry.activate("a", &mut ctx);
            registry.transition("b", Transition::fade(Duration::from_millis(100)), &mut ctx);
        }
        assert_eq!(
            registry.overlay().and_then(|o| o.attached_to()),
            Some(&SceneId::new("a"))
        );

        let frames = run_until_idle(&mut registry, &mut harness);
        // Two phases of ~6 frames each plus the switching frame.
        assert!(frames >= 13);

        let overlay = registry.overlay().unwrap();
        assert!(!overlay.is_attached());
        assert!(registry.scene("a").unwrap().graph().is_empty());
        assert!(registry.scene("b").unwrap().graph().is_empty());
    }

    #[test]
    fn glitch_captures_then_rebinds_fade() {
        let (mut registry, _) = registry_with(&["a", "b"]);
        let mut harness = Harness::new();
        {
            let (mut ctx, _) = harness.ctx();
            registry.init_transitions(ctx.camera, ctx.viewport);
            registry.activate("a", &mut ctx);
            registry.transition("b", Transition::glitch(Duration::from_millis(50)), &mut ctx);
        }
        run_until_idle(&mut registry, &mut harness);

        assert_eq!(registry.current(), Some(&SceneId::new("b")));
        let overlay = registry.overlay().unwrap();
        assert_eq!(overlay.bound(), crate::scene::BoundMaterial::Fade);
        assert!(!overlay.is_attached());
        assert_eq!(harness.renderer.live_captures(), 0);

        let calls = harness.renderer.calls();
        assert!(calls.iter().any(|c| matches!(c, crate::render::RenderCall::CreateCapture(_))));
        // The overlay is always hidden while the capture renders.
        assert!(calls.iter().all(|c| !matches!(
            c,
            crate::render::RenderCall::Capture {
                overlay_visible: true,
                ..
            }
        )));
    }

    #[test]
    fn renderer_failure_still_switches_and_cleans_up() {
        let (mut registry, _) = registry_with(&["a", "b"]);
        let mut harness = Harness::new();
        harness.renderer.fail_captures(true);
        {
            let (mut ctx, _) = harness.ctx();
            registry.init_transitions(ctx.camera, ctx.viewport);
            registry.activate("a", &mut ctx);
            registry.transition("b", Transition::glitch(Duration::from_millis(500)), &mut ctx);
        }

        let frames = run_until_idle(&mut registry, &mut harness);
        assert_eq!(frames, 1);
        assert_eq!(registry.current(), Some(&SceneId::new("b")));
        assert_eq!(registry.state(), TransitionState::Idle);
        assert!(!registry.overlay().unwrap().is_attached());

        // A later transition proceeds normally.
        harness.renderer.fail_captures(false);
        {
            let (mut ctx, _) = harness.ctx();
            assert_eq!(
                registry.transition("a", Transition::fade(Duration::from_millis(50)), &mut ctx),
                TransitionRequest::Started
            );
        }
        run_until_idle(&mut registry, &mut harness);
        assert_eq!(registry.current(), Some(&SceneId::new("a")));
    }

    #[test]
    fn unknown_transition_target_is_reported() {
        let (mut registry, _) = registry_with(&["a"]);
        let mut harness = Harness::new();
        let (mut ctx, _) = harness.ctx();
        registry.init_transitions(ctx.camera, ctx.viewport);
        registry.activate("a", &mut ctx);
        assert_eq!(
            registry.transition("nowhere", Transition::fade(Duration::ZERO), &mut ctx),
            TransitionRequest::UnknownScene
        );
        assert!(!registry.is_transitioning());
    }

    #[test]
    fn activating_mid_transition_moves_the_overlay() {
        let (mut registry, _) = registry_with(&["a", "b"]);
        let door_at = glam::Vec3::new(1.0, 2.0, 0.0);
        registry.register(
            Scene::builder("c")
                .on_init(move |graph, _| {
                    graph.node("door").at(door_at).spawn();
                    Ok(())
                })
                .build(),
        );

        let mut harness = Harness::new();
        {
            let (mut ctx, renderer) = harness.ctx();
            registry.init_transitions(ctx.camera, ctx.viewport);
            registry.activate("a", &mut ctx);
            registry.transition("b", Transition::fade(Duration::from_millis(100)), &mut ctx);
            registry.update(1.0 / 60.0, &mut *renderer, &mut ctx);

            registry.activate("c", &mut ctx);
            assert!(registry.scene("a").unwrap().graph().is_empty());
            assert_eq!(
                registry.overlay().and_then(|o| o.attached_to()),
                Some(&SceneId::new("c"))
            );
            registry.update(1.0 / 60.0, &mut *renderer, &mut ctx);
        }

        let c = registry.scene("c").unwrap().graph();
        let door = c.find("door").unwrap();
        assert_eq!(c.transform(door).map(|t| t.position), Some(door_at));

        run_until_idle(&mut registry, &mut harness);
        assert_eq!(registry.current(), Some(&SceneId::new("b")));
        assert!(!registry.overlay().unwrap().is_attached());
        let c = registry.scene("c").unwrap().graph();
        assert_eq!(c.len(), 1);
        assert_eq!(c.transform(door).map(|t| t.position), Some(door_at));
    }

    struct Logger(Rc<RefCell<Vec<String>>>);

    impl SceneObserver for Logger {
        fn scene_exiting(&mut self, scene: &SceneId, _: &mut SceneGraph) -> Result<(), SceneError> {
            self.0.borrow_mut().push(format!("observer exit {}", scene));
            Ok(())
        }

        fn scene_changed(&mut self, scene: &SceneId, _: &mut SceneGraph) -> Result<(), SceneError> {
            self.0.borrow_mut().push(format!("observer changed {}", scene));
            Ok(())
        }
    }

    fn logged(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Scene {
        let (init, enter, exit) = (Rc::clone(log), Rc::clone(log), Rc::clone(log));
        Scene::builder(name)
            .on_init(move |_, _| {
                init.borrow_mut().push(format!("init {}", name));
                Ok(())
            })
            .on_enter(move |_, _| {
                enter.borrow_mut().push(format!("enter {}", name));
                Ok(())
            })
            .on_exit(move |_, _| {
                exit.borrow_mut().push(format!("exit {}", name));
                Ok(())
            })
            .build()
    }

    #[test]
    fn hooks_and_observers_interleave_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = SceneRegistry::new();
        registry.register(logged("a", &log));
        registry.register(logged("b", &log));
        registry.add_observer(Rc::new(RefCell::new(Logger(Rc::clone(&log)))));

        let mut harness = Harness::new();
        let (mut ctx, _) = harness.ctx();
        registry.activate("a", &mut ctx);
        registry.activate("b", &mut ctx);
        registry.activate("a", &mut ctx);

        assert_eq!(
            *log.borrow(),
            vec![
                "init a",
                "observer changed a",
                "enter a",
                "exit a",
                "observer exit a",
                "init b",
                "observer changed b",
                "enter b",
                "exit b",
                "observer exit b",
                "observer changed a",
                "enter a",
            ]
        );
    }

    struct Recorder(Vec<String>);

    impl SceneObserver for Recorder {
        fn scene_exiting(&mut self, scene: &SceneId, _: &mut SceneGraph) -> Result<(), SceneError> {
            self.0.push(format!("exit {}", scene));
            Err(SceneError::failed("observer broke"))
        }

        fn scene_changed(&mut self, scene: &SceneId, _: &mut SceneGraph) -> Result<(), SceneError> {
            self.0.push(format!("changed {}", scene));
            Ok(())
        }

        fn transition_finished(&mut self, target: &SceneId, outcome: &TransitionOutcome) {
            self.0.push(format!("finished {} {:?}", target, outcome));
        }
    }

    #[test]
    fn observers_see_every_switch_despite_errors() {
        let (mut registry, _) = registry_with(&["a", "b"]);
        let first = Rc::new(RefCell::new(Recorder(Vec::new())));
        let second = Rc::new(RefCell::new(Recorder(Vec::new())));
        registry.add_observer(first.clone());
        registry.add_observer(second.clone());

        let mut harness = Harness::new();
        {
            let (mut ctx, _) = harness.ctx();
            registry.init_transitions(ctx.camera, ctx.viewport);
            registry.activate("a", &mut ctx);
            registry.transition("b", Transition::fade(Duration::from_millis(20)), &mut ctx);
        }
        run_until_idle(&mut registry, &mut harness);

        for recorder in [first, second] {
            assert_eq!(
                recorder.borrow().0,
                vec![
                    "changed a".to_string(),
                    "exit a".to_string(),
                    "changed b".to_string(),
                    "finished b Completed".to_string(),
                ]
            );
        }
    }
}
