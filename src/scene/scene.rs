//! Scene definition, lifecycle hooks and the per-call engine context.

use crate::assets::{AssetError, AssetProvider};
use crate::camera::Camera;
use crate::graph::SceneGraph;
use crate::picking::Intersection;
use crate::render::Viewport;
use crate::sound::{SoundError, Sounds};

use super::transition::Transition;

/// Unique identifier for a scene.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(pub(crate) String);

impl SceneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SceneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Errors raised by scene hooks and observers.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Sound(#[from] SoundError),
    #[error("{0}")]
    Failed(String),
}

impl SceneError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A transition a scene asked for while handling a hook.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneRequest {
    pub target: SceneId,
    /// `None` uses the engine's default transition.
    pub transition: Option<Transition>,
}

/// Engine services lent to scene hooks for the duration of one call.
///
/// Scenes never own these. Transition requests made here are queued and
/// applied by the engine after the hook returns.
pub struct SceneContext<'a> {
    pub camera: &'a mut Camera,
    pub sounds: &'a mut dyn Sounds,
    pub assets: &'a mut AssetProvider,
    pub viewport: Viewport,
    /// Seconds since the engine started.
    pub time: f32,
    requests: Vec<SceneRequest>,
}

impl<'a> SceneContext<'a> {
    pub fn new(
        camera: &'a mut Camera,
        sounds: &'a mut dyn Sounds,
        assets: &'a mut AssetProvider,
        viewport: Viewport,
        time: f32,
    ) -> Self {
        Self {
            camera,
            sounds,
            assets,
            viewport,
            time,
            requests: Vec::new(),
        }
    }

    /// Ask for a transition with the engine's default effect.
    pub fn go_to(&mut self, scene: impl Into<SceneId>) {
        self.requests.push(SceneRequest {
            target: scene.into(),
            transition: None,
        });
    }

    /// Ask for a transition with a specific effect.
    pub fn transition_to(&mut self, scene: impl Into<SceneId>, transition: Transition) {
        self.requests.push(SceneRequest {
            target: scene.into(),
            transition: Some(transition),
        });
    }

    pub fn take_requests(&mut self) -> Vec<SceneRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }
}

/// Scene lifecycle and input hooks. Every hook has a no-op default.
///
/// `init` runs once, the first time the scene is activated. `on_enter` and
/// `on_exit` run on every activation and deactivation. Errors are logged by
/// the registry and never abort a scene switch.
#[allow(unused_variables)]
pub trait SceneBehavior {
    fn init(&mut self, graph: &mut SceneGraph, ctx: &mut SceneContext) -> Result<(), SceneError> {
        Ok(())
    }

    fn on_enter(
        &mut self,
        graph: &mut SceneGraph,
        ctx: &mut SceneContext,
    ) -> Result<(), SceneError> {
        Ok(())
    }

    fn on_exit(&mut self, graph: &mut SceneGraph, ctx: &mut SceneContext) -> Result<(), SceneError> {
        Ok(())
    }

    /// Per-tick update while the scene is active.
    fn update(&mut self, graph: &mut SceneGraph, ctx: &mut SceneContext, dt: f32) {}

    /// Alpha-tested hits under a click, nearest first. Never empty.
    fn on_click(&mut self, graph: &mut SceneGraph, ctx: &mut SceneContext, hits: &[Intersection]) {
    }

    /// Alpha-tested hover hits under the pointer, nearest first. May be empty.
    fn on_pointer_move(
        &mut self,
        graph: &mut SceneGraph,
        ctx: &mut SceneContext,
        hits: &[Intersection],
    ) {
    }
}

/// A named scene: its node graph plus the behavior driving it.
pub struct Scene {
    pub(crate) id: SceneId,
    pub(crate) graph: SceneGraph,
    pub(crate) behavior: Box<dyn SceneBehavior>,
}

impl Scene {
    pub fn new(id: impl Into<SceneId>, behavior: impl SceneBehavior + 'static) -> Self {
        Self {
            id: id.into(),
            graph: SceneGraph::new(),
            behavior: Box::new(behavior),
        }
    }

    /// Build a scene from closures.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let hall = Scene::builder("hall")
    ///     .on_init(|graph, ctx| {
    ///         let door = ctx.assets.load_texture("hall/door.png");
    ///         graph.node("door").sprite(door, Vec2::new(1.0, 2.0)).spawn();
    ///         Ok(())
    ///     })
    ///     .on_click(|graph, ctx, hits| {
    ///         if graph.name(hits[0].entity).as_deref() == Some("door") {
    ///             ctx.go_to("gallery");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn builder(id: impl Into<SceneId>) -> SceneBuilder {
        SceneBuilder {
            id: id.into(),
            hooks: ClosureBehavior::default(),
        }
    }

    pub fn id(&self) -> &SceneId {
        &self.id
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Borrow the graph and behavior together, for calling hooks.
    pub fn parts_mut(&mut self) -> (&mut SceneGraph, &mut dyn SceneBehavior) {
        (&mut self.graph, self.behavior.as_mut())
    }
}

type LifecycleHook = Box<dyn FnMut(&mut SceneGraph, &mut SceneContext) -> Result<(), SceneError>>;
type UpdateHook = Box<dyn FnMut(&mut SceneGraph, &mut SceneContext, f32)>;
type HitsHook = Box<dyn FnMut(&mut SceneGraph, &mut SceneContext, &[Intersection])>;

#[derive(Default)]
struct ClosureBehavior {
    init: Option<LifecycleHook>,
    enter: Option<LifecycleHook>,
    exit: Option<LifecycleHook>,
    update: Option<UpdateHook>,
    click: Option<HitsHook>,
    pointer_move: Option<HitsHook>,
}

fn run_lifecycle(
    hook: &mut Option<LifecycleHook>,
    graph: &mut SceneGraph,
    ctx: &mut SceneContext,
) -> Result<(), SceneError> {
    match hook {
        Some(hook) => hook(graph, ctx),
        None => Ok(()),
    }
}

impl SceneBehavior for ClosureBehavior {
    fn init(&mut self, graph: &mut SceneGraph, ctx: &mut SceneContext) -> Result<(), SceneError> {
        run_lifecycle(&mut self.init, graph, ctx)
    }

    fn on_enter(
        &mut self,
        graph: &mut SceneGraph,
        ctx: &mut SceneContext,
    ) -> Result<(), SceneError> {
        run_lifecycle(&mut self.enter, graph, ctx)
    }

    fn on_exit(&mut self, graph: &mut SceneGraph, ctx: &mut SceneContext) -> Result<(), SceneError> {
        run_lifecycle(&mut self.exit, graph, ctx)
    }

    fn update(&mut self, graph: &mut SceneGraph, ctx: &mut SceneContext, dt: f32) {
        if let Some(hook) = &mut self.update {
            hook(graph, ctx, dt);
        }
    }

    fn on_click(&mut self, graph: &mut SceneGraph, ctx: &mut SceneContext, hits: &[Intersection]) {
        if let Some(hook) = &mut self.click {
            hook(graph, ctx, hits);
        }
    }

    fn on_pointer_move(
        &mut self,
        graph: &mut SceneGraph,
        ctx: &mut SceneContext,
        hits: &[Intersection],
    ) {
        if let Some(hook) = &mut self.pointer_move {
            hook(graph, ctx, hits);
        }
    }
}

/// Builder for closure-driven scenes. See [`Scene::builder`].
pub struct SceneBuilder {
    id: SceneId,
    hooks: ClosureBehavior,
}

impl SceneBuilder {
    /// Runs once, on first activation.
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut SceneGraph, &mut SceneContext) -> Result<(), SceneError> + 'static,
    {
        self.hooks.init = Some(Box::new(hook));
        self
    }

    /// Runs every time the scene becomes active, after `on_init`.
    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut SceneGraph, &mut SceneContext) -> Result<(), SceneError> + 'static,
    {
        self.hooks.enter = Some(Box::new(hook));
        self
    }

    /// Runs every time the scene stops being active.
    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut SceneGraph, &mut SceneContext) -> Result<(), SceneError> + 'static,
    {
        self.hooks.exit = Some(Box::new(hook));
        self
    }

    pub fn on_update<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut SceneGraph, &mut SceneContext, f32) + 'static,
    {
        self.hooks.update = Some(Box::new(hook));
        self
    }

    pub fn on_click<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut SceneGraph, &mut SceneContext, &[Intersection]) + 'static,
    {
        self.hooks.click = Some(Box::new(hook));
        self
    }

    pub fn on_pointer_move<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut SceneGraph, &mut SceneContext, &[Intersection]) + 'static,
    {
        self.hooks.pointer_move = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Scene {
        Scene {
            id: self.id,
            graph: SceneGraph::new(),
            behavior: Box::new(self.hooks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::SilentSounds;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn builder_hooks_run() {
        let entered = Rc::new(Cell::new(0));
        let counter = Rc::clone(&entered);
        let mut scene = Scene::builder("hall")
            .on_enter(move |graph, ctx| {
                counter.set(counter.get() + 1);
                graph.node("door").spawn();
                ctx.go_to("gallery");
                Ok(())
            })
            .build();

        let mut camera = Camera::new();
        let mut sounds = SilentSounds;
        let mut assets = AssetProvider::new(".");
        let mut ctx = SceneContext::new(
            &mut camera,
            &mut sounds,
            &mut assets,
            Viewport::new(800, 600),
            0.0,
        );

        let (graph, behavior) = scene.parts_mut();
        behavior.on_enter(graph, &mut ctx).unwrap();
        behavior.init(graph, &mut ctx).unwrap();

        assert_eq!(entered.get(), 1);
        assert!(scene.graph().find("door").is_some());
        let requests = ctx.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, SceneId::new("gallery"));
        assert!(requests[0].transition.is_none());
        assert!(!ctx.has_requests());
    }

    #[test]
    fn scene_ids_compare_by_name() {
        assert_eq!(SceneId::from("a"), SceneId::new(String::from("a")));
        assert_eq!(SceneId::new("void").to_string(), "void");
    }
}
