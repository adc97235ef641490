//! The engine: scenes, input and rendering tied together by one tick.
//!
//! Each tick runs, in order: one slice of queued asset loads, the transition
//! in flight, click-ring animation, the active scene's `update`, any scene
//! switches requested along the way, then the frame render.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use winit::keyboard::KeyCode;

use crate::assets::AssetProvider;
use crate::camera::Camera;
use crate::cursor::CursorIndicator;
use crate::dispatch::{DispatchConfig, InputDispatcher};
use crate::input::InputEvent;
use crate::prefs::Preferences;
use crate::render::{RenderError, Renderer, Viewport};
use crate::scene::{Scene, SceneContext, SceneId, SceneRegistry, Transition, TransitionRequest};
use crate::sound::Sounds;

/// Scene switches requested from inside switch hooks are followed at most this deep.
const MAX_REQUEST_ROUNDS: usize = 8;

/// Errors that stop the engine from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("no scenes registered")]
    NoScenes,
}

/// Engine configuration.
///
/// # Example
///
/// ```ignore
/// let config = EngineConfig::new()
///     .title("Gallery")
///     .size(1280, 720)
///     .initial_scene("hall")
///     .preferences("prefs.json");
/// ```
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Scene to start in when no preferred scene is saved. Defaults to the
    /// first registered scene.
    pub initial_scene: Option<SceneId>,
    /// Used for scene requests that don't name an effect.
    pub transition: Transition,
    pub dispatch: DispatchConfig,
    /// Cursor diameter as a fraction of the visible height.
    pub cursor_size: f32,
    /// Where preferences are stored. `None` keeps them in memory.
    pub preferences: Option<PathBuf>,
    pub asset_root: PathBuf,
    /// Queued asset loads settled per tick.
    pub preload_budget: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Tableau".to_string(),
            width: 1280,
            height: 720,
            initial_scene: None,
            transition: Transition::fade(Duration::from_millis(500)),
            dispatch: DispatchConfig::default(),
            cursor_size: 0.035,
            preferences: None,
            asset_root: PathBuf::from("assets"),
            preload_budget: 4,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn initial_scene(mut self, scene: impl Into<SceneId>) -> Self {
        self.initial_scene = Some(scene.into());
        self
    }

    pub fn default_transition(mut self, transition: Transition) -> Self {
        self.transition = transition;
        self
    }

    /// Sound played on every click. `None` disables it.
    pub fn click_sound(mut self, name: Option<&str>, volume: f32) -> Self {
        self.dispatch.click_sound = name.map(str::to_string);
        self.dispatch.click_volume = volume;
        self
    }

    pub fn debug_key(mut self, key: KeyCode) -> Self {
        self.dispatch.debug_key = key;
        self
    }

    pub fn click_rings(mut self, duration: Duration, size: f32) -> Self {
        self.dispatch.ring_duration = duration;
        self.dispatch.ring_size = size;
        self
    }

    pub fn alpha_threshold(mut self, threshold: f32) -> Self {
        self.dispatch.alpha_threshold = threshold;
        self
    }

    pub fn preferences(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences = Some(path.into());
        self
    }

    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }
}

/// Apply queued scene requests, including ones raised while applying them.
fn drain_requests(registry: &mut SceneRegistry, ctx: &mut SceneContext, fallback: Transition) {
    for _ in 0..MAX_REQUEST_ROUNDS {
        let requests = ctx.take_requests();
        if requests.is_empty() {
            return;
        }
        for request in requests {
            let transition = request.transition.unwrap_or(fallback);
            registry.transition(request.target.as_str(), transition, ctx);
        }
    }
    if ctx.has_requests() {
        log::warn!("dropping scene requests: switch hooks keep requesting switches");
        ctx.take_requests();
    }
}

pub struct Engine<R: Renderer> {
    config: EngineConfig,
    renderer: R,
    registry: SceneRegistry,
    dispatcher: InputDispatcher,
    cursor: Rc<RefCell<CursorIndicator>>,
    camera: Camera,
    sounds: Box<dyn Sounds>,
    assets: AssetProvider,
    prefs: Preferences,
    time: f32,
}

impl<R: Renderer> Engine<R> {
    pub fn new(config: EngineConfig, renderer: R, sounds: Box<dyn Sounds>) -> Self {
        let camera = Camera::new();
        let cursor = Rc::new(RefCell::new(CursorIndicator::new(config.cursor_size)));

        let mut registry = SceneRegistry::new();
        registry.init_transitions(&camera, renderer.viewport());
        registry.add_observer(cursor.clone());

        let dispatcher = InputDispatcher::new(config.dispatch.clone(), Rc::clone(&cursor));
        let prefs = match &config.preferences {
            Some(path) => Preferences::open(path),
            None => Preferences::in_memory(),
        };

        Self {
            assets: AssetProvider::new(config.asset_root.clone()),
            config,
            renderer,
            registry,
            dispatcher,
            cursor,
            camera,
            sounds,
            prefs,
            time: 0.0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register(&mut self, scene: Scene) {
        self.registry.register(scene);
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SceneRegistry {
        &mut self.registry
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn dispatcher(&self) -> &InputDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut InputDispatcher {
        &mut self.dispatcher
    }

    pub fn cursor(&self) -> &Rc<RefCell<CursorIndicator>> {
        &self.cursor
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn sounds_mut(&mut self) -> &mut dyn Sounds {
        self.sounds.as_mut()
    }

    pub fn assets_mut(&mut self) -> &mut AssetProvider {
        &mut self.assets
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn prefs_mut(&mut self) -> &mut Preferences {
        &mut self.prefs
    }

    /// Seconds of simulated time since the engine was created.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Scene the engine starts in: the saved preference if it still exists,
    /// then the configured initial scene, then the first registered one.
    pub fn initial_scene(&self) -> Option<SceneId> {
        let registered = |id: &SceneId| self.registry.contains(id.as_str());
        if let Some(preferred) = self.prefs.preferred_scene().filter(registered) {
            return Some(preferred);
        }
        if let Some(configured) = self.config.initial_scene.clone() {
            if registered(&configured) {
                return Some(configured);
            }
            log::warn!("initial scene '{}' is not registered", configured);
        }
        self.registry.default_scene().cloned()
    }

    /// Activate the initial scene.
    pub fn start(&mut self) -> Result<SceneId, EngineError> {
        let initial = self.initial_scene().ok_or(EngineError::NoScenes)?;
        log::info!("starting in scene '{}'", initial);

        let viewport = self.renderer.viewport();
        let mut ctx = SceneContext::new(
            &mut self.camera,
            self.sounds.as_mut(),
            &mut self.assets,
            viewport,
            self.time,
        );
        self.registry.activate(initial.as_str(), &mut ctx);
        drain_requests(&mut self.registry, &mut ctx, self.config.transition);
        Ok(initial)
    }

    /// Request a scene switch, with the default effect when `transition` is `None`.
    pub fn go_to(&mut self, name: &str, transition: Option<Transition>) -> TransitionRequest {
        let viewport = self.renderer.viewport();
        let mut ctx = SceneContext::new(
            &mut self.camera,
            self.sounds.as_mut(),
            &mut self.assets,
            viewport,
            self.time,
        );
        let transition = transition.unwrap_or(self.config.transition);
        let result = self.registry.transition(name, transition, &mut ctx);
        drain_requests(&mut self.registry, &mut ctx, self.config.transition);
        result
    }

    /// Advance everything by `dt` seconds and render a frame.
    pub fn tick(&mut self, dt: f32) -> Result<(), RenderError> {
        self.time += dt;
        self.assets.pump(self.config.preload_budget);

        let viewport = self.renderer.viewport();
        {
            let mut ctx = SceneContext::new(
                &mut self.camera,
                self.sounds.as_mut(),
                &mut self.assets,
                viewport,
                self.time,
            );

            self.registry.update(dt, &mut self.renderer, &mut ctx);
            self.dispatcher.update(dt, &mut self.registry);

            if let Some(scene) = self.registry.current_scene_mut() {
                let (graph, behavior) = scene.parts_mut();
                behavior.update(graph, &mut ctx, dt);
            }

            drain_requests(&mut self.registry, &mut ctx, self.config.transition);
        }

        match self.registry.current_scene() {
            Some(scene) => self.renderer.render(scene.graph(), &self.camera, self.time),
            None => Ok(()),
        }
    }

    /// Route one input event to the dispatcher.
    pub fn handle(&mut self, event: InputEvent) {
        let viewport = self.renderer.viewport();
        let mut ctx = SceneContext::new(
            &mut self.camera,
            self.sounds.as_mut(),
            &mut self.assets,
            viewport,
            self.time,
        );

        match event {
            InputEvent::PointerMoved(position) => {
                self.dispatcher
                    .on_pointer_move(position, &mut self.registry, &mut ctx);
            }
            InputEvent::Click(position) => {
                self.dispatcher.on_click(position, &mut self.registry, &mut ctx);
            }
            InputEvent::KeyDown(key) => {
                if !self.dispatcher.on_key_down(key) {
                    self.dispatcher.debug_mut().handle_key(
                        key,
                        &mut self.registry,
                        &mut self.prefs,
                        self.config.transition,
                        &mut ctx,
                    );
                }
            }
        }

        drain_requests(&mut self.registry, &mut ctx, self.config.transition);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }
        self.renderer.resize(viewport);
        self.registry.resize(&self.camera, viewport);
    }

    /// Debug overlay text while it's open.
    pub fn debug_summary(&self) -> Option<String> {
        let debug = self.dispatcher.debug();
        debug
            .is_visible()
            .then(|| debug.summary(&self.registry, &self.prefs))
    }

    /// Stop input handling and background audio. Returns `true` when the OS
    /// cursor should be shown again.
    pub fn dispose(&mut self) -> bool {
        self.sounds.stop_all_background();
        self.dispatcher.dispose(&mut self.registry)
    }
}
