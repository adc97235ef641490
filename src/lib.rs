//! # Tableau
//!
//! **Scene lifecycle, transitions and pixel-accurate input for interactive
//! narrative experiences.**
//!
//! Scenes are named node graphs with lifecycle hooks. The registry activates
//! them, runs `init` once per scene, and plays fade or glitch transitions
//! between them. Clicks and hovers are raycast against the current scene and
//! filtered by sprite alpha, so transparent parts of an image never catch the
//! pointer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use tableau::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     run(EngineConfig::new().title("Gallery"), |engine| {
//!         engine.register(
//!             Scene::builder("hall")
//!                 .on_init(|graph, ctx| {
//!                     let door = ctx.assets.load_texture("hall/door.png");
//!                     graph.node("door").sprite(door, Vec2::new(1.0, 2.0)).spawn();
//!                     Ok(())
//!                 })
//!                 .on_click(|graph, ctx, hits| {
//!                     if graph.name(hits[0].entity).as_deref() == Some("door") {
//!                         ctx.transition_to("gallery", Transition::glitch(Duration::from_millis(600)));
//!                     }
//!                 })
//!                 .build(),
//!         );
//!         engine.register(Scene::builder("gallery").build());
//!     })
//! }
//! ```

mod alpha;
mod app;
mod assets;
mod camera;
mod color;
mod cursor;
mod debug;
mod dispatch;
mod easing;
mod engine;
mod geometry;
mod graph;
mod input;
mod mesh;
mod picking;
mod prefs;
pub mod render;
pub mod scene;
mod sound;
mod texture;

pub use alpha::{AlphaTester, DEFAULT_ALPHA_THRESHOLD, PixelBuffer};
pub use app::run;
pub use assets::{AssetError, AssetKind, AssetProvider};
pub use camera::{Camera, Projection};
pub use color::Color;
pub use cursor::CursorIndicator;
pub use debug::DebugOverlay;
pub use dispatch::{ClickRing, DispatchConfig, InputDispatcher, to_ndc};
pub use easing::Easing;
pub use engine::{Engine, EngineConfig, EngineError};
pub use geometry::{GeometryError, Model, ModelId};
pub use graph::{
    FadeMaterial, GlitchMaterial, Glow, GraphId, Layers, Name, NodeBuilder, OverlayMaterial,
    OverlayQuad, RenderOrder, Ring, Role, SceneGraph, Solid, Sprite, Visible,
};
pub use input::{Input, InputEvent};
pub use mesh::{Mesh, Transform, Vertex3d};
pub use picking::{Collider, Intersection, PickFilter, Ray, raycast};
pub use prefs::{PREFERRED_SCENE_KEY, Preferences, PrefsError};
pub use render::{
    CaptureId, GpuContext, HeadlessRenderer, RenderCall, RenderError, Renderer, Viewport,
    WgpuRenderer,
};
pub use scene::{
    ObserverHandle, Scene, SceneBehavior, SceneBuilder, SceneContext, SceneError, SceneId,
    SceneObserver, SceneRegistry, SceneRequest, Transition, TransitionKind, TransitionOutcome,
    TransitionRequest, TransitionState,
};
pub use sound::{SilentSounds, SoundError, SoundManager, Sounds};
pub use texture::{PixelAccessError, Texture, TextureId};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;

pub use hecs::{Entity, World};
