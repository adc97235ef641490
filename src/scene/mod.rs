//! Scenes, the scene registry and animated transitions.
//!
//! A [`Scene`] pairs a [`SceneGraph`](crate::graph::SceneGraph) with a
//! [`SceneBehavior`]. The [`SceneRegistry`] owns every scene, keeps track of
//! the current one and plays [`Transition`]s between them.
//!
//! # Example
//!
//! ```ignore
//! use tableau::*;
//!
//! let mut registry = SceneRegistry::new();
//! registry.register(
//!     Scene::builder("hall")
//!         .on_click(|graph, ctx, hits| {
//!             if graph.name(hits[0].entity).as_deref() == Some("door") {
//!                 ctx.transition_to("gallery", Transition::glitch(Duration::from_millis(600)));
//!             }
//!         })
//!         .build(),
//! );
//! ```

mod overlay;
mod registry;
pub mod scene;
mod transition;

pub use overlay::{BoundMaterial, TransitionOverlay};
pub use registry::{ObserverHandle, SceneObserver, SceneRegistry};
pub use scene::{
    Scene, SceneBehavior, SceneBuilder, SceneContext, SceneError, SceneId, SceneRequest,
};
pub use transition::{
    ActiveTransition, Transition, TransitionKind, TransitionOutcome, TransitionRequest,
    TransitionState,
};
