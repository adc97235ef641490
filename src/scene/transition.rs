//! Transition descriptions and the in-flight transition record.

use std::time::Duration;

use super::scene::SceneId;
use crate::color::Color;
use crate::easing::Easing;
use crate::render::CaptureId;

/// Visual effect played while switching scenes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionKind {
    /// Fade to a flat color, switch, fade back.
    Fade { color: Color },
    /// Distort a live capture of the outgoing scene, switch, distort the incoming one.
    Glitch,
}

/// Configuration for a scene transition.
///
/// Each of the out and in phases lasts the full `duration`.
///
/// # Example
///
/// ```ignore
/// registry.transition("gallery", Transition::fade(Duration::from_millis(500)), &mut ctx);
/// registry.transition("void", Transition::glitch(Duration::from_millis(800)), &mut ctx);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub duration: Duration,
    /// Curve of the out phase (effect 0 to 1).
    pub out_easing: Easing,
    /// Curve of the in phase (effect 1 to 0).
    pub in_easing: Easing,
}

impl Transition {
    /// Fade through black.
    pub fn fade(duration: Duration) -> Self {
        Self::fade_to_color(Color::BLACK, duration)
    }

    /// Fade through an arbitrary color.
    pub fn fade_to_color(color: Color, duration: Duration) -> Self {
        Self {
            kind: TransitionKind::Fade { color },
            duration,
            out_easing: Easing::EaseIn,
            in_easing: Easing::EaseOut,
        }
    }

    pub fn glitch(duration: Duration) -> Self {
        Self {
            kind: TransitionKind::Glitch,
            duration,
            out_easing: Easing::EaseIn,
            in_easing: Easing::EaseOut,
        }
    }

    pub fn easing(mut self, out_easing: Easing, in_easing: Easing) -> Self {
        self.out_easing = out_easing;
        self.in_easing = in_easing;
        self
    }

    pub fn is_glitch(&self) -> bool {
        matches!(self.kind, TransitionKind::Glitch)
    }
}

/// Where the registry is in a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionState {
    #[default]
    Idle,
    /// Effect ramping up over the outgoing scene.
    TransitioningOut,
    /// One frame with the effect fully on; the target is activated.
    Switching,
    /// Effect ramping down over the incoming scene.
    TransitioningIn,
}

/// Immediate answer to a transition request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionRequest {
    /// A new transition is in flight.
    Started,
    /// A transition to the same target is already in flight; nothing changed.
    Duplicate,
    /// A transition to a different target is in flight; the request was dropped.
    Rejected,
    /// Transition resources aren't set up; the scene was switched instantly.
    Immediate,
    /// No scene with that name is registered.
    UnknownScene,
}

/// How a finished transition ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    Completed,
    /// The renderer failed; the rest of the effect was skipped but the
    /// target scene is active.
    EffectFailed(String),
}

/// The transition currently in flight, advanced once per tick.
#[derive(Debug)]
pub struct ActiveTransition {
    pub target: SceneId,
    pub transition: Transition,
    pub state: TransitionState,
    /// Seconds spent in the current phase.
    pub phase_elapsed: f32,
    /// Seconds since the transition started.
    pub elapsed: f32,
    /// Off-screen target for glitch captures, created on the first glitch frame.
    pub capture: Option<CaptureId>,
    /// Whether the target scene has been activated.
    pub switched: bool,
    pub failure: Option<String>,
}

impl ActiveTransition {
    pub fn new(target: SceneId, transition: Transition) -> Self {
        Self {
            target,
            transition,
            state: TransitionState::TransitioningOut,
            phase_elapsed: 0.0,
            elapsed: 0.0,
            capture: None,
            switched: false,
            failure: None,
        }
    }

    /// Advance the clocks by `dt` seconds and return linear phase progress.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.phase_elapsed += dt;
        self.elapsed += dt;
        self.phase_progress()
    }

    pub fn phase_progress(&self) -> f32 {
        let duration = self.transition.duration.as_secs_f32();
        if duration <= 0.0 {
            1.0
        } else {
            (self.phase_elapsed / duration).clamp(0.0, 1.0)
        }
    }

    /// Effect strength (overlay opacity or glitch intensity) for the current phase.
    pub fn effect_value(&self) -> f32 {
        let progress = self.phase_progress();
        match self.state {
            TransitionState::TransitioningOut => self.transition.out_easing.apply(progress),
            TransitionState::Switching => 1.0,
            TransitionState::TransitioningIn => 1.0 - self.transition.in_easing.apply(progress),
            TransitionState::Idle => 0.0,
        }
    }

    pub fn enter(&mut self, state: TransitionState) {
        self.state = state;
        self.phase_elapsed = 0.0;
    }

    pub fn outcome(&self) -> TransitionOutcome {
        match &self.failure {
            Some(message) => TransitionOutcome::EffectFailed(message.clone()),
            None => TransitionOutcome::Completed,
        }
    }
}
