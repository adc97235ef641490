//! Developer scene switcher.
//!
//! Toggled by the debug key. While open, the digit keys jump to the scene
//! with that position in registration order using the regular transition
//! path, and remember it as the scene to start in next time.

use winit::keyboard::KeyCode;

use crate::prefs::Preferences;
use crate::scene::{SceneContext, SceneId, SceneRegistry, Transition, TransitionRequest};

#[derive(Debug, Default)]
pub struct DebugOverlay {
    visible: bool,
}

fn digit(key: KeyCode) -> Option<usize> {
    let n = match key {
        KeyCode::Digit1 | KeyCode::Numpad1 => 1,
        KeyCode::Digit2 | KeyCode::Numpad2 => 2,
        KeyCode::Digit3 | KeyCode::Numpad3 => 3,
        KeyCode::Digit4 | KeyCode::Numpad4 => 4,
        KeyCode::Digit5 | KeyCode::Numpad5 => 5,
        KeyCode::Digit6 | KeyCode::Numpad6 => 6,
        KeyCode::Digit7 | KeyCode::Numpad7 => 7,
        KeyCode::Digit8 | KeyCode::Numpad8 => 8,
        KeyCode::Digit9 | KeyCode::Numpad9 => 9,
        _ => return None,
    };
    Some(n)
}

impl DebugOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        log::debug!("debug overlay {}", if self.visible { "shown" } else { "hidden" });
        self.visible
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// One line per scene: `1 hall*` marks the current scene, `+` the preferred one.
    pub fn lines(&self, registry: &SceneRegistry, prefs: &Preferences) -> Vec<String> {
        let preferred = prefs.preferred_scene();
        registry
            .names()
            .enumerate()
            .map(|(i, name)| {
                let mut line = format!("{} {}", i + 1, name);
                if registry.current() == Some(name) {
                    line.push('*');
                }
                if preferred.as_ref() == Some(name) {
                    line.push('+');
                }
                line
            })
            .collect()
    }

    /// Compact summary suitable for a window title.
    pub fn summary(&self, registry: &SceneRegistry, prefs: &Preferences) -> String {
        format!("[debug] {}", self.lines(registry, prefs).join("  "))
    }

    /// Handle a key while the overlay is open. Returns the scene picked, if any.
    pub fn handle_key(
        &mut self,
        key: KeyCode,
        registry: &mut SceneRegistry,
        prefs: &mut Preferences,
        transition: Transition,
        ctx: &mut SceneContext,
    ) -> Option<SceneId> {
        if !self.visible {
            return None;
        }
        let index = digit(key)? - 1;
        let target = registry.names().nth(index)?.clone();

        match registry.transition(target.as_str(), transition, ctx) {
            TransitionRequest::Started | TransitionRequest::Immediate => {
                if let Err(err) = prefs.set_preferred_scene(&target) {
                    log::warn!("could not remember preferred scene: {}", err);
                }
                Some(target)
            }
            other => {
                log::debug!("debug switch to '{}' ignored: {:?}", target, other);
                None
            }
        }
    }
}
