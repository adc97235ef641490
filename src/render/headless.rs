use std::collections::HashSet;

use super::{CaptureId, RenderError, Renderer, Viewport};
use crate::camera::Camera;
use crate::graph::{OverlayMaterial, OverlayQuad, SceneGraph, Visible};

/// One call observed by a [`HeadlessRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
    CreateCapture(CaptureId),
    /// `overlay_visible` is whether any transition overlay was drawable while capturing.
    Capture {
        target: CaptureId,
        overlay_visible: bool,
    },
    Release(CaptureId),
    /// `overlay` is the material of the visible overlay, if one was attached.
    Render { overlay: Option<OverlayMaterial> },
}

/// Renderer that draws nothing and records what it was asked to do.
///
/// Failures can be switched on to exercise error paths.
#[derive(Debug)]
pub struct HeadlessRenderer {
    viewport: Viewport,
    next_capture: u64,
    live: HashSet<CaptureId>,
    calls: Vec<RenderCall>,
    fail_captures: bool,
    fail_renders: bool,
}

impl HeadlessRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            next_capture: 1,
            live: HashSet::new(),
            calls: Vec::new(),
            fail_captures: false,
            fail_renders: false,
        }
    }

    /// Make `create_capture` and `capture` fail until switched off.
    pub fn fail_captures(&mut self, fail: bool) {
        self.fail_captures = fail;
    }

    /// Make `render` fail until switched off.
    pub fn fail_renders(&mut self, fail: bool) {
        self.fail_renders = fail;
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Capture targets created and not yet released.
    pub fn live_captures(&self) -> usize {
        self.live.len()
    }

    fn visible_overlay(graph: &SceneGraph) -> Option<OverlayMaterial> {
        graph
            .world()
            .query::<(&OverlayQuad, &Visible)>()
            .iter()
            .find(|(_, (_, visible))| visible.0)
            .map(|(_, (overlay, _))| overlay.material)
    }
}

impl Renderer for HeadlessRenderer {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn create_capture(&mut self) -> Result<CaptureId, RenderError> {
        if self.fail_captures {
            return Err(RenderError::Backend("capture targets unavailable".into()));
        }
        let id = CaptureId(self.next_capture);
        self.next_capture += 1;
        self.live.insert(id);
        self.calls.push(RenderCall::CreateCapture(id));
        Ok(id)
    }

    fn capture(
        &mut self,
        graph: &SceneGraph,
        _camera: &Camera,
        target: CaptureId,
    ) -> Result<(), RenderError> {
        if self.fail_captures {
            return Err(RenderError::Backend("capture failed".into()));
        }
        if !self.live.contains(&target) {
            return Err(RenderError::UnknownCapture(target));
        }
        self.calls.push(RenderCall::Capture {
            target,
            overlay_visible: Self::visible_overlay(graph).is_some(),
        });
        Ok(())
    }

    fn release_capture(&mut self, target: CaptureId) {
        if self.live.remove(&target) {
            self.calls.push(RenderCall::Release(target));
        }
    }

    fn render(
        &mut self,
        graph: &SceneGraph,
        _camera: &Camera,
        _time: f32,
    ) -> Result<(), RenderError> {
        if self.fail_renders {
            return Err(RenderError::Backend("render failed".into()));
        }
        self.calls.push(RenderCall::Render {
            overlay: Self::visible_overlay(graph),
        });
        Ok(())
    }
}
