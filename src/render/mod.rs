//! Renderer seam.
//!
//! The engine core talks to the GPU only through the [`Renderer`] trait:
//! draw a scene graph to the screen, or into an off-screen capture target that
//! the glitch overlay then samples.
//!
//! - [`WgpuRenderer`]: windowed wgpu backend
//! - [`HeadlessRenderer`]: records calls; used by tests and headless runs

mod gpu;
mod headless;
mod target;
mod wgpu_renderer;

pub use gpu::GpuContext;
pub use headless::{HeadlessRenderer, RenderCall};
pub use target::RenderTarget;
pub use wgpu_renderer::WgpuRenderer;

use crate::camera::Camera;
use crate::graph::SceneGraph;

/// Handle to an off-screen capture target owned by a renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CaptureId(pub(crate) u64);

/// Drawable area in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. A degenerate viewport reports 1.0.
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Errors raised by a renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface has no supported format")]
    NoSurfaceFormat,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("unknown capture target {0:?}")]
    UnknownCapture(CaptureId),
    #[error("{0}")]
    Backend(String),
}

/// Draws scene graphs.
pub trait Renderer {
    fn viewport(&self) -> Viewport;

    fn resize(&mut self, viewport: Viewport);

    /// Allocate an off-screen target sized to the current viewport.
    fn create_capture(&mut self) -> Result<CaptureId, RenderError>;

    /// Render `graph` through `camera` into `target`.
    fn capture(
        &mut self,
        graph: &SceneGraph,
        camera: &Camera,
        target: CaptureId,
    ) -> Result<(), RenderError>;

    /// Free a capture target. Unknown ids are ignored.
    fn release_capture(&mut self, target: CaptureId);

    /// Render `graph` through `camera` to the screen.
    fn render(&mut self, graph: &SceneGraph, camera: &Camera, time: f32)
    -> Result<(), RenderError>;
}
