//! Core GPU context and device management.
//!
//! [`GpuContext`] holds the wgpu device, queue, surface and surface
//! configuration for the window. It is created once by the windowed renderer
//! and handed by reference to everything that uploads or draws.

use std::sync::Arc;
use winit::window::Window;

use super::{RenderError, Viewport};

/// Core GPU context holding wgpu resources.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a GPU context for a window.
    ///
    /// Picks the primary backends, the default adapter for the surface and an
    /// sRGB surface format when one is offered.
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Tableau Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::NoSurfaceFormat)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        log::info!(
            "GPU ready: {:?}, {}x{} {:?}",
            adapter.get_info().backend,
            config.width,
            config.height,
            surface_format
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    /// Resize the surface. Zero-sized dimensions (minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    /// Re-apply the current configuration after the surface was lost.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}
