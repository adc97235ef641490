//! Windowed entry point.
//!
//! [`run`] opens a winit window, builds an [`Engine`] over the wgpu renderer
//! and drives it from the event loop until the window closes.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::engine::{Engine, EngineConfig, EngineError};
use crate::input::Input;
use crate::render::{RenderError, Viewport, WgpuRenderer};
use crate::sound::{SilentSounds, SoundManager, Sounds};

/// Frame steps longer than this are clamped, so a stall doesn't skip a
/// whole transition.
const MAX_FRAME_STEP: f32 = 0.1;

type SetupFn = Box<dyn FnOnce(&mut Engine<WgpuRenderer>)>;

/// Open a window and run the engine until it's closed.
///
/// `setup` registers scenes and loads sounds before the initial scene is
/// activated.
///
/// # Example
/// ```ignore
/// tableau::run(EngineConfig::new().title("Gallery"), |engine| {
///     engine.register(Scene::builder("hall").build());
/// })?;
/// ```
pub fn run<S>(config: EngineConfig, setup: S) -> Result<(), EngineError>
where
    S: FnOnce(&mut Engine<WgpuRenderer>) + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = TableauApp::Pending {
        config,
        setup: Some(Box::new(setup)),
    };
    event_loop.run_app(&mut app)?;

    match app {
        TableauApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

enum TableauApp {
    Pending {
        config: EngineConfig,
        setup: Option<SetupFn>,
    },
    Running {
        window: Arc<Window>,
        engine: Engine<WgpuRenderer>,
        input: Input,
        last_frame: Instant,
        title: String,
    },
    Failed(EngineError),
}

fn open_sounds() -> Box<dyn Sounds> {
    match SoundManager::new() {
        Ok(manager) => Box::new(manager),
        Err(err) => {
            log::warn!("audio unavailable, continuing silently: {}", err);
            Box::new(SilentSounds)
        }
    }
}

impl TableauApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: EngineConfig,
        setup: SetupFn,
    ) -> Result<Self, EngineError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        window.set_cursor_visible(false);

        let renderer = WgpuRenderer::new(Arc::clone(&window))?;
        let title = config.title.clone();
        let mut engine = Engine::new(config, renderer, open_sounds());
        setup(&mut engine);
        engine.start()?;

        window.request_redraw();
        Ok(TableauApp::Running {
            window,
            engine,
            input: Input::new(),
            last_frame: Instant::now(),
            title,
        })
    }
}

impl ApplicationHandler for TableauApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let TableauApp::Pending { config, setup } = self else {
            return;
        };
        let Some(setup) = setup.take() else {
            return;
        };

        *self = match Self::start(event_loop, config.clone(), setup) {
            Ok(running) => running,
            Err(err) => {
                log::error!("failed to start: {}", err);
                event_loop.exit();
                TableauApp::Failed(err)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let TableauApp::Running {
            window,
            engine,
            input,
            last_frame,
            title,
        } = self
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                if engine.dispose() {
                    window.set_cursor_visible(true);
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                engine.resize(Viewport::new(size.width, size.height));
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(*last_frame).as_secs_f32().min(MAX_FRAME_STEP);
                *last_frame = now;

                match engine.tick(dt) {
                    Ok(()) => {}
                    Err(RenderError::Surface(err)) => log::warn!("frame skipped: {}", err),
                    Err(err) => {
                        log::error!("render failed: {}", err);
                        event_loop.exit();
                        return;
                    }
                }

                let wanted = engine
                    .debug_summary()
                    .map(|summary| format!("{}  {}", engine.config().title, summary))
                    .unwrap_or_else(|| engine.config().title.clone());
                if *title != wanted {
                    window.set_title(&wanted);
                    *title = wanted;
                }

                window.request_redraw();
            }
            other => {
                if let Some(event) = input.handle_event(&other) {
                    engine.handle(event);
                }
            }
        }
    }
}
