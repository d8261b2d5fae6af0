//! Application event loop.
//!
//! [`App`] is the composition root. It owns the tokio runtime the model load runs on, the
//! [`Showroom`] scene, the control panel and, once the window exists, the GPU context and
//! renderers. Every redraw runs the same steps:
//!
//! 1. Drain load progress and, when the load finished, attach the model or record the failure
//! 2. Advance auto-rotation
//! 3. Step the orbit camera
//! 4. Build the GUI (control panel and loading overlay)
//! 5. Render shadows, the scene and the GUI, then present
//! 6. Request the next frame

use std::{iter, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::Context,
    gui::{GuiHost, overlay, panel::ControlPanel},
    pipelines::gui::GuiRenderer,
    render::SceneRenderer,
    resources::{self, PendingLoad},
    scene::composer::Showroom,
};

/// Everything that needs a window.
struct AppState {
    ctx: Context,
    renderer: SceneRenderer,
    gui: GuiHost,
    gui_renderer: GuiRenderer,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &ViewerConfig, showroom: &Showroom) -> anyhow::Result<Self> {
        let ctx = Context::new(window.clone(), &showroom.lights, config.clear_colour).await?;
        let renderer = SceneRenderer::new(&ctx.device, &ctx.queue);
        let gui = GuiHost::new(&window);
        if let Some(font) = &config.cjk_font {
            if let Err(e) = gui.install_font(font) {
                log::warn!("{e:#}");
            }
        } else if config.locale.needs_cjk_font() {
            log::warn!("locale {:?} needs a CJK font, set SHOWROOM_CJK_FONT", config.locale);
        }
        let gui_renderer = GuiRenderer::new(&ctx.device, ctx.config.format);
        Ok(Self {
            ctx,
            renderer,
            gui,
            gui_renderer,
            is_surface_configured: true,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(width, height);
            self.is_surface_configured = true;
        } else {
            self.is_surface_configured = false;
        }
    }

    fn render(&mut self, showroom: &mut Showroom, panel: &mut ControlPanel) -> Result<(), wgpu::CurrentSurfaceTexture> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        // Acquire the frame before building the GUI so its texture delta is never dropped.
        let output = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => texture,
            other => return Err(other),
        };
        self.ctx.camera.update(&self.ctx.queue, &self.ctx.projection);

        let window = self.ctx.window.clone();
        let locale = panel.locale();
        let gui_output = self.gui.run_ui(&window, |ctx| {
            panel.show(ctx, showroom);
            overlay::show(ctx, showroom.status(), locale);
        });
        self.gui_renderer
            .update_textures(&self.ctx.device, &self.ctx.queue, &gui_output.textures_delta);

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.renderer
            .render(&mut self.ctx, &mut encoder, &view, showroom.graph(), &showroom.lights);

        self.gui_renderer.render(
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &view,
            &gui_output.clipped_primitives,
            gui_output.pixels_per_point,
            gui_output.screen_size_px,
        );

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        self.gui_renderer.free_textures(&gui_output.textures_delta);
        Ok(())
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: ViewerConfig,
    state: Option<AppState>,
    showroom: Showroom,
    panel: ControlPanel,
    pending: Option<PendingLoad>,
    load_started: Instant,
    /// First fatal error, returned from [`run`].
    fatal: Option<anyhow::Error>,
}

impl App {
    /// Build the scene and start loading the model in the background.
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let async_runtime = tokio::runtime::Runtime::new()?;
        let showroom = Showroom::new(&config);
        let panel = ControlPanel::new(config.locale);
        let path = resources::resolve_asset_path(&config.model_path);
        log::info!("loading model from {}", path.display());
        let pending = PendingLoad::spawn(async_runtime.handle(), path);

        Ok(Self {
            async_runtime,
            config,
            state: None,
            showroom,
            panel,
            pending: Some(pending),
            load_started: Instant::now(),
            fatal: None,
        })
    }

    /// Feed load progress into the scene and swap in the model once it arrived.
    fn pump_load(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        for progress in pending.drain_progress() {
            self.showroom.record_progress(progress);
        }
        let Some(outcome) = pending.poll_outcome() else {
            return;
        };
        match outcome {
            Ok(model) => {
                log::info!(
                    "model decoded in {:.2}s ({} nodes)",
                    self.load_started.elapsed().as_secs_f32(),
                    model.len()
                );
                // A failed attach is recorded in the load status.
                let _ = self.showroom.attach_model(model);
            }
            Err(e) => self.showroom.fail_load(e.to_string()),
        }
        self.pending = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes().with_title(self.config.window_title.clone());
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fatal = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        match self
            .async_runtime
            .block_on(AppState::new(window.clone(), &self.config, &self.showroom))
        {
            Ok(state) => {
                self.state = Some(state);
                window.request_redraw();
            }
            Err(e) => {
                log::error!("GPU setup failed: {e:#}");
                self.fatal = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let consumed = state.gui.on_window_event(&state.ctx.window, &event);
        if !consumed {
            state.ctx.camera.controller.handle_window_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                self.pump_load();
                self.showroom.tick();
                let Some(state) = self.state.as_mut() else {
                    return;
                };
                match state.render(&mut self.showroom, &mut self.panel) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated) => {
                        log::warn!("surface lost, reconfiguring");
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {:?}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Open the showroom window and run until it is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;

    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
