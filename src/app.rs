//! Application shell.
//!
//! Owns the window, the GPU backend and the shader registry, and translates
//! winit events into [`InteractionController`] calls. The loop is
//! frame-driven: while `animating` it redraws continuously, otherwise it only
//! redraws after a mutation requests one.
//!
//! Keys: shift-click picks, left-drag rotates, right-drag pans, scroll zooms.
//! `S`/`G` enter scale/translate mode, `X`/`Y`/`Z` choose the gizmo axis,
//! `Escape` unwinds gizmo -> selection ->
//! exit, `Delete` removes the selection, digits 1-6 snap views, `H` homes,
//! `C`/`V`/`R` store/recall/reset the camera, `O` switches lens, `W` cycles
//! draw style, `Q` toggles shading, `L` lighting, `K` head light, `I`
//! directional light, `P` profiling, `Space` animation.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use cgmath::Point2;
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use crate::gfx::backend::{GpuBackend, WgpuBackend};
use crate::gfx::camera::{Camera, Lens};
use crate::gfx::gnomon::Gnomon;
use crate::gfx::interaction::{Axis, InteractionController, ViewDirection};
use crate::gfx::scene::{DrawStyle, Shading, World};
use crate::gfx::shaders::{initialize_shader_registry, ShaderRegistry};

const ZOOM_STEP: f32 = 0.1;
const STATS_INTERVAL_FRAMES: u32 = 120;

/// Frame-time accumulator; reports averages to the log every couple of
/// seconds while profiling is on.
#[derive(Debug, Default)]
pub struct RenderStats {
    frames: u32,
    cpu_ms_total: f32,
    last_gpu_ms: Option<f32>,
}

impl RenderStats {
    pub fn record(&mut self, cpu_ms: f32, gpu_ms: Option<f32>) {
        self.frames += 1;
        self.cpu_ms_total += cpu_ms;
        if gpu_ms.is_some() {
            self.last_gpu_ms = gpu_ms;
        }
        if self.frames >= STATS_INTERVAL_FRAMES {
            let avg = self.cpu_ms_total / self.frames as f32;
            match self.last_gpu_ms {
                Some(gpu) => info!("frame avg {avg:.2} ms cpu, last {gpu:.2} ms gpu"),
                None => info!("frame avg {avg:.2} ms cpu"),
            }
            self.frames = 0;
            self.cpu_ms_total = 0.0;
        }
    }
}

pub struct PolyviewApp {
    state: AppState,
}

struct AppState {
    window: Option<Arc<Window>>,
    backend: Option<WgpuBackend>,
    registry: Option<ShaderRegistry>,
    startup_error: Option<anyhow::Error>,

    pub world: World,
    gnomon: Gnomon,
    controller: InteractionController,

    animating: bool,
    needs_redraw: bool,
    profiling: bool,
    stats: RenderStats,

    size: (u32, u32),
    cursor: Point2<f32>,
    shift: bool,
    panning: bool,
    last_frame: Instant,
}

impl Default for PolyviewApp {
    fn default() -> Self {
        Self::new()
    }
}

impl PolyviewApp {
    pub fn new() -> Self {
        let mut world = World::new(Camera::new(cgmath::Vector3::new(0.0, 0.0, 3.5), 1.0));
        let mut controller = InteractionController::new();
        controller.set_view(&mut world, ViewDirection::Home);
        world.camera.store();
        Self {
            state: AppState {
                window: None,
                backend: None,
                registry: None,
                startup_error: None,
                world,
                gnomon: Gnomon::new(),
                controller,
                animating: false,
                needs_redraw: true,
                profiling: false,
                stats: RenderStats::default(),
                size: (1, 1),
                cursor: Point2::new(0.0, 0.0),
                shift: false,
                panning: false,
                last_frame: Instant::now(),
            },
        }
    }

    /// Mutable access to the world for scene setup before `run`.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.state.world
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        env_logger::init();
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop
            .run_app(&mut self.state)
            .context("event loop failed")?;

        match self.state.startup_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn request_update(&mut self) {
        self.needs_redraw = true;
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn ndc(&self, x: f64, y: f64) -> Point2<f32> {
        let (w, h) = self.size;
        Point2::new(
            2.0 * x as f32 / w.max(1) as f32 - 1.0,
            1.0 - 2.0 * y as f32 / h.max(1) as f32,
        )
    }

    fn render_frame(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let Some(registry) = self.registry.as_ref() else {
            return;
        };
        let cpu_start = Instant::now();

        let elapsed_ms = self.last_frame.elapsed().as_secs_f32() * 1000.0;
        self.last_frame = Instant::now();
        if self.animating {
            self.controller.trackball.advance(elapsed_ms);
        }

        self.controller.revalidate(&mut self.world, backend);
        self.controller.sync_camera(&mut self.world);
        self.gnomon.sync(&self.world.camera);

        if self.profiling {
            backend.begin_timed_frame();
        }
        self.world.render(backend, registry);
        self.gnomon.render(&self.world, backend, registry);
        backend.end_frame();

        let gpu_ms = backend.poll_elapsed_ms();
        if self.profiling {
            self.stats
                .record(cpu_start.elapsed().as_secs_f32() * 1000.0, gpu_ms);
        }
        self.needs_redraw = false;
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        // the backend is live once the window exists; commands that need it
        // bail out quietly before then
        macro_rules! with_backend {
            (|$b:ident| $body:expr) => {
                if let Some(mut $b) = self.backend.take() {
                    $body;
                    self.backend = Some($b);
                    self.request_update();
                }
            };
        }

        match code {
            KeyCode::Escape => {
                if self.controller.active_axis().is_some()
                    || self.controller.selected().is_some()
                {
                    with_backend!(|b| {
                        if self.controller.active_axis().is_some() {
                            self.controller.finish_manipulation(&mut self.world, &mut b);
                        } else {
                            self.controller.deselect(&mut self.world, &mut b);
                        }
                    });
                } else {
                    event_loop.exit();
                }
            }
            KeyCode::KeyS => with_backend!(|b| self
                .controller
                .begin_scale(&mut self.world, &mut b)),
            KeyCode::KeyG => with_backend!(|b| self
                .controller
                .begin_translate(&mut self.world, &mut b)),
            KeyCode::Delete | KeyCode::Backspace => with_backend!(|b| self
                .controller
                .delete_selected(&mut self.world, &mut b)),

            KeyCode::KeyX => self.choose_axis(Axis::X),
            KeyCode::KeyY => self.choose_axis(Axis::Y),
            KeyCode::KeyZ => self.choose_axis(Axis::Z),

            KeyCode::Digit1 => self.snap_view(ViewDirection::Front),
            KeyCode::Digit2 => self.snap_view(ViewDirection::Back),
            KeyCode::Digit3 => self.snap_view(ViewDirection::Left),
            KeyCode::Digit4 => self.snap_view(ViewDirection::Right),
            KeyCode::Digit5 => self.snap_view(ViewDirection::Top),
            KeyCode::Digit6 => self.snap_view(ViewDirection::Bottom),
            KeyCode::KeyH => self.snap_view(ViewDirection::Home),

            KeyCode::KeyC => {
                self.world.camera.store();
                info!("camera stored");
            }
            KeyCode::KeyV => {
                self.world.camera.recall();
                self.request_update();
            }
            KeyCode::KeyR => {
                self.world.camera.reset();
                self.controller
                    .trackball
                    .reset(ViewDirection::Home.rotation());
                self.request_update();
            }
            KeyCode::KeyO => {
                let lens = match self.world.camera.lens() {
                    Lens::Perspective => Lens::Orthographic,
                    Lens::Orthographic => Lens::Perspective,
                };
                self.world.camera.set_lens(lens);
                self.request_update();
            }
            KeyCode::KeyW => {
                self.world.scene.draw_style = match self.world.scene.draw_style {
                    DrawStyle::Points => DrawStyle::Wireframe,
                    DrawStyle::Wireframe => DrawStyle::Solid,
                    DrawStyle::Solid => DrawStyle::SolidWithEdges,
                    DrawStyle::SolidWithEdges => DrawStyle::Points,
                };
                self.request_update();
            }
            KeyCode::KeyQ => {
                self.world.scene.shading = match self.world.scene.shading {
                    Shading::Low => Shading::High,
                    Shading::High => Shading::Low,
                };
                self.request_update();
            }
            KeyCode::KeyL => {
                self.world.lighting = !self.world.lighting;
                self.request_update();
            }
            KeyCode::KeyK => {
                let head = !self.world.light.head_light;
                self.world.light.set_head_light(head);
                self.request_update();
            }
            KeyCode::KeyI => {
                let directional = !self.world.light.directional;
                self.world.light.set_directional(directional);
                self.request_update();
            }
            KeyCode::KeyP => {
                self.profiling = !self.profiling;
                info!(
                    "profiling {}",
                    if self.profiling { "on" } else { "off" }
                );
            }
            KeyCode::Space => {
                self.animating = !self.animating;
                self.controller.trackball.set_paused(!self.animating);
                self.last_frame = Instant::now();
                self.request_update();
            }
            _ => {}
        }
    }

    fn snap_view(&mut self, view: ViewDirection) {
        self.controller.set_view(&mut self.world, view);
        self.request_update();
    }

    fn choose_axis(&mut self, axis: Axis) {
        self.controller.select_axis(&mut self.world, axis);
        self.request_update();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            WindowAttributes::default()
                .with_title("polyview")
                .with_inner_size(winit::dpi::LogicalSize::new(1200, 800)),
        ) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.startup_error = Some(anyhow::Error::new(err).context("window creation"));
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let (width, height) = window.inner_size().into();
        self.size = (width, height);
        self.world.camera.set_aspect_ratio(width as f32 / height.max(1) as f32);

        let mut backend =
            pollster::block_on(async move { WgpuBackend::new(window, width, height).await });

        match initialize_shader_registry(&mut backend) {
            Ok(registry) => {
                // actors added before the window existed have no buffers yet
                for actor in self.world.scene.iter_mut() {
                    actor.upload(&mut backend);
                }
                self.gnomon.upload(&mut backend);
                self.registry = Some(registry);
                self.backend = Some(backend);
                self.request_update();
            }
            Err(err) => {
                error!("shader registry initialization failed: {err}");
                self.startup_error =
                    Some(anyhow::Error::new(err).context("shader registry initialization"));
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
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.size = (width, height);
                self.world
                    .camera
                    .set_aspect_ratio(width as f32 / height.max(1) as f32);
                if let Some(backend) = self.backend.as_mut() {
                    backend.resize(width, height);
                }
                self.request_update();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift = modifiers.state().shift_key();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let p = self.ndc(position.x, position.y);
                if self.panning {
                    let delta = p - self.cursor;
                    self.controller
                        .pan(&mut self.world, Point2::new(delta.x, delta.y));
                    self.request_update();
                }
                self.cursor = p;
                self.controller.pointer_moved(&mut self.world, p);
                self.request_update();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let p = self.cursor;
                match (button, state) {
                    (MouseButton::Left, ElementState::Pressed) => {
                        if let Some(mut backend) = self.backend.take() {
                            self.controller.pointer_pressed(
                                &mut self.world,
                                &mut backend,
                                p,
                                self.shift,
                            );
                            self.backend = Some(backend);
                            self.request_update();
                        }
                    }
                    (MouseButton::Left, ElementState::Released) => {
                        if let Some(mut backend) = self.backend.take() {
                            self.controller
                                .pointer_released(&mut self.world, &mut backend, p);
                            self.backend = Some(backend);
                            self.request_update();
                        }
                    }
                    (MouseButton::Right, ElementState::Pressed) => self.panning = true,
                    (MouseButton::Right, ElementState::Released) => self.panning = false,
                    _ => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                self.controller
                    .scroll(&mut self.world, amount * ZOOM_STEP);
                self.request_update();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.animating || self.needs_redraw {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }
}
