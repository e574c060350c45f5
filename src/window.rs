use std::{sync::Arc, time::Instant};

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::{
    config::Settings,
    controller::LookMoveController,
    frame_loop::{FrameLoop, FrameScheduler},
    input::{InputState, Key},
    render::Renderer,
    rendering::GpuRenderer,
    solar_system::SolarSystem,
};

struct RedrawScheduler<'a>(&'a Window);

impl FrameScheduler for RedrawScheduler<'_> {
    fn schedule_next_frame(&mut self) {
        self.0.request_redraw();
    }
}

struct AppState {
    renderer: GpuRenderer,
    system: SolarSystem,
    frame_loop: FrameLoop,
}

struct App {
    settings: Settings,
    input: InputState,
    state: Option<AppState>,
    start: Instant,
    pointer_locked: bool,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(settings: Settings) -> Self {
        let input =
            InputState::new(settings.time_scale).with_pointer_sensitivity(settings.sensitivity);

        Self {
            settings,
            input,
            state: None,
            start: Instant::now(),
            pointer_locked: false,
            error: None,
        }
    }

    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attributes = Window::default_attributes()
            .with_title("Orrery")
            .with_inner_size(PhysicalSize::new(self.settings.width, self.settings.height));
        let window = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")?;

        let mut renderer = pollster::block_on(GpuRenderer::new(Arc::new(window)))?;

        let size = renderer.size;
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let system = SolarSystem::build(&self.settings.solar_system(), aspect, &mut renderer)
            .context("Failed to build the solar system")?;

        let controller = LookMoveController::new(self.settings.damping);
        let frame_loop = FrameLoop::new(elapsed_ms(self.start), controller);

        renderer.window.request_redraw();

        Ok(AppState {
            renderer,
            system,
            frame_loop,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn lock_pointer(&mut self, window: &Window) {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));

        match grabbed {
            Ok(()) => {
                window.set_cursor_visible(false);
                self.pointer_locked = true;
            }
            Err(error) => log::warn!("Pointer lock unavailable: {error}"),
        }
    }

    fn release_pointer(&mut self, window: &Window) {
        if let Err(error) = window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("Failed to release pointer: {error}");
        }
        window.set_cursor_visible(true);
        self.pointer_locked = false;
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn keycode_to_key(keycode: KeyCode) -> Option<Key> {
    match keycode {
        KeyCode::KeyW => Some(Key::KeyW),
        KeyCode::KeyA => Some(Key::KeyA),
        KeyCode::KeyS => Some(Key::KeyS),
        KeyCode::KeyD => Some(Key::KeyD),
        KeyCode::ArrowUp => Some(Key::ArrowUp),
        KeyCode::ArrowDown => Some(Key::ArrowDown),
        KeyCode::Escape => Some(Key::Escape),
        _ => None,
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => self.state = Some(state),
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    let camera = state.system.camera_mut();
                    camera.set_aspect(new_size.width as f32 / new_size.height as f32);
                    camera.update_projection_matrix();
                }
                state.renderer.set_size(new_size.width, new_size.height);
            }
            WindowEvent::Focused(false) => {
                self.input.release_all();
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } if !self.pointer_locked => {
                let window = state.renderer.window.clone();
                self.lock_pointer(&window);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(keycode) = event.physical_key else {
                    return;
                };
                let Some(key) = keycode_to_key(keycode) else {
                    return;
                };

                let pressed = event.state == ElementState::Pressed;
                if key == Key::Escape && pressed && self.pointer_locked {
                    let window = state.renderer.window.clone();
                    self.release_pointer(&window);
                }
                self.input.key_changed(key, pressed);
            }
            WindowEvent::RedrawRequested => {
                let now = elapsed_ms(self.start);
                let window = state.renderer.window.clone();
                let mut scheduler = RedrawScheduler(&window);

                let result = state.frame_loop.tick(
                    now,
                    &mut state.system,
                    &self.input,
                    &mut state.renderer,
                    &mut scheduler,
                );

                if let Err(error) = result {
                    self.fail(event_loop, error.context("Frame failed"));
                }
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.pointer_locked {
                self.input.pointer_moved(dx as f32, dy as f32);
            }
        }
    }
}

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(settings);
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
