use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{error, info};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{
    ElementState, Event, KeyboardInput, MouseButton as WinitMouseButton, MouseScrollDelta,
    WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use meshview::{
    dispatch_keyboard, load_model, model_matrix, mouse_reaches_camera, print_model_summary,
    reload_needed, Camera, FrameCamera, GpuModel, InputState, KeyCode, NamedKey, ObjModel,
    ParamPanel, Renderer, SceneSettings,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let model = load_model(Path::new(&options.path))
        .with_context(|| format!("failed to load model {}", options.path))?;
    print_model_summary(&model);

    if options.summary_only {
        return Ok(());
    }

    match run_interactive(&options.path, model) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn run_interactive(model_path: &str, model: ObjModel) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Model Viewer")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let renderer = block_on(Renderer::new(Arc::clone(&window)))?;
    let panel = ParamPanel::new(
        &event_loop,
        renderer.device(),
        renderer.surface_format(),
        model_path,
    );

    let source_dir = model_dir(Path::new(model_path));
    let gpu_model = GpuModel::upload(&renderer, &model, &source_dir);

    let now = Instant::now();
    let mut app = AppState {
        renderer,
        model: Some(gpu_model),
        camera: Camera::default(),
        input: Arc::new(InputState::new()),
        settings: SceneSettings::new(model_path),
        panel,
        last_cursor: None,
        started: now,
        last_frame: now,
        frame_ms: 0.0,
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    if let Some(err) = app.last_error {
        return Err(err);
    }

    Ok(())
}

fn model_dir(path: &Path) -> PathBuf {
    path.parent().unwrap_or_else(|| Path::new("")).to_path_buf()
}

struct AppState {
    renderer: Renderer,
    model: Option<GpuModel>,
    camera: Camera,
    input: Arc<InputState>,
    settings: SceneSettings,
    panel: ParamPanel,
    last_cursor: Option<Vec2>,
    started: Instant,
    last_frame: Instant,
    frame_ms: f32,
    last_error: Option<anyhow::Error>,
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                let consumed = self.panel.handle_event(event);
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                    }
                    WindowEvent::KeyboardInput { input, .. } if !consumed => {
                        self.handle_keyboard(input, control_flow);
                    }
                    // Button releases must reach the camera even when the
                    // panel owns the pointer: during free-look the hidden
                    // cursor can sit over the panel when the right button
                    // comes up, and the exit transition is unconditional.
                    WindowEvent::MouseInput { state, button, .. }
                        if mouse_reaches_camera(
                            consumed,
                            *state == ElementState::Released,
                            self.camera.free_look_enabled(),
                        ) =>
                    {
                        self.handle_mouse_button(*state, *button);
                    }
                    WindowEvent::CursorMoved { position, .. }
                        if mouse_reaches_camera(
                            consumed,
                            false,
                            self.camera.free_look_enabled(),
                        ) =>
                    {
                        let pos = Vec2::new(position.x as f32, position.y as f32);
                        self.handle_cursor_moved(pos);
                    }
                    WindowEvent::MouseWheel { delta, .. }
                        if mouse_reaches_camera(
                            consumed,
                            false,
                            self.camera.free_look_enabled(),
                        ) =>
                    {
                        let dy = match delta {
                            MouseScrollDelta::LineDelta(_, y) => *y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                        };
                        self.input.push_scroll(dy);
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                self.redraw()?;
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_ms = if self.frame_ms == 0.0 {
            dt * 1000.0
        } else {
            self.frame_ms * 0.9 + dt * 100.0
        };

        dispatch_keyboard(&self.input, &mut self.camera, dt);
        let scroll = self.input.take_scroll();
        if self.camera.free_look_enabled() {
            self.camera.process_scroll(scroll);
        }

        let panel_output =
            self.panel
                .run(self.renderer.window(), &mut self.settings, self.frame_ms);
        if let Some(requested) = panel_output.requested_model {
            self.settings.model_path = requested.clone();
            self.maybe_reload(Path::new(&requested));
        }

        let frame_camera = FrameCamera {
            view_proj: self.camera.projection_matrix(self.renderer.aspect())
                * self.camera.view_matrix(),
            position: self.camera.position,
        };
        self.renderer.update_globals(&frame_camera, &self.settings);
        self.renderer
            .update_object(model_matrix(self.started.elapsed().as_secs_f32()));

        if let Err(err) = self.renderer.render(self.model.as_ref(), &mut self.panel) {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    let size = self.renderer.window().inner_size();
                    self.renderer.resize(size);
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    info!("Surface timeout; retrying next frame");
                }
            }
        }
        Ok(())
    }

    /// Reloads when the requested path points into a different directory
    /// than the resident model. A parse failure keeps the current model on
    /// screen; the next load request retries the path.
    fn maybe_reload(&mut self, requested: &Path) {
        let loaded_dir = self.model.as_ref().map(GpuModel::source_dir);
        if !reload_needed(loaded_dir, requested) {
            return;
        }

        match load_model(requested) {
            Ok(parsed) => {
                // Release the old model's GPU resources before uploading the
                // replacement.
                self.model = None;
                let dir = model_dir(requested);
                self.model = Some(GpuModel::upload(&self.renderer, &parsed, &dir));
                info!("loaded model {}", requested.display());
            }
            Err(err) => {
                error!("failed to load {}: {err}", requested.display());
            }
        }
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput, control_flow: &mut ControlFlow) {
        let Some(keycode) = input.virtual_keycode.and_then(map_keycode) else {
            return;
        };
        if keycode == KeyCode::Named(NamedKey::Escape) && input.state == ElementState::Pressed {
            control_flow.set_exit();
            return;
        }
        match input.state {
            ElementState::Pressed => self.input.set_key_down(keycode),
            ElementState::Released => self.input.set_key_up(keycode),
        }
    }

    fn handle_mouse_button(&mut self, state: ElementState, button: WinitMouseButton) {
        let index = match button {
            WinitMouseButton::Left => 0,
            WinitMouseButton::Right => 1,
            WinitMouseButton::Middle => 2,
            WinitMouseButton::Other(value) => value,
        } as u8;
        let mapped = meshview::MouseButton::new(index);
        match state {
            ElementState::Pressed => self.input.set_mouse_button_down(mapped),
            ElementState::Released => self.input.set_mouse_button_up(mapped),
        }

        if mapped == meshview::MouseButton::RIGHT {
            match state {
                ElementState::Pressed => {
                    self.camera.enter_free_look();
                    self.renderer.window().set_cursor_visible(false);
                }
                ElementState::Released => {
                    self.camera.exit_free_look();
                    self.renderer.window().set_cursor_visible(true);
                }
            }
        }
    }

    fn handle_cursor_moved(&mut self, pos: Vec2) {
        self.input.set_mouse_position(pos);
        if let Some(last) = self.last_cursor {
            // Screen Y grows downward; the camera expects up-positive pitch.
            let dx = pos.x - last.x;
            let dy = last.y - pos.y;
            self.camera.process_mouse_movement(dx, dy);
        }
        self.last_cursor = Some(pos);
    }
}

fn map_keycode(code: winit::event::VirtualKeyCode) -> Option<KeyCode> {
    use winit::event::VirtualKeyCode as Key;
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::Return => KeyCode::Named(NamedKey::Enter),
        Key::Tab => KeyCode::Named(NamedKey::Tab),
        Key::Left => KeyCode::Named(NamedKey::Left),
        Key::Right => KeyCode::Named(NamedKey::Right),
        Key::Up => KeyCode::Named(NamedKey::Up),
        Key::Down => KeyCode::Named(NamedKey::Down),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::Back => KeyCode::Named(NamedKey::Backspace),
        Key::Home => KeyCode::Named(NamedKey::Home),
        Key::End => KeyCode::Named(NamedKey::End),
        Key::PageUp => KeyCode::Named(NamedKey::PageUp),
        Key::PageDown => KeyCode::Named(NamedKey::PageDown),
        Key::LShift => KeyCode::Named(NamedKey::LeftShift),
        Key::RShift => KeyCode::Named(NamedKey::RightShift),
        Key::LControl => KeyCode::Named(NamedKey::LeftCtrl),
        Key::RControl => KeyCode::Named(NamedKey::RightCtrl),
        Key::LAlt => KeyCode::Named(NamedKey::LeftAlt),
        Key::RAlt => KeyCode::Named(NamedKey::RightAlt),
        Key::Key0 => KeyCode::Digit(0),
        Key::Key1 => KeyCode::Digit(1),
        Key::Key2 => KeyCode::Digit(2),
        Key::Key3 => KeyCode::Digit(3),
        Key::Key4 => KeyCode::Digit(4),
        Key::Key5 => KeyCode::Digit(5),
        Key::Key6 => KeyCode::Digit(6),
        Key::Key7 => KeyCode::Digit(7),
        Key::Key8 => KeyCode::Digit(8),
        Key::Key9 => KeyCode::Digit(9),
        Key::A => KeyCode::Character('A'),
        Key::B => KeyCode::Character('B'),
        Key::C => KeyCode::Character('C'),
        Key::D => KeyCode::Character('D'),
        Key::E => KeyCode::Character('E'),
        Key::F => KeyCode::Character('F'),
        Key::G => KeyCode::Character('G'),
        Key::H => KeyCode::Character('H'),
        Key::I => KeyCode::Character('I'),
        Key::J => KeyCode::Character('J'),
        Key::K => KeyCode::Character('K'),
        Key::L => KeyCode::Character('L'),
        Key::M => KeyCode::Character('M'),
        Key::N => KeyCode::Character('N'),
        Key::O => KeyCode::Character('O'),
        Key::P => KeyCode::Character('P'),
        Key::Q => KeyCode::Character('Q'),
        Key::R => KeyCode::Character('R'),
        Key::S => KeyCode::Character('S'),
        Key::T => KeyCode::Character('T'),
        Key::U => KeyCode::Character('U'),
        Key::V => KeyCode::Character('V'),
        Key::W => KeyCode::Character('W'),
        Key::X => KeyCode::Character('X'),
        Key::Y => KeyCode::Character('Y'),
        Key::Z => KeyCode::Character('Z'),
        Key::F1 => KeyCode::Function(1),
        Key::F2 => KeyCode::Function(2),
        Key::F3 => KeyCode::Function(3),
        Key::F4 => KeyCode::Function(4),
        Key::F5 => KeyCode::Function(5),
        Key::F6 => KeyCode::Function(6),
        Key::F7 => KeyCode::Function(7),
        Key::F8 => KeyCode::Function(8),
        Key::F9 => KeyCode::Function(9),
        Key::F10 => KeyCode::Function(10),
        Key::F11 => KeyCode::Function(11),
        Key::F12 => KeyCode::Function(12),
        _ => return None,
    })
}

struct CliOptions {
    path: String,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!("Usage: meshview <model.obj> [--summary-only]"));
        };
        let mut summary_only = false;
        for arg in args {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                other => {
                    return Err(anyhow!("Unknown argument: {other}. Expected --summary-only"));
                }
            }
        }
        Ok(Self { path, summary_only })
    }
}
