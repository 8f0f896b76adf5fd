use glam::Vec3;
use winit::event_loop::EventLoop;
use winit::window::Window;

use crate::settings::SceneSettings;

/// Values the panel hands back to the frame loop.
#[derive(Debug, Default)]
pub struct PanelOutput {
    /// Path submitted through the model field; the loop feeds it into the
    /// reload check.
    pub requested_model: Option<String>,
}

/// On-screen parameter editor: an egui overlay painted after the scene pass.
///
/// Owns the egui context, the winit translation state, and the wgpu painter.
/// Events consumed by the panel (clicks and drags over widgets) must not
/// reach the camera; `handle_event` reports that.
pub struct ParamPanel {
    context: egui::Context,
    winit_state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
    model_path_edit: String,
}

impl ParamPanel {
    pub fn new(
        event_loop: &EventLoop<()>,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        initial_model_path: &str,
    ) -> Self {
        Self {
            context: egui::Context::default(),
            winit_state: egui_winit::State::new(event_loop),
            renderer: egui_wgpu::Renderer::new(device, surface_format, None, 1),
            paint_jobs: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
            pixels_per_point: 1.0,
            model_path_edit: initial_model_path.to_string(),
        }
    }

    /// Feeds a window event to egui. Returns true when the panel consumed
    /// it and the rest of the application should ignore it.
    pub fn handle_event(&mut self, event: &winit::event::WindowEvent<'_>) -> bool {
        self.winit_state.on_event(&self.context, event).consumed
    }

    /// Runs the editor UI for this frame and stores the tessellated output
    /// for [`ParamPanel::paint`].
    pub fn run(
        &mut self,
        window: &Window,
        settings: &mut SceneSettings,
        frame_ms: f32,
    ) -> PanelOutput {
        self.pixels_per_point = window.scale_factor() as f32;
        self.winit_state.set_pixels_per_point(self.pixels_per_point);

        let mut output = PanelOutput::default();
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, |ctx| {
            editor_window(ctx, settings, &mut self.model_path_edit, frame_ms, &mut output);
        });

        self.winit_state
            .handle_platform_output(window, &self.context, full_output.platform_output);
        self.paint_jobs = self.context.tessellate(full_output.shapes);
        self.textures_delta = full_output.textures_delta;
        output
    }

    /// Paints the UI stored by the last [`ParamPanel::run`] call in its own
    /// render pass (load-op Load, so the scene underneath survives).
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
    ) {
        for (id, delta) in &self.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }

        let screen = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: self.pixels_per_point,
        };
        let callback_buffers =
            self.renderer
                .update_buffers(device, queue, encoder, &self.paint_jobs, &screen);
        if !callback_buffers.is_empty() {
            queue.submit(callback_buffers);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("panel-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.renderer.render(&mut pass, &self.paint_jobs, &screen);
        }

        for id in &self.textures_delta.free {
            self.renderer.free_texture(id);
        }
        self.textures_delta = egui::TexturesDelta::default();
    }
}

fn editor_window(
    ctx: &egui::Context,
    settings: &mut SceneSettings,
    model_path_edit: &mut String,
    frame_ms: f32,
    output: &mut PanelOutput,
) {
    egui::Window::new("Editor").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label("Model");
            ui.text_edit_singleline(model_path_edit);
            if ui.button("Load").clicked() {
                output.requested_model = Some(model_path_edit.clone());
            }
        });

        ui.separator();
        ui.label("Material properties");
        ui.add(
            egui::Slider::new(&mut settings.material.shininess, 0.0..=5.0)
                .text("Object shininess"),
        );
        ui.add(
            egui::Slider::new(&mut settings.light_intensity, 0.0..=5.0)
                .text("Light intensity multiplier"),
        );
        color_edit(ui, "Material ambient", &mut settings.material.ambient);
        color_edit(ui, "Material diffuse", &mut settings.material.diffuse);
        color_edit(ui, "Material specular", &mut settings.material.specular);

        for (index, light) in settings.lights.iter_mut().enumerate() {
            ui.separator();
            ui.label(format!("Light {index} properties"));
            ui.add(egui::Slider::new(&mut light.constant, 0.0..=5.0).text("Constant"));
            ui.add(egui::Slider::new(&mut light.linear, 0.0..=5.0).text("Linear"));
            ui.add(egui::Slider::new(&mut light.quadratic, 0.0..=5.0).text("Quadratic"));
        }

        ui.separator();
        if frame_ms > 0.0 {
            ui.label(format!(
                "Application average {frame_ms:.3} ms/frame ({:.1} FPS)",
                1000.0 / frame_ms
            ));
        }
    });
}

fn color_edit(ui: &mut egui::Ui, label: &str, color: &mut Vec3) {
    let mut rgb = color.to_array();
    ui.horizontal(|ui| {
        ui.color_edit_button_rgb(&mut rgb);
        ui.label(label);
    });
    *color = Vec3::from_array(rgb);
}
