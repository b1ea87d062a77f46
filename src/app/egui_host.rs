use crate::render::OverlayPaint;
use egui_winit::winit::event::WindowEvent;
use winit::window::Window;

/// egui context plus its winit input state for one window.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Self {
            context,
            winit_state,
        }
    }

    /// Feed a window event to egui. Returns true when egui wants it for itself.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    /// Run one overlay frame and tessellate it for the renderer.
    pub fn paint<F>(&mut self, window: &Window, build: F) -> OverlayPaint
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, build);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        let pixels_per_point = full_output.pixels_per_point;
        let paint_jobs = self
            .context
            .tessellate(full_output.shapes, pixels_per_point);

        OverlayPaint {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
        }
    }
}
