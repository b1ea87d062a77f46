mod camera;
mod controls;
mod gpu;
pub mod pick;

pub use camera::{pointer_to_ndc, PerspectiveCamera};
pub use controls::{DragMode, OrbitControls};
pub use gpu::GpuRenderer;
pub use pick::{pick_nearest, PickHit};

use crate::scene::{LightRig, Model};
use glam::{Mat4, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreateFailed(String),
    #[error("no compatible GPU adapter: {0}")]
    AdapterUnavailable(String),
    #[error("failed to create GPU device: {0}")]
    DeviceCreateFailed(String),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("surface frame unavailable: {0}")]
    FrameUnavailable(String),
    #[error("renderer has been disposed")]
    Disposed,
}

/// Everything a backend needs to draw one frame.
pub struct FrameView<'a> {
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub lights: &'a LightRig,
    pub clear_color: [f32; 4],
    pub model: Option<&'a Model>,
}

/// A drawing surface bound to the host container.
pub trait RenderBackend {
    /// `width`/`height` are container units; the backing store is scaled by `pixel_ratio`.
    fn resize(&mut self, width: f32, height: f32, pixel_ratio: f32);
    fn output_size(&self) -> (u32, u32);
    fn upload_model(&mut self, model: &Model) -> Result<(), RenderError>;
    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError>;
    /// Release GPU resources. Later calls are no-ops.
    fn dispose(&mut self);
}

pub fn clamp_pixel_ratio(device_ratio: f32, max_ratio: f32) -> f32 {
    let ratio = if device_ratio.is_finite() && device_ratio > 0.0 {
        device_ratio
    } else {
        1.0
    };
    if max_ratio.is_finite() && max_ratio > 0.0 {
        ratio.min(max_ratio)
    } else {
        ratio
    }
}

/// Backing store size in physical pixels, never zero.
pub fn output_buffer_size(width: f32, height: f32, pixel_ratio: f32) -> (u32, u32) {
    let scale = |v: f32| {
        let px = (v * pixel_ratio).round();
        if px.is_finite() && px >= 1.0 {
            px as u32
        } else {
            1
        }
    };
    (scale(width), scale(height))
}

/// Tessellated egui output waiting to be painted over the next frame.
pub struct OverlayPaint {
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

pub type OverlayQueue = Rc<RefCell<Option<OverlayPaint>>>;

/// Replace the queued overlay. Texture uploads from a frame that was never
/// painted are carried forward so the font atlas isn't lost.
pub fn queue_overlay(queue: &OverlayQueue, mut paint: OverlayPaint) {
    let mut slot = queue.borrow_mut();
    if let Some(mut stale) = slot.take() {
        stale.textures_delta.append(paint.textures_delta);
        paint.textures_delta = stale.textures_delta;
    }
    *slot = Some(paint);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        assert_eq!(clamp_pixel_ratio(3.0, 2.0), 2.0);
        assert_eq!(clamp_pixel_ratio(1.5, 2.0), 1.5);
        assert_eq!(clamp_pixel_ratio(0.0, 2.0), 1.0);
        assert_eq!(clamp_pixel_ratio(f32::NAN, 2.0), 1.0);
    }

    #[test]
    fn output_size_scales_and_never_hits_zero() {
        assert_eq!(output_buffer_size(800.0, 600.0, 2.0), (1600, 1200));
        assert_eq!(output_buffer_size(100.5, 10.0, 1.0), (101, 10));
        assert_eq!(output_buffer_size(0.0, 0.0, 2.0), (1, 1));
    }

    #[test]
    fn stale_overlay_textures_carry_forward() {
        let queue: OverlayQueue = Rc::new(RefCell::new(None));
        let mut first = egui::TexturesDelta::default();
        first.free.push(egui::TextureId::Managed(7));
        queue_overlay(
            &queue,
            OverlayPaint {
                paint_jobs: Vec::new(),
                textures_delta: first,
                pixels_per_point: 1.0,
            },
        );
        queue_overlay(
            &queue,
            OverlayPaint {
                paint_jobs: Vec::new(),
                textures_delta: egui::TexturesDelta::default(),
                pixels_per_point: 2.0,
            },
        );
        let slot = queue.borrow();
        let paint = slot.as_ref().expect("queued");
        assert_eq!(paint.pixels_per_point, 2.0);
        assert_eq!(paint.textures_delta.free, vec![egui::TextureId::Managed(7)]);
    }
}
