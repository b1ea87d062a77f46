use super::FrameRequest;
use crate::render::{RenderBackend, RenderError};
use glam::Vec2;

/// Layout size of the container the scene draws into, in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

impl ContainerSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Resize,
    PointerMove,
    PointerDown,
    PointerUp,
    PointerLeave,
    Click,
    Wheel,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 7] = [
        ListenerKind::Resize,
        ListenerKind::PointerMove,
        ListenerKind::PointerDown,
        ListenerKind::PointerUp,
        ListenerKind::PointerLeave,
        ListenerKind::Click,
        ListenerKind::Wheel,
    ];
}

/// Cursor hint shown over the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAffordance {
    Grab,
    Grabbing,
    Pointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Auxiliary,
}

/// One pointer position: `local` is relative to the container's top-left,
/// `client` is in screen space and anchors the tooltip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub local: Vec2,
    pub client: Vec2,
}

impl PointerSample {
    pub fn new(local: Vec2, client: Vec2) -> Self {
        Self { local, client }
    }

    /// Container at the screen origin, so both coordinates agree.
    pub fn at(x: f32, y: f32) -> Self {
        let p = Vec2::new(x, y);
        Self { local: p, client: p }
    }
}

/// What the controller needs from the environment it is mounted in.
pub trait Host {
    fn container_size(&self) -> ContainerSize;

    fn device_pixel_ratio(&self) -> f32 {
        1.0
    }

    /// Create a drawing surface inside the container.
    fn create_surface(&mut self) -> Result<Box<dyn RenderBackend>, RenderError>;

    /// Remove the drawing surface if it is still present.
    fn remove_surface(&mut self);

    fn add_listener(&mut self, kind: ListenerKind);
    fn remove_listener(&mut self, kind: ListenerKind);

    /// Ask for one frame callback; the host calls `tick` with the returned handle.
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);

    fn set_cursor(&mut self, cursor: CursorAffordance);
}

/// Callbacks out of the scene.
pub trait SceneEvents {
    /// `Some(title)` while a section is under the pointer, `None` once when
    /// the hover clears. `pointer` is in screen space.
    fn on_hover(&mut self, title: Option<&str>, pointer: Vec2);

    fn on_activate(&mut self, path: &str);
}
