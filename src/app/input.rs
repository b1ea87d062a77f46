use crate::controller::{PointerButton, PointerSample};
use glam::Vec2;
use winit::dpi::PhysicalPosition;
use winit::event::{MouseButton, MouseScrollDelta};

/// Pixels one wheel "line" scrolls, matching what browsers report for `deltaY`.
const LINE_HEIGHT_PX: f32 = 100.0;

/// A primary press that travels less than this (logical px) before release is a click.
const CLICK_SLOP_PX: f32 = 5.0;

pub fn map_mouse_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Auxiliary),
        _ => None,
    }
}

/// Positive means "scroll down", i.e. dolly out.
pub fn wheel_delta_y(delta: MouseScrollDelta, scale_factor: f64) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT_PX,
        MouseScrollDelta::PixelDelta(pos) => -(pos.y / scale_factor) as f32,
    }
}

/// Tracks the cursor in logical pixels and turns press/release pairs into clicks.
///
/// The last position and any held press survive the cursor leaving the
/// window, so a release outside still ends a drag.
#[derive(Debug, Default)]
pub struct PointerTracker {
    position: Option<Vec2>,
    inside: bool,
    press: Option<(PointerButton, Vec2)>,
}

impl PointerTracker {
    pub fn sample(&self) -> Option<PointerSample> {
        // The window is the container, so local and client coordinates agree.
        self.position.map(|p| PointerSample::at(p.x, p.y))
    }

    pub fn moved(&mut self, position: PhysicalPosition<f64>, scale_factor: f64) -> PointerSample {
        let logical = position.to_logical::<f32>(scale_factor);
        let p = Vec2::new(logical.x, logical.y);
        self.position = Some(p);
        self.inside = true;
        PointerSample::at(p.x, p.y)
    }

    pub fn left(&mut self) -> Option<PointerSample> {
        self.inside = false;
        self.sample()
    }

    pub fn pressed(&mut self, button: PointerButton) -> Option<PointerSample> {
        if !self.inside {
            return None;
        }
        let sample = self.sample()?;
        self.press = Some((button, sample.local));
        Some(sample)
    }

    /// Returns the release sample and whether it completes a click. A release
    /// outside the window reports the last position inside and is never a click.
    pub fn released(&mut self, button: PointerButton) -> Option<(PointerSample, bool)> {
        let sample = self.sample()?;
        let click = match self.press.take() {
            Some((pressed, origin)) => {
                self.inside
                    && pressed == button
                    && button == PointerButton::Primary
                    && origin.distance(sample.local) <= CLICK_SLOP_PX
            }
            None => false,
        };
        Some((sample, click))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_logical() {
        let mut tracker = PointerTracker::default();
        let sample = tracker.moved(PhysicalPosition::new(200.0, 100.0), 2.0);
        assert_eq!(sample.local, Vec2::new(100.0, 50.0));
        assert_eq!(sample.client, sample.local);
    }

    #[test]
    fn short_primary_press_is_a_click() {
        let mut tracker = PointerTracker::default();
        tracker.moved(PhysicalPosition::new(10.0, 10.0), 1.0);
        tracker.pressed(PointerButton::Primary);
        tracker.moved(PhysicalPosition::new(12.0, 11.0), 1.0);
        let (_, click) = tracker.released(PointerButton::Primary).expect("cursor inside");
        assert!(click);
    }

    #[test]
    fn drags_and_other_buttons_are_not_clicks() {
        let mut tracker = PointerTracker::default();
        tracker.moved(PhysicalPosition::new(10.0, 10.0), 1.0);
        tracker.pressed(PointerButton::Primary);
        tracker.moved(PhysicalPosition::new(80.0, 10.0), 1.0);
        assert_eq!(tracker.released(PointerButton::Primary).map(|r| r.1), Some(false));

        tracker.pressed(PointerButton::Secondary);
        assert_eq!(tracker.released(PointerButton::Secondary).map(|r| r.1), Some(false));
    }

    #[test]
    fn presses_outside_the_window_are_ignored() {
        let mut tracker = PointerTracker::default();
        assert!(tracker.pressed(PointerButton::Primary).is_none());
        assert!(tracker.released(PointerButton::Primary).is_none());
        tracker.moved(PhysicalPosition::new(1.0, 1.0), 1.0);
        assert!(tracker.left().is_some());
        assert!(tracker.pressed(PointerButton::Primary).is_none());
    }

    #[test]
    fn release_after_leaving_still_ends_the_press() {
        let mut tracker = PointerTracker::default();
        tracker.moved(PhysicalPosition::new(10.0, 10.0), 1.0);
        tracker.pressed(PointerButton::Primary);
        tracker.moved(PhysicalPosition::new(11.0, 10.0), 1.0);
        tracker.left();

        let (sample, click) = tracker.released(PointerButton::Primary).expect("release delivered");
        assert_eq!(sample.local, Vec2::new(11.0, 10.0));
        assert!(!click);

        // Back inside, a fresh press and release is a click again.
        tracker.moved(PhysicalPosition::new(20.0, 20.0), 1.0);
        tracker.pressed(PointerButton::Primary);
        assert_eq!(tracker.released(PointerButton::Primary).map(|r| r.1), Some(true));
    }

    #[test]
    fn wheel_follows_browser_sign() {
        assert_eq!(wheel_delta_y(MouseScrollDelta::LineDelta(0.0, 1.0), 1.0), -100.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -30.0));
        assert_eq!(wheel_delta_y(pixels, 2.0), 15.0);
        assert_eq!(map_mouse_button(MouseButton::Back), None);
    }
}
