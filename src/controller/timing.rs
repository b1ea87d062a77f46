use std::time::{Duration, Instant};

const FPS_WINDOW: Duration = Duration::from_secs(5);

pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Option<Instant>,
    frame_count: u32,
    pub frame_dt: f32,
    fps: f32,
}

impl FrameTiming {
    pub fn new() -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: None,
            frame_count: 0,
            frame_dt: 0.0,
            fps: 0.0,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Seconds since the previous frame; zero on the first.
    pub fn update(&mut self, now: Instant) -> f32 {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt.as_secs_f32();

        let window_start = *self.last_fps_time.get_or_insert(now);
        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(window_start);
        if elapsed >= FPS_WINDOW {
            self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
            log::debug!(
                "{:.1} fps (last frame {:.2} ms)",
                self.fps,
                self.frame_dt * 1000.0
            );
            self.frame_count = 0;
            self.last_fps_time = Some(now);
        }
        self.frame_dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_zero_dt() {
        let mut timing = FrameTiming::new();
        let start = Instant::now();
        assert_eq!(timing.update(start), 0.0);
        let dt = timing.update(start + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn clock_going_backwards_is_clamped() {
        let mut timing = FrameTiming::new();
        let start = Instant::now() + Duration::from_secs(1);
        timing.update(start);
        assert_eq!(timing.update(start - Duration::from_millis(5)), 0.0);
    }

    #[test]
    fn fps_is_averaged_over_the_window() {
        let mut timing = FrameTiming::new();
        let start = Instant::now();
        for frame in 0..=300u64 {
            timing.update(start + Duration::from_millis(frame * 20));
        }
        assert!((timing.fps() - 50.0).abs() < 1.0);
    }
}
