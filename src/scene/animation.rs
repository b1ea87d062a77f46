//! Keyframe clips and a mixer that plays every clip on repeat.

use super::Model;
use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl ChannelValues {
    pub fn len(&self) -> usize {
        match self {
            ChannelValues::Translation(v) | ChannelValues::Scale(v) => v.len(),
            ChannelValues::Rotation(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keyframes for one property of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub node: usize,
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            duration,
            channels,
        }
    }
}

#[derive(Debug, Clone)]
struct ClipAction {
    clip: AnimationClip,
    time: f32,
}

/// Plays all clips of a model at once, each looping forever.
#[derive(Debug, Clone)]
pub struct Mixer {
    actions: Vec<ClipAction>,
}

impl Mixer {
    /// `None` when the model has nothing to animate.
    pub fn new(clips: &[AnimationClip]) -> Option<Self> {
        if clips.is_empty() {
            return None;
        }
        let actions = clips
            .iter()
            .map(|clip| ClipAction {
                clip: clip.clone(),
                time: 0.0,
            })
            .collect();
        Some(Self { actions })
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn time(&self, action: usize) -> Option<f32> {
        self.actions.get(action).map(|a| a.time)
    }

    /// Advance every action by `dt` seconds and pose the model.
    pub fn update(&mut self, dt: f32, model: &mut Model) {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        for action in &mut self.actions {
            action.time = wrap_time(action.time + dt, action.clip.duration);
            for channel in &action.clip.channels {
                apply_channel(channel, action.time, model);
            }
        }
        model.update_world_transforms();
    }
}

fn wrap_time(time: f32, duration: f32) -> f32 {
    if duration > 0.0 {
        time.rem_euclid(duration)
    } else {
        0.0
    }
}

fn apply_channel(channel: &Channel, time: f32, model: &mut Model) {
    let Some(node) = model.node_mut(channel.node) else {
        return;
    };
    let Some(key) = locate(&channel.times, time) else {
        return;
    };
    let step = channel.interpolation == Interpolation::Step;
    match &channel.values {
        ChannelValues::Translation(values) => {
            if let Some(v) = sample(values, key, step, Vec3::lerp) {
                node.transform.translation = v;
            }
        }
        ChannelValues::Scale(values) => {
            if let Some(v) = sample(values, key, step, Vec3::lerp) {
                node.transform.scale = v;
            }
        }
        ChannelValues::Rotation(values) => {
            if let Some(q) = sample(values, key, step, Quat::slerp) {
                node.transform.rotation = q.normalize();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct KeyPosition {
    prev: usize,
    next: usize,
    factor: f32,
}

/// `None` when `times` is empty or not sorted around `time` (NaN keys).
fn locate(times: &[f32], time: f32) -> Option<KeyPosition> {
    let last = times.len().checked_sub(1)?;
    if time <= times[0] {
        return Some(KeyPosition { prev: 0, next: 0, factor: 0.0 });
    }
    if time >= times[last] {
        return Some(KeyPosition { prev: last, next: last, factor: 0.0 });
    }
    let next = times.partition_point(|t| *t <= time);
    let prev = next.checked_sub(1)?;
    let (start, end) = (*times.get(prev)?, *times.get(next)?);
    let span = end - start;
    let factor = if span > 0.0 { (time - start) / span } else { 0.0 };
    Some(KeyPosition { prev, next, factor })
}

fn sample<T: Copy>(values: &[T], key: KeyPosition, step: bool, mix: fn(T, T, f32) -> T) -> Option<T> {
    let a = *values.get(key.prev)?;
    if step || key.prev == key.next {
        return Some(a);
    }
    let b = *values.get(key.next)?;
    Some(mix(a, b, key.factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::testing::placed_quads;

    fn slide_clip() -> AnimationClip {
        AnimationClip::new(
            "slide",
            vec![Channel {
                node: 0,
                times: vec![0.0, 1.0],
                values: ChannelValues::Translation(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]),
                interpolation: Interpolation::Linear,
            }],
        )
    }

    #[test]
    fn nan_keyframes_leave_the_node_alone() {
        let clip = AnimationClip::new(
            "broken",
            vec![Channel {
                node: 0,
                times: vec![f32::NAN, 1.0, 2.0],
                values: ChannelValues::Translation(vec![Vec3::ONE; 3]),
                interpolation: Interpolation::Linear,
            }],
        );
        let mut model = placed_quads(&[Vec3::ZERO], vec![clip]);
        if let Some(mut mixer) = Mixer::new(model.clips()) {
            mixer.update(0.5, &mut model);
            mixer.update(0.5, &mut model);
        }
        assert!(model.node_world(0).is_finite());
        assert!(locate(&[f32::NAN, 1.0, 2.0], 0.5).is_none());
        assert!(locate(&[], 0.5).is_none());
    }

    #[test]
    fn no_clips_means_no_mixer() {
        assert!(Mixer::new(&[]).is_none());
    }

    #[test]
    fn clip_duration_is_the_last_keyframe() {
        assert_eq!(slide_clip().duration, 1.0);
    }

    #[test]
    fn update_interpolates_and_loops() {
        let clip = slide_clip();
        let mut model = placed_quads(&[Vec3::ZERO], vec![clip.clone()]);
        let mut mixer = Mixer::new(model.clips()).expect("mixer");
        assert_eq!(mixer.action_count(), 1);

        mixer.update(0.5, &mut model);
        let x = model.node_world(0).transform_point3(Vec3::ZERO).x;
        assert!((x - 5.0).abs() < 1e-4);

        mixer.update(0.75, &mut model);
        assert!((mixer.time(0).unwrap_or_default() - 0.25).abs() < 1e-5);
        let x = model.node_world(0).transform_point3(Vec3::ZERO).x;
        assert!((x - 2.5).abs() < 1e-4);
    }

    #[test]
    fn step_channels_hold_the_previous_key() {
        let clip = AnimationClip::new(
            "blink",
            vec![Channel {
                node: 0,
                times: vec![0.0, 1.0, 2.0],
                values: ChannelValues::Scale(vec![Vec3::ONE, Vec3::splat(2.0), Vec3::ONE]),
                interpolation: Interpolation::Step,
            }],
        );
        let mut model = placed_quads(&[Vec3::ZERO], vec![clip]);
        let mut mixer = Mixer::new(model.clips()).expect("mixer");
        mixer.update(1.5, &mut model);
        assert_eq!(model.nodes()[0].transform.scale, Vec3::splat(2.0));
    }

    #[test]
    fn negative_or_nan_dt_does_not_move_time() {
        let mut model = placed_quads(&[Vec3::ZERO], vec![slide_clip()]);
        let mut mixer = Mixer::new(model.clips()).expect("mixer");
        mixer.update(-1.0, &mut model);
        mixer.update(f32::NAN, &mut model);
        assert_eq!(mixer.time(0), Some(0.0));
    }

    #[test]
    fn channels_for_missing_nodes_are_ignored() {
        let clip = AnimationClip::new(
            "ghost",
            vec![Channel {
                node: 42,
                times: vec![0.0, 1.0],
                values: ChannelValues::Rotation(vec![Quat::IDENTITY, Quat::from_rotation_y(1.0)]),
                interpolation: Interpolation::Linear,
            }],
        );
        let mut model = placed_quads(&[Vec3::ZERO], vec![clip]);
        let mut mixer = Mixer::new(model.clips()).expect("mixer");
        mixer.update(0.5, &mut model);
        assert_eq!(model.nodes()[0].transform.rotation, Quat::IDENTITY);
    }
}
