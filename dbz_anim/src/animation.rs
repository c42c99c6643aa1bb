//! Imported animation clips and keyframe evaluation.
use std::collections::BTreeMap;
use std::ops::Bound::*;

use glam::{Mat4, Quat, Vec3};
use indexmap::IndexMap;
use log::debug;
use ordered_float::OrderedFloat;
use smol_str::SmolStr;

use crate::{BoneDirectory, MIN_DURATION, Transform};

/// A single imported animation.
///
/// Clips are immutable after import and shared by every entity that plays them.
#[derive(Debug, PartialEq, Clone)]
pub struct Clip {
    duration: f32,
    ticks_per_second: f32,
    root_node: HierarchyNode,
    tracks: IndexMap<SmolStr, Track>,
    // The root transform never changes, so its inverse is computed once.
    inverse_root_transform: Mat4,
}

/// A node in the model's transform hierarchy at import time.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Clone)]
pub struct HierarchyNode {
    pub name: SmolStr,
    /// The transform relative to the parent used when the node has no [Track].
    pub transform: Mat4,
    pub children: Vec<HierarchyNode>,
}

/// Keyframes for a single bone keyed by their timestamp in ticks.
///
/// A channel with a single key is constant.
/// An empty channel uses the identity value for that channel.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Track {
    pub position_keys: BTreeMap<OrderedFloat<f32>, Vec3>,
    pub rotation_keys: BTreeMap<OrderedFloat<f32>, Quat>,
    pub scale_keys: BTreeMap<OrderedFloat<f32>, Vec3>,
}

impl HierarchyNode {
    pub fn new(name: &str, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            transform,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<HierarchyNode>) -> Self {
        self.children = children;
        self
    }
}

impl Clip {
    /// Create a clip with `duration` in ticks played at `ticks_per_second`.
    ///
    /// A non positive rate is treated as one tick per second.
    pub fn new(
        duration: f32,
        ticks_per_second: f32,
        root_node: HierarchyNode,
        tracks: IndexMap<SmolStr, Track>,
    ) -> Self {
        let ticks_per_second = if ticks_per_second > 0.0 {
            ticks_per_second
        } else {
            debug!("Invalid ticks per second {ticks_per_second}, using 1.0");
            1.0
        };

        let inverse_root_transform = root_node.transform.inverse();

        Self {
            duration: duration.max(0.0),
            ticks_per_second,
            root_node,
            tracks,
            inverse_root_transform,
        }
    }

    /// The length of the clip in ticks.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn ticks_per_second(&self) -> f32 {
        self.ticks_per_second
    }

    /// The length of the clip in seconds.
    /// This is never smaller than [MIN_DURATION] to be safe to divide by.
    pub fn duration_seconds(&self) -> f32 {
        (self.duration / self.ticks_per_second).max(MIN_DURATION)
    }

    pub fn root_node(&self) -> &HierarchyNode {
        &self.root_node
    }

    /// The inverse of the root node's static transform.
    pub fn inverse_root_transform(&self) -> Mat4 {
        self.inverse_root_transform
    }

    pub fn tracks(&self) -> &IndexMap<SmolStr, Track> {
        &self.tracks
    }

    pub fn find_track(&self, name: &str) -> Option<&Track> {
        self.tracks.get(name)
    }

    /// Convert `seconds` to clip local ticks.
    ///
    /// Looping clips wrap into `[0, duration)`.
    /// Other clips clamp into `[0, duration]` to hold the final pose.
    pub fn time_in_ticks(&self, seconds: f32, looping: bool) -> f32 {
        let ticks = seconds * self.ticks_per_second;
        if looping {
            if self.duration > 0.0 {
                ticks.rem_euclid(self.duration)
            } else {
                0.0
            }
        } else {
            ticks.clamp(0.0, self.duration)
        }
    }

    /// Add any bone targeted by a track that is missing from `bones`.
    pub fn register_missing_bones(&self, bones: &mut BoneDirectory) {
        for name in self.tracks.keys() {
            bones.register_missing(name);
        }
    }
}

impl Track {
    /// Sample the position at `time` in ticks.
    /// Returns `None` if there are no position keys.
    pub fn sample_position(&self, time: f32) -> Option<Vec3> {
        sample_keys(&self.position_keys, time, |a, b, t| a.lerp(b, t))
    }

    /// Sample the rotation at `time` in ticks using spherical interpolation.
    /// Returns `None` if there are no rotation keys.
    pub fn sample_rotation(&self, time: f32) -> Option<Quat> {
        sample_keys(&self.rotation_keys, time, |a, b, t| a.slerp(b, t)).map(Quat::normalize)
    }

    /// Sample the scale at `time` in ticks.
    /// Returns `None` if there are no scale keys.
    pub fn sample_scale(&self, time: f32) -> Option<Vec3> {
        sample_keys(&self.scale_keys, time, |a, b, t| a.lerp(b, t))
    }

    /// Sample each channel and combine them as scale -> rotation -> translation (TRS).
    pub fn sample_transform(&self, time: f32) -> Transform {
        Transform {
            translation: self.sample_position(time).unwrap_or(Vec3::ZERO),
            rotation: self.sample_rotation(time).unwrap_or(Quat::IDENTITY),
            scale: self.sample_scale(time).unwrap_or(Vec3::ONE),
        }
    }

    /// The local transform matrix of the bone at `time` in ticks.
    pub fn local_transform(&self, time: f32) -> Mat4 {
        self.sample_transform(time).to_matrix()
    }
}

fn sample_keys<T, F>(
    keys: &BTreeMap<OrderedFloat<f32>, T>,
    time: f32,
    interpolate: F,
) -> Option<T>
where
    T: Copy,
    F: Fn(T, T, f32) -> T,
{
    if keys.len() == 1 {
        return keys.values().next().copied();
    }

    let ((previous_time, previous), (next_time, next)) = keyframe_pair(keys, time)?;
    let factor = interpolation_factor(previous_time, next_time, time);
    Some(interpolate(*previous, *next, factor))
}

/// Find the first pair of consecutive keys straddling `time`.
///
/// Times before the first key use the first pair.
/// Times at or after the last key use the final pair.
fn keyframe_pair<T>(
    keys: &BTreeMap<OrderedFloat<f32>, T>,
    time: f32,
) -> Option<((f32, &T), (f32, &T))> {
    if keys.len() < 2 {
        return None;
    }

    // Use a workaround for tree lower/upper bound not being stable.
    let key = OrderedFloat::<f32>::from(time);
    let mut before = keys.range((Unbounded, Included(key)));
    let mut after = keys.range((Excluded(key), Unbounded));

    let pair = match (before.next_back(), after.next()) {
        (Some(previous), Some(next)) => (previous, next),
        (None, _) => {
            let mut first = keys.iter();
            (first.next()?, first.next()?)
        }
        (Some(_), None) => {
            let mut last = keys.iter().rev();
            let next = last.next()?;
            (last.next()?, next)
        }
    };
    let ((previous_time, previous), (next_time, next)) = pair;
    Some(((previous_time.0, previous), (next_time.0, next)))
}

fn interpolation_factor(previous_time: f32, next_time: f32, time: f32) -> f32 {
    let frames_diff = next_time - previous_time;
    if frames_diff > 0.0 {
        ((time - previous_time) / frames_diff).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
