//! The per entity animation component.
use std::sync::Arc;

use glam::Mat4;
use indexmap::IndexMap;
use log::{debug, warn};
use smol_str::SmolStr;

use crate::skinning::sample_bone_matrices;
use crate::{AnimatorGraph, BoneDirectory, Clip, MAX_BONES};

/// The animation state and output skinning matrices for a single entity.
///
/// An entity either plays a single clip directly
/// or uses an [AnimatorGraph] to switch between clips.
/// A non empty [graph](#structfield.graph) takes priority
/// and the single clip fields are then ignored.
#[derive(Debug, Clone)]
pub struct Animator {
    /// The clips this entity can play by name.
    pub clips: IndexMap<SmolStr, Arc<Clip>>,
    /// The bones shared by every entity using the same model.
    pub skeleton: Arc<BoneDirectory>,
    pub graph: Option<AnimatorGraph>,

    /// The clip for single clip playback.
    pub current_clip_name: Option<SmolStr>,
    /// The playback time in seconds of the current clip or active graph state.
    pub current_time: f32,
    pub is_playing: bool,
    pub looping: bool,
    pub playback_speed: f32,

    /// The skinning matrix for each bone id, overwritten in place each frame.
    pub bone_matrices: Box<[Mat4; MAX_BONES]>,
}

impl Animator {
    pub fn new(skeleton: Arc<BoneDirectory>) -> Self {
        if skeleton.len() > MAX_BONES {
            warn!(
                "Skeleton has {} bones but only the first {MAX_BONES} will be animated",
                skeleton.len()
            );
        }
        Self {
            clips: IndexMap::new(),
            skeleton,
            graph: None,
            current_clip_name: None,
            current_time: 0.0,
            is_playing: false,
            looping: true,
            playback_speed: 1.0,
            bone_matrices: Box::new([Mat4::IDENTITY; MAX_BONES]),
        }
    }

    pub fn with_graph(mut self, graph: AnimatorGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Add or replace a clip.
    /// The first clip added becomes the current clip.
    pub fn add_clip(&mut self, name: &str, clip: Arc<Clip>) {
        self.clips.insert(name.into(), clip);
        if self.current_clip_name.is_none() {
            self.current_clip_name = Some(name.into());
        }
    }

    pub fn clip(&self, name: &str) -> Option<&Arc<Clip>> {
        self.clips.get(name)
    }

    pub fn current_clip(&self) -> Option<&Arc<Clip>> {
        self.current_clip_name
            .as_ref()
            .and_then(|name| self.clips.get(name))
    }

    /// Start playing `name` from the beginning.
    /// Returns `false` and leaves playback unchanged if there is no clip with that name.
    pub fn play_clip(&mut self, name: &str) -> bool {
        if self.clips.contains_key(name) {
            self.current_clip_name = Some(name.into());
            self.current_time = 0.0;
            self.is_playing = true;
            true
        } else {
            debug!("No clip named {name:?}");
            false
        }
    }

    pub fn play(&mut self) {
        self.is_playing = true;
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    /// Pause and rewind to the start of the clip.
    pub fn stop(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
    }

    /// Returns `true` if a non empty graph drives playback.
    pub fn uses_graph(&self) -> bool {
        self.graph.as_ref().is_some_and(|g| !g.is_empty())
    }

    /// Advance single clip playback by `delta_time` seconds and update the bone matrices.
    ///
    /// Looping clips wrap around.
    /// Other clips hold the final pose and stop playing once they reach the end.
    pub fn update_player(&mut self, delta_time: f32) {
        if !self.is_playing {
            return;
        }
        let Some(clip) = self.current_clip().cloned() else {
            return;
        };

        self.current_time += delta_time * self.playback_speed;

        let duration = clip.duration_seconds();
        if self.current_time >= duration {
            if self.looping {
                self.current_time %= duration;
            } else {
                self.current_time = duration;
                self.is_playing = false;
            }
        }

        let ticks = clip.time_in_ticks(self.current_time, self.looping);
        sample_bone_matrices(
            &clip,
            ticks,
            &self.skeleton,
            self.bone_matrices.as_mut_slice(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use glam::{Vec3, vec3};

    use crate::{HierarchyNode, Track};

    // A 2 second clip moving "bone" from the origin to x = 10.
    fn two_second_clip() -> Arc<Clip> {
        let track = Track {
            position_keys: [
                (0.0.into(), Vec3::ZERO),
                (50.0.into(), vec3(10.0, 0.0, 0.0)),
            ]
            .into(),
            ..Default::default()
        };
        Arc::new(Clip::new(
            50.0,
            25.0,
            HierarchyNode::new("root", Mat4::IDENTITY)
                .with_children(vec![HierarchyNode::new("bone", Mat4::IDENTITY)]),
            [(SmolStr::from("bone"), track)].into_iter().collect(),
        ))
    }

    fn animator() -> Animator {
        let skeleton: BoneDirectory = [("bone", Mat4::IDENTITY)].into_iter().collect();
        let mut animator = Animator::new(Arc::new(skeleton));
        animator.add_clip("walk", two_second_clip());
        animator
    }

    #[test]
    fn add_clip_first_is_current() {
        let mut animator = animator();
        animator.add_clip("run", two_second_clip());
        assert_eq!(Some(&SmolStr::from("walk")), animator.current_clip_name.as_ref());
        assert!(animator.current_clip().is_some());
        assert!(!animator.is_playing);
    }

    #[test]
    fn play_clip_unknown() {
        let mut animator = animator();
        animator.current_time = 1.0;
        assert!(!animator.play_clip("swim"));
        assert_eq!(1.0, animator.current_time);
        assert!(!animator.is_playing);
    }

    #[test]
    fn play_clip_restarts() {
        let mut animator = animator();
        animator.add_clip("run", two_second_clip());
        animator.current_time = 1.0;
        assert!(animator.play_clip("run"));
        assert_eq!(Some(&SmolStr::from("run")), animator.current_clip_name.as_ref());
        assert_eq!(0.0, animator.current_time);
        assert!(animator.is_playing);
    }

    #[test]
    fn stop_rewinds() {
        let mut animator = animator();
        animator.play();
        animator.update_player(0.5);
        animator.stop();
        assert_eq!(0.0, animator.current_time);
        assert!(!animator.is_playing);
    }

    #[test]
    fn update_paused_does_nothing() {
        let mut animator = animator();
        animator.update_player(0.5);
        assert_eq!(0.0, animator.current_time);
        assert_eq!(Mat4::IDENTITY, animator.bone_matrices[0]);
    }

    #[test]
    fn update_samples_current_time() {
        let mut animator = animator();
        animator.play();
        animator.update_player(0.5);

        assert_eq!(0.5, animator.current_time);
        assert_relative_eq!(
            vec3(2.5, 0.0, 0.0),
            animator.bone_matrices[0].w_axis.truncate(),
            epsilon = 0.0001
        );
    }

    #[test]
    fn update_looping_wraps_exactly() {
        let mut animator = animator();
        animator.play();
        animator.update_player(0.5);
        animator.update_player(2.0);
        assert_eq!(0.5, animator.current_time);
        assert!(animator.is_playing);
    }

    #[test]
    fn update_non_looping_stops_at_end() {
        let mut animator = animator();
        animator.looping = false;
        animator.play();

        for _ in 0..4 {
            animator.update_player(0.5);
        }
        assert_eq!(2.0, animator.current_time);
        assert!(!animator.is_playing);
        assert_relative_eq!(
            vec3(10.0, 0.0, 0.0),
            animator.bone_matrices[0].w_axis.truncate(),
            epsilon = 0.0001
        );

        animator.update_player(0.5);
        assert_eq!(2.0, animator.current_time);
    }

    #[test]
    fn update_playback_speed() {
        let mut animator = animator();
        animator.playback_speed = 2.0;
        animator.play();
        animator.update_player(0.25);
        assert_eq!(0.5, animator.current_time);
    }

    #[test]
    fn uses_graph_only_when_not_empty() {
        let mut animator = animator().with_graph(AnimatorGraph::new());
        assert!(!animator.uses_graph());

        if let Some(graph) = animator.graph.as_mut() {
            graph.add_state("Walk", "walk", glam::Vec2::ZERO);
        }
        assert!(animator.uses_graph());
    }
}
