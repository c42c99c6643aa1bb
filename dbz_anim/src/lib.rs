//! # dbz_anim
//! dbz_anim plays back imported skeletal animation clips and drives
//! transitions between them with a per entity animator state machine.
//!
//! The data flows in one direction each frame:
//! [AnimationSystem](system::AnimationSystem) reads an entity's [Animator],
//! samples one or two [Clip] values into bone matrices using the shared
//! [BoneDirectory], and blends them while a transition is active.
//! The renderer then reads [bone_matrices](struct.Animator.html#structfield.bone_matrices).
//!
//! Clips and bone directories are imported once and shared with [std::sync::Arc].
//! Nothing in the per frame path returns an error.
//! Missing data is logged and skipped so a frame always produces some pose.

pub mod animation;
pub mod animator;
pub mod error;
pub mod graph;
pub mod skeleton;
pub mod skinning;
pub mod system;
pub mod transform;

pub use animation::{Clip, HierarchyNode, Track};
pub use animator::Animator;
pub use graph::{
    AnimatorGraph, CompareOp, Condition, ParamType, ParamValue, Parameter, State, Transition,
};
pub use skeleton::{BoneDirectory, BoneInfo};
pub use system::{AnimationSystem, AnimatorStore, Diagnostic, DiagnosticsSink};
pub use transform::Transform;

/// The maximum number of skinning matrices for a single animated entity.
///
/// Bones with an id at or above this value are never written.
pub const MAX_BONES: usize = 100;

/// The smallest duration in seconds used as a divisor for clip and blend durations.
pub const MIN_DURATION: f32 = 0.001;
