//! JSON rig descriptions and parameter assignments from the command line.
use std::{path::Path, str::FromStr, sync::Arc};

use dbz_anim::{
    Animator, AnimatorGraph, BoneDirectory, Clip, HierarchyNode, MAX_BONES, ParamType,
    ParamValue, Track, error::ParameterError,
};
use glam::{Mat4, Quat, Vec3};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadRigError {
    #[error("error reading rig file")]
    Io(#[from] std::io::Error),

    #[error("error parsing rig JSON")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum AssignmentError {
    #[error("expected {expected} but found {input:?}")]
    Syntax {
        input: String,
        expected: &'static str,
    },

    #[error("the rig has no animator graph")]
    NoGraph,

    #[error("no parameter named {0:?}")]
    UnknownParameter(String),

    #[error("{value:?} is not a valid {param_type:?} value for parameter {name:?}")]
    InvalidValue {
        name: String,
        value: String,
        param_type: ParamType,
    },

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// The bones, clips, and optional graph for a single animated entity.
#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RigDesc {
    pub bones: Vec<BoneDesc>,
    pub clips: Vec<ClipDesc>,
    #[serde(default)]
    pub graph: Option<AnimatorGraph>,
    /// The clip to play when there is no graph.
    /// Defaults to the first clip.
    #[serde(default)]
    pub play: Option<String>,
    #[serde(default = "default_looping")]
    pub looping: bool,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct BoneDesc {
    pub name: String,
    /// The inverse of the bone's bind pose transform.
    #[serde(default)]
    pub offset: Mat4,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct ClipDesc {
    pub name: String,
    /// The length in ticks.
    pub duration: f32,
    pub ticks_per_second: f32,
    pub root: NodeDesc,
    #[serde(default)]
    pub tracks: Vec<TrackDesc>,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct NodeDesc {
    pub name: String,
    #[serde(default)]
    pub transform: Mat4,
    #[serde(default)]
    pub children: Vec<NodeDesc>,
}

/// Keyframes as `(time in ticks, value)` pairs.
#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct TrackDesc {
    pub bone: String,
    #[serde(default)]
    pub positions: Vec<(f32, Vec3)>,
    #[serde(default)]
    pub rotations: Vec<(f32, Quat)>,
    #[serde(default)]
    pub scales: Vec<(f32, Vec3)>,
}

fn default_looping() -> bool {
    true
}

pub fn load_rig<P: AsRef<Path>>(path: P) -> Result<RigDesc, LoadRigError> {
    let text = std::fs::read_to_string(path)?;
    let rig = serde_json::from_str(&text)?;
    Ok(rig)
}

impl RigDesc {
    /// Create an animator ready for its first update.
    pub fn build(&self) -> Animator {
        let mut skeleton = BoneDirectory::new();
        for bone in &self.bones {
            skeleton.insert(&bone.name, bone.offset);
        }

        let clips: Vec<_> = self
            .clips
            .iter()
            .map(|desc| (desc.name.as_str(), desc.to_clip()))
            .collect();

        // Tracks can animate nodes no mesh uses.
        for (_, clip) in &clips {
            clip.register_missing_bones(&mut skeleton);
        }
        info!(
            "Loaded {} bones and {} clips",
            skeleton.len(),
            clips.len()
        );

        let mut animator = Animator::new(Arc::new(skeleton));
        animator.looping = self.looping;
        for (name, clip) in clips {
            animator.add_clip(name, Arc::new(clip));
        }

        match &self.graph {
            Some(graph) if !graph.is_empty() => {
                info!(
                    "Using graph with {} states and {} transitions",
                    graph.states.len(),
                    graph.transitions.len()
                );
                animator.graph = Some(graph.clone());
            }
            _ => match &self.play {
                Some(name) => {
                    animator.play_clip(name);
                }
                None => animator.play(),
            },
        }

        animator
    }
}

impl ClipDesc {
    fn to_clip(&self) -> Clip {
        let tracks = self
            .tracks
            .iter()
            .map(|t| {
                let track = Track {
                    position_keys: t.positions.iter().map(|(k, v)| ((*k).into(), *v)).collect(),
                    rotation_keys: t.rotations.iter().map(|(k, v)| ((*k).into(), *v)).collect(),
                    scale_keys: t.scales.iter().map(|(k, v)| ((*k).into(), *v)).collect(),
                };
                (SmolStr::from(t.bone.as_str()), track)
            })
            .collect();

        Clip::new(
            self.duration,
            self.ticks_per_second,
            self.root.to_node(),
            tracks,
        )
    }
}

impl NodeDesc {
    fn to_node(&self) -> HierarchyNode {
        HierarchyNode::new(&self.name, self.transform)
            .with_children(self.children.iter().map(NodeDesc::to_node).collect())
    }
}

/// A `name=value` parameter assignment.
#[derive(Debug, PartialEq, Clone)]
pub struct Assignment {
    pub name: String,
    pub value: String,
}

/// A `frame:name=value` parameter assignment applied before updating `frame`.
#[derive(Debug, PartialEq, Clone)]
pub struct TimedAssignment {
    pub frame: usize,
    pub assignment: Assignment,
}

impl FromStr for Assignment {
    type Err = AssignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| syntax_error(s, "name=value"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(syntax_error(s, "name=value"));
        }

        Ok(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl FromStr for TimedAssignment {
    type Err = AssignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (frame, assignment) = s
            .split_once(':')
            .ok_or_else(|| syntax_error(s, "frame:name=value"))?;
        let frame = frame
            .trim()
            .parse()
            .map_err(|_| syntax_error(s, "frame:name=value"))?;

        Ok(Self {
            frame,
            assignment: assignment.parse()?,
        })
    }
}

impl Assignment {
    /// Set the parameter using the value format for its type.
    ///
    /// Bool and trigger parameters accept `true` or `false`.
    pub fn apply(&self, animator: &mut Animator) -> Result<(), AssignmentError> {
        let graph = animator.graph.as_mut().ok_or(AssignmentError::NoGraph)?;
        let param_type = graph
            .parameter(&self.name)
            .map(|p| p.param_type)
            .ok_or_else(|| AssignmentError::UnknownParameter(self.name.clone()))?;

        let value = parse_value(param_type, &self.value).ok_or_else(|| {
            AssignmentError::InvalidValue {
                name: self.name.clone(),
                value: self.value.clone(),
                param_type,
            }
        })?;

        debug!("Set {:?} to {value:?}", self.name);
        graph.set_value(&self.name, value)?;
        Ok(())
    }
}

fn syntax_error(input: &str, expected: &'static str) -> AssignmentError {
    AssignmentError::Syntax {
        input: input.to_string(),
        expected,
    }
}

fn parse_value(param_type: ParamType, value: &str) -> Option<ParamValue> {
    match param_type {
        ParamType::Bool | ParamType::Trigger => value.parse().ok().map(ParamValue::Bool),
        ParamType::Float => value.parse().ok().map(ParamValue::Float),
        ParamType::Int => value.parse().ok().map(ParamValue::Int),
    }
}

/// The skinning matrix for each bone by name in column major order.
pub fn bone_matrices_by_name(animator: &Animator) -> IndexMap<String, [f32; 16]> {
    animator
        .skeleton
        .iter()
        .filter(|(_, bone)| bone.id < MAX_BONES)
        .map(|(name, bone)| {
            (
                name.to_string(),
                animator.bone_matrices[bone.id].to_cols_array(),
            )
        })
        .collect()
}

/// The name of the graph's active state if any.
pub fn active_state_name(graph: &AnimatorGraph) -> Option<&str> {
    graph
        .active_state
        .and_then(|id| graph.find_state(id))
        .map(|s| s.name.as_str())
}
