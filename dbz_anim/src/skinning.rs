//! Skinning matrix calculation for sampled and blended poses.
use glam::Mat4;
use log::trace;

use crate::{BoneDirectory, Clip, HierarchyNode, Transform};

/// Compute the skinning matrix for each bone in `bones` at `time` in ticks.
///
/// Each matrix transforms a vertex in the bind pose to its animated position
/// and is written to `output` at the bone's id.
/// Bones that are not reachable in the clip's hierarchy
/// or whose id is out of range for `output` are left unchanged.
///
/// Returns the number of matrices written.
pub fn sample_bone_matrices(
    clip: &Clip,
    time: f32,
    bones: &BoneDirectory,
    output: &mut [Mat4],
) -> usize {
    // Apply the inverse root transform first so clips authored with an offset root
    // don't add an extra global translation or rotation.
    let mut written = 0;
    visit_node(
        clip,
        clip.root_node(),
        clip.inverse_root_transform(),
        time,
        bones,
        output,
        &mut written,
    );
    written
}

fn visit_node(
    clip: &Clip,
    node: &HierarchyNode,
    parent_transform: Mat4,
    time: f32,
    bones: &BoneDirectory,
    output: &mut [Mat4],
    written: &mut usize,
) {
    // Nodes without a track are helpers that use their static transform.
    let local_transform = clip
        .find_track(&node.name)
        .map(|track| track.local_transform(time))
        .unwrap_or(node.transform);

    let global_transform = parent_transform * local_transform;

    if let Some(bone) = bones.get(&node.name) {
        match output.get_mut(bone.id) {
            Some(matrix) => {
                *matrix = global_transform * bone.offset;
                *written += 1;
            }
            None => trace!(
                "Bone {:?} id {} out of range for length {}",
                node.name,
                bone.id,
                output.len()
            ),
        }
    }

    for child in &node.children {
        visit_node(
            clip,
            child,
            global_transform,
            time,
            bones,
            output,
            written,
        );
    }
}

/// Blend two sets of skinning matrices bone by bone.
///
/// The matrices are decomposed so rotations use spherical interpolation.
/// Linearly blending the matrices directly would shear rotating bones.
/// A `factor` of `0.0` produces `from` and `1.0` produces `to`.
pub fn blend_bone_matrices(from: &[Mat4], to: &[Mat4], factor: f32, output: &mut [Mat4]) {
    for ((output, from), to) in output.iter_mut().zip(from).zip(to) {
        *output = blend_matrices(*from, *to, factor);
    }
}

fn blend_matrices(from: Mat4, to: Mat4, factor: f32) -> Mat4 {
    Transform::from_matrix(from)
        .lerp(Transform::from_matrix(to), factor)
        .to_matrix()
}
