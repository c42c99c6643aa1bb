//! The per frame driver for every animated entity.
//!
//! Entities without a graph use the [Animator]'s single clip player.
//! Entities with a non empty [AnimatorGraph](crate::AnimatorGraph)
//! advance the active state, fire at most one transition per frame,
//! and cross fade between the previous and active clips while blending.
use std::collections::BTreeMap;

use glam::Mat4;
use indexmap::IndexMap;
use log::{debug, warn};
use smol_str::SmolStr;

use crate::graph::{Parameter, StateId, Transition};
use crate::skinning::{blend_bone_matrices, sample_bone_matrices};
use crate::{Animator, MAX_BONES, MIN_DURATION};

/// Missing or inconsistent data skipped during an update.
#[derive(Debug, PartialEq, Clone)]
pub enum Diagnostic {
    /// The graph's active state id does not refer to a state.
    MissingActiveState { state_id: Option<StateId> },
    /// A state's clip was never added to the entity's [Animator].
    MissingClip { clip_name: SmolStr },
    /// A transition condition references a parameter that does not exist.
    UnknownParameter { name: SmolStr },
}

/// A destination for [Diagnostic] values reported by [AnimationSystem].
///
/// Every diagnostic is also logged,
/// so a sink is only needed to inspect them programmatically.
pub trait DiagnosticsSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticsSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Discard all diagnostics.
impl DiagnosticsSink for () {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Entity storage holding the [Animator] components to update.
pub trait AnimatorStore {
    type Entity: Clone;

    /// The entities to visit in update order.
    fn entities(&self) -> Vec<Self::Entity>;

    fn animator_mut(&mut self, entity: Self::Entity) -> Option<&mut Animator>;

    fn has_animator(&self, entity: Self::Entity) -> bool;
}

/// Each index is an entity.
impl AnimatorStore for [Animator] {
    type Entity = usize;

    fn entities(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    fn animator_mut(&mut self, entity: usize) -> Option<&mut Animator> {
        self.get_mut(entity)
    }

    fn has_animator(&self, entity: usize) -> bool {
        entity < self.len()
    }
}

impl AnimatorStore for Vec<Animator> {
    type Entity = usize;

    fn entities(&self) -> Vec<usize> {
        self.as_slice().entities()
    }

    fn animator_mut(&mut self, entity: usize) -> Option<&mut Animator> {
        self.as_mut_slice().animator_mut(entity)
    }

    fn has_animator(&self, entity: usize) -> bool {
        self.as_slice().has_animator(entity)
    }
}

impl<K: Ord + Clone> AnimatorStore for BTreeMap<K, Animator> {
    type Entity = K;

    fn entities(&self) -> Vec<K> {
        self.keys().cloned().collect()
    }

    fn animator_mut(&mut self, entity: K) -> Option<&mut Animator> {
        self.get_mut(&entity)
    }

    fn has_animator(&self, entity: K) -> bool {
        self.contains_key(&entity)
    }
}

/// Advances playback and writes the bone matrices of every [Animator].
#[derive(Debug, Clone)]
pub struct AnimationSystem {
    // Reused for every blended entity to avoid allocating each frame.
    previous_pose: Box<[Mat4; MAX_BONES]>,
    active_pose: Box<[Mat4; MAX_BONES]>,
}

impl Default for AnimationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationSystem {
    pub fn new() -> Self {
        Self {
            previous_pose: Box::new([Mat4::IDENTITY; MAX_BONES]),
            active_pose: Box::new([Mat4::IDENTITY; MAX_BONES]),
        }
    }

    /// Update every entity in `store` by `delta_time` seconds.
    pub fn update<S>(&mut self, store: &mut S, delta_time: f32)
    where
        S: AnimatorStore + ?Sized,
    {
        self.update_with_diagnostics(store, delta_time, &mut ());
    }

    /// Update every entity in `store` and report skipped data to `diagnostics`.
    #[tracing::instrument(skip_all)]
    pub fn update_with_diagnostics<S, D>(
        &mut self,
        store: &mut S,
        delta_time: f32,
        diagnostics: &mut D,
    ) where
        S: AnimatorStore + ?Sized,
        D: DiagnosticsSink + ?Sized,
    {
        for entity in store.entities() {
            if !store.has_animator(entity.clone()) {
                continue;
            }
            if let Some(animator) = store.animator_mut(entity) {
                self.update_animator(animator, delta_time, diagnostics);
            }
        }
    }

    /// Update a single entity by `delta_time` seconds.
    pub fn update_animator<D>(
        &mut self,
        animator: &mut Animator,
        delta_time: f32,
        diagnostics: &mut D,
    ) where
        D: DiagnosticsSink + ?Sized,
    {
        if animator.uses_graph() {
            self.update_graph(animator, delta_time, diagnostics);
        } else {
            animator.update_player(delta_time);
        }
    }

    fn update_graph<D>(
        &mut self,
        animator: &mut Animator,
        delta_time: f32,
        diagnostics: &mut D,
    ) where
        D: DiagnosticsSink + ?Sized,
    {
        let Some(graph) = animator.graph.as_mut() else {
            return;
        };

        // The previous frame's matrices stay in place if anything is missing.
        let Some(state) = graph
            .active_state
            .and_then(|id| graph.find_state(id))
            .cloned()
        else {
            warn!("Active state {:?} not found", graph.active_state);
            diagnostics.report(Diagnostic::MissingActiveState {
                state_id: graph.active_state,
            });
            return;
        };
        let Some(clip) = animator.clips.get(&state.clip_name).cloned() else {
            warn!("Clip {:?} for state {:?} not found", state.clip_name, state.name);
            diagnostics.report(Diagnostic::MissingClip {
                clip_name: state.clip_name.clone(),
            });
            return;
        };

        animator.current_time += delta_time * state.speed;

        let duration = clip.duration_seconds();
        let mut normalized_time = animator.current_time / duration;
        if animator.current_time >= duration {
            if state.looping {
                animator.current_time %= duration;
                normalized_time = animator.current_time / duration;
            } else {
                animator.current_time = duration;
                normalized_time = 1.0;
            }
        }

        // Blends always run to completion before checking transitions again.
        if !graph.in_transition {
            let fired = graph
                .transitions_from(state.id)
                .find(|t| should_fire(t, &graph.parameters, normalized_time, diagnostics))
                .map(|t| (t.id, t.destination, t.blend_duration));

            if let Some((id, destination, blend_duration)) = fired {
                debug!(
                    "Transition {id} from state {} to state {destination}",
                    state.id
                );
                graph.previous_state = Some(state.id);
                graph.previous_clip_time = animator.current_time;
                graph.active_state = Some(destination);
                graph.in_transition = true;
                graph.transition_progress = 0.0;
                graph.active_blend_duration = blend_duration;
                animator.current_time = 0.0;
            }
        }

        // Triggers only stay set for a single evaluation.
        graph.reset_triggers();

        let Some(active) = graph
            .active_state
            .and_then(|id| graph.find_state(id))
            .cloned()
        else {
            warn!("Active state {:?} not found", graph.active_state);
            diagnostics.report(Diagnostic::MissingActiveState {
                state_id: graph.active_state,
            });
            return;
        };
        let Some(active_clip) = animator.clips.get(&active.clip_name).cloned() else {
            warn!(
                "Clip {:?} for state {:?} not found",
                active.clip_name, active.name
            );
            diagnostics.report(Diagnostic::MissingClip {
                clip_name: active.clip_name.clone(),
            });
            return;
        };
        let active_ticks = active_clip.time_in_ticks(animator.current_time, active.looping);

        if graph.in_transition {
            graph.transition_progress = (graph.transition_progress
                + delta_time / graph.active_blend_duration.max(MIN_DURATION))
            .min(1.0);
            let factor = graph.transition_progress;

            self.previous_pose.fill(Mat4::IDENTITY);
            self.active_pose.fill(Mat4::IDENTITY);

            let previous = graph
                .previous_state
                .and_then(|id| graph.find_state(id))
                .cloned();
            if let Some(previous) = previous {
                match animator.clips.get(&previous.clip_name) {
                    Some(previous_clip) => {
                        graph.previous_clip_time += delta_time * previous.speed;
                        let ticks =
                            previous_clip.time_in_ticks(graph.previous_clip_time, previous.looping);
                        sample_bone_matrices(
                            previous_clip,
                            ticks,
                            &animator.skeleton,
                            self.previous_pose.as_mut_slice(),
                        );
                    }
                    None => {
                        warn!(
                            "Clip {:?} for state {:?} not found",
                            previous.clip_name, previous.name
                        );
                        diagnostics.report(Diagnostic::MissingClip {
                            clip_name: previous.clip_name.clone(),
                        });
                    }
                }
            }

            sample_bone_matrices(
                &active_clip,
                active_ticks,
                &animator.skeleton,
                self.active_pose.as_mut_slice(),
            );
            blend_bone_matrices(
                self.previous_pose.as_slice(),
                self.active_pose.as_slice(),
                factor,
                animator.bone_matrices.as_mut_slice(),
            );

            if factor >= 1.0 {
                debug!("Blend into state {} complete", active.id);
                graph.in_transition = false;
                graph.previous_state = None;
            }
        } else {
            sample_bone_matrices(
                &active_clip,
                active_ticks,
                &animator.skeleton,
                animator.bone_matrices.as_mut_slice(),
            );
        }
    }
}

fn should_fire<D>(
    transition: &Transition,
    parameters: &IndexMap<SmolStr, Parameter>,
    normalized_time: f32,
    diagnostics: &mut D,
) -> bool
where
    D: DiagnosticsSink + ?Sized,
{
    if transition.has_exit_time && normalized_time < transition.exit_time {
        return false;
    }

    transition.conditions.iter().all(|condition| {
        match parameters.get(&condition.param_name) {
            Some(parameter) => condition.evaluate(parameter),
            None => {
                warn!(
                    "Transition {} references unknown parameter {:?}",
                    transition.id, condition.param_name
                );
                diagnostics.report(Diagnostic::UnknownParameter {
                    name: condition.param_name.clone(),
                });
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use approx::assert_relative_eq;
    use glam::{Vec2, Vec3, vec3};
    use pretty_assertions::assert_eq;

    use crate::{
        AnimatorGraph, BoneDirectory, Clip, CompareOp, Condition, HierarchyNode, ParamType,
        ParamValue, Track,
    };

    // A 1 second clip holding "bone" at x.
    fn constant_clip(x: f32) -> Arc<Clip> {
        let track = Track {
            position_keys: [(0.0.into(), vec3(x, 0.0, 0.0))].into(),
            ..Default::default()
        };
        Arc::new(Clip::new(
            30.0,
            30.0,
            HierarchyNode::new("root", Mat4::IDENTITY)
                .with_children(vec![HierarchyNode::new("bone", Mat4::IDENTITY)]),
            [(SmolStr::from("bone"), track)].into_iter().collect(),
        ))
    }

    fn animator(graph: AnimatorGraph) -> Animator {
        let skeleton: BoneDirectory = [("bone", Mat4::IDENTITY)].into_iter().collect();
        let mut animator = Animator::new(Arc::new(skeleton)).with_graph(graph);
        animator.add_clip("idle", constant_clip(0.0));
        animator.add_clip("run", constant_clip(10.0));
        animator
    }

    fn bone_x(animator: &Animator) -> f32 {
        animator.bone_matrices[0].w_axis.x
    }

    struct IdleRun {
        graph: AnimatorGraph,
        idle: StateId,
        run: StateId,
        transition: u32,
    }

    // Idle -> Run with no exit time or conditions.
    fn idle_run() -> IdleRun {
        let mut graph = AnimatorGraph::new();
        let idle = graph.add_state("Idle", "idle", Vec2::ZERO);
        let run = graph.add_state("Run", "run", Vec2::new(200.0, 0.0));
        let transition = graph.add_transition(idle, run);
        if let Some(t) = graph.find_transition_mut(transition) {
            t.has_exit_time = false;
        }
        IdleRun {
            graph,
            idle,
            run,
            transition,
        }
    }

    fn add_condition(graph: &mut AnimatorGraph, transition: u32, condition: Condition) {
        if let Some(t) = graph.find_transition_mut(transition) {
            t.conditions.push(condition);
        }
    }

    #[test]
    fn idle_to_run_on_speed() {
        let IdleRun {
            mut graph,
            idle,
            run,
            transition,
        } = idle_run();
        graph.add_parameter("speed", ParamType::Float).unwrap();
        add_condition(
            &mut graph,
            transition,
            Condition::new("speed", CompareOp::Greater, ParamValue::Float(0.1)),
        );
        let mut animator = animator(graph);
        let mut system = AnimationSystem::new();

        system.update_animator(&mut animator, 1.0 / 60.0, &mut ());
        let graph = animator.graph.as_ref().unwrap();
        assert_eq!(Some(idle), graph.active_state);
        assert!(!graph.in_transition);

        animator.graph.as_mut().unwrap().set_float("speed", 2.0).unwrap();
        system.update_animator(&mut animator, 1.0 / 60.0, &mut ());

        let graph = animator.graph.as_ref().unwrap();
        assert_eq!(Some(run), graph.active_state);
        assert_eq!(Some(idle), graph.previous_state);
        assert!(graph.in_transition);
        assert_eq!(0.0, animator.current_time);
    }

    #[test]
    fn conditions_all_required() {
        // grounded (bool), jumps (int), speed (float), dash (trigger)
        let cases = [
            (true, 2, 1.0, true, true),
            (false, 2, 1.0, true, false),
            (true, 0, 1.0, true, false),
            (true, 2, 0.0, true, false),
            (true, 2, 1.0, false, false),
            (false, 0, 0.0, false, false),
        ];
        for (grounded, jumps, speed, dash, expected) in cases {
            let IdleRun {
                mut graph,
                run,
                transition,
                ..
            } = idle_run();
            graph.add_parameter("grounded", ParamType::Bool).unwrap();
            graph.add_parameter("jumps", ParamType::Int).unwrap();
            graph.add_parameter("speed", ParamType::Float).unwrap();
            graph.add_parameter("dash", ParamType::Trigger).unwrap();
            for condition in [
                Condition::new("grounded", CompareOp::Equal, ParamValue::Bool(true)),
                Condition::new("jumps", CompareOp::Greater, ParamValue::Int(1)),
                Condition::new("speed", CompareOp::Greater, ParamValue::Float(0.5)),
                Condition::new("dash", CompareOp::Equal, ParamValue::Bool(true)),
            ] {
                add_condition(&mut graph, transition, condition);
            }
            graph.set_bool("grounded", grounded).unwrap();
            graph.set_int("jumps", jumps).unwrap();
            graph.set_float("speed", speed).unwrap();
            if dash {
                graph.set_trigger("dash").unwrap();
            }

            let mut animator = animator(graph);
            AnimationSystem::new().update_animator(&mut animator, 0.1, &mut ());

            let graph = animator.graph.as_ref().unwrap();
            assert_eq!(
                expected,
                graph.active_state == Some(run),
                "grounded = {grounded}, jumps = {jumps}, speed = {speed}, dash = {dash}"
            );
        }
    }

    #[test]
    fn exit_time_delays_transition() {
        let IdleRun {
            mut graph,
            idle,
            run,
            transition,
        } = idle_run();
        if let Some(t) = graph.find_transition_mut(transition) {
            t.has_exit_time = true;
            t.exit_time = 0.9;
        }
        graph.add_parameter("speed", ParamType::Float).unwrap();
        add_condition(
            &mut graph,
            transition,
            Condition::new("speed", CompareOp::Greater, ParamValue::Float(0.1)),
        );
        graph.set_float("speed", 2.0).unwrap();
        let mut animator = animator(graph);
        let mut system = AnimationSystem::new();

        // The clip is 1 second long, so times are also normalized times.
        for delta in [0.5, 0.25, 0.125] {
            system.update_animator(&mut animator, delta, &mut ());
            assert_eq!(Some(idle), animator.graph.as_ref().unwrap().active_state);
        }
        assert_eq!(0.875, animator.current_time);

        system.update_animator(&mut animator, 0.0625, &mut ());
        let graph = animator.graph.as_ref().unwrap();
        assert_eq!(Some(run), graph.active_state);
        assert_eq!(Some(idle), graph.previous_state);
    }

    #[test]
    fn trigger_consumed_by_one_evaluation() {
        let IdleRun {
            mut graph,
            idle,
            run,
            transition,
        } = idle_run();
        if let Some(t) = graph.find_transition_mut(transition) {
            t.has_exit_time = true;
            t.exit_time = 0.75;
        }
        graph.add_parameter("jump", ParamType::Trigger).unwrap();
        add_condition(
            &mut graph,
            transition,
            Condition::new("jump", CompareOp::Equal, ParamValue::Bool(true)),
        );
        let mut animator = animator(graph);
        let mut system = AnimationSystem::new();

        // Set before the exit time, so the transition can't use it.
        animator.graph.as_mut().unwrap().set_trigger("jump").unwrap();
        system.update_animator(&mut animator, 0.5, &mut ());
        let graph = animator.graph.as_ref().unwrap();
        assert_eq!(Some(idle), graph.active_state);
        assert_eq!(Some(ParamValue::Bool(false)), graph.parameter("jump").map(|p| p.value));

        system.update_animator(&mut animator, 0.25, &mut ());
        assert_eq!(Some(idle), animator.graph.as_ref().unwrap().active_state);

        animator.graph.as_mut().unwrap().set_trigger("jump").unwrap();
        system.update_animator(&mut animator, 0.0, &mut ());
        let graph = animator.graph.as_ref().unwrap();
        assert_eq!(Some(run), graph.active_state);
        assert_eq!(Some(ParamValue::Bool(false)), graph.parameter("jump").map(|p| p.value));
    }

    #[test]
    fn first_passing_transition_wins() {
        let mut graph = AnimatorGraph::new();
        let idle = graph.add_state("Idle", "idle", Vec2::ZERO);
        let run = graph.add_state("Run", "run", Vec2::ZERO);
        let walk = graph.add_state("Walk", "idle", Vec2::ZERO);
        for destination in [walk, run] {
            let id = graph.add_transition(idle, destination);
            if let Some(t) = graph.find_transition_mut(id) {
                t.has_exit_time = false;
            }
        }
        let mut animator = animator(graph);
        AnimationSystem::new().update_animator(&mut animator, 0.1, &mut ());

        assert_eq!(Some(walk), animator.graph.as_ref().unwrap().active_state);
    }

    #[test]
    fn blend_from_previous_to_active() {
        let IdleRun {
            mut graph,
            idle,
            run,
            transition,
        } = idle_run();
        if let Some(t) = graph.find_transition_mut(transition) {
            t.blend_duration = 0.5;
        }
        let mut animator = animator(graph);
        let mut system = AnimationSystem::new();

        // Fire without advancing the blend.
        system.update_animator(&mut animator, 0.0, &mut ());
        assert_eq!(Some((idle, run, 0.0)), animator.graph.as_ref().unwrap().blend_weights());
        assert_relative_eq!(0.0, bone_x(&animator), epsilon = 0.0001);

        system.update_animator(&mut animator, 0.25, &mut ());
        assert_eq!(Some((idle, run, 0.5)), animator.graph.as_ref().unwrap().blend_weights());
        assert_relative_eq!(5.0, bone_x(&animator), epsilon = 0.0001);
        assert_eq!(0.25, animator.graph.as_ref().unwrap().previous_clip_time);

        system.update_animator(&mut animator, 0.25, &mut ());
        let graph = animator.graph.as_ref().unwrap();
        assert!(!graph.in_transition);
        assert_eq!(None, graph.previous_state);
        assert_eq!(1.0, graph.transition_progress);
        assert_relative_eq!(10.0, bone_x(&animator), epsilon = 0.0001);
    }

    #[test]
    fn zero_blend_duration_completes_immediately() {
        let IdleRun {
            mut graph,
            transition,
            ..
        } = idle_run();
        if let Some(t) = graph.find_transition_mut(transition) {
            t.blend_duration = 0.0;
        }
        let mut animator = animator(graph);
        AnimationSystem::new().update_animator(&mut animator, 0.1, &mut ());

        let graph = animator.graph.as_ref().unwrap();
        assert!(!graph.in_transition);
        assert!(graph.transition_progress.is_finite());
        assert_relative_eq!(10.0, bone_x(&animator), epsilon = 0.0001);
    }

    #[test]
    fn no_transitions_while_blending() {
        let IdleRun {
            mut graph,
            idle,
            run,
            transition,
        } = idle_run();
        if let Some(t) = graph.find_transition_mut(transition) {
            t.blend_duration = 1.0;
        }
        let back = graph.add_transition(run, idle);
        if let Some(t) = graph.find_transition_mut(back) {
            t.has_exit_time = false;
        }
        let mut animator = animator(graph);
        let mut system = AnimationSystem::new();

        system.update_animator(&mut animator, 0.1, &mut ());
        system.update_animator(&mut animator, 0.1, &mut ());
        let graph = animator.graph.as_ref().unwrap();
        assert_eq!(Some(run), graph.active_state);
        assert!(graph.in_transition);
    }

    #[test]
    fn looping_state_wraps_exactly() {
        let mut graph = AnimatorGraph::new();
        graph.add_state("Idle", "idle", Vec2::ZERO);
        let mut animator = animator(graph);
        let mut system = AnimationSystem::new();

        system.update_animator(&mut animator, 0.25, &mut ());
        system.update_animator(&mut animator, 1.0, &mut ());
        assert_eq!(0.25, animator.current_time);
    }

    #[test]
    fn non_looping_state_holds_last_frame() {
        let mut graph = AnimatorGraph::new();
        let idle = graph.add_state("Idle", "idle", Vec2::ZERO);
        if let Some(s) = graph.find_state_mut(idle) {
            s.looping = false;
            s.speed = 2.0;
        }
        let mut animator = animator(graph);
        let mut system = AnimationSystem::new();

        system.update_animator(&mut animator, 0.75, &mut ());
        assert_eq!(1.0, animator.current_time);
        system.update_animator(&mut animator, 0.75, &mut ());
        assert_eq!(1.0, animator.current_time);
    }

    #[test]
    fn missing_clip_skips_entity() {
        let mut graph = AnimatorGraph::new();
        graph.add_state("Swim", "swim", Vec2::ZERO);
        let mut animator = animator(graph);
        let previous = Mat4::from_translation(Vec3::ONE);
        animator.bone_matrices.fill(previous);

        let mut diagnostics = Vec::new();
        AnimationSystem::new().update_animator(&mut animator, 0.5, &mut diagnostics);

        assert_eq!(
            vec![Diagnostic::MissingClip {
                clip_name: "swim".into()
            }],
            diagnostics
        );
        assert_eq!(0.0, animator.current_time);
        assert_eq!(previous, animator.bone_matrices[0]);
    }

    #[test]
    fn missing_active_state_skips_entity() {
        let mut graph = AnimatorGraph::new();
        graph.add_state("Idle", "idle", Vec2::ZERO);
        graph.active_state = Some(7);
        let mut animator = animator(graph);

        let mut diagnostics = Vec::new();
        AnimationSystem::new().update_animator(&mut animator, 0.5, &mut diagnostics);

        assert_eq!(
            vec![Diagnostic::MissingActiveState { state_id: Some(7) }],
            diagnostics
        );
        assert_eq!(0.0, animator.current_time);
        assert_eq!(Mat4::IDENTITY, animator.bone_matrices[0]);
    }

    #[test]
    fn unknown_parameter_blocks_transition() {
        let IdleRun {
            mut graph,
            idle,
            transition,
            ..
        } = idle_run();
        add_condition(
            &mut graph,
            transition,
            Condition::new("ghost", CompareOp::Equal, ParamValue::Bool(true)),
        );
        let mut animator = animator(graph);

        let mut diagnostics = Vec::new();
        AnimationSystem::new().update_animator(&mut animator, 0.1, &mut diagnostics);

        assert_eq!(Some(idle), animator.graph.as_ref().unwrap().active_state);
        assert_eq!(
            vec![Diagnostic::UnknownParameter {
                name: "ghost".into()
            }],
            diagnostics
        );
    }

    #[test]
    fn bones_beyond_cap_not_written() {
        let count = MAX_BONES + 5;
        let names: Vec<String> = (0..count).map(|i| format!("bone{i}")).collect();
        let children = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                HierarchyNode::new(name, Mat4::from_translation(vec3(i as f32, 0.0, 0.0)))
            })
            .collect();
        let clip = Clip::new(
            1.0,
            1.0,
            HierarchyNode::new("root", Mat4::IDENTITY).with_children(children),
            IndexMap::new(),
        );
        let skeleton: BoneDirectory = names
            .iter()
            .map(|name| (name.as_str(), Mat4::IDENTITY))
            .collect();
        assert_eq!(count, skeleton.len());

        let mut animator = Animator::new(Arc::new(skeleton));
        animator.add_clip("clip", Arc::new(clip));
        animator.play();

        let mut animators = vec![animator];
        AnimationSystem::new().update(&mut animators, 0.1);

        assert_eq!(MAX_BONES, animators[0].bone_matrices.len());
        assert_eq!(0.0, animators[0].bone_matrices[0].w_axis.x);
        assert_eq!(
            (MAX_BONES - 1) as f32,
            animators[0].bone_matrices[MAX_BONES - 1].w_axis.x
        );
    }

    #[test]
    fn update_store_visits_every_entity() {
        let graph_entity = animator(idle_run().graph);

        let mut player_entity = animator(AnimatorGraph::new());
        assert!(player_entity.play_clip("run"));

        let mut store = BTreeMap::new();
        store.insert(3u32, graph_entity);
        store.insert(1u32, player_entity);

        let mut system = AnimationSystem::default();
        system.update(&mut store, 0.1);

        assert!(store[&3].graph.as_ref().unwrap().in_transition);
        assert_relative_eq!(10.0, bone_x(&store[&1]), epsilon = 0.0001);
        assert!(!store.has_animator(2));
    }
}
