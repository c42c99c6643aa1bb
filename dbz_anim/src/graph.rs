//! Animator state machines for switching and blending between clips.
//!
//! An [AnimatorGraph] is authored as [State] nodes bound to clips,
//! [Transition] edges guarded by [Condition] values,
//! and named parameters the conditions compare against.
//! The runtime fields track the active state and any in progress blend.
//! They are advanced each frame by [AnimationSystem](crate::AnimationSystem).
use glam::Vec2;
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::{GraphError, ParameterError};

pub type StateId = u32;
pub type TransitionId = u32;

/// The type of an animator parameter.
///
/// [ParamType::Trigger] parameters behave like [ParamType::Bool]
/// but are reset to `false` after every transition evaluation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ParamType {
    Bool,
    Float,
    Int,
    Trigger,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ParamValue {
    Bool(bool),
    Float(f32),
    Int(i32),
}

/// A named value referenced by transition conditions.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Parameter {
    pub param_type: ParamType,
    pub value: ParamValue,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CompareOp {
    Greater,
    Less,
    Equal,
    NotEqual,
}

/// A comparison between a parameter and a constant threshold.
///
/// Bool and trigger parameters only support [CompareOp::Equal] and [CompareOp::NotEqual].
/// Other operators make the condition fail.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, PartialEq, Clone)]
pub struct Condition {
    pub param_name: SmolStr,
    pub op: CompareOp,
    pub threshold: ParamValue,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, PartialEq, Clone)]
pub struct State {
    pub id: StateId,
    pub name: SmolStr,
    /// The name of the clip in the entity's [Animator](crate::Animator).
    pub clip_name: SmolStr,
    /// The playback rate relative to the clip's own rate.
    pub speed: f32,
    pub looping: bool,
    /// The position of the node in the graph editor.
    pub position: Vec2,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, PartialEq, Clone)]
pub struct Transition {
    pub id: TransitionId,
    pub source: StateId,
    pub destination: StateId,
    /// The length of the cross fade in seconds.
    pub blend_duration: f32,
    /// Wait until the source clip reaches [exit_time](#structfield.exit_time) before firing.
    pub has_exit_time: bool,
    /// The normalized time in `[0, 1]` of the source clip.
    pub exit_time: f32,
    /// Every condition must pass for the transition to fire.
    pub conditions: Vec<Condition>,
}

/// The states, transitions, and parameters of an entity's animator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, PartialEq, Clone, Default)]
pub struct AnimatorGraph {
    pub states: Vec<State>,
    /// Transitions in insertion order.
    /// The first transition from a state whose conditions pass wins.
    pub transitions: Vec<Transition>,
    pub parameters: IndexMap<SmolStr, Parameter>,
    pub entry_state: Option<StateId>,

    pub active_state: Option<StateId>,
    /// The state being blended out while [in_transition](#structfield.in_transition) is `true`.
    pub previous_state: Option<StateId>,
    pub in_transition: bool,
    /// The blend factor from the previous state to the active state in `[0, 1]`.
    pub transition_progress: f32,
    pub active_blend_duration: f32,
    /// The playback time in seconds of the previous state's clip.
    pub previous_clip_time: f32,

    next_state_id: StateId,
    next_transition_id: TransitionId,
}

impl ParamType {
    pub fn default_value(self) -> ParamValue {
        match self {
            ParamType::Bool | ParamType::Trigger => ParamValue::Bool(false),
            ParamType::Float => ParamValue::Float(0.0),
            ParamType::Int => ParamValue::Int(0),
        }
    }

    /// Returns `true` if a value of type `value` can be stored in a parameter of this type.
    pub fn accepts(self, value: ParamValue) -> bool {
        matches!(
            (self, value),
            (ParamType::Bool | ParamType::Trigger, ParamValue::Bool(_))
                | (ParamType::Float, ParamValue::Float(_))
                | (ParamType::Int, ParamValue::Int(_))
        )
    }
}

impl ParamValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// The numeric value with integers converted to floats.
    pub fn as_f32(self) -> Option<f32> {
        match self {
            ParamValue::Bool(_) => None,
            ParamValue::Float(v) => Some(v),
            ParamValue::Int(v) => Some(v as f32),
        }
    }
}

impl Parameter {
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            value: param_type.default_value(),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            id: 0,
            name: SmolStr::default(),
            clip_name: SmolStr::default(),
            speed: 1.0,
            looping: true,
            position: Vec2::ZERO,
        }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            id: 0,
            source: 0,
            destination: 0,
            blend_duration: 0.25,
            has_exit_time: true,
            exit_time: 0.9,
            conditions: Vec::new(),
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self {
            param_name: SmolStr::default(),
            op: CompareOp::Equal,
            threshold: ParamValue::Bool(true),
        }
    }
}

impl Condition {
    pub fn new(param_name: &str, op: CompareOp, threshold: ParamValue) -> Self {
        Self {
            param_name: param_name.into(),
            op,
            threshold,
        }
    }

    /// Compare `parameter` against the threshold using the operators for its type.
    pub fn evaluate(&self, parameter: &Parameter) -> bool {
        match parameter.param_type {
            ParamType::Bool | ParamType::Trigger => {
                match (parameter.value.as_bool(), self.threshold.as_bool()) {
                    (Some(value), Some(threshold)) => match self.op {
                        CompareOp::Equal => value == threshold,
                        CompareOp::NotEqual => value != threshold,
                        CompareOp::Greater | CompareOp::Less => false,
                    },
                    _ => false,
                }
            }
            ParamType::Float | ParamType::Int => match (parameter.value, self.threshold) {
                (ParamValue::Int(value), ParamValue::Int(threshold)) => {
                    compare(self.op, value, threshold)
                }
                (value, threshold) => match (value.as_f32(), threshold.as_f32()) {
                    (Some(value), Some(threshold)) => compare(self.op, value, threshold),
                    _ => false,
                },
            },
        }
    }
}

fn compare<T: PartialOrd>(op: CompareOp, value: T, threshold: T) -> bool {
    match op {
        CompareOp::Greater => value > threshold,
        CompareOp::Less => value < threshold,
        CompareOp::Equal => value == threshold,
        CompareOp::NotEqual => value != threshold,
    }
}

impl AnimatorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the graph has no states and can't drive playback.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Add a state playing `clip_name` and return its id.
    ///
    /// The first state added becomes both the entry and active state.
    pub fn add_state(&mut self, name: &str, clip_name: &str, position: Vec2) -> StateId {
        // Graphs loaded from a file may not have the id counter saved.
        let id = self
            .states
            .iter()
            .map(|s| s.id + 1)
            .fold(self.next_state_id, StateId::max);
        self.next_state_id = id + 1;

        self.states.push(State {
            id,
            name: name.into(),
            clip_name: clip_name.into(),
            position,
            ..Default::default()
        });

        if self.entry_state.is_none() {
            self.entry_state = Some(id);
            self.active_state = Some(id);
        }

        id
    }

    /// Add a transition with no conditions and return its id.
    pub fn add_transition(&mut self, source: StateId, destination: StateId) -> TransitionId {
        let id = self
            .transitions
            .iter()
            .map(|t| t.id + 1)
            .fold(self.next_transition_id, TransitionId::max);
        self.next_transition_id = id + 1;

        self.transitions.push(Transition {
            id,
            source,
            destination,
            ..Default::default()
        });

        id
    }

    /// Remove a state and every transition to or from it.
    pub fn remove_state(&mut self, id: StateId) {
        self.transitions.retain(|t| t.source != id && t.destination != id);
        self.states.retain(|s| s.id != id);

        if self.entry_state == Some(id) {
            self.entry_state = self.states.first().map(|s| s.id);
        }
        if self.active_state == Some(id) {
            self.active_state = self.entry_state;
        }
        if self.previous_state == Some(id) {
            // There is nothing left to blend from.
            self.previous_state = None;
            self.in_transition = false;
            self.transition_progress = 0.0;
        }
    }

    pub fn remove_transition(&mut self, id: TransitionId) {
        self.transitions.retain(|t| t.id != id);
    }

    pub fn find_state(&self, id: StateId) -> Option<&State> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn find_state_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.states.iter_mut().find(|s| s.id == id)
    }

    /// Find the first state playing `clip_name`.
    pub fn find_state_by_clip(&self, clip_name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.clip_name == clip_name)
    }

    pub fn find_transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id == id)
    }

    pub fn find_transition_mut(&mut self, id: TransitionId) -> Option<&mut Transition> {
        self.transitions.iter_mut().find(|t| t.id == id)
    }

    /// The transitions leaving `id` in insertion order.
    pub fn transitions_from(&self, id: StateId) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.source == id)
    }

    pub fn set_entry_state(&mut self, id: StateId) -> Result<(), GraphError> {
        if self.find_state(id).is_none() {
            return Err(GraphError::MissingState(id));
        }
        self.entry_state = Some(id);
        Ok(())
    }

    /// Return to the entry state and cancel any blend and pending triggers.
    pub fn reset(&mut self) {
        self.active_state = self.entry_state;
        self.previous_state = None;
        self.in_transition = false;
        self.transition_progress = 0.0;
        self.active_blend_duration = 0.0;
        self.previous_clip_time = 0.0;
        self.reset_triggers();
    }

    /// The previous state, active state, and blend factor while blending.
    pub fn blend_weights(&self) -> Option<(StateId, StateId, f32)> {
        if self.in_transition {
            Some((
                self.previous_state?,
                self.active_state?,
                self.transition_progress,
            ))
        } else {
            None
        }
    }

    pub fn add_parameter(
        &mut self,
        name: &str,
        param_type: ParamType,
    ) -> Result<(), ParameterError> {
        if self.parameters.contains_key(name) {
            return Err(ParameterError::Duplicate(name.to_string()));
        }
        self.parameters.insert(name.into(), Parameter::new(param_type));
        Ok(())
    }

    /// Remove a parameter and any conditions that reference it.
    pub fn remove_parameter(&mut self, name: &str) -> Option<Parameter> {
        let parameter = self.parameters.shift_remove(name)?;
        for transition in &mut self.transitions {
            transition.conditions.retain(|c| c.param_name != name);
        }
        Some(parameter)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), ParameterError> {
        self.set_typed(name, ParamType::Bool, ParamValue::Bool(value))
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), ParameterError> {
        self.set_typed(name, ParamType::Float, ParamValue::Float(value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> Result<(), ParameterError> {
        self.set_typed(name, ParamType::Int, ParamValue::Int(value))
    }

    /// Set a trigger for the next transition evaluation.
    pub fn set_trigger(&mut self, name: &str) -> Result<(), ParameterError> {
        self.set_typed(name, ParamType::Trigger, ParamValue::Bool(true))
    }

    /// Set a parameter of any type to a value of the matching type.
    pub fn set_value(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let parameter = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| ParameterError::Missing(name.to_string()))?;

        if !parameter.param_type.accepts(value) {
            return Err(ParameterError::TypeMismatch {
                name: name.to_string(),
                expected: value_type(value),
                found: parameter.param_type,
            });
        }
        parameter.value = value;
        Ok(())
    }

    /// Set every trigger parameter to `false`.
    pub fn reset_triggers(&mut self) {
        for parameter in self.parameters.values_mut() {
            if parameter.param_type == ParamType::Trigger {
                parameter.value = ParamValue::Bool(false);
            }
        }
    }

    fn set_typed(
        &mut self,
        name: &str,
        param_type: ParamType,
        value: ParamValue,
    ) -> Result<(), ParameterError> {
        let parameter = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| ParameterError::Missing(name.to_string()))?;

        if parameter.param_type != param_type {
            return Err(ParameterError::TypeMismatch {
                name: name.to_string(),
                expected: param_type,
                found: parameter.param_type,
            });
        }
        parameter.value = value;
        Ok(())
    }
}

fn value_type(value: ParamValue) -> ParamType {
    match value {
        ParamValue::Bool(_) => ParamType::Bool,
        ParamValue::Float(_) => ParamType::Float,
        ParamValue::Int(_) => ParamType::Int,
    }
}
