use thiserror::Error;

use crate::graph::{ParamType, StateId};

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("a parameter named {0:?} already exists")]
    Duplicate(String),

    #[error("no parameter named {0:?}")]
    Missing(String),

    #[error("parameter {name:?} has type {found:?} but {expected:?} was expected")]
    TypeMismatch {
        name: String,
        expected: ParamType,
        found: ParamType,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("no state with id {0}")]
    MissingState(StateId),
}
