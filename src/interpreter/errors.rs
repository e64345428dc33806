//! Runtime error types
//!
//! Faults raised by the traced program (calling a non-function, reading a
//! property of `undefined`) are surfaced to consumers as a final error step
//! in the trace, never as a host error. Guard limit variants exist so the
//! engine can unwind when a cap is hit; they turn into a reported
//! [`GuardLimit`] on the interpreter rather than an error step.

use crate::parser::ast::SourceLocation;
use serde::Serialize;
use std::fmt;

/// Which guard cap an execution ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardLimit {
    Steps,
    CallDepth,
    LoopIterations,
}

/// Runtime error raised while executing the traced program
#[derive(Debug, Clone)]
pub enum RuntimeError {
    /// Type fault in the traced program ("x is not a function", reading
    /// through `undefined`, reduce of an empty array, ...)
    TypeError {
        message: String,
        location: SourceLocation,
    },
    NotAFunction {
        name: String,
        location: SourceLocation,
    },
    UnsupportedConstructor {
        name: String,
        location: SourceLocation,
    },
    /// Internal heap inconsistency (a dangling address); indicates an engine
    /// bug rather than a subject-program fault
    HeapFault {
        message: String,
        location: SourceLocation,
    },
    /// The trace reached its maximum number of steps
    StepLimitExceeded,
    CallDepthExceeded {
        depth: usize,
        location: SourceLocation,
    },
    LoopLimitExceeded {
        location: SourceLocation,
    },
}

impl RuntimeError {
    /// The guard cap this error corresponds to, if any
    pub fn guard_limit(&self) -> Option<GuardLimit> {
        match self {
            RuntimeError::StepLimitExceeded => Some(GuardLimit::Steps),
            RuntimeError::CallDepthExceeded { .. } => Some(GuardLimit::CallDepth),
            RuntimeError::LoopLimitExceeded { .. } => Some(GuardLimit::LoopIterations),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            RuntimeError::TypeError { location, .. }
            | RuntimeError::NotAFunction { location, .. }
            | RuntimeError::UnsupportedConstructor { location, .. }
            | RuntimeError::HeapFault { location, .. }
            | RuntimeError::CallDepthExceeded { location, .. }
            | RuntimeError::LoopLimitExceeded { location } => Some(*location),
            RuntimeError::StepLimitExceeded => None,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::TypeError { message, .. } => {
                write!(f, "TypeError: {}", message)
            }
            RuntimeError::NotAFunction { name, .. } => {
                write!(f, "TypeError: {} is not a function", name)
            }
            RuntimeError::UnsupportedConstructor { name, .. } => {
                write!(f, "TypeError: {} is not a supported constructor", name)
            }
            RuntimeError::HeapFault { message, .. } => {
                write!(f, "Internal heap fault: {}", message)
            }
            RuntimeError::StepLimitExceeded => {
                write!(f, "Execution stopped: maximum step count reached")
            }
            RuntimeError::CallDepthExceeded { depth, .. } => {
                write!(f, "RangeError: maximum call depth {} exceeded", depth)
            }
            RuntimeError::LoopLimitExceeded { .. } => {
                write!(f, "Execution stopped: loop iteration limit reached")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}
