//! Tree-walking interpreter with step recording
//!
//! Walks the AST directly and records an [`crate::trace::ExecutionStep`]
//! per observable transition. Split into:
//! - [`engine`]: interpreter state, stepping, guards, hoisting
//! - [`statements`]: statement execution and loops
//! - [`expressions`]: expression evaluation and the call machinery
//! - [`builtins`]: array/string/map/set methods, `console`, `Math`
//! - [`errors`]: runtime fault types
//!
//! Faults in the traced program end the trace with an error step; guard
//! limits end it with a reported [`GuardLimit`]. Neither surfaces as a host
//! error.

pub mod builtins;
pub mod engine;
pub mod errors;
pub mod expressions;
pub mod statements;

pub use engine::{GuardLimits, Interpreter};
pub use errors::{GuardLimit, RuntimeError};
