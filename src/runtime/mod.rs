//! Runtime state models
//!
//! The interpreter's mutable world, split into:
//! - [`value`]: the tagged [`value::Value`] union (primitives by copy,
//!   composites by heap address)
//! - [`heap`]: grow-only object arena with stable addresses
//! - [`scope`]: scope arena with parent-chain lookup; closures capture
//!   scopes by id
//! - [`stack`]: call frames

pub mod heap;
pub mod scope;
pub mod stack;
pub mod value;

pub use heap::{FunctionObject, Heap, HeapData, HeapObject};
pub use scope::{Scope, ScopeArena, ScopeId, ScopeKind, GLOBAL_SCOPE};
pub use stack::{CallFrame, CallStack};
pub use value::{Address, Value};
