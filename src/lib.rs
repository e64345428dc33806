//! # Introduction
//!
//! jstrace parses and executes a subset of JavaScript, capturing a snapshot
//! of the full interpreter state at every observable transition. The
//! resulting trace is an immutable, serializable sequence of steps that a
//! consumer can replay forward and backward to show how the program reached
//! any state. A separate analyzer simulates the browser event loop (call
//! stack, microtask queue, macrotask queue) for the same source.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Interpreter → ExecutionSteps
//!                              └→ Event-loop analyzer → EventLoopSteps
//! ```
//!
//! 1. [`parser`] — tokenises the source and builds an AST.
//! 2. [`interpreter`] — walks the AST, executes statements, and records an
//!    [`trace::ExecutionStep`] per transition.
//! 3. [`runtime`] — the in-process memory model: tagged
//!    [`runtime::Value`] variants, a grow-only [`runtime::Heap`] with
//!    stable addresses, a scope arena, and a call stack.
//! 4. [`trace`] — step and snapshot types, console recorder, breakpoints.
//! 5. [`eventloop`] — phase-by-phase scheduling simulation with a closed
//!    warning set for unmodeled constructs.
//!
//! ## Supported JavaScript subset
//!
//! Declarations: `let`, `const`, `var`, functions (declarations,
//! expressions, arrows with defaults). Control flow: `if/else`, `while`,
//! `do-while`, `for`, `for..of`, `break`, `continue`, `return`.
//! Built-ins: `console.log`, `Math`, array/string methods, `Map`, `Set`.
//! No classes, exceptions, generators, modules or `async`/`await`.

pub mod eventloop;
pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod trace;

pub use eventloop::{analyze_event_loop, AnalyzerWarning, EventLoopStep, EventLoopTrace, Phase, WarningKind};
pub use interpreter::{GuardLimit, GuardLimits, Interpreter, RuntimeError};
pub use parser::{parse, ParseError, Program};
pub use trace::{Breakpoint, ExecutionStep, StepKind, WatchExpression};
