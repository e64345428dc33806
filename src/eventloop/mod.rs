//! Event-loop analyzer
//!
//! A scheduling simulation, not an execution: the source is parsed with the
//! shared parser, top-level statements and the callbacks they schedule are
//! extracted statically, and the call stack / microtask queue / macrotask
//! queue are then stepped through phase by phase. The guarantees are about
//! ORDERING (all microtasks drain before each macrotask; macrotasks run in
//! `(delay, scheduling order)` order), not about evaluating arbitrary
//! expressions inside callbacks.
//!
//! Constructs the simulation cannot model honestly (promise combinators,
//! rejection paths, `setInterval`, `fetch`, `new Promise`) degrade to
//! [`AnalyzerWarning`]s drawn from a closed [`WarningKind`] set; the
//! simulator never fabricates an ordering for them.

mod analyzer;

use crate::parser::ParseError;
use serde::Serialize;

/// Which part of the event loop a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Sync,
    Micro,
    Macro,
    Idle,
}

/// One step of the simulated event loop
#[derive(Debug, Clone, Serialize)]
pub struct EventLoopStep {
    pub phase: Phase,
    pub description: String,
    /// Zero-based source line this step corresponds to; `None` for
    /// bookkeeping steps (phase transitions, the final idle step)
    pub code_line: Option<usize>,
    /// Labels on the call stack, bottom first (`<script>` during sync)
    pub call_stack: Vec<String>,
    /// Labels waiting in the microtask queue after this step
    pub microtasks: Vec<String>,
    /// Labels waiting in the macrotask queue after this step
    pub macrotasks: Vec<String>,
    /// Cumulative console output up to and including this step
    pub output: Vec<String>,
}

/// Closed set of conditions the analyzer can flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// `Promise.all` / `race` / `any` / `allSettled`
    PromiseCombinator,
    /// `.catch(...)` handler
    CatchHandler,
    /// `Promise.reject(...)`
    PromiseReject,
    /// `setInterval(...)`
    SetInterval,
    /// `fetch(...)`
    Fetch,
    /// `new Promise(executor)`
    PromiseConstructor,
    /// The simulation hit its step cap and stopped
    StepLimit,
}

/// A construct the simulation saw but does not model
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerWarning {
    pub kind: WarningKind,
    pub message: String,
    /// Zero-based source line, when the warning points at one
    pub line: Option<usize>,
}

/// The analyzer's result: a phase-by-phase step sequence plus warnings
#[derive(Debug, Clone, Serialize)]
pub struct EventLoopTrace {
    pub steps: Vec<EventLoopStep>,
    pub warnings: Vec<AnalyzerWarning>,
}

impl EventLoopTrace {
    /// Cumulative console output at the end of the simulation
    pub fn final_output(&self) -> &[String] {
        self.steps.last().map(|step| step.output.as_slice()).unwrap_or(&[])
    }
}

/// Simulate the event loop for a source snippet.
///
/// Fails only on parse errors; unmodeled constructs become warnings.
pub fn analyze_event_loop(source: &str) -> Result<EventLoopTrace, ParseError> {
    let program = crate::parser::parse(source)?;
    Ok(analyzer::Analyzer::new(&program).run())
}
