//! Interpreter engine
//!
//! Owns all execution state (scope arena, heap, call stack, console, the
//! trace itself) and the stepping machinery. Statement and expression
//! evaluation live in sibling modules as further `impl Interpreter` blocks.
//!
//! # Stepping model
//!
//! Every observable transition records one [`ExecutionStep`] holding a deep
//! snapshot of the scope chain, call stack and heap. Recording fails with
//! [`RuntimeError::StepLimitExceeded`] once the trace holds `max_steps`
//! entries; the error unwinds the walk, so a runaway `while (true) {}`
//! produces a trace of exactly `max_steps` steps and a reported guard
//! condition instead of hanging the host.

use super::errors::{GuardLimit, RuntimeError};
use crate::parser::ast::{Program, SourceLocation, Stmt};
use crate::runtime::{
    Address, CallFrame, CallStack, Heap, HeapObject, ScopeArena, ScopeId, Value, GLOBAL_SCOPE,
};
use crate::trace::{
    Breakpoint, ConsoleRecorder, ExecutionStep, FrameSnapshot, HeapObjectSnapshot, ScopeSnapshot,
    StepKind,
};

/// Caps that keep a runaway program from hanging or flooding the host
#[derive(Debug, Clone, Copy)]
pub struct GuardLimits {
    /// Maximum number of steps in a trace
    pub max_steps: usize,
    /// Maximum function nesting depth (global frame excluded)
    pub max_call_depth: usize,
    /// Maximum iterations of any single loop
    pub max_loop_iterations: usize,
}

impl Default for GuardLimits {
    fn default() -> Self {
        GuardLimits {
            max_steps: 10_000,
            max_call_depth: 100,
            max_loop_iterations: 1_000,
        }
    }
}

/// Tree-walking interpreter that records a replayable trace
pub struct Interpreter {
    pub(crate) limits: GuardLimits,
    pub(crate) scopes: ScopeArena,
    pub(crate) current_scope: ScopeId,
    pub(crate) heap: Heap,
    pub(crate) stack: CallStack,
    pub(crate) console: ConsoleRecorder,
    pub(crate) steps: Vec<ExecutionStep>,
    pub(crate) guard: Option<GuardLimit>,
    pub(crate) breakpoints: Vec<Breakpoint>,
    /// Set by `return`; checked after every statement to unwind the body
    pub(crate) pending_return: Option<Value>,
    pub(crate) should_break: bool,
    pub(crate) should_continue: bool,
}

impl Interpreter {
    pub fn new(limits: GuardLimits) -> Self {
        Interpreter {
            limits,
            scopes: ScopeArena::new(),
            current_scope: GLOBAL_SCOPE,
            heap: Heap::new(),
            stack: CallStack::new(),
            console: ConsoleRecorder::new(),
            steps: Vec::new(),
            guard: None,
            breakpoints: Vec::new(),
            pending_return: None,
            should_break: false,
            should_continue: false,
        }
    }

    /// Breakpoints are consumer state; the interpreter only uses them to
    /// flag matching steps as pause points.
    pub fn set_breakpoints(&mut self, breakpoints: &[Breakpoint]) {
        self.breakpoints = breakpoints.to_vec();
    }

    /// Execute a program and return its trace. Any previous execution state
    /// is discarded, so the same program always yields the same trace.
    pub fn execute(&mut self, program: &Program) -> Vec<ExecutionStep> {
        self.reset();

        let start_line = program
            .body
            .first()
            .map(|stmt| stmt.location().line)
            .unwrap_or(1);
        self.stack.push(CallFrame {
            name: "global".to_string(),
            params: Vec::new(),
            scope: GLOBAL_SCOPE,
            call_site: None,
            start_line,
            depth: 0,
        });

        if let Err(err) = self.run_program(program) {
            self.guard = err.guard_limit();
            // The step cap needs no closing step (the trace is already
            // full); every other failure ends the trace with an error step.
            if !matches!(err, RuntimeError::StepLimitExceeded) {
                let location = err.location().unwrap_or(SourceLocation::new(1, 1));
                let _ = self.record_step(StepKind::Error, location, err.to_string());
            }
        }

        std::mem::take(&mut self.steps)
    }

    /// All console lines produced by the last execution
    pub fn console_output(&self) -> &[String] {
        self.console.lines()
    }

    /// Which guard cap the last execution hit, if any
    pub fn guard_exceeded(&self) -> Option<GuardLimit> {
        self.guard
    }

    fn run_program(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.hoist_scope(&program.body, GLOBAL_SCOPE)?;
        for stmt in &program.body {
            self.execute_statement(stmt)?;
            // A stray top-level `return` ends nothing; drop it
            self.pending_return = None;
            self.should_break = false;
            self.should_continue = false;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.scopes = ScopeArena::new();
        self.current_scope = GLOBAL_SCOPE;
        self.heap = Heap::new();
        self.stack.clear();
        self.console.clear();
        self.steps.clear();
        self.guard = None;
        self.pending_return = None;
        self.should_break = false;
        self.should_continue = false;
    }

    /// Record one step with a full state snapshot
    pub(crate) fn record_step(
        &mut self,
        kind: StepKind,
        location: SourceLocation,
        description: String,
    ) -> Result<(), RuntimeError> {
        if self.steps.len() >= self.limits.max_steps {
            return Err(RuntimeError::StepLimitExceeded);
        }

        let pause_point = self
            .breakpoints
            .iter()
            .any(|breakpoint| breakpoint.line == location.line);

        let step = ExecutionStep {
            index: self.steps.len(),
            kind,
            location,
            description,
            call_stack: FrameSnapshot::capture(&self.stack),
            scopes: ScopeSnapshot::capture_chain(&self.scopes, self.current_scope),
            heap: HeapObjectSnapshot::capture(&self.heap),
            console_delta: self.console.delta(),
            pause_point,
        };
        self.steps.push(step);
        Ok(())
    }

    /// Index the next recorded step will get; stamped on heap allocations
    pub(crate) fn step_index(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn heap_get(
        &self,
        address: Address,
        location: SourceLocation,
    ) -> Result<&HeapObject, RuntimeError> {
        self.heap
            .get(address)
            .map_err(|message| RuntimeError::HeapFault { message, location })
    }

    pub(crate) fn heap_get_mut(
        &mut self,
        address: Address,
        location: SourceLocation,
    ) -> Result<&mut HeapObject, RuntimeError> {
        self.heap
            .get_mut(address)
            .map_err(|message| RuntimeError::HeapFault { message, location })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(GuardLimits::default())
    }
}

// ===== Hoisting =====

impl Interpreter {
    /// Hoist declarations into `scope` before its body runs: function
    /// declarations become callable immediately, `var` names are bound to
    /// `undefined`. `var`s are collected through nested blocks and loops but
    /// never through nested function bodies.
    pub(crate) fn hoist_scope(
        &mut self,
        body: &[Stmt],
        scope: ScopeId,
    ) -> Result<(), RuntimeError> {
        self.hoist_functions(body, scope);

        let mut var_names = Vec::new();
        for stmt in body {
            collect_var_names(stmt, &mut var_names);
        }
        for name in var_names {
            if !self.scopes.has_own(scope, &name) {
                self.scopes.declare(scope, &name, Value::Undefined);
            }
        }

        Ok(())
    }

    /// Hoist just the function declarations of a statement list into
    /// `scope`. Blocks use this alone; `var` hoisting happens once per
    /// function body.
    pub(crate) fn hoist_functions(&mut self, body: &[Stmt], scope: ScopeId) {
        for stmt in body {
            if let Stmt::FunctionDecl { function, .. } = stmt {
                let value = self.allocate_function(function, scope);
                if let Some(name) = &function.name {
                    self.scopes.declare(scope, name, value);
                }
            }
        }
    }
}

/// Collect `var` declarator names, descending into blocks and control flow
/// but not into nested functions
fn collect_var_names(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::VarDecl {
            kind: crate::parser::ast::DeclKind::Var,
            declarators,
            ..
        } => {
            for declarator in declarators {
                out.push(declarator.name.clone());
            }
        }
        Stmt::VarDecl { .. } | Stmt::FunctionDecl { .. } => {}
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            collect_var_names(then_branch, out);
            if let Some(else_branch) = else_branch {
                collect_var_names(else_branch, out);
            }
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => {
            collect_var_names(body, out);
        }
        Stmt::For { init, body, .. } => {
            if let Some(init) = init {
                collect_var_names(init, out);
            }
            collect_var_names(body, out);
        }
        Stmt::ForOf { kind, binding, body, .. } => {
            if *kind == crate::parser::ast::DeclKind::Var {
                out.push(binding.clone());
            }
            collect_var_names(body, out);
        }
        Stmt::Block { body, .. } => {
            for stmt in body {
                collect_var_names(stmt, out);
            }
        }
        Stmt::Expression { .. }
        | Stmt::Return { .. }
        | Stmt::Break { .. }
        | Stmt::Continue { .. } => {}
    }
}
