//! Extraction and phase simulation

use super::{AnalyzerWarning, EventLoopStep, EventLoopTrace, Phase, WarningKind};
use crate::parser::ast::{Expr, FnBody, Function, MemberKey, Program, Stmt};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Total step cap for one simulation
const MAX_STEPS: usize = 500;
/// Cap on tasks drained from one queue in one go
const MAX_DRAIN: usize = 50;
/// How deep callback scheduling is followed
const MAX_CALLBACK_DEPTH: usize = 4;

/// An extracted unit of work: what it prints and what it schedules when run
#[derive(Debug, Clone)]
struct Task {
    label: String,
    line: Option<usize>,
    output: Vec<String>,
    spawns_micro: Vec<Task>,
    spawns_macro: Vec<(u64, Task)>,
    /// How the sync step for this task is described; empty for callbacks
    sync_description: String,
}

impl Task {
    fn new(label: &str, line: Option<usize>) -> Self {
        Task {
            label: label.to_string(),
            line,
            output: Vec::new(),
            spawns_micro: Vec::new(),
            spawns_macro: Vec::new(),
            sync_description: String::new(),
        }
    }
}

pub(super) struct Analyzer {
    sync_tasks: Vec<Task>,
    warnings: Vec<AnalyzerWarning>,
    steps: Vec<EventLoopStep>,
    micro: VecDeque<Task>,
    /// Kept sorted by `(delay, seq)`; seq is the scheduling order
    macro_queue: Vec<(u64, u64, Task)>,
    seq: u64,
    output: Vec<String>,
    truncated: bool,
}

impl Analyzer {
    pub(super) fn new(program: &Program) -> Self {
        let mut functions = FxHashMap::default();
        for stmt in &program.body {
            if let Stmt::FunctionDecl { function, .. } = stmt {
                if let Some(name) = &function.name {
                    functions.insert(name.clone(), function.clone());
                }
            }
        }

        let extractor = Extractor { functions };
        let sync_tasks = extractor.extract_top_level(&program.body);
        let warnings = collect_warnings(&program.body);

        Analyzer {
            sync_tasks,
            warnings,
            steps: Vec::new(),
            micro: VecDeque::new(),
            macro_queue: Vec::new(),
            seq: 0,
            output: Vec::new(),
            truncated: false,
        }
    }

    pub(super) fn run(mut self) -> EventLoopTrace {
        self.push_step(
            Phase::Sync,
            "Script starts executing. Global execution context pushed to call stack."
                .to_string(),
            None,
            vec!["<script>".to_string()],
        );

        let sync_tasks = std::mem::take(&mut self.sync_tasks);
        for task in sync_tasks {
            self.output.extend(task.output.iter().cloned());
            self.schedule_spawns(&task);
            let description = if task.sync_description.is_empty() {
                "Runs synchronously on the call stack.".to_string()
            } else {
                task.sync_description.clone()
            };
            self.push_step(
                Phase::Sync,
                description,
                task.line,
                vec!["<script>".to_string(), task.label.clone()],
            );
        }

        self.push_step(
            Phase::Idle,
            "Synchronous code done. Script pops off. Event loop checks microtasks FIRST!"
                .to_string(),
            None,
            Vec::new(),
        );

        self.drain_microtasks();

        while !self.macro_queue.is_empty() && !self.truncated {
            let (_, _, task) = self.macro_queue.remove(0);
            self.output.extend(task.output.iter().cloned());
            self.schedule_spawns(&task);
            self.push_step(
                Phase::Macro,
                format!(
                    "Macrotask '{}' runs. Callback pushed onto the call stack.",
                    task.label
                ),
                task.line,
                vec![task.label.clone()],
            );
            self.drain_microtasks();
        }

        if !self.truncated {
            self.push_step(
                Phase::Idle,
                "All queues empty. Event loop waits for new tasks.".to_string(),
                None,
                Vec::new(),
            );
        }

        EventLoopTrace {
            steps: self.steps,
            warnings: self.warnings,
        }
    }

    /// Microtasks drain completely, including ones queued mid-drain, before
    /// the loop looks at the macrotask queue again
    fn drain_microtasks(&mut self) {
        let mut drained = 0;
        while let Some(task) = self.micro.pop_front() {
            if self.truncated {
                return;
            }
            drained += 1;
            if drained > MAX_DRAIN {
                self.truncate("microtask drain limit reached");
                return;
            }
            self.output.extend(task.output.iter().cloned());
            self.schedule_spawns(&task);
            self.push_step(
                Phase::Micro,
                format!("Microtask '{}' runs.", task.label),
                task.line,
                vec![task.label.clone()],
            );
        }
    }

    fn schedule_spawns(&mut self, task: &Task) {
        for micro in &task.spawns_micro {
            self.micro.push_back(micro.clone());
        }
        for (delay, spawned) in &task.spawns_macro {
            self.enqueue_macro(*delay, spawned.clone());
        }
    }

    /// Insert keeping `(delay, seq)` order: shorter delays first, ties in
    /// scheduling order
    fn enqueue_macro(&mut self, delay: u64, task: Task) {
        let seq = self.seq;
        self.seq += 1;
        let position = self
            .macro_queue
            .iter()
            .position(|(d, s, _)| (*d, *s) > (delay, seq))
            .unwrap_or(self.macro_queue.len());
        self.macro_queue.insert(position, (delay, seq, task));
    }

    fn push_step(
        &mut self,
        phase: Phase,
        description: String,
        code_line: Option<usize>,
        call_stack: Vec<String>,
    ) {
        if self.steps.len() >= MAX_STEPS {
            self.truncate("step limit reached");
            return;
        }
        self.steps.push(EventLoopStep {
            phase,
            description,
            code_line,
            call_stack,
            microtasks: self.micro.iter().map(|task| task.label.clone()).collect(),
            macrotasks: self
                .macro_queue
                .iter()
                .map(|(_, _, task)| task.label.clone())
                .collect(),
            output: self.output.clone(),
        });
    }

    fn truncate(&mut self, reason: &str) {
        if !self.truncated {
            self.truncated = true;
            self.warnings.push(AnalyzerWarning {
                kind: WarningKind::StepLimit,
                message: format!("Simulation stopped early: {}.", reason),
                line: None,
            });
        }
    }
}

// ===== Extraction =====

struct Extractor {
    /// Top-level function declarations, so callbacks can be named functions
    functions: FxHashMap<String, Function>,
}

impl Extractor {
    fn extract_top_level(&self, body: &[Stmt]) -> Vec<Task> {
        let mut tasks = Vec::new();
        for stmt in body {
            match stmt {
                Stmt::FunctionDecl { .. } => {}
                Stmt::Expression { expr, location } => {
                    let line = Some(location.line.saturating_sub(1));
                    if let Some(task) = self.classify_call(expr, line, 0) {
                        tasks.push(task);
                    } else {
                        let mut task = Task::new(&statement_label(stmt), line);
                        task.sync_description =
                            "Runs synchronously on the call stack.".to_string();
                        tasks.push(task);
                    }
                }
                // `const t = setTimeout(...)` schedules exactly like the bare
                // call; the binding itself is plain sync work
                Stmt::VarDecl {
                    declarators,
                    location,
                    ..
                } => {
                    let line = Some(location.line.saturating_sub(1));
                    let mut classified = false;
                    for declarator in declarators {
                        if let Some(task) = declarator
                            .init
                            .as_ref()
                            .and_then(|init| self.classify_call(init, line, 0))
                        {
                            tasks.push(task);
                            classified = true;
                        }
                    }
                    if !classified {
                        let mut task = Task::new(&statement_label(stmt), line);
                        task.sync_description =
                            "Runs synchronously on the call stack.".to_string();
                        tasks.push(task);
                    }
                }
                other => {
                    let line = Some(other.location().line.saturating_sub(1));
                    let mut task = Task::new(&statement_label(other), line);
                    task.sync_description = "Runs synchronously on the call stack.".to_string();
                    tasks.push(task);
                }
            }
        }
        tasks
    }

    /// Recognize the calls the simulation models; anything else is `None`
    fn classify_call(&self, expr: &Expr, line: Option<usize>, depth: usize) -> Option<Task> {
        let Expr::Call { callee, args, .. } = expr else {
            return None;
        };

        // console.log(...)
        if is_member_of(callee, "console", "log") {
            let rendered = render_log_args(args);
            let mut task = Task::new("console.log()", line);
            task.sync_description = format!("console.log prints '{}'.", rendered);
            task.output.push(rendered);
            return Some(task);
        }

        // setTimeout(cb, delay)
        if is_identifier(callee, "setTimeout") {
            let delay = args
                .get(1)
                .and_then(|arg| match arg {
                    Expr::Number(n, _) => Some(*n as u64),
                    _ => None,
                })
                .unwrap_or(0);
            let label = if depth == 0 { "timeout cb" } else { "nested timeout cb" };
            let callback = self.task_from_callback(args.first(), label, depth + 1);
            let mut task = Task::new("setTimeout()", line);
            task.sync_description = format!(
                "setTimeout called. Callback handed to the timer; macrotask queued ({}ms).",
                delay
            );
            task.spawns_macro.push((delay, callback));
            return Some(task);
        }

        // queueMicrotask(cb)
        if is_identifier(callee, "queueMicrotask") {
            let label = if depth == 0 { "microtask cb" } else { "nested microtask cb" };
            let callback = self.task_from_callback(args.first(), label, depth + 1);
            let mut task = Task::new("queueMicrotask()", line);
            task.sync_description =
                "queueMicrotask called. Callback queued on the microtask queue.".to_string();
            task.spawns_micro.push(callback);
            return Some(task);
        }

        // Promise.resolve().then(cb).then(cb2)...
        if let Some(callbacks) = promise_then_chain(expr) {
            let label = if depth == 0 { "promise cb" } else { "nested promise cb" };
            // Chain backwards: each callback queues the next as a microtask
            // when it completes
            let mut next: Option<Task> = None;
            for callback in callbacks.into_iter().rev() {
                let mut task = self.task_from_callback(callback, label, depth + 1);
                if let Some(chained) = next.take() {
                    task.spawns_micro.push(chained);
                }
                next = Some(task);
            }
            let first = next?;
            let mut task = Task::new("Promise.then()", line);
            task.sync_description =
                "Promise already fulfilled. Its .then callback is queued on the microtask queue."
                    .to_string();
            task.spawns_micro.push(first);
            return Some(task);
        }

        None
    }

    /// Turn a callback expression (arrow, function expression, or the name
    /// of a top-level function) into a task by walking its body one
    /// statement at a time
    fn task_from_callback(&self, callback: Option<&Expr>, label: &str, depth: usize) -> Task {
        let mut task = Task::new(label, None);
        if depth > MAX_CALLBACK_DEPTH {
            return task;
        }

        let function = match callback {
            Some(Expr::Function { function, location }) => {
                task.line = Some(location.line.saturating_sub(1));
                Some((**function).clone())
            }
            Some(Expr::Identifier(name, location)) => {
                task.line = Some(location.line.saturating_sub(1));
                self.functions.get(name).cloned()
            }
            _ => None,
        };
        let Some(function) = function else {
            return task;
        };

        match &function.body {
            FnBody::Expr(expr) => self.absorb_callback_effect(&mut task, expr, depth),
            FnBody::Block(body) => {
                for stmt in body {
                    match stmt {
                        Stmt::Expression { expr, .. } => {
                            self.absorb_callback_effect(&mut task, expr, depth);
                        }
                        Stmt::VarDecl { declarators, .. } => {
                            for declarator in declarators {
                                if let Some(init) = &declarator.init {
                                    self.absorb_callback_effect(&mut task, init, depth);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        task
    }

    /// Fold one callback-body expression into the task: output for logs,
    /// spawned tasks for nested scheduling
    fn absorb_callback_effect(&self, task: &mut Task, expr: &Expr, depth: usize) {
        if let Expr::Call { callee, args, .. } = expr {
            if is_member_of(callee, "console", "log") {
                task.output.push(render_log_args(args));
                return;
            }
        }
        if let Some(inner) = self.classify_call(expr, None, depth) {
            task.spawns_micro.extend(inner.spawns_micro);
            task.spawns_macro.extend(inner.spawns_macro);
            task.output.extend(inner.output);
        }
    }
}

fn statement_label(stmt: &Stmt) -> String {
    match stmt {
        Stmt::VarDecl {
            kind, declarators, ..
        } => {
            let names: Vec<&str> = declarators
                .iter()
                .map(|declarator| declarator.name.as_str())
                .collect();
            format!("{} {}", kind, names.join(", "))
        }
        Stmt::Expression { expr, .. } => expr.to_source(),
        Stmt::If { .. } => "if statement".to_string(),
        Stmt::While { .. } | Stmt::DoWhile { .. } => "loop".to_string(),
        Stmt::For { .. } | Stmt::ForOf { .. } => "loop".to_string(),
        _ => "statement".to_string(),
    }
}

fn is_identifier(expr: &Expr, name: &str) -> bool {
    matches!(expr, Expr::Identifier(n, _) if n == name)
}

fn is_member_of(expr: &Expr, object: &str, property: &str) -> bool {
    if let Expr::Member {
        object: obj,
        property: MemberKey::Static(name),
        ..
    } = expr
    {
        return is_identifier(obj, object) && name == property;
    }
    false
}

/// Match `Promise.resolve().then(cb)[.then(cb2)]*`, returning the `.then`
/// callbacks in scheduling order
fn promise_then_chain(expr: &Expr) -> Option<Vec<Option<&Expr>>> {
    let mut callbacks = Vec::new();
    let mut current = expr;
    loop {
        let Expr::Call { callee, args, .. } = current else {
            return None;
        };
        let Expr::Member {
            object,
            property: MemberKey::Static(name),
            ..
        } = &**callee
        else {
            return None;
        };
        match name.as_str() {
            "then" => {
                callbacks.push(args.first());
                current = object;
            }
            "resolve" if is_identifier(object, "Promise") => {
                if callbacks.is_empty() {
                    return None;
                }
                callbacks.reverse();
                return Some(callbacks);
            }
            _ => return None,
        }
    }
}

// ===== Warnings =====

/// Walk every statement and expression, flagging constructs the simulation
/// does not model. Detection is structural (AST shapes), never text
/// matching, so `// Promise.all` in a comment can't trigger it.
fn collect_warnings(body: &[Stmt]) -> Vec<AnalyzerWarning> {
    let mut warnings = Vec::new();
    for stmt in body {
        walk_stmt(stmt, &mut warnings);
    }
    warnings
}

fn walk_stmt(stmt: &Stmt, warnings: &mut Vec<AnalyzerWarning>) {
    match stmt {
        Stmt::VarDecl { declarators, .. } => {
            for declarator in declarators {
                if let Some(init) = &declarator.init {
                    walk_expr(init, warnings);
                }
            }
        }
        Stmt::FunctionDecl { function, .. } => walk_function(function, warnings),
        Stmt::Expression { expr, .. } => walk_expr(expr, warnings),
        Stmt::Return { expr, .. } => {
            if let Some(expr) = expr {
                walk_expr(expr, warnings);
            }
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            walk_expr(condition, warnings);
            walk_stmt(then_branch, warnings);
            if let Some(else_branch) = else_branch {
                walk_stmt(else_branch, warnings);
            }
        }
        Stmt::While {
            condition, body, ..
        }
        | Stmt::DoWhile {
            condition, body, ..
        } => {
            walk_expr(condition, warnings);
            walk_stmt(body, warnings);
        }
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            if let Some(init) = init {
                walk_stmt(init, warnings);
            }
            if let Some(test) = test {
                walk_expr(test, warnings);
            }
            if let Some(update) = update {
                walk_expr(update, warnings);
            }
            walk_stmt(body, warnings);
        }
        Stmt::ForOf { iterable, body, .. } => {
            walk_expr(iterable, warnings);
            walk_stmt(body, warnings);
        }
        Stmt::Block { body, .. } => {
            for stmt in body {
                walk_stmt(stmt, warnings);
            }
        }
        Stmt::Break { .. } | Stmt::Continue { .. } => {}
    }
}

fn walk_function(function: &Function, warnings: &mut Vec<AnalyzerWarning>) {
    for param in &function.params {
        if let Some(default) = &param.default {
            walk_expr(default, warnings);
        }
    }
    match &function.body {
        FnBody::Block(body) => {
            for stmt in body {
                walk_stmt(stmt, warnings);
            }
        }
        FnBody::Expr(expr) => walk_expr(expr, warnings),
    }
}

fn walk_expr(expr: &Expr, warnings: &mut Vec<AnalyzerWarning>) {
    let line = Some(expr.location().line.saturating_sub(1));

    match expr {
        Expr::Call { callee, args, .. } => {
            if let Expr::Member {
                object,
                property: MemberKey::Static(name),
                ..
            } = &**callee
            {
                if is_identifier(object, "Promise") {
                    match name.as_str() {
                        "all" | "race" | "any" | "allSettled" => warnings.push(AnalyzerWarning {
                            kind: WarningKind::PromiseCombinator,
                            message: format!(
                                "Promise.{} is modeled as a plain promise; combinator ordering is not simulated.",
                                name
                            ),
                            line,
                        }),
                        "reject" => warnings.push(AnalyzerWarning {
                            kind: WarningKind::PromiseReject,
                            message: "Promise.reject is not simulated; rejection paths are ignored."
                                .to_string(),
                            line,
                        }),
                        _ => {}
                    }
                }
                if name == "catch" {
                    warnings.push(AnalyzerWarning {
                        kind: WarningKind::CatchHandler,
                        message: ".catch handlers are not simulated; rejection paths are ignored."
                            .to_string(),
                        line,
                    });
                }
                walk_expr(object, warnings);
            } else {
                if is_identifier(callee, "setInterval") {
                    warnings.push(AnalyzerWarning {
                        kind: WarningKind::SetInterval,
                        message: "setInterval is not simulated; only setTimeout is modeled."
                            .to_string(),
                        line,
                    });
                }
                if is_identifier(callee, "fetch") {
                    warnings.push(AnalyzerWarning {
                        kind: WarningKind::Fetch,
                        message: "fetch is not simulated; network callbacks are ignored."
                            .to_string(),
                        line,
                    });
                }
                walk_expr(callee, warnings);
            }
            for arg in args {
                walk_expr(arg, warnings);
            }
        }
        Expr::New {
            constructor, args, ..
        } => {
            if constructor == "Promise" {
                warnings.push(AnalyzerWarning {
                    kind: WarningKind::PromiseConstructor,
                    message: "new Promise(executor) is not simulated; executor timing is ignored."
                        .to_string(),
                    line,
                });
            }
            for arg in args {
                walk_expr(arg, warnings);
            }
        }
        Expr::Function { function, .. } => walk_function(function, warnings),
        Expr::Array { elements, .. } => {
            for element in elements {
                walk_expr(element, warnings);
            }
        }
        Expr::Object { properties, .. } => {
            for (_, value) in properties {
                walk_expr(value, warnings);
            }
        }
        Expr::Assignment { target, value, .. } => {
            walk_expr(target, warnings);
            walk_expr(value, warnings);
        }
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            walk_expr(left, warnings);
            walk_expr(right, warnings);
        }
        Expr::Unary { operand, .. } => walk_expr(operand, warnings),
        Expr::Update { target, .. } => walk_expr(target, warnings),
        Expr::Conditional {
            condition,
            consequent,
            alternate,
            ..
        } => {
            walk_expr(condition, warnings);
            walk_expr(consequent, warnings);
            walk_expr(alternate, warnings);
        }
        Expr::Member {
            object, property, ..
        } => {
            walk_expr(object, warnings);
            if let MemberKey::Computed(index) = property {
                walk_expr(index, warnings);
            }
        }
        _ => {}
    }
}

/// Render `console.log` arguments the way the console would show them:
/// string literals bare, everything else as source text
fn render_log_args(args: &[Expr]) -> String {
    args.iter()
        .map(|arg| match arg {
            Expr::Str(s, _) => s.clone(),
            other => other.to_source(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
