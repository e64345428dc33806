//! Statement execution

use super::engine::Interpreter;
use super::errors::RuntimeError;
use crate::parser::ast::{DeclKind, Expr, SourceLocation, Stmt, UpdateOp};
use crate::runtime::{HeapData, ScopeKind, Value};
use crate::trace::StepKind;

impl Interpreter {
    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::VarDecl {
                kind,
                declarators,
                location,
            } => {
                for declarator in declarators {
                    let value = match &declarator.init {
                        Some(init) => self.evaluate(init)?,
                        None => Value::Undefined,
                    };
                    if *kind == DeclKind::Var {
                        // The binding was hoisted to the function scope;
                        // assignment finds it there
                        self.scopes
                            .assign(self.current_scope, &declarator.name, value.clone());
                    } else {
                        self.scopes
                            .declare(self.current_scope, &declarator.name, value.clone());
                    }
                    let rendered = self.heap.format_value_quoted(&value);
                    self.record_step(
                        StepKind::Declaration,
                        *location,
                        format!("{} {} = {}", kind, declarator.name, rendered),
                    )?;
                }
                Ok(())
            }

            Stmt::FunctionDecl { function, location } => {
                // The binding itself was created during hoisting
                let name = function.name.as_deref().unwrap_or("anonymous");
                let params: Vec<&str> = function
                    .params
                    .iter()
                    .map(|param| param.name.as_str())
                    .collect();
                self.record_step(
                    StepKind::Declaration,
                    *location,
                    format!("function {}({})", name, params.join(", ")),
                )
            }

            Stmt::Expression { expr, location } => self.execute_expression_statement(expr, *location),

            Stmt::Return { expr, location: _ } => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Undefined,
                };
                self.pending_return = Some(value);
                Ok(())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                location,
            } => {
                let taken = self.evaluate(condition)?.is_truthy();
                self.record_step(
                    StepKind::Branch,
                    *location,
                    format!("if ({}) → {}", condition.to_source(), taken),
                )?;
                if taken {
                    self.execute_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)
                } else {
                    Ok(())
                }
            }

            Stmt::While {
                condition,
                body,
                location,
            } => self.run_while(condition, body, *location),

            Stmt::DoWhile {
                body,
                condition,
                location,
            } => self.run_do_while(body, condition, *location),

            Stmt::For {
                init,
                test,
                update,
                body,
                location,
            } => self.run_for(init.as_deref(), test.as_ref(), update.as_ref(), body, *location),

            Stmt::ForOf {
                kind,
                binding,
                iterable,
                body,
                location,
            } => self.run_for_of(*kind, binding, iterable, body, *location),

            Stmt::Block { body, .. } => {
                let saved = self.current_scope;
                let scope = self.scopes.create(ScopeKind::Block, "block", saved);
                self.current_scope = scope;
                self.hoist_functions(body, scope);
                let result = self.execute_body(body);
                self.current_scope = saved;
                result
            }

            Stmt::Break { .. } => {
                self.should_break = true;
                Ok(())
            }

            Stmt::Continue { .. } => {
                self.should_continue = true;
                Ok(())
            }
        }
    }

    /// Run a statement list, stopping early on return/break/continue
    pub(crate) fn execute_body(&mut self, body: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in body {
            self.execute_statement(stmt)?;
            if self.pending_return.is_some() || self.should_break || self.should_continue {
                break;
            }
        }
        Ok(())
    }

    /// Expression statements step according to what the expression did:
    /// assignments through a member are heap mutations, calls already
    /// recorded their own call/return/console steps, everything else is a
    /// plain expression step.
    fn execute_expression_statement(
        &mut self,
        expr: &Expr,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let value = self.evaluate(expr)?;

        match expr {
            Expr::Assignment { target, .. } => {
                let kind = if matches!(**target, Expr::Member { .. }) {
                    StepKind::HeapMutation
                } else {
                    StepKind::Assignment
                };
                let rendered = self.heap.format_value_quoted(&value);
                self.record_step(
                    kind,
                    location,
                    format!("{} = {}", target.to_source(), rendered),
                )
            }
            Expr::Update {
                op,
                prefix,
                target,
                ..
            } => {
                let delta = match op {
                    UpdateOp::Inc => 1.0,
                    UpdateOp::Dec => -1.0,
                };
                let after = if *prefix {
                    value.to_number()
                } else {
                    value.to_number() + delta
                };
                let kind = if matches!(**target, Expr::Member { .. }) {
                    StepKind::HeapMutation
                } else {
                    StepKind::Assignment
                };
                self.record_step(
                    kind,
                    location,
                    format!(
                        "{} → {}",
                        expr.to_source(),
                        crate::runtime::value::format_number(after)
                    ),
                )
            }
            Expr::Call { .. } | Expr::New { .. } => Ok(()),
            _ => {
                let rendered = self.heap.format_value_quoted(&value);
                self.record_step(
                    StepKind::Expression,
                    location,
                    format!("{} → {}", expr.to_source(), rendered),
                )
            }
        }
    }

    // ===== Loops =====

    fn run_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.record_step(
            StepKind::LoopStart,
            location,
            format!("while ({})", condition.to_source()),
        )?;

        let mut iterations = 0usize;
        loop {
            if !self.evaluate(condition)?.is_truthy() {
                break;
            }
            iterations += 1;
            if iterations > self.limits.max_loop_iterations {
                return Err(RuntimeError::LoopLimitExceeded { location });
            }
            self.record_step(
                StepKind::LoopIteration,
                location,
                format!("while ({}) iteration {}", condition.to_source(), iterations),
            )?;

            self.execute_statement(body)?;
            self.should_continue = false;
            if self.should_break {
                self.should_break = false;
                break;
            }
            if self.pending_return.is_some() {
                return Ok(());
            }
        }

        self.record_step(
            StepKind::LoopEnd,
            location,
            format!("while loop done after {} iteration(s)", iterations),
        )
    }

    fn run_do_while(
        &mut self,
        body: &Stmt,
        condition: &Expr,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.record_step(
            StepKind::LoopStart,
            location,
            format!("do..while ({})", condition.to_source()),
        )?;

        let mut iterations = 0usize;
        loop {
            iterations += 1;
            if iterations > self.limits.max_loop_iterations {
                return Err(RuntimeError::LoopLimitExceeded { location });
            }
            self.record_step(
                StepKind::LoopIteration,
                location,
                format!("do..while iteration {}", iterations),
            )?;

            self.execute_statement(body)?;
            self.should_continue = false;
            if self.should_break {
                self.should_break = false;
                break;
            }
            if self.pending_return.is_some() {
                return Ok(());
            }

            if !self.evaluate(condition)?.is_truthy() {
                break;
            }
        }

        self.record_step(
            StepKind::LoopEnd,
            location,
            format!("do..while loop done after {} iteration(s)", iterations),
        )
    }

    fn run_for(
        &mut self,
        init: Option<&Stmt>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let saved = self.current_scope;
        let head = self.scopes.create(ScopeKind::Block, "for", saved);
        self.current_scope = head;

        let result = self.run_for_inner(init, test, update, body, location, head);

        self.current_scope = saved;
        let iterations = result?;

        self.record_step(
            StepKind::LoopEnd,
            location,
            format!("for loop done after {} iteration(s)", iterations),
        )
    }

    fn run_for_inner(
        &mut self,
        init: Option<&Stmt>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        location: SourceLocation,
        head: crate::runtime::ScopeId,
    ) -> Result<usize, RuntimeError> {
        // `let`/`const` loop variables get a fresh copy per iteration, so
        // closures created in the body capture distinct bindings
        let mut loop_vars: Vec<String> = Vec::new();
        if let Some(init) = init {
            if let Stmt::VarDecl {
                kind: DeclKind::Let | DeclKind::Const,
                declarators,
                ..
            } = init
            {
                loop_vars = declarators
                    .iter()
                    .map(|declarator| declarator.name.clone())
                    .collect();
            }
            self.execute_statement(init)?;
        }

        self.record_step(
            StepKind::LoopStart,
            location,
            format!(
                "for ({}; {}; {})",
                init.map(|_| "…").unwrap_or(""),
                test.map(Expr::to_source).unwrap_or_default(),
                update.map(Expr::to_source).unwrap_or_default()
            ),
        )?;

        let mut iterations = 0usize;
        let mut iter_scope = self.per_iteration_scope(head, &loop_vars, head);
        self.current_scope = iter_scope;
        loop {
            if let Some(test) = test {
                if !self.evaluate(test)?.is_truthy() {
                    break;
                }
            }

            iterations += 1;
            if iterations > self.limits.max_loop_iterations {
                return Err(RuntimeError::LoopLimitExceeded { location });
            }
            self.record_step(
                StepKind::LoopIteration,
                location,
                format!("for loop iteration {}", iterations),
            )?;

            self.execute_statement(body)?;
            self.should_continue = false;
            if self.should_break {
                self.should_break = false;
                break;
            }
            if self.pending_return.is_some() {
                break;
            }

            // Copy the loop variables into the next iteration's scope before
            // the update runs, so closures made this iteration keep the
            // pre-update values
            iter_scope = self.per_iteration_scope(head, &loop_vars, iter_scope);
            self.current_scope = iter_scope;
            if let Some(update) = update {
                self.evaluate(update)?;
            }
        }

        Ok(iterations)
    }

    fn per_iteration_scope(
        &mut self,
        head: crate::runtime::ScopeId,
        loop_vars: &[String],
        carry: crate::runtime::ScopeId,
    ) -> crate::runtime::ScopeId {
        if loop_vars.is_empty() {
            return head;
        }
        let scope = self.scopes.create(ScopeKind::Block, "for", head);
        for name in loop_vars {
            if let Some(value) = self.scopes.lookup(carry, name) {
                self.scopes.declare(scope, name, value);
            }
        }
        scope
    }

    fn run_for_of(
        &mut self,
        kind: DeclKind,
        binding: &str,
        iterable: &Expr,
        body: &Stmt,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let value = self.evaluate(iterable)?;
        let items = self.iterable_items(&value, iterable, location)?;

        self.record_step(
            StepKind::LoopStart,
            location,
            format!("for ({} {} of {})", kind, binding, iterable.to_source()),
        )?;

        let saved = self.current_scope;
        let mut iterations = 0usize;
        let mut result = Ok(());

        for item in items {
            iterations += 1;
            if iterations > self.limits.max_loop_iterations {
                result = Err(RuntimeError::LoopLimitExceeded { location });
                break;
            }

            // Fresh scope per iteration: closures capture this element's
            // binding, not a shared one
            let scope = self.scopes.create(ScopeKind::Block, "for-of", saved);
            self.current_scope = scope;
            if kind == DeclKind::Var {
                self.scopes.assign(saved, binding, item.clone());
            } else {
                self.scopes.declare(scope, binding, item.clone());
            }

            let rendered = self.heap.format_value_quoted(&item);
            if let Err(err) = self.record_step(
                StepKind::LoopIteration,
                location,
                format!("{} = {}", binding, rendered),
            ) {
                result = Err(err);
                break;
            }
            if let Err(err) = self.execute_statement(body) {
                result = Err(err);
                break;
            }
            self.current_scope = saved;

            self.should_continue = false;
            if self.should_break {
                self.should_break = false;
                break;
            }
            if self.pending_return.is_some() {
                break;
            }
        }

        self.current_scope = saved;
        result?;

        self.record_step(
            StepKind::LoopEnd,
            location,
            format!("for..of done after {} iteration(s)", iterations),
        )
    }

    /// Materialize the elements a `for..of` walks. Map entries become
    /// freshly allocated `[key, value]` arrays, mirroring JS iteration.
    fn iterable_items(
        &mut self,
        value: &Value,
        iterable: &Expr,
        location: SourceLocation,
    ) -> Result<Vec<Value>, RuntimeError> {
        match value {
            Value::Array(addr) => match &self.heap_get(*addr, location)?.data {
                HeapData::Array(elements) => Ok(elements.clone()),
                _ => Ok(Vec::new()),
            },
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Set(addr) => match &self.heap_get(*addr, location)?.data {
                HeapData::Set(members) => Ok(members.clone()),
                _ => Ok(Vec::new()),
            },
            Value::Map(addr) => {
                let entries = match &self.heap_get(*addr, location)?.data {
                    HeapData::Map(entries) => entries.clone(),
                    _ => Vec::new(),
                };
                let step = self.step_index();
                Ok(entries
                    .into_iter()
                    .map(|(key, val)| {
                        let addr = self.heap.allocate(HeapData::Array(vec![key, val]), step);
                        Value::Array(addr)
                    })
                    .collect())
            }
            _ => Err(RuntimeError::TypeError {
                message: format!("{} is not iterable", iterable.to_source()),
                location,
            }),
        }
    }
}
