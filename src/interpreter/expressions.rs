//! Expression evaluation
//!
//! Left-to-right, depth-first. Pure sub-expression evaluation records no
//! steps; calls, console output and heap mutations do.

use super::engine::Interpreter;
use super::errors::RuntimeError;
use crate::parser::ast::{
    self, AssignOp, BinOp, Expr, FnBody, LogicalOp, MemberKey, SourceLocation, UnOp, UpdateOp,
};
use crate::runtime::{
    Address, CallFrame, FunctionObject, HeapData, ScopeId, ScopeKind, Value,
};
use crate::trace::StepKind;
use indexmap::IndexMap;

/// A numeric key addresses an element only when it is a non-negative
/// integer; `a[-1]` or `a[0.5]` are plain properties in JS and never touch
/// the element storage.
fn element_index(n: f64) -> Option<usize> {
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 {
        Some(n as usize)
    } else {
        None
    }
}

impl Interpreter {
    pub(crate) fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::Str(s, _) => Ok(Value::Str(s.clone())),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::Null(_) => Ok(Value::Null),
            Expr::This(_) => Ok(Value::Undefined),

            Expr::Identifier(name, _) => Ok(self.resolve_identifier(name)),

            Expr::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                let step = self.step_index();
                let address = self.heap.allocate(HeapData::Array(values), step);
                Ok(Value::Array(address))
            }

            Expr::Object { properties, .. } => {
                let mut map = IndexMap::with_capacity(properties.len());
                for (key, value) in properties {
                    map.insert(key.clone(), self.evaluate(value)?);
                }
                let step = self.step_index();
                let address = self.heap.allocate(HeapData::Object(map), step);
                Ok(Value::Object(address))
            }

            Expr::Function { function, .. } => {
                Ok(self.allocate_function(function, self.current_scope))
            }

            Expr::Assignment {
                target,
                op,
                value,
                location,
            } => self.eval_assignment(target, *op, value, *location),

            Expr::Binary {
                op,
                left,
                right,
                location,
            } => {
                let lhs = self.evaluate(left)?;
                let rhs = self.evaluate(right)?;
                self.apply_binary(*op, &lhs, &rhs, *location)
            }

            Expr::Logical {
                op, left, right, ..
            } => {
                let lhs = self.evaluate(left)?;
                let take_right = match op {
                    LogicalOp::And => lhs.is_truthy(),
                    LogicalOp::Or => !lhs.is_truthy(),
                    LogicalOp::Nullish => matches!(lhs, Value::Null | Value::Undefined),
                };
                if take_right {
                    self.evaluate(right)
                } else {
                    Ok(lhs)
                }
            }

            Expr::Unary { op, operand, .. } => {
                let value = self.evaluate(operand)?;
                Ok(match op {
                    UnOp::Neg => Value::Number(-value.to_number()),
                    UnOp::Pos => Value::Number(value.to_number()),
                    UnOp::Not => Value::Bool(!value.is_truthy()),
                    UnOp::Typeof => Value::Str(value.type_of().to_string()),
                })
            }

            Expr::Update {
                op,
                prefix,
                target,
                location,
            } => {
                let old = self.evaluate(target)?.to_number();
                let delta = match op {
                    UpdateOp::Inc => 1.0,
                    UpdateOp::Dec => -1.0,
                };
                let new_value = Value::Number(old + delta);
                self.assign_to(target, new_value.clone(), *location)?;
                Ok(if *prefix {
                    new_value
                } else {
                    Value::Number(old)
                })
            }

            Expr::Conditional {
                condition,
                consequent,
                alternate,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(consequent)
                } else {
                    self.evaluate(alternate)
                }
            }

            Expr::Call {
                callee,
                args,
                location,
            } => self.eval_call(callee, args, *location),

            Expr::New {
                constructor,
                args,
                location,
            } => self.eval_new(constructor, args, *location),

            Expr::Member {
                object,
                property,
                location,
            } => {
                let receiver = self.evaluate(object)?;
                let key = self.member_key(property)?;
                self.member_read(&receiver, &key, object, *location)
            }
        }
    }

    /// `undefined`, `NaN` and `Infinity` are plain global bindings in JS;
    /// everything else resolves through the scope chain, and an unbound name
    /// reads as `undefined`.
    fn resolve_identifier(&self, name: &str) -> Value {
        match name {
            "undefined" => Value::Undefined,
            "NaN" => Value::Number(f64::NAN),
            "Infinity" => Value::Number(f64::INFINITY),
            _ => self
                .scopes
                .lookup(self.current_scope, name)
                .unwrap_or(Value::Undefined),
        }
    }

    pub(crate) fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|arg| self.evaluate(arg)).collect()
    }

    pub(crate) fn allocate_function(&mut self, function: &ast::Function, env: ScopeId) -> Value {
        let step = self.step_index();
        let address = self.heap.allocate(
            HeapData::Function(FunctionObject {
                name: function.name.clone(),
                params: function.params.clone(),
                body: function.body.clone(),
                env,
            }),
            step,
        );
        Value::Function(address)
    }

    // ===== Assignment =====

    fn eval_assignment(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: &Expr,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let rhs = self.evaluate(value)?;
        let new_value = match op {
            AssignOp::Assign => rhs,
            compound => {
                let current = self.evaluate(target)?;
                let bin_op = match compound {
                    AssignOp::Add => BinOp::Add,
                    AssignOp::Sub => BinOp::Sub,
                    AssignOp::Mul => BinOp::Mul,
                    AssignOp::Div => BinOp::Div,
                    AssignOp::Mod => BinOp::Mod,
                    AssignOp::Assign => unreachable!(),
                };
                self.apply_binary(bin_op, &current, &rhs, location)?
            }
        };
        self.assign_to(target, new_value.clone(), location)?;
        Ok(new_value)
    }

    /// Store a value through an assignment target (identifier or member)
    pub(crate) fn assign_to(
        &mut self,
        target: &Expr,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match target {
            Expr::Identifier(name, _) => {
                self.scopes.assign(self.current_scope, name, value);
                Ok(())
            }
            Expr::Member {
                object, property, ..
            } => {
                let receiver = self.evaluate(object)?;
                let key = self.member_key(property)?;
                self.member_write(&receiver, &key, value, object, location)
            }
            _ => Err(RuntimeError::TypeError {
                message: format!("Cannot assign to {}", target.to_source()),
                location,
            }),
        }
    }

    fn member_key(&mut self, property: &MemberKey) -> Result<Value, RuntimeError> {
        match property {
            MemberKey::Static(name) => Ok(Value::Str(name.clone())),
            MemberKey::Computed(index) => self.evaluate(index),
        }
    }

    fn member_write(
        &mut self,
        receiver: &Value,
        key: &Value,
        value: Value,
        object: &Expr,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match receiver {
            Value::Array(address) => {
                if let Value::Number(n) = key {
                    // A non-element key would become a plain property in JS;
                    // the element model drops the write instead of touching
                    // element 0
                    let Some(index) = element_index(*n) else {
                        return Ok(());
                    };
                    if let HeapData::Array(elements) =
                        &mut self.heap_get_mut(*address, location)?.data
                    {
                        // Writing past the end pads with undefined, as JS does
                        if index >= elements.len() {
                            elements.resize(index + 1, Value::Undefined);
                        }
                        elements[index] = value;
                    }
                    Ok(())
                } else {
                    Err(RuntimeError::TypeError {
                        message: format!(
                            "Array index must be a number, got {}",
                            key.type_of()
                        ),
                        location,
                    })
                }
            }
            Value::Object(address) => {
                let name = match key {
                    Value::Str(s) => s.clone(),
                    other => self.heap.format_value(other),
                };
                if let HeapData::Object(properties) =
                    &mut self.heap_get_mut(*address, location)?.data
                {
                    properties.insert(name, value);
                }
                Ok(())
            }
            Value::Undefined | Value::Null => Err(RuntimeError::TypeError {
                message: format!(
                    "Cannot set properties of {} (setting {})",
                    receiver.type_of(),
                    self.heap.format_value(key)
                ),
                location,
            }),
            _ => Err(RuntimeError::TypeError {
                message: format!(
                    "Cannot set property on {}",
                    object.to_source()
                ),
                location,
            }),
        }
    }

    fn member_read(
        &mut self,
        receiver: &Value,
        key: &Value,
        object: &Expr,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let prop = match key {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        };

        match receiver {
            Value::Undefined | Value::Null => Err(RuntimeError::TypeError {
                message: format!(
                    "Cannot read properties of {} (reading {} of {})",
                    receiver.type_of(),
                    self.heap.format_value_quoted(key),
                    object.to_source()
                ),
                location,
            }),
            Value::Str(s) => match (prop, key) {
                (Some("length"), _) => Ok(Value::Number(s.chars().count() as f64)),
                (_, Value::Number(n)) => Ok(element_index(*n)
                    .and_then(|index| s.chars().nth(index))
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Undefined)),
                _ => Ok(Value::Undefined),
            },
            Value::Array(address) => {
                let elements = match &self.heap_get(*address, location)?.data {
                    HeapData::Array(elements) => elements,
                    _ => return Ok(Value::Undefined),
                };
                match (prop, key) {
                    (Some("length"), _) => Ok(Value::Number(elements.len() as f64)),
                    (_, Value::Number(n)) => Ok(element_index(*n)
                        .and_then(|index| elements.get(index))
                        .cloned()
                        .unwrap_or(Value::Undefined)),
                    _ => Ok(Value::Undefined),
                }
            }
            Value::Object(address) => {
                let properties = match &self.heap_get(*address, location)?.data {
                    HeapData::Object(properties) => properties,
                    _ => return Ok(Value::Undefined),
                };
                let name = match key {
                    Value::Str(s) => s.clone(),
                    other => self.heap.format_value(other),
                };
                Ok(properties.get(&name).cloned().unwrap_or(Value::Undefined))
            }
            Value::Map(address) => match prop {
                Some("size") => {
                    let len = match &self.heap_get(*address, location)?.data {
                        HeapData::Map(entries) => entries.len(),
                        _ => 0,
                    };
                    Ok(Value::Number(len as f64))
                }
                _ => Ok(Value::Undefined),
            },
            Value::Set(address) => match prop {
                Some("size") => {
                    let len = match &self.heap_get(*address, location)?.data {
                        HeapData::Set(members) => members.len(),
                        _ => 0,
                    };
                    Ok(Value::Number(len as f64))
                }
                _ => Ok(Value::Undefined),
            },
            Value::Function(address) => match prop {
                Some("name") => {
                    let name = match &self.heap_get(*address, location)?.data {
                        HeapData::Function(func) => func.display_name().to_string(),
                        _ => String::new(),
                    };
                    Ok(Value::Str(name))
                }
                _ => Ok(Value::Undefined),
            },
            _ => Ok(Value::Undefined),
        }
    }

    // ===== Operators =====

    pub(crate) fn apply_binary(
        &mut self,
        op: BinOp,
        left: &Value,
        right: &Value,
        _location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let value = match op {
            BinOp::Add => {
                if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                    Value::Str(format!(
                        "{}{}",
                        self.heap.format_value(left),
                        self.heap.format_value(right)
                    ))
                } else {
                    Value::Number(left.to_number() + right.to_number())
                }
            }
            BinOp::Sub => Value::Number(left.to_number() - right.to_number()),
            BinOp::Mul => Value::Number(left.to_number() * right.to_number()),
            BinOp::Div => Value::Number(left.to_number() / right.to_number()),
            BinOp::Mod => Value::Number(left.to_number() % right.to_number()),
            BinOp::Pow => Value::Number(left.to_number().powf(right.to_number())),
            BinOp::Eq => Value::Bool(left.loose_eq(right)),
            BinOp::Ne => Value::Bool(!left.loose_eq(right)),
            BinOp::StrictEq => Value::Bool(left.strict_eq(right)),
            BinOp::StrictNe => Value::Bool(!left.strict_eq(right)),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                Value::Bool(Self::compare(op, left, right))
            }
        };
        Ok(value)
    }

    /// Relational comparison: two strings compare lexicographically,
    /// anything else numerically. NaN operands make every comparison false.
    fn compare(op: BinOp, left: &Value, right: &Value) -> bool {
        if let (Value::Str(a), Value::Str(b)) = (left, right) {
            return match op {
                BinOp::Lt => a < b,
                BinOp::Le => a <= b,
                BinOp::Gt => a > b,
                BinOp::Ge => a >= b,
                _ => false,
            };
        }
        let a = left.to_number();
        let b = right.to_number();
        match op {
            BinOp::Lt => a < b,
            BinOp::Le => a <= b,
            BinOp::Gt => a > b,
            BinOp::Ge => a >= b,
            _ => false,
        }
    }

    // ===== Calls =====

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        // Host namespaces and method calls route through the member form
        if let Expr::Member {
            object,
            property: MemberKey::Static(method),
            ..
        } = callee
        {
            if let Expr::Identifier(namespace, _) = &**object {
                match (namespace.as_str(), method.as_str()) {
                    ("console", "log") => return self.call_console_log(args, location),
                    ("Math", _) => {
                        let argv = self.eval_args(args)?;
                        return self.call_math(method, &argv, location);
                    }
                    ("Array", "isArray") => {
                        let argv = self.eval_args(args)?;
                        return Ok(Value::Bool(matches!(argv.first(), Some(Value::Array(_)))));
                    }
                    _ => {}
                }
            }

            let receiver = self.evaluate(object)?;
            let argv = self.eval_args(args)?;
            return self.call_method(&receiver, object, method, argv, location);
        }

        let func = self.evaluate(callee)?;
        let argv = self.eval_args(args)?;
        match func {
            Value::Function(address) => self.call_function(address, argv, location),
            _ => Err(RuntimeError::NotAFunction {
                name: callee.to_source(),
                location,
            }),
        }
    }

    fn call_console_log(
        &mut self,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let argv = self.eval_args(args)?;
        let line = argv
            .iter()
            .map(|value| self.heap.format_value(value))
            .collect::<Vec<_>>()
            .join(" ");
        self.console.log(line.clone());
        self.record_step(
            StepKind::Console,
            location,
            format!("console.log({})", line),
        )?;
        Ok(Value::Undefined)
    }

    fn call_math(
        &mut self,
        method: &str,
        args: &[Value],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let arg = |i: usize| args.get(i).map(Value::to_number).unwrap_or(f64::NAN);
        let value = match method {
            "floor" => arg(0).floor(),
            "ceil" => arg(0).ceil(),
            "round" => arg(0).round(),
            "abs" => arg(0).abs(),
            "sqrt" => arg(0).sqrt(),
            "pow" => arg(0).powf(arg(1)),
            "min" => args
                .iter()
                .map(Value::to_number)
                .fold(f64::INFINITY, f64::min),
            "max" => args
                .iter()
                .map(Value::to_number)
                .fold(f64::NEG_INFINITY, f64::max),
            _ => {
                return Err(RuntimeError::NotAFunction {
                    name: format!("Math.{}", method),
                    location,
                });
            }
        };
        Ok(Value::Number(value))
    }

    /// Invoke a user function: new scope chained onto the closure scope,
    /// parameters bound (defaults evaluated in the new scope), a call step,
    /// the body, then a return step.
    pub(crate) fn call_function(
        &mut self,
        address: Address,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if self.stack.depth() >= self.limits.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                depth: self.limits.max_call_depth,
                location,
            });
        }

        let func = match &self.heap_get(address, location)?.data {
            HeapData::Function(func) => func.clone(),
            other => {
                return Err(RuntimeError::NotAFunction {
                    name: other.kind().to_string(),
                    location,
                });
            }
        };
        let name = func.display_name().to_string();

        let call_desc = {
            let rendered: Vec<String> = args
                .iter()
                .map(|value| self.heap.format_value_quoted(value))
                .collect();
            format!("call {}({})", name, rendered.join(", "))
        };

        let saved_scope = self.current_scope;
        let saved_return = self.pending_return.take();
        let saved_break = std::mem::replace(&mut self.should_break, false);
        let saved_continue = std::mem::replace(&mut self.should_continue, false);

        let scope = self.scopes.create(ScopeKind::Function, &name, func.env);
        self.current_scope = scope;

        let start_line = match &func.body {
            FnBody::Block(stmts) => stmts
                .first()
                .map(|stmt| stmt.location().line)
                .unwrap_or(location.line),
            FnBody::Expr(expr) => expr.location().line,
        };
        self.stack.push(CallFrame {
            name: name.clone(),
            params: func
                .params
                .iter()
                .map(|param| param.name.clone())
                .collect(),
            scope,
            call_site: Some(location),
            start_line,
            depth: self.stack.depth() + 1,
        });

        let outcome = self.run_call(&func, scope, args, call_desc, location);

        let return_step = match &outcome {
            Ok(value) => {
                let rendered = self.heap.format_value_quoted(value);
                self.record_step(
                    StepKind::Return,
                    location,
                    format!("{} returned {}", name, rendered),
                )
            }
            Err(_) => Ok(()),
        };

        self.stack.pop();
        self.current_scope = saved_scope;
        self.pending_return = saved_return;
        self.should_break = saved_break;
        self.should_continue = saved_continue;

        let value = outcome?;
        return_step?;
        Ok(value)
    }

    fn run_call(
        &mut self,
        func: &FunctionObject,
        scope: ScopeId,
        args: Vec<Value>,
        call_desc: String,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        for (i, param) in func.params.iter().enumerate() {
            let value = match args.get(i) {
                Some(Value::Undefined) | None => match &param.default {
                    Some(default) => self.evaluate(default)?,
                    None => Value::Undefined,
                },
                Some(value) => value.clone(),
            };
            self.scopes.declare(scope, &param.name, value);
        }

        self.record_step(StepKind::Call, location, call_desc)?;

        match &func.body {
            FnBody::Block(stmts) => {
                self.hoist_scope(stmts, scope)?;
                self.execute_body(stmts)?;
                Ok(self.pending_return.take().unwrap_or(Value::Undefined))
            }
            FnBody::Expr(expr) => self.evaluate(expr),
        }
    }

    // ===== Constructors =====

    fn eval_new(
        &mut self,
        constructor: &str,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let argv = self.eval_args(args)?;
        match constructor {
            "Map" => {
                let mut entries: Vec<(Value, Value)> = Vec::new();
                if let Some(Value::Array(address)) = argv.first() {
                    let pairs = match &self.heap_get(*address, location)?.data {
                        HeapData::Array(elements) => elements.clone(),
                        _ => Vec::new(),
                    };
                    for pair in pairs {
                        if let Value::Array(pair_address) = pair {
                            if let HeapData::Array(elements) =
                                &self.heap_get(pair_address, location)?.data
                            {
                                let key = elements.first().cloned().unwrap_or(Value::Undefined);
                                let val = elements.get(1).cloned().unwrap_or(Value::Undefined);
                                Self::map_insert(&mut entries, key, val);
                            }
                        }
                    }
                }
                let step = self.step_index();
                let address = self.heap.allocate(HeapData::Map(entries), step);
                Ok(Value::Map(address))
            }
            "Set" => {
                let mut members: Vec<Value> = Vec::new();
                if let Some(Value::Array(address)) = argv.first() {
                    let elements = match &self.heap_get(*address, location)?.data {
                        HeapData::Array(elements) => elements.clone(),
                        _ => Vec::new(),
                    };
                    for element in elements {
                        if !members.iter().any(|member| member.same_value_zero(&element)) {
                            members.push(element);
                        }
                    }
                }
                let step = self.step_index();
                let address = self.heap.allocate(HeapData::Set(members), step);
                Ok(Value::Set(address))
            }
            other => Err(RuntimeError::UnsupportedConstructor {
                name: other.to_string(),
                location,
            }),
        }
    }

    /// Insert into map entries with SameValueZero key semantics
    pub(crate) fn map_insert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
        for entry in entries.iter_mut() {
            if entry.0.same_value_zero(&key) {
                entry.1 = value;
                return;
            }
        }
        entries.push((key, value));
    }
}
