//! Built-in methods on arrays, strings, maps and sets
//!
//! Mutating methods record a heap-mutation step after changing the object in
//! place; read-only methods record nothing. Higher-order methods invoke the
//! callback through the normal call machinery, so each invocation shows up
//! in the trace as its own call/return pair.

use super::engine::Interpreter;
use super::errors::RuntimeError;
use crate::parser::ast::{Expr, SourceLocation};
use crate::runtime::{Address, HeapData, Value};
use crate::trace::StepKind;

/// Clamp a possibly negative JS index into `0..=len`
fn norm_index(n: f64, len: usize) -> usize {
    if n.is_nan() {
        return 0;
    }
    if n < 0.0 {
        let back = (-n) as usize;
        len.saturating_sub(back)
    } else {
        (n as usize).min(len)
    }
}

impl Interpreter {
    pub(crate) fn call_method(
        &mut self,
        receiver: &Value,
        object: &Expr,
        method: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match receiver {
            Value::Array(address) => self.call_array_method(*address, object, method, args, location),
            Value::Str(s) => self.call_string_method(s, object, method, args, location),
            Value::Map(address) => self.call_map_method(*address, object, method, args, location),
            Value::Set(address) => self.call_set_method(*address, object, method, args, location),
            Value::Object(address) => {
                // A function-valued property is a user method
                let properties = match &self.heap_get(*address, location)?.data {
                    HeapData::Object(properties) => properties.clone(),
                    _ => return self.not_a_method(object, method, location),
                };
                match properties.get(method) {
                    Some(Value::Function(func_address)) => {
                        self.call_function(*func_address, args, location)
                    }
                    _ => self.not_a_method(object, method, location),
                }
            }
            _ => self.not_a_method(object, method, location),
        }
    }

    fn not_a_method<T>(
        &self,
        object: &Expr,
        method: &str,
        location: SourceLocation,
    ) -> Result<T, RuntimeError> {
        Err(RuntimeError::NotAFunction {
            name: format!("{}.{}", object.to_source(), method),
            location,
        })
    }

    fn callback_address(
        &self,
        args: &[Value],
        object: &Expr,
        method: &str,
        location: SourceLocation,
    ) -> Result<Address, RuntimeError> {
        match args.first() {
            Some(Value::Function(address)) => Ok(*address),
            _ => Err(RuntimeError::TypeError {
                message: format!(
                    "{}.{} expects a function argument",
                    object.to_source(),
                    method
                ),
                location,
            }),
        }
    }

    fn array_elements(
        &self,
        address: Address,
        location: SourceLocation,
    ) -> Result<Vec<Value>, RuntimeError> {
        match &self.heap_get(address, location)?.data {
            HeapData::Array(elements) => Ok(elements.clone()),
            _ => Ok(Vec::new()),
        }
    }

    /// Record the heap-mutation step for an in-place array/map/set change
    fn record_mutation(
        &mut self,
        receiver: &Value,
        object: &Expr,
        method: &str,
        args: &[Value],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let rendered_args: Vec<String> = args
            .iter()
            .map(|value| self.heap.format_value_quoted(value))
            .collect();
        let after = self.heap.format_value_quoted(receiver);
        self.record_step(
            StepKind::HeapMutation,
            location,
            format!(
                "{}.{}({}) → {}",
                object.to_source(),
                method,
                rendered_args.join(", "),
                after
            ),
        )
    }

    // ===== Arrays =====

    fn call_array_method(
        &mut self,
        address: Address,
        object: &Expr,
        method: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let receiver = Value::Array(address);

        match method {
            // Mutating methods
            "push" => {
                let new_len = {
                    let elements = self.array_mut(address, location)?;
                    elements.extend(args.iter().cloned());
                    elements.len()
                };
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(Value::Number(new_len as f64))
            }
            "pop" => {
                let popped = self.array_mut(address, location)?.pop();
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(popped.unwrap_or(Value::Undefined))
            }
            "shift" => {
                let elements = self.array_mut(address, location)?;
                let shifted = if elements.is_empty() {
                    Value::Undefined
                } else {
                    elements.remove(0)
                };
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(shifted)
            }
            "unshift" => {
                let new_len = {
                    let elements = self.array_mut(address, location)?;
                    for (i, value) in args.iter().enumerate() {
                        elements.insert(i, value.clone());
                    }
                    elements.len()
                };
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(Value::Number(new_len as f64))
            }
            "splice" => {
                let removed = {
                    let elements = self.array_mut(address, location)?;
                    let len = elements.len();
                    let start = norm_index(
                        args.first().map(Value::to_number).unwrap_or(0.0),
                        len,
                    );
                    let delete_count = match args.get(1) {
                        Some(count) => (count.to_number().max(0.0) as usize).min(len - start),
                        None => len - start,
                    };
                    let removed: Vec<Value> =
                        elements.splice(start..start + delete_count, args.iter().skip(2).cloned())
                            .collect();
                    removed
                };
                self.record_mutation(&receiver, object, method, &args, location)?;
                let step = self.step_index();
                let removed_address = self.heap.allocate(HeapData::Array(removed), step);
                Ok(Value::Array(removed_address))
            }
            "reverse" => {
                self.array_mut(address, location)?.reverse();
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(receiver)
            }
            "fill" => {
                {
                    let fill_value = args.first().cloned().unwrap_or(Value::Undefined);
                    let elements = self.array_mut(address, location)?;
                    let len = elements.len();
                    let start =
                        norm_index(args.get(1).map(Value::to_number).unwrap_or(0.0), len);
                    let end = norm_index(
                        args.get(2).map(Value::to_number).unwrap_or(len as f64),
                        len,
                    );
                    for slot in elements.iter_mut().take(end).skip(start) {
                        *slot = fill_value.clone();
                    }
                }
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(receiver)
            }

            // Read-only methods
            "indexOf" => {
                let elements = self.array_elements(address, location)?;
                let needle = args.first().cloned().unwrap_or(Value::Undefined);
                let index = elements
                    .iter()
                    .position(|element| element.strict_eq(&needle))
                    .map(|i| i as f64)
                    .unwrap_or(-1.0);
                Ok(Value::Number(index))
            }
            // includes uses SameValueZero, so it does find NaN; indexOf stays strict
            "includes" => {
                let elements = self.array_elements(address, location)?;
                let needle = args.first().cloned().unwrap_or(Value::Undefined);
                Ok(Value::Bool(
                    elements
                        .iter()
                        .any(|element| element.same_value_zero(&needle)),
                ))
            }
            "join" => {
                let elements = self.array_elements(address, location)?;
                let separator = match args.first() {
                    Some(Value::Str(s)) => s.clone(),
                    _ => ",".to_string(),
                };
                let parts: Vec<String> = elements
                    .iter()
                    .map(|element| match element {
                        Value::Null | Value::Undefined => String::new(),
                        other => self.heap.format_value(other),
                    })
                    .collect();
                Ok(Value::Str(parts.join(&separator)))
            }
            "slice" => {
                let elements = self.array_elements(address, location)?;
                let len = elements.len();
                let start = norm_index(args.first().map(Value::to_number).unwrap_or(0.0), len);
                let end = norm_index(
                    args.get(1).map(Value::to_number).unwrap_or(len as f64),
                    len,
                );
                let sliced: Vec<Value> = if start < end {
                    elements[start..end].to_vec()
                } else {
                    Vec::new()
                };
                let step = self.step_index();
                let new_address = self.heap.allocate(HeapData::Array(sliced), step);
                Ok(Value::Array(new_address))
            }
            "concat" => {
                let mut combined = self.array_elements(address, location)?;
                for arg in &args {
                    match arg {
                        Value::Array(other) => {
                            combined.extend(self.array_elements(*other, location)?);
                        }
                        other => combined.push(other.clone()),
                    }
                }
                let step = self.step_index();
                let new_address = self.heap.allocate(HeapData::Array(combined), step);
                Ok(Value::Array(new_address))
            }

            // Higher-order methods
            "forEach" => {
                let callback = self.callback_address(&args, object, method, location)?;
                let elements = self.array_elements(address, location)?;
                for (i, element) in elements.into_iter().enumerate() {
                    self.call_function(
                        callback,
                        vec![element, Value::Number(i as f64), receiver.clone()],
                        location,
                    )?;
                }
                Ok(Value::Undefined)
            }
            "map" => {
                let callback = self.callback_address(&args, object, method, location)?;
                let elements = self.array_elements(address, location)?;
                let mut mapped = Vec::with_capacity(elements.len());
                for (i, element) in elements.into_iter().enumerate() {
                    mapped.push(self.call_function(
                        callback,
                        vec![element, Value::Number(i as f64), receiver.clone()],
                        location,
                    )?);
                }
                let step = self.step_index();
                let new_address = self.heap.allocate(HeapData::Array(mapped), step);
                Ok(Value::Array(new_address))
            }
            "filter" => {
                let callback = self.callback_address(&args, object, method, location)?;
                let elements = self.array_elements(address, location)?;
                let mut kept = Vec::new();
                for (i, element) in elements.into_iter().enumerate() {
                    let keep = self.call_function(
                        callback,
                        vec![element.clone(), Value::Number(i as f64), receiver.clone()],
                        location,
                    )?;
                    if keep.is_truthy() {
                        kept.push(element);
                    }
                }
                let step = self.step_index();
                let new_address = self.heap.allocate(HeapData::Array(kept), step);
                Ok(Value::Array(new_address))
            }
            "reduce" => {
                let callback = self.callback_address(&args, object, method, location)?;
                let elements = self.array_elements(address, location)?;
                let mut iter = elements.into_iter().enumerate();
                let mut accumulator = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match iter.next() {
                        Some((_, first)) => first,
                        None => {
                            return Err(RuntimeError::TypeError {
                                message: "Reduce of empty array with no initial value"
                                    .to_string(),
                                location,
                            });
                        }
                    },
                };
                for (i, element) in iter {
                    accumulator = self.call_function(
                        callback,
                        vec![
                            accumulator,
                            element,
                            Value::Number(i as f64),
                            receiver.clone(),
                        ],
                        location,
                    )?;
                }
                Ok(accumulator)
            }
            "find" | "findIndex" => {
                let callback = self.callback_address(&args, object, method, location)?;
                let elements = self.array_elements(address, location)?;
                for (i, element) in elements.into_iter().enumerate() {
                    let hit = self.call_function(
                        callback,
                        vec![element.clone(), Value::Number(i as f64), receiver.clone()],
                        location,
                    )?;
                    if hit.is_truthy() {
                        return Ok(if method == "find" {
                            element
                        } else {
                            Value::Number(i as f64)
                        });
                    }
                }
                Ok(if method == "find" {
                    Value::Undefined
                } else {
                    Value::Number(-1.0)
                })
            }
            "some" | "every" => {
                let callback = self.callback_address(&args, object, method, location)?;
                let elements = self.array_elements(address, location)?;
                for (i, element) in elements.into_iter().enumerate() {
                    let hit = self
                        .call_function(
                            callback,
                            vec![element, Value::Number(i as f64), receiver.clone()],
                            location,
                        )?
                        .is_truthy();
                    if method == "some" && hit {
                        return Ok(Value::Bool(true));
                    }
                    if method == "every" && !hit {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(method == "every"))
            }

            _ => self.not_a_method(object, method, location),
        }
    }

    fn array_mut(
        &mut self,
        address: Address,
        location: SourceLocation,
    ) -> Result<&mut Vec<Value>, RuntimeError> {
        match &mut self.heap_get_mut(address, location)?.data {
            HeapData::Array(elements) => Ok(elements),
            other => Err(RuntimeError::HeapFault {
                message: format!("Expected array at {}, found {}", address, other.kind()),
                location,
            }),
        }
    }

    // ===== Strings =====

    fn call_string_method(
        &mut self,
        s: &str,
        object: &Expr,
        method: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len();
        let arg_num = |i: usize| args.get(i).map(Value::to_number);
        let arg_str = |i: usize| match args.get(i) {
            Some(Value::Str(s)) => Some(s.clone()),
            Some(other) => Some(self.heap.format_value(other)),
            None => None,
        };

        let value = match method {
            "charAt" => {
                let index = arg_num(0).unwrap_or(0.0) as usize;
                Value::Str(chars.get(index).map(|c| c.to_string()).unwrap_or_default())
            }
            "charCodeAt" => {
                let index = arg_num(0).unwrap_or(0.0) as usize;
                match chars.get(index) {
                    Some(c) => Value::Number(*c as u32 as f64),
                    None => Value::Number(f64::NAN),
                }
            }
            "substring" | "slice" => {
                let raw_start = arg_num(0).unwrap_or(0.0);
                let raw_end = arg_num(1).unwrap_or(len as f64);
                let (start, end) = if method == "substring" {
                    // substring clamps negatives to 0 and swaps its bounds
                    let a = (raw_start.max(0.0) as usize).min(len);
                    let b = (raw_end.max(0.0) as usize).min(len);
                    (a.min(b), a.max(b))
                } else {
                    (norm_index(raw_start, len), norm_index(raw_end, len))
                };
                if start < end {
                    Value::Str(chars[start..end].iter().collect())
                } else {
                    Value::Str(String::new())
                }
            }
            "split" => {
                let parts: Vec<Value> = match arg_str(0) {
                    None => vec![Value::Str(s.to_string())],
                    Some(sep) if sep.is_empty() => {
                        chars.iter().map(|c| Value::Str(c.to_string())).collect()
                    }
                    Some(sep) => s
                        .split(sep.as_str())
                        .map(|part| Value::Str(part.to_string()))
                        .collect(),
                };
                let step = self.step_index();
                let address = self.heap.allocate(HeapData::Array(parts), step);
                Value::Array(address)
            }
            "indexOf" => {
                let needle = arg_str(0).unwrap_or_default();
                match s.find(&needle) {
                    Some(byte_index) => {
                        Value::Number(s[..byte_index].chars().count() as f64)
                    }
                    None => Value::Number(-1.0),
                }
            }
            "lastIndexOf" => {
                let needle = arg_str(0).unwrap_or_default();
                match s.rfind(&needle) {
                    Some(byte_index) => {
                        Value::Number(s[..byte_index].chars().count() as f64)
                    }
                    None => Value::Number(-1.0),
                }
            }
            "includes" => Value::Bool(s.contains(&arg_str(0).unwrap_or_default())),
            "startsWith" => Value::Bool(s.starts_with(&arg_str(0).unwrap_or_default())),
            "endsWith" => Value::Bool(s.ends_with(&arg_str(0).unwrap_or_default())),
            "toUpperCase" => Value::Str(s.to_uppercase()),
            "toLowerCase" => Value::Str(s.to_lowercase()),
            "trim" => Value::Str(s.trim().to_string()),
            "repeat" => {
                let count = arg_num(0).unwrap_or(0.0);
                if count < 0.0 {
                    return Err(RuntimeError::TypeError {
                        message: "Invalid count value for repeat".to_string(),
                        location,
                    });
                }
                Value::Str(s.repeat(count as usize))
            }
            "padStart" | "padEnd" => {
                let target = arg_num(0).unwrap_or(0.0) as usize;
                let pad = arg_str(1).unwrap_or_else(|| " ".to_string());
                let mut result = s.to_string();
                if pad.is_empty() {
                    return Ok(Value::Str(result));
                }
                let pad_chars: Vec<char> = pad.chars().collect();
                let mut filler = String::new();
                let mut i = 0;
                while len + filler.chars().count() < target {
                    filler.push(pad_chars[i % pad_chars.len()]);
                    i += 1;
                }
                if method == "padStart" {
                    result = format!("{}{}", filler, result);
                } else {
                    result.push_str(&filler);
                }
                Value::Str(result)
            }
            "replace" => {
                let needle = arg_str(0).unwrap_or_default();
                let replacement = arg_str(1).unwrap_or_default();
                Value::Str(s.replacen(&needle, &replacement, 1))
            }
            _ => return self.not_a_method(object, method, location),
        };
        Ok(value)
    }

    // ===== Map / Set =====

    fn call_map_method(
        &mut self,
        address: Address,
        object: &Expr,
        method: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let receiver = Value::Map(address);
        let key = args.first().cloned().unwrap_or(Value::Undefined);

        match method {
            "get" => {
                let entries = self.map_entries(address, location)?;
                Ok(entries
                    .iter()
                    .find(|(k, _)| k.same_value_zero(&key))
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Undefined))
            }
            "has" => {
                let entries = self.map_entries(address, location)?;
                Ok(Value::Bool(
                    entries.iter().any(|(k, _)| k.same_value_zero(&key)),
                ))
            }
            "set" => {
                let value = args.get(1).cloned().unwrap_or(Value::Undefined);
                if let HeapData::Map(entries) = &mut self.heap_get_mut(address, location)?.data {
                    Self::map_insert(entries, key, value);
                }
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(receiver)
            }
            "delete" => {
                let removed = {
                    match &mut self.heap_get_mut(address, location)?.data {
                        HeapData::Map(entries) => {
                            let before = entries.len();
                            entries.retain(|(k, _)| !k.same_value_zero(&key));
                            entries.len() != before
                        }
                        _ => false,
                    }
                };
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(Value::Bool(removed))
            }
            _ => self.not_a_method(object, method, location),
        }
    }

    fn map_entries(
        &self,
        address: Address,
        location: SourceLocation,
    ) -> Result<Vec<(Value, Value)>, RuntimeError> {
        match &self.heap_get(address, location)?.data {
            HeapData::Map(entries) => Ok(entries.clone()),
            _ => Ok(Vec::new()),
        }
    }

    fn call_set_method(
        &mut self,
        address: Address,
        object: &Expr,
        method: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let receiver = Value::Set(address);
        let member = args.first().cloned().unwrap_or(Value::Undefined);

        match method {
            "has" => {
                let present = match &self.heap_get(address, location)?.data {
                    HeapData::Set(members) => members
                        .iter()
                        .any(|existing| existing.same_value_zero(&member)),
                    _ => false,
                };
                Ok(Value::Bool(present))
            }
            "add" => {
                if let HeapData::Set(members) = &mut self.heap_get_mut(address, location)?.data {
                    if !members
                        .iter()
                        .any(|existing| existing.same_value_zero(&member))
                    {
                        members.push(member);
                    }
                }
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(receiver)
            }
            "delete" => {
                let removed = match &mut self.heap_get_mut(address, location)?.data {
                    HeapData::Set(members) => {
                        let before = members.len();
                        members.retain(|existing| !existing.same_value_zero(&member));
                        members.len() != before
                    }
                    _ => false,
                };
                self.record_mutation(&receiver, object, method, &args, location)?;
                Ok(Value::Bool(removed))
            }
            _ => self.not_a_method(object, method, location),
        }
    }
}
