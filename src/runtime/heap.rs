//! Heap model
//!
//! An accumulating arena of composite objects. Addresses start at 1 and grow
//! monotonically; nothing is ever freed or reused, so an address observed in
//! one step denotes the same object in every later step. Mutation happens
//! in place and never changes an object's address, which is what makes
//! aliasing observable in the trace.

use super::scope::ScopeId;
use super::value::{format_number, Address, Value};
use crate::parser::ast::{FnBody, Param};
use indexmap::IndexMap;

/// A user-defined function stored on the heap. Carries the scope it was
/// defined in; calls chain their new scope onto `env`, which is what gives
/// closures access to captured variables.
#[derive(Debug, Clone)]
pub struct FunctionObject {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: FnBody,
    pub env: ScopeId,
}

impl FunctionObject {
    /// Display name for stack frames and formatted values
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}

/// Payload of a heap object
#[derive(Debug, Clone)]
pub enum HeapData {
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Function(FunctionObject),
    /// Insertion-ordered key/value pairs; keys compared with `===`
    Map(Vec<(Value, Value)>),
    /// Insertion-ordered members; compared with `===`
    Set(Vec<Value>),
}

impl HeapData {
    /// Kind label used in snapshots and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            HeapData::Array(_) => "array",
            HeapData::Object(_) => "object",
            HeapData::Function(_) => "function",
            HeapData::Map(_) => "map",
            HeapData::Set(_) => "set",
        }
    }
}

/// One allocated object
#[derive(Debug, Clone)]
pub struct HeapObject {
    pub address: Address,
    pub data: HeapData,
    /// Index of the step during which this object was allocated
    pub created_at_step: usize,
}

/// The heap: a grow-only arena keyed by address
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

// Nesting depth cap when rendering composite values, so cyclic structures
// terminate.
const FORMAT_DEPTH_LIMIT: usize = 4;

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    /// Allocate a new object, returning its address (first address is 1)
    pub fn allocate(&mut self, data: HeapData, step: usize) -> Address {
        let address = self.objects.len() as Address + 1;
        self.objects.push(HeapObject {
            address,
            data,
            created_at_step: step,
        });
        address
    }

    pub fn get(&self, address: Address) -> Result<&HeapObject, String> {
        self.objects
            .get(address.wrapping_sub(1) as usize)
            .ok_or_else(|| format!("Invalid heap address {}", address))
    }

    pub fn get_mut(&mut self, address: Address) -> Result<&mut HeapObject, String> {
        self.objects
            .get_mut(address.wrapping_sub(1) as usize)
            .ok_or_else(|| format!("Invalid heap address {}", address))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeapObject> {
        self.objects.iter()
    }

    /// Render a value for console output and step descriptions, following
    /// the conventions of browser consoles: strings unquoted at the top
    /// level but quoted inside composites, `[1, 2]`, `{x: 1}`, `ƒ name()`.
    pub fn format_value(&self, value: &Value) -> String {
        self.format_depth(value, 0, true)
    }

    /// Like [`Heap::format_value`] but always quoting strings, for values
    /// embedded in descriptions ("x = 'hi'" rather than "x = hi").
    pub fn format_value_quoted(&self, value: &Value) -> String {
        self.format_depth(value, 0, false)
    }

    fn format_depth(&self, value: &Value, depth: usize, bare_strings: bool) -> String {
        if depth > FORMAT_DEPTH_LIMIT {
            return "…".to_string();
        }
        match value {
            Value::Number(n) => format_number(*n),
            Value::Str(s) => {
                if bare_strings && depth == 0 {
                    s.clone()
                } else {
                    format!("'{}'", s)
                }
            }
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::Array(addr) => match self.get(*addr) {
                Ok(HeapObject {
                    data: HeapData::Array(elements),
                    ..
                }) => {
                    let inner: Vec<String> = elements
                        .iter()
                        .map(|v| self.format_depth(v, depth + 1, bare_strings))
                        .collect();
                    format!("[{}]", inner.join(", "))
                }
                _ => format!("[array @{}]", addr),
            },
            Value::Object(addr) => match self.get(*addr) {
                Ok(HeapObject {
                    data: HeapData::Object(properties),
                    ..
                }) => {
                    let inner: Vec<String> = properties
                        .iter()
                        .map(|(k, v)| {
                            format!("{}: {}", k, self.format_depth(v, depth + 1, bare_strings))
                        })
                        .collect();
                    format!("{{{}}}", inner.join(", "))
                }
                _ => format!("[object @{}]", addr),
            },
            Value::Function(addr) => match self.get(*addr) {
                Ok(HeapObject {
                    data: HeapData::Function(func),
                    ..
                }) => format!("ƒ {}()", func.display_name()),
                _ => "ƒ ()".to_string(),
            },
            Value::Map(addr) => match self.get(*addr) {
                Ok(HeapObject {
                    data: HeapData::Map(entries),
                    ..
                }) => {
                    let inner: Vec<String> = entries
                        .iter()
                        .map(|(k, v)| {
                            format!(
                                "{} => {}",
                                self.format_depth(k, depth + 1, bare_strings),
                                self.format_depth(v, depth + 1, bare_strings)
                            )
                        })
                        .collect();
                    if inner.is_empty() {
                        "Map(0) {}".to_string()
                    } else {
                        format!("Map({}) {{{}}}", entries.len(), inner.join(", "))
                    }
                }
                _ => format!("[map @{}]", addr),
            },
            Value::Set(addr) => match self.get(*addr) {
                Ok(HeapObject {
                    data: HeapData::Set(members),
                    ..
                }) => {
                    let inner: Vec<String> = members
                        .iter()
                        .map(|v| self.format_depth(v, depth + 1, bare_strings))
                        .collect();
                    if inner.is_empty() {
                        "Set(0) {}".to_string()
                    } else {
                        format!("Set({}) {{{}}}", members.len(), inner.join(", "))
                    }
                }
                _ => format!("[set @{}]", addr),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_stable_and_monotonic() {
        let mut heap = Heap::new();
        let a = heap.allocate(HeapData::Array(vec![Value::Number(1.0)]), 0);
        let b = heap.allocate(HeapData::Array(vec![]), 1);
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        if let HeapData::Array(elements) = &mut heap.get_mut(a).unwrap().data {
            elements.push(Value::Number(2.0));
        }
        assert_eq!(heap.get(a).unwrap().address, a);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn test_format_values() {
        let mut heap = Heap::new();
        let arr = heap.allocate(
            HeapData::Array(vec![Value::Number(1.0), Value::Str("a".to_string())]),
            0,
        );
        assert_eq!(heap.format_value(&Value::Array(arr)), "[1, 'a']");

        let mut props = IndexMap::new();
        props.insert("x".to_string(), Value::Number(5.0));
        let obj = heap.allocate(HeapData::Object(props), 0);
        assert_eq!(heap.format_value(&Value::Object(obj)), "{x: 5}");

        assert_eq!(heap.format_value(&Value::Str("hi".to_string())), "hi");
        assert_eq!(
            heap.format_value_quoted(&Value::Str("hi".to_string())),
            "'hi'"
        );
    }

    #[test]
    fn test_format_cycle_terminates() {
        let mut heap = Heap::new();
        let arr = heap.allocate(HeapData::Array(vec![]), 0);
        if let HeapData::Array(elements) = &mut heap.get_mut(arr).unwrap().data {
            elements.push(Value::Array(arr));
        }
        let rendered = heap.format_value(&Value::Array(arr));
        assert!(rendered.contains('…'));
    }

    #[test]
    fn test_invalid_address() {
        let heap = Heap::new();
        assert!(heap.get(1).is_err());
        assert!(heap.get(0).is_err());
    }
}
