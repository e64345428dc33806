//! Execution trace
//!
//! The interpreter's output is a sequence of [`ExecutionStep`]s, one per
//! observable transition. Each step carries a complete deep snapshot of the
//! call stack, the active scope chain and the heap, so a consumer can jump
//! to any step and render the full program state without replaying. Steps
//! are immutable once recorded and serialize deterministically.

use crate::parser::ast::SourceLocation;
use crate::runtime::{
    Address, CallStack, Heap, HeapData, ScopeArena, ScopeId, ScopeKind, Value,
};
use indexmap::IndexMap;
use serde::Serialize;

/// What kind of transition a step records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Declaration,
    Assignment,
    Call,
    Return,
    Branch,
    LoopStart,
    LoopIteration,
    LoopEnd,
    HeapMutation,
    Console,
    Expression,
    Error,
}

/// Snapshot of one call frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub name: String,
    pub params: Vec<String>,
    pub scope: ScopeId,
    pub call_site: Option<SourceLocation>,
    pub depth: usize,
}

impl FrameSnapshot {
    pub fn capture(stack: &CallStack) -> Vec<FrameSnapshot> {
        stack
            .iter()
            .map(|frame| FrameSnapshot {
                name: frame.name.clone(),
                params: frame.params.clone(),
                scope: frame.scope,
                call_site: frame.call_site,
                depth: frame.depth,
            })
            .collect()
    }
}

/// Snapshot of one scope on the active chain
#[derive(Debug, Clone, Serialize)]
pub struct ScopeSnapshot {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub name: String,
    pub parent: Option<ScopeId>,
    pub bindings: IndexMap<String, Value>,
}

impl ScopeSnapshot {
    /// Capture the scope chain from global down to `scope`, outermost first
    pub fn capture_chain(arena: &ScopeArena, scope: ScopeId) -> Vec<ScopeSnapshot> {
        arena
            .chain(scope)
            .into_iter()
            .map(|id| {
                let s = arena.get(id);
                ScopeSnapshot {
                    id: s.id,
                    kind: s.kind,
                    name: s.name.clone(),
                    parent: s.parent,
                    bindings: s.bindings.clone(),
                }
            })
            .collect()
    }
}

/// Snapshot of one heap object's payload
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeapValueSnapshot {
    Array {
        elements: Vec<Value>,
    },
    Object {
        properties: IndexMap<String, Value>,
    },
    Function {
        name: Option<String>,
        arity: usize,
        closure_scope: ScopeId,
    },
    Map {
        entries: Vec<(Value, Value)>,
    },
    Set {
        members: Vec<Value>,
    },
}

/// Snapshot of one heap object
#[derive(Debug, Clone, Serialize)]
pub struct HeapObjectSnapshot {
    pub address: Address,
    pub created_at_step: usize,
    pub value: HeapValueSnapshot,
}

impl HeapObjectSnapshot {
    /// Capture the entire heap in address order
    pub fn capture(heap: &Heap) -> Vec<HeapObjectSnapshot> {
        heap.iter()
            .map(|object| {
                let value = match &object.data {
                    HeapData::Array(elements) => HeapValueSnapshot::Array {
                        elements: elements.clone(),
                    },
                    HeapData::Object(properties) => HeapValueSnapshot::Object {
                        properties: properties.clone(),
                    },
                    HeapData::Function(func) => HeapValueSnapshot::Function {
                        name: func.name.clone(),
                        arity: func.params.len(),
                        closure_scope: func.env,
                    },
                    HeapData::Map(entries) => HeapValueSnapshot::Map {
                        entries: entries.clone(),
                    },
                    HeapData::Set(members) => HeapValueSnapshot::Set {
                        members: members.clone(),
                    },
                };
                HeapObjectSnapshot {
                    address: object.address,
                    created_at_step: object.created_at_step,
                    value,
                }
            })
            .collect()
    }
}

/// One recorded step of an execution
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStep {
    /// Position in the trace, starting at 0
    pub index: usize,
    pub kind: StepKind,
    pub location: SourceLocation,
    /// Human-readable account of the transition ("let x = 5", "call add(1, 2)")
    pub description: String,
    pub call_stack: Vec<FrameSnapshot>,
    /// Active scope chain, outermost first
    pub scopes: Vec<ScopeSnapshot>,
    pub heap: Vec<HeapObjectSnapshot>,
    /// Console lines produced by this step
    pub console_delta: Vec<String>,
    /// Set when the step's line carries a breakpoint
    pub pause_point: bool,
}

impl ExecutionStep {
    /// Resolve a variable name through this snapshot's scope chain,
    /// innermost scope first. Used by watch panels during playback.
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name))
    }

    /// Look up a heap object in this snapshot by address
    pub fn heap_object(&self, address: Address) -> Option<&HeapObjectSnapshot> {
        self.heap.iter().find(|object| object.address == address)
    }
}

/// Accumulates console output and tracks which lines each step produced
#[derive(Debug, Default)]
pub struct ConsoleRecorder {
    lines: Vec<String>,
    flushed: usize,
}

impl ConsoleRecorder {
    pub fn new() -> Self {
        ConsoleRecorder::default()
    }

    pub fn log(&mut self, line: String) {
        self.lines.push(line);
    }

    /// Lines appended since the previous call; consumed into the next step
    pub fn delta(&mut self) -> Vec<String> {
        let delta = self.lines[self.flushed..].to_vec();
        self.flushed = self.lines.len();
        delta
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.flushed = 0;
    }
}

/// A line-based breakpoint held by the consumer and passed to the
/// interpreter; steps on this line are flagged as pause points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    pub line: usize,
}

/// A watch expression is pure consumer bookkeeping: the name is resolved
/// against each step with [`ExecutionStep::resolve`] during playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchExpression {
    pub expression: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_delta() {
        let mut console = ConsoleRecorder::new();
        console.log("a".to_string());
        console.log("b".to_string());
        assert_eq!(console.delta(), vec!["a".to_string(), "b".to_string()]);
        assert!(console.delta().is_empty());
        console.log("c".to_string());
        assert_eq!(console.delta(), vec!["c".to_string()]);
        assert_eq!(console.lines().len(), 3);
    }

    #[test]
    fn test_resolve_prefers_inner_scope() {
        let mut inner = IndexMap::new();
        inner.insert("x".to_string(), Value::Number(2.0));
        let mut outer = IndexMap::new();
        outer.insert("x".to_string(), Value::Number(1.0));
        outer.insert("y".to_string(), Value::Number(3.0));

        let step = ExecutionStep {
            index: 0,
            kind: StepKind::Declaration,
            location: SourceLocation::new(1, 1),
            description: String::new(),
            call_stack: Vec::new(),
            scopes: vec![
                ScopeSnapshot {
                    id: 0,
                    kind: ScopeKind::Global,
                    name: "global".to_string(),
                    parent: None,
                    bindings: outer,
                },
                ScopeSnapshot {
                    id: 1,
                    kind: ScopeKind::Block,
                    name: "block".to_string(),
                    parent: Some(0),
                    bindings: inner,
                },
            ],
            heap: Vec::new(),
            console_delta: Vec::new(),
            pause_point: false,
        };

        assert_eq!(step.resolve("x"), Some(&Value::Number(2.0)));
        assert_eq!(step.resolve("y"), Some(&Value::Number(3.0)));
        assert_eq!(step.resolve("z"), None);
    }
}
