//! Scope model
//!
//! Scopes live in an arena and are never destroyed: a closure keeps its
//! defining scope alive by id, so captured variables stay readable and
//! writable after the enclosing call returns. Lookup walks the parent chain
//! from the innermost scope outward.

use super::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// Index into the scope arena
pub type ScopeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// One lexical scope
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Display name ("global", a function name, "block")
    pub name: String,
    pub parent: Option<ScopeId>,
    /// Insertion-ordered so snapshots list variables in declaration order
    pub bindings: IndexMap<String, Value>,
}

/// Arena of all scopes created during one execution
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

/// The global scope always has id 0
pub const GLOBAL_SCOPE: ScopeId = 0;

impl ScopeArena {
    pub fn new() -> Self {
        ScopeArena {
            scopes: vec![Scope {
                id: GLOBAL_SCOPE,
                kind: ScopeKind::Global,
                name: "global".to_string(),
                parent: None,
                bindings: IndexMap::new(),
            }],
        }
    }

    /// Create a child scope and return its id
    pub fn create(&mut self, kind: ScopeKind, name: &str, parent: ScopeId) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            id,
            kind,
            name: name.to_string(),
            parent: Some(parent),
            bindings: IndexMap::new(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    /// Bind a name in exactly this scope, shadowing any outer binding
    pub fn declare(&mut self, scope: ScopeId, name: &str, value: Value) {
        self.scopes[scope].bindings.insert(name.to_string(), value);
    }

    /// Read a variable, walking the parent chain. `None` means the name is
    /// unbound everywhere; callers treat that as `undefined`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<Value> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(value) = self.scopes[id].bindings.get(name) {
                return Some(value.clone());
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// Write a variable: the nearest scope that already binds the name wins.
    /// If no scope binds it, the name is created in the innermost scope
    /// (undeclared assignment).
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: Value) {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scopes[id].bindings.contains_key(name) {
                self.scopes[id].bindings.insert(name.to_string(), value);
                return;
            }
            current = self.scopes[id].parent;
        }
        self.scopes[scope].bindings.insert(name.to_string(), value);
    }

    /// Whether this exact scope (not its parents) binds the name
    pub fn has_own(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope].bindings.contains_key(name)
    }

    /// Scope ids from the global scope down to `scope`, outermost first
    pub fn chain(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut ids = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            ids.push(id);
            current = self.scopes[id].parent;
        }
        ids.reverse();
        ids
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        ScopeArena::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parent_chain() {
        let mut arena = ScopeArena::new();
        arena.declare(GLOBAL_SCOPE, "x", Value::Number(1.0));
        let inner = arena.create(ScopeKind::Block, "block", GLOBAL_SCOPE);

        assert_eq!(arena.lookup(inner, "x"), Some(Value::Number(1.0)));
        assert_eq!(arena.lookup(inner, "y"), None);
    }

    #[test]
    fn test_shadowing() {
        let mut arena = ScopeArena::new();
        arena.declare(GLOBAL_SCOPE, "x", Value::Number(1.0));
        let inner = arena.create(ScopeKind::Block, "block", GLOBAL_SCOPE);
        arena.declare(inner, "x", Value::Number(2.0));

        assert_eq!(arena.lookup(inner, "x"), Some(Value::Number(2.0)));
        assert_eq!(arena.lookup(GLOBAL_SCOPE, "x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let mut arena = ScopeArena::new();
        arena.declare(GLOBAL_SCOPE, "x", Value::Number(1.0));
        let inner = arena.create(ScopeKind::Function, "f", GLOBAL_SCOPE);

        arena.assign(inner, "x", Value::Number(9.0));
        assert_eq!(arena.lookup(GLOBAL_SCOPE, "x"), Some(Value::Number(9.0)));
        assert!(!arena.has_own(inner, "x"));
    }

    #[test]
    fn test_chain_is_outermost_first() {
        let mut arena = ScopeArena::new();
        let f = arena.create(ScopeKind::Function, "f", GLOBAL_SCOPE);
        let b = arena.create(ScopeKind::Block, "block", f);

        assert_eq!(arena.chain(b), vec![GLOBAL_SCOPE, f, b]);
    }
}
