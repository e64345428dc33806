//! Call stack model

use super::scope::ScopeId;
use crate::parser::ast::SourceLocation;

/// One active function invocation
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Function name ("global" for the synthetic bottom frame)
    pub name: String,
    /// Parameter names in declaration order
    pub params: Vec<String>,
    /// The function-body scope of this invocation
    pub scope: ScopeId,
    /// Where the call happened (`None` for the global frame)
    pub call_site: Option<SourceLocation>,
    /// Line of the function's first statement
    pub start_line: usize,
    /// 0 for the global frame, parent depth + 1 otherwise
    pub depth: usize,
}

/// Stack of active invocations. The global frame sits at the bottom for the
/// whole execution.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack::default()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Number of frames above the global frame
    pub fn depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallFrame> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, depth: usize) -> CallFrame {
        CallFrame {
            name: name.to_string(),
            params: Vec::new(),
            scope: 0,
            call_site: None,
            start_line: 1,
            depth,
        }
    }

    #[test]
    fn test_depth_excludes_global_frame() {
        let mut stack = CallStack::new();
        stack.push(frame("global", 0));
        assert_eq!(stack.depth(), 0);

        stack.push(frame("f", 1));
        assert_eq!(stack.depth(), 1);

        stack.pop();
        assert_eq!(stack.depth(), 0);
    }
}
