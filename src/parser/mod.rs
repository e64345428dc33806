//! JavaScript source code parser
//!
//! This module transforms JavaScript source text into an Abstract Syntax Tree:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parser`]: Parsing (tokens → AST)
//! - [`ast`]: AST node definitions
//!
//! # Supported JavaScript Subset
//!
//! - Declarations: `let`, `const`, `var` (multi-declarator), function
//!   declarations, function expressions, arrow functions with defaults
//! - Control flow: `if`/`else`, `while`, `do`/`while`, `for`, `for..of`,
//!   `break`, `continue`, `return`
//! - Expressions: literals (including template literals without `${}`),
//!   array/object literals, member access, calls, `new`, assignment
//!   (plain and compound), `&&`/`||`/`??`, ternary, `typeof`, `++`/`--`
//! - Pragmatic automatic semicolon insertion: `;` is optional before a line
//!   break, `}`, or end of input
//! - No classes, generators, destructuring, `async`/`await`, or modules
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary
//! operators. No external parser generator dependencies.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::Program;
pub use parser::{ParseError, Parser};

/// Parse JavaScript source into a [`Program`].
///
/// Deterministic: the same source always yields the same AST or the same
/// error. Malformed input never panics.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program()
}
