// AST definitions for the JavaScript subset

use serde::Serialize;
use std::fmt;

/// Source location information for error reporting and step records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Declaration keyword of a variable statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKind::Let => write!(f, "let"),
            DeclKind::Const => write!(f, "const"),
            DeclKind::Var => write!(f, "var"),
        }
    }
}

/// A single `name = init` entry of a variable statement
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
}

/// Function parameter with an optional default value expression
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// Body of a function: a statement block, or a bare expression (arrow functions)
#[derive(Debug, Clone)]
pub enum FnBody {
    Block(Vec<Stmt>),
    Expr(Box<Expr>),
}

/// A function declaration, function expression, or arrow function
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: FnBody,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::StrictEq => "===",
            BinOp::StrictNe => "!==",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Short-circuiting operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "&&"),
            LogicalOp::Or => write!(f, "||"),
            LogicalOp::Nullish => write!(f, "??"),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Pos,
    Not,
    Typeof,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Pos => write!(f, "+"),
            UnOp::Not => write!(f, "!"),
            UnOp::Typeof => write!(f, "typeof "),
        }
    }
}

/// Assignment operators (`=` plus the compound forms)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
        };
        write!(f, "{}", s)
    }
}

/// `++` / `--`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Inc,
    Dec,
}

impl fmt::Display for UpdateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOp::Inc => write!(f, "++"),
            UpdateOp::Dec => write!(f, "--"),
        }
    }
}

/// Property accessor of a member expression
#[derive(Debug, Clone)]
pub enum MemberKey {
    /// `obj.name`
    Static(String),
    /// `obj[expr]`
    Computed(Box<Expr>),
}

/// Statements
#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl {
        kind: DeclKind,
        declarators: Vec<Declarator>,
        location: SourceLocation,
    },
    FunctionDecl {
        function: Function,
        location: SourceLocation,
    },
    Expression {
        expr: Expr,
        location: SourceLocation,
    },
    Return {
        expr: Option<Expr>,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
        location: SourceLocation,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    ForOf {
        kind: DeclKind,
        binding: String,
        iterable: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    Block {
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
}

impl Stmt {
    /// Get the source location of this statement
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::VarDecl { location, .. }
            | Stmt::FunctionDecl { location, .. }
            | Stmt::Expression { location, .. }
            | Stmt::Return { location, .. }
            | Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::DoWhile { location, .. }
            | Stmt::For { location, .. }
            | Stmt::ForOf { location, .. }
            | Stmt::Block { location, .. }
            | Stmt::Break { location }
            | Stmt::Continue { location } => *location,
        }
    }
}

/// Expressions
#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64, SourceLocation),
    Str(String, SourceLocation),
    Bool(bool, SourceLocation),
    Null(SourceLocation),
    Identifier(String, SourceLocation),
    This(SourceLocation),
    Array {
        elements: Vec<Expr>,
        location: SourceLocation,
    },
    Object {
        properties: Vec<(String, Expr)>,
        location: SourceLocation,
    },
    Function {
        function: Box<Function>,
        location: SourceLocation,
    },
    Assignment {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
        location: SourceLocation,
    },
    Conditional {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        location: SourceLocation,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    New {
        constructor: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    Member {
        object: Box<Expr>,
        property: MemberKey,
        location: SourceLocation,
    },
}

impl Expr {
    /// Get the source location of this expression
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Number(_, loc)
            | Expr::Str(_, loc)
            | Expr::Bool(_, loc)
            | Expr::Null(loc)
            | Expr::Identifier(_, loc)
            | Expr::This(loc) => *loc,
            Expr::Array { location, .. }
            | Expr::Object { location, .. }
            | Expr::Function { location, .. }
            | Expr::Assignment { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Logical { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Update { location, .. }
            | Expr::Conditional { location, .. }
            | Expr::Call { location, .. }
            | Expr::New { location, .. }
            | Expr::Member { location, .. } => *location,
        }
    }

    /// Render the expression back to readable source text, used for step
    /// descriptions ("arr[0] = 5" rather than a node dump).
    pub fn to_source(&self) -> String {
        match self {
            Expr::Number(n, _) => crate::runtime::value::format_number(*n),
            Expr::Str(s, _) => format!("'{}'", s),
            Expr::Bool(b, _) => b.to_string(),
            Expr::Null(_) => "null".to_string(),
            Expr::Identifier(name, _) => name.clone(),
            Expr::This(_) => "this".to_string(),
            Expr::Array { elements, .. } => {
                let inner: Vec<String> = elements.iter().map(Expr::to_source).collect();
                format!("[{}]", inner.join(", "))
            }
            Expr::Object { properties, .. } => {
                let inner: Vec<String> = properties
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_source()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Expr::Function { function, .. } => match &function.name {
                Some(name) => format!("function {}()", name),
                None => "() => …".to_string(),
            },
            Expr::Assignment {
                target, op, value, ..
            } => format!("{} {} {}", target.to_source(), op, value.to_source()),
            Expr::Binary {
                op, left, right, ..
            } => format!("{} {} {}", left.to_source(), op, right.to_source()),
            Expr::Logical {
                op, left, right, ..
            } => format!("{} {} {}", left.to_source(), op, right.to_source()),
            Expr::Unary { op, operand, .. } => format!("{}{}", op, operand.to_source()),
            Expr::Update {
                op, prefix, target, ..
            } => {
                if *prefix {
                    format!("{}{}", op, target.to_source())
                } else {
                    format!("{}{}", target.to_source(), op)
                }
            }
            Expr::Conditional {
                condition,
                consequent,
                alternate,
                ..
            } => format!(
                "{} ? {} : {}",
                condition.to_source(),
                consequent.to_source(),
                alternate.to_source()
            ),
            Expr::Call { callee, args, .. } => {
                let inner: Vec<String> = args.iter().map(Expr::to_source).collect();
                format!("{}({})", callee.to_source(), inner.join(", "))
            }
            Expr::New {
                constructor, args, ..
            } => {
                let inner: Vec<String> = args.iter().map(Expr::to_source).collect();
                format!("new {}({})", constructor, inner.join(", "))
            }
            Expr::Member {
                object, property, ..
            } => match property {
                MemberKey::Static(name) => format!("{}.{}", object.to_source(), name),
                MemberKey::Computed(index) => {
                    format!("{}[{}]", object.to_source(), index.to_source())
                }
            },
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
