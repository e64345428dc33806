//! Runtime values
//!
//! A [`Value`] is either a primitive (copied on assignment) or a handle to a
//! heap object (copied by address, so two variables can alias one object).

use serde::Serialize;

/// Heap address. Addresses are handed out monotonically and never reused,
/// so a value's address doubles as its identity.
pub type Address = u64;

/// A runtime value of the JavaScript subset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    /// Array on the heap
    Array(Address),
    /// Plain object on the heap
    Object(Address),
    /// Function object on the heap
    Function(Address),
    /// `new Map()` instance on the heap
    Map(Address),
    /// `new Set()` instance on the heap
    Set(Address),
}

impl Value {
    /// JS truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Null | Value::Undefined => false,
            Value::Array(_)
            | Value::Object(_)
            | Value::Function(_)
            | Value::Map(_)
            | Value::Set(_) => true,
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Undefined => "undefined",
            Value::Function(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Map(_) | Value::Set(_) => {
                "object"
            }
        }
    }

    /// The heap address behind this value, if it is a composite
    pub fn address(&self) -> Option<Address> {
        match self {
            Value::Array(addr)
            | Value::Object(addr)
            | Value::Function(addr)
            | Value::Map(addr)
            | Value::Set(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Numeric coercion (`Number(v)`). Composites coerce to NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::Null => 0.0,
            Value::Undefined => f64::NAN,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// Strict equality (`===`). Composites compare by address (identity).
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Undefined, Value::Undefined) => true,
            _ => match (self.address(), other.address()) {
                (Some(a), Some(b)) => {
                    a == b && std::mem::discriminant(self) == std::mem::discriminant(other)
                }
                _ => false,
            },
        }
    }

    /// SameValueZero, the equality Map keys and Set members use: like `===`
    /// except NaN matches NaN.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        if let (Value::Number(a), Value::Number(b)) = (self, other) {
            return a == b || (a.is_nan() && b.is_nan());
        }
        self.strict_eq(other)
    }

    /// Loose equality (`==`): `null == undefined`, numeric coercion between
    /// numbers, strings and booleans; composites still compare by identity.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => true,
            (Value::Number(_), Value::Str(_))
            | (Value::Str(_), Value::Number(_))
            | (Value::Bool(_), Value::Number(_))
            | (Value::Number(_), Value::Bool(_))
            | (Value::Bool(_), Value::Str(_))
            | (Value::Str(_), Value::Bool(_)) => {
                let a = self.to_number();
                let b = other.to_number();
                a == b
            }
            _ => self.strict_eq(other),
        }
    }
}

/// Format a number the way JS `String(n)` does: integers without a decimal
/// point, and the literal spellings of NaN and the infinities.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    format!("{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::Array(1).is_truthy());
    }

    #[test]
    fn test_equality() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(Value::Number(1.0).loose_eq(&Value::Str("1".to_string())));
        assert!(!Value::Number(1.0).strict_eq(&Value::Str("1".to_string())));
        assert!(Value::Array(3).strict_eq(&Value::Array(3)));
        assert!(!Value::Array(3).strict_eq(&Value::Array(4)));
        assert!(!Value::Array(3).strict_eq(&Value::Object(3)));
        assert!(!Value::Number(f64::NAN).strict_eq(&Value::Number(f64::NAN)));
    }

    #[test]
    fn test_same_value_zero() {
        assert!(Value::Number(f64::NAN).same_value_zero(&Value::Number(f64::NAN)));
        assert!(Value::Number(0.0).same_value_zero(&Value::Number(-0.0)));
        assert!(Value::Str("a".to_string()).same_value_zero(&Value::Str("a".to_string())));
        assert!(!Value::Number(1.0).same_value_zero(&Value::Str("1".to_string())));
    }
}
