//! Literal values and their type tags.
//!
//! Block scripts are statically typed over five tags.  A [`Value`] is built
//! either from a raw script token (re-interpreted per tag, e.g. quotes are
//! stripped from strings and `0x`-prefixed text is parsed as hex) or
//! directly from a native Rust value, and is immutable once built.
//!
//! Tag-specific accessors (`get_int`, `get_double`, …) fail with a type
//! error on a mismatched tag; `to_bool` is total — nonzero / non-empty
//! means true for every tag.

use std::fmt;

use crate::error::{ScriptError, ScriptResult};

/// The type tag of a script value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Double,
    String,
    Bool,
    IntVector,
}

impl Type {
    /// Every tag, in declaration order.  Used when a function is registered
    /// once per tag (`SET_VAR`, `IF`, …).
    pub const ALL: [Type; 5] = [
        Type::Int,
        Type::Double,
        Type::String,
        Type::Bool,
        Type::IntVector,
    ];

    /// Name of the tag as used on the block-controller surface.
    pub fn name(self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Double => "double",
            Type::String => "string",
            Type::Bool => "bool",
            Type::IntVector => "int_vector",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tagged, immutable script value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    String(String),
    Bool(bool),
    IntVector(Vec<i64>),
}

impl Value {
    /// Re-interpret raw token text as a value of tag `ty`.
    ///
    /// Int accepts an optional leading `-`, decimal digits, or a
    /// `0x`-prefixed hex literal (either case).  String strips one layer of
    /// surrounding quotes, double or single.  Bool accepts `TRUE`/`FALSE`
    /// case-insensitively, or any integer text cast to boolean.  Int-vector
    /// accepts a bracketed, comma/space-separated list of signed integers.
    pub fn from_token(text: &str, ty: Type) -> ScriptResult<Value> {
        let malformed = || ScriptError::syntax(format!("malformed {ty} literal: {text}"));
        match ty {
            Type::Int => parse_int(text).map(Value::Int).ok_or_else(malformed),
            Type::Double => text
                .trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| malformed()),
            Type::String => Ok(Value::String(strip_quotes(text).to_owned())),
            Type::Bool => {
                if text.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    parse_int(text)
                        .map(|n| Value::Bool(n != 0))
                        .ok_or_else(malformed)
                }
            }
            Type::IntVector => {
                let inner = text
                    .trim()
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .ok_or_else(malformed)?;
                let mut elems = Vec::new();
                for part in inner.split(|c: char| c == ',' || c.is_whitespace()) {
                    if part.is_empty() {
                        continue;
                    }
                    elems.push(part.parse::<i64>().map_err(|_| malformed())?);
                }
                Ok(Value::IntVector(elems))
            }
        }
    }

    /// The tag of this value.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Double(_) => Type::Double,
            Value::String(_) => Type::String,
            Value::Bool(_) => Type::Bool,
            Value::IntVector(_) => Type::IntVector,
        }
    }

    /// Coerce to boolean.  Total: `0`, `0.0`, `""`, `false`, and `[]` are
    /// the falsy values; everything else is truthy.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Double(x) => *x != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::IntVector(v) => !v.is_empty(),
        }
    }

    // ── Tag-specific accessors ────────────────────────────────────────────────

    pub fn get_int(&self) -> ScriptResult<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(other.mismatch(Type::Int)),
        }
    }

    pub fn get_double(&self) -> ScriptResult<f64> {
        match self {
            Value::Double(x) => Ok(*x),
            other => Err(other.mismatch(Type::Double)),
        }
    }

    pub fn get_string(&self) -> ScriptResult<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            other => Err(other.mismatch(Type::String)),
        }
    }

    pub fn get_bool(&self) -> ScriptResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.mismatch(Type::Bool)),
        }
    }

    pub fn get_int_vector(&self) -> ScriptResult<Vec<i64>> {
        match self {
            Value::IntVector(v) => Ok(v.clone()),
            other => Err(other.mismatch(Type::IntVector)),
        }
    }

    fn mismatch(&self, wanted: Type) -> ScriptError {
        ScriptError::type_error(format!("expected a {wanted} value, got {}", self.type_of()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::String(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::IntVector(v) => {
                write!(f, "[")?;
                for (i, n) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{n}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Parse decimal or `0x`-prefixed hex integer text.
fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        text.parse::<i64>().ok()
    }
}

/// Strip one layer of matching surrounding quotes, if present.
fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0]
    {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntVector(v)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
