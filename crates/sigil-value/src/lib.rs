//! The dynamic value universe sigil reasons about.
//!
//! Values form a tagged sum over host primitives plus an open opaque case
//! for user-defined containers. The type-checking engine never inspects
//! values except through this crate: deep equality, display, field access,
//! and pointer identity for containers.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use sigil_diag::TypeError;

/// Reserved opaque tag for the partial-application placeholder.
const PLACEHOLDER_TAG: &str = "sigil/Placeholder";

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A dynamically typed value.
///
/// Containers are `Rc`-shared and immutable; cloning a value is cheap and
/// never deep-copies.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Record(Rc<BTreeMap<String, Value>>),
    Function(FnValue),
    Opaque(Rc<OpaqueValue>),
}

/// A user-defined container value: a type tag plus named fields.
#[derive(Clone, PartialEq)]
pub struct OpaqueValue {
    pub tag: String,
    pub fields: BTreeMap<String, Value>,
}

/// A callable value.
///
/// `repr` is the stable printed representation; for engine-made callables it
/// equals the printed signature. Equality is pointer identity.
#[derive(Clone)]
pub struct FnValue {
    repr: Rc<str>,
    arity: usize,
    f: Rc<dyn Fn(&[Value]) -> Result<Value, TypeError>>,
}

impl FnValue {
    pub fn new(
        repr: impl Into<String>,
        arity: usize,
        f: impl Fn(&[Value]) -> Result<Value, TypeError> + 'static,
    ) -> Self {
        Self {
            repr: Rc::from(repr.into()),
            arity,
            f: Rc::new(f),
        }
    }

    pub fn repr(&self) -> &str {
        &self.repr
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, TypeError> {
        (self.f)(args)
    }
}

impl fmt::Debug for FnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnValue({})", self.repr)
    }
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(Rc::from(s.into()))
    }

    pub fn array(items: impl Into<Vec<Value>>) -> Self {
        Value::Array(Rc::new(items.into()))
    }

    pub fn record(fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Record(Rc::new(fields.into_iter().collect()))
    }

    pub fn opaque(tag: impl Into<String>, fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Opaque(Rc::new(OpaqueValue {
            tag: tag.into(),
            fields: fields.into_iter().collect(),
        }))
    }

    pub fn function(
        repr: impl Into<String>,
        arity: usize,
        f: impl Fn(&[Value]) -> Result<Value, TypeError> + 'static,
    ) -> Self {
        Value::Function(FnValue::new(repr, arity, f))
    }

    /// The distinguished "this slot is still open" value.
    pub fn placeholder() -> Self {
        Value::opaque(PLACEHOLDER_TAG, [])
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Opaque(o) if o.tag == PLACEHOLDER_TAG && o.fields.is_empty())
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Named-field access on records and opaque containers.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.get(key),
            Value::Opaque(o) => o.fields.get(key),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FnValue> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Stable pointer identity for container values.
    ///
    /// Used by candidate-type inference to track the ancestor chain during
    /// structural descent. Primitives have no identity.
    pub fn container_id(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(Rc::as_ptr(items) as usize),
            Value::Record(fields) => Some(Rc::as_ptr(fields) as *const u8 as usize),
            Value::Opaque(o) => Some(Rc::as_ptr(o) as *const u8 as usize),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

// ---------------------------------------------------------------------------
// Deep equality
// ---------------------------------------------------------------------------

/// Total equality on numbers: NaN equals NaN, so enum membership and
/// evidence comparison behave set-like.
fn number_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_eq(*a, *b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.f, &b.f),
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == n.trunc() && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

fn write_str(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            _ => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &BTreeMap<String, Value>) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_str(f, key)?;
        write!(f, ": {value}")?;
    }
    write!(f, "}}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write_number(f, *n),
            Value::Str(s) => write_str(f, s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => write_fields(f, fields),
            Value::Function(fv) => write!(f, "{}", fv.repr),
            Value::Opaque(o) => {
                write!(f, "{}", o.tag)?;
                if !o.fields.is_empty() {
                    write!(f, " ")?;
                    write_fields(f, &o.fields)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
