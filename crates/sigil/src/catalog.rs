//! Pre-built types and the default environment.
//!
//! Each entry is a one-liner over the `sigil-types` constructors. The
//! default environment is the universe candidate-type inference and
//! type-variable narrowing draw from; keep it small and unambiguous.

use sigil_types::{binary, nullary, unary, unknown, Type, NULLABLE_NAME};
use sigil_value::Value;

/// JavaScript's safe-integer bound: integers at or below it round-trip
/// through an f64 exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn any() -> Type {
    nullary("sigil/Any", |_| true)
}

pub fn any_function() -> Type {
    nullary("sigil/AnyFunction", |v| v.is_callable())
}

pub fn boolean() -> Type {
    nullary("sigil/Boolean", |v| matches!(v, Value::Bool(_)))
}

pub fn null() -> Type {
    nullary("sigil/Null", |v| matches!(v, Value::Null))
}

pub fn number() -> Type {
    nullary("sigil/Number", |v| matches!(v, Value::Number(_)))
}

pub fn valid_number() -> Type {
    nullary("sigil/ValidNumber", |v| {
        matches!(v, Value::Number(n) if !n.is_nan())
    })
}

pub fn finite_number() -> Type {
    nullary("sigil/FiniteNumber", |v| {
        matches!(v, Value::Number(n) if n.is_finite())
    })
}

pub fn nonzero_finite_number() -> Type {
    nullary("sigil/NonZeroFiniteNumber", |v| {
        matches!(v, Value::Number(n) if n.is_finite() && *n != 0.0)
    })
}

pub fn positive_number() -> Type {
    nullary("sigil/PositiveNumber", |v| {
        matches!(v, Value::Number(n) if *n > 0.0)
    })
}

pub fn negative_number() -> Type {
    nullary("sigil/NegativeNumber", |v| {
        matches!(v, Value::Number(n) if *n < 0.0)
    })
}

fn is_integer(n: f64) -> bool {
    n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
}

pub fn integer() -> Type {
    nullary("sigil/Integer", |v| {
        matches!(v, Value::Number(n) if is_integer(*n))
    })
}

pub fn nonzero_integer() -> Type {
    nullary("sigil/NonZeroInteger", |v| {
        matches!(v, Value::Number(n) if is_integer(*n) && *n != 0.0)
    })
}

pub fn nonnegative_integer() -> Type {
    nullary("sigil/NonNegativeInteger", |v| {
        matches!(v, Value::Number(n) if is_integer(*n) && *n >= 0.0)
    })
}

pub fn string() -> Type {
    nullary("sigil/String", |v| matches!(v, Value::Str(_)))
}

pub fn object() -> Type {
    nullary("sigil/Object", |v| matches!(v, Value::Record(_)))
}

pub fn array(inner: Type) -> Type {
    unary(
        "sigil/Array",
        |v| matches!(v, Value::Array(_)),
        |v| v.as_array().map(<[Value]>::to_vec).unwrap_or_default(),
        inner,
    )
}

pub fn str_map(inner: Type) -> Type {
    unary(
        "sigil/StrMap",
        |v| matches!(v, Value::Record(_)),
        |v| match v {
            Value::Record(fields) => fields.values().cloned().collect(),
            _ => Vec::new(),
        },
        inner,
    )
}

pub fn pair(first: Type, second: Type) -> Type {
    binary(
        "sigil/Pair",
        |v| v.field("fst").is_some() && v.field("snd").is_some(),
        |v| v.field("fst").cloned().into_iter().collect(),
        |v| v.field("snd").cloned().into_iter().collect(),
        first,
        second,
    )
}

/// `Nullable a`: `null` or a member of `a`. Excluded from candidate-type
/// inference by name so it does not subsume every type in the environment.
pub fn nullable(inner: Type) -> Type {
    unary(
        NULLABLE_NAME,
        |_| true,
        |v| match v {
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        },
        inner,
    )
}

/// The default environment, in display order.
pub fn env() -> Vec<Type> {
    vec![
        any_function(),
        array(unknown()),
        boolean(),
        null(),
        number(),
        object(),
        str_map(unknown()),
        string(),
    ]
}
