//! Rendering deferred violations into user-facing banners.
//!
//! A banner is the signature line with caret underlines and centred
//! position numbers beneath the sub-types involved, one body entry per
//! numbered position showing the value and its loosely inferred types, and
//! a closing sentence. Columns come from a span-tracking [`Styler`] that
//! re-walks the signature exactly as `Display` renders it.

use std::collections::BTreeMap;

use sigil_diag::{caret_line, count_args, has_labels, label_line, q, ErrorKind, Mark, TypeError};
use sigil_types::{PropPath, Styler, Type, TypeClass, TypeInfo, Variant};
use sigil_value::Value;

use crate::{
    determine_actual_types_loose, determine_actual_types_strict, EvidencePath, Violation,
};

// ---------------------------------------------------------------------------
// Signature layout
// ---------------------------------------------------------------------------

/// The rendered signature line plus the column range of every sub-type
/// (keyed by argument index and prop path) and of every constraint.
struct SigLayout {
    line: String,
    spans: BTreeMap<(usize, PropPath), (usize, usize)>,
    constraint_spans: Vec<(String, String, (usize, usize))>,
}

impl SigLayout {
    fn span(&self, index: usize, path: &PropPath) -> (usize, usize) {
        self.spans
            .get(&(index, path.clone()))
            .or_else(|| self.spans.get(&(index, Vec::new())))
            .copied()
            .unwrap_or((0, 0))
    }

    fn constraint_span(&self, var: &str, class: &str) -> Option<(usize, usize)> {
        self.constraint_spans
            .iter()
            .find(|(v, c, _)| v == var && c == class)
            .map(|(_, _, span)| *span)
    }
}

struct Tracker<'a> {
    index: usize,
    path: PropPath,
    offset: usize,
    spans: &'a mut BTreeMap<(usize, PropPath), (usize, usize)>,
}

impl Styler for Tracker<'_> {
    fn literal(&mut self, chunk: &str) -> String {
        self.offset += chunk.chars().count();
        chunk.to_string()
    }

    fn child(&mut self, key: &str, ty: &Type) -> String {
        self.path.push(key.to_string());
        let start = self.offset;
        let rendered = ty.format(self);
        self.spans
            .insert((self.index, self.path.clone()), (start, self.offset));
        self.path.pop();
        rendered
    }
}

fn layout(info: &TypeInfo) -> SigLayout {
    let mut line = format!("{} :: ", info.name);
    let mut constraint_spans = Vec::new();

    let total: usize = info.constraints.values().map(Vec::len).sum();
    if total > 0 {
        if total >= 2 {
            line.push('(');
        }
        let mut first = true;
        for (var, classes) in &info.constraints {
            for class in classes {
                if !first {
                    line.push_str(", ");
                }
                first = false;
                let start = line.chars().count();
                line.push_str(class.name());
                line.push(' ');
                line.push_str(var);
                let end = line.chars().count();
                constraint_spans.push((var.clone(), class.name().to_string(), (start, end)));
            }
        }
        if total >= 2 {
            line.push(')');
        }
        line.push_str(" => ");
    }

    let mut spans = BTreeMap::new();
    for (i, ty) in info.types.iter().enumerate() {
        if i > 0 {
            line.push_str(" -> ");
        }
        // Function-typed slots keep their parentheses at the top level of a
        // parameter; other composites render bare.
        let wrap = ty.variant() == Variant::Function;
        if wrap {
            line.push('(');
        }
        let start = line.chars().count();
        let mut tracker = Tracker {
            index: i,
            path: Vec::new(),
            offset: start,
            spans: &mut spans,
        };
        let rendered = ty.format(&mut tracker);
        line.push_str(&rendered);
        let end = line.chars().count();
        spans.insert((i, Vec::new()), (start, end));
        if wrap {
            line.push(')');
        }
    }

    SigLayout {
        line,
        spans,
        constraint_spans,
    }
}

/// The printed signature, including the name and constraint context. The
/// stable repr every typed callable carries.
pub fn signature_repr(info: &TypeInfo) -> String {
    layout(info).line
}

// ---------------------------------------------------------------------------
// Banner assembly
// ---------------------------------------------------------------------------

fn banner(
    kind: ErrorKind,
    sig: &SigLayout,
    marks: &[Mark],
    body: &[String],
    closing: &str,
) -> String {
    let mut text = String::new();
    text.push_str(kind.headline());
    text.push_str("\n\n");
    text.push_str(&sig.line);
    if !marks.is_empty() {
        text.push('\n');
        text.push_str(&caret_line(marks));
        if has_labels(marks) {
            text.push('\n');
            text.push_str(&label_line(marks));
        }
    }
    for entry in body {
        text.push_str("\n\n");
        text.push_str(entry);
    }
    text.push_str("\n\n");
    text.push_str(closing);
    text
}

fn values_with_types(env: &[Type], values: &[Value]) -> String {
    let shown: Vec<String> = values.iter().map(ToString::to_string).collect();
    let types: Vec<String> = determine_actual_types_loose(env, values)
        .iter()
        .map(ToString::to_string)
        .collect();
    format!("{} :: {}", shown.join(", "), types.join(", "))
}

fn type_at(info: &TypeInfo, index: usize, path: &PropPath) -> Option<Type> {
    let mut ty = info.types.get(index)?.clone();
    for key in path {
        ty = ty.child(key)?.ty.clone();
    }
    Some(ty)
}

// ---------------------------------------------------------------------------
// The four error shapes
// ---------------------------------------------------------------------------

/// Structural membership failure at one position.
pub fn invalid_value(
    env: &[Type],
    info: &TypeInfo,
    index: usize,
    path: &PropPath,
    value: &Value,
) -> TypeError {
    let sig = layout(info);
    let (start, end) = sig.span(index, path);
    let marks = [Mark::numbered(start, end, 1)];
    let body = [format!(
        "1)  {}",
        values_with_types(env, std::slice::from_ref(value))
    )];
    let expected = type_at(info, index, path).expect("violation paths point into the signature");
    let closing = format!("The value at position 1 is not a member of {}.", q(expected));
    TypeError::new(
        ErrorKind::InvalidValue,
        banner(ErrorKind::InvalidValue, &sig, &marks, &body, &closing),
    )
}

/// A variable-bound value failed a declared type class. Underlines the
/// violated constraint and the offending occurrence.
pub fn class_violation(
    env: &[Type],
    info: &TypeInfo,
    class: &TypeClass,
    index: usize,
    path: &PropPath,
    value: &Value,
) -> TypeError {
    let sig = layout(info);
    let var = type_at(info, index, path)
        .map(|t| t.name().to_string())
        .unwrap_or_default();
    let mut marks = Vec::new();
    if let Some((start, end)) = sig.constraint_span(&var, class.name()) {
        marks.push(Mark::plain(start, end));
    }
    let (start, end) = sig.span(index, path);
    marks.push(Mark::numbered(start, end, 1));
    let body = [format!(
        "1)  {}",
        values_with_types(env, std::slice::from_ref(value))
    )];
    let closing = format!(
        "{} requires {} to satisfy the {} type-class constraint; the value at position 1 does not.",
        q(&info.name),
        q(&var),
        class.name()
    );
    TypeError::new(
        ErrorKind::ClassConstraintViolation,
        banner(ErrorKind::ClassConstraintViolation, &sig, &marks, &body, &closing),
    )
}

/// No environment type is consistent with every observed use of a variable.
///
/// Only positions that are actually incompatible with the violation
/// position are underlined: a position is kept when strict inference over
/// the union of its values and the violation position's values comes up
/// empty.
pub fn var_violation(
    env: &[Type],
    info: &TypeInfo,
    index: usize,
    path: &PropPath,
    values_by_path: &BTreeMap<EvidencePath, Vec<Value>>,
) -> TypeError {
    let sig = layout(info);
    let violation_key = EvidencePath::new(index, path.clone());
    let violation_values = values_by_path
        .get(&violation_key)
        .cloned()
        .unwrap_or_default();

    let mut positions: Vec<(&EvidencePath, &Vec<Value>)> = Vec::new();
    for (position, values) in values_by_path {
        if *position == violation_key {
            positions.push((position, values));
            continue;
        }
        let mut union = violation_values.clone();
        union.extend(values.iter().cloned());
        if determine_actual_types_strict(env, &union).is_empty() {
            positions.push((position, values));
        }
    }

    let mut marks = Vec::new();
    let mut body = Vec::new();
    for (n, (position, values)) in positions.iter().enumerate() {
        let (start, end) = sig.span(position.index, &position.path);
        marks.push(Mark::numbered(start, end, n + 1));
        body.push(format!("{})  {}", n + 1, values_with_types(env, values)));
    }
    let closing = "Since there is no type of which all the above values are members, \
                   the type-variable constraint has been violated.";
    TypeError::new(
        ErrorKind::VarConstraintViolation,
        banner(ErrorKind::VarConstraintViolation, &sig, &marks, &body, closing),
    )
}

/// Render whichever violation escaped the solver.
pub fn realize(env: &[Type], info: &TypeInfo, violation: &Violation) -> TypeError {
    match violation {
        Violation::InvalidValue { index, path, value } => {
            invalid_value(env, info, *index, path, value)
        }
        Violation::ClassConstraint {
            class,
            index,
            path,
            value,
        } => class_violation(env, info, class, *index, path, value),
        Violation::VarConstraint {
            index,
            path,
            values_by_path,
        } => var_violation(env, info, *index, path, values_by_path),
    }
}

// ---------------------------------------------------------------------------
// Arity errors
// ---------------------------------------------------------------------------

/// Over-application of the typed callable itself. No carets: the whole
/// call, not a position, is wrong.
pub fn too_many_args(info: &TypeInfo, expected: usize, received: usize) -> TypeError {
    let sig = layout(info);
    let closing = format!(
        "{} expected at most {} but received {}.",
        q(&info.name),
        count_args(expected),
        count_args(received)
    );
    TypeError::new(
        ErrorKind::WrongArity,
        banner(ErrorKind::WrongArity, &sig, &[], &[], &closing),
    )
}

/// A wrapped callback applied to the wrong number of arguments. Underlines
/// the callback slot and lists the received arguments.
pub fn callback_arity(
    info: &TypeInfo,
    index: usize,
    expected: usize,
    received: &[Value],
) -> TypeError {
    let sig = layout(info);
    let (start, end) = sig.span(index, &Vec::new());
    let marks = [Mark::numbered(start, end, 1)];
    let shown: Vec<String> = received.iter().map(ToString::to_string).collect();
    let body = [format!("1)  {}", shown.join(", "))];
    let callback =
        type_at(info, index, &Vec::new()).expect("callback index points into the signature");
    let closing = format!(
        "{} expected {} but received {}.",
        q(callback),
        count_args(expected),
        count_args(received.len())
    );
    TypeError::new(
        ErrorKind::WrongArity,
        banner(ErrorKind::WrongArity, &sig, &marks, &body, &closing),
    )
}

/// More than nine parameters at definition time.
pub fn arity_range(name: &str, params: usize) -> TypeError {
    TypeError::new(
        ErrorKind::ArityRange,
        format!(
            "{}\n\n{} was declared with {params} parameters but the maximum is nine.",
            ErrorKind::ArityRange.headline(),
            q(name)
        ),
    )
}
