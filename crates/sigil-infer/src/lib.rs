//! Candidate-type inference and the constraint solver for sigil.
//!
//! This crate implements:
//! - dynamic reverse lookup from a value to the environment types it
//!   inhabits (`determine_actual_types_*`), cycle-safe via ancestor
//!   identity tracking;
//! - the per-call `TypeVarMap`: for each type variable, the candidate
//!   concrete types still consistent with every observed value, plus the
//!   evidence that narrowed them;
//! - `satisfactory_types`, the structural walk of an expected type against
//!   observed values that threads the map forward and defers failures.
//!
//! Failures are returned as [`Violation`] values carrying raw context; only
//! the violation that escapes combinator choice is rendered into a
//! [`sigil_diag::TypeError`] by [`report`].

pub mod report;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use sigil_types::{PropPath, Type, TypeClass, TypeInfo, Variant, NULLABLE_NAME};
use sigil_value::Value;

pub use sigil_diag::{ErrorKind, TypeError};

// ---------------------------------------------------------------------------
// Evidence paths
// ---------------------------------------------------------------------------

/// Where a type variable was observed: argument position plus the path of
/// child-slot keys inside that argument's declared type.
///
/// Ordering is structural: the argument index compares numerically first,
/// then path segments (with `$n` segments compared by their number), so map
/// iteration stays canonical past position 9.
#[derive(Debug, Clone)]
pub struct EvidencePath {
    pub index: usize,
    pub path: PropPath,
}

impl EvidencePath {
    pub fn new(index: usize, path: PropPath) -> Self {
        Self { index, path }
    }
}

fn segment_cmp(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| s.strip_prefix('$').and_then(|n| n.parse::<usize>().ok());
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

impl Ord for EvidencePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index).then_with(|| {
            for (a, b) in self.path.iter().zip(&other.path) {
                match segment_cmp(a, b) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                }
            }
            self.path.len().cmp(&other.path.len())
        })
    }
}

impl PartialOrd for EvidencePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EvidencePath {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EvidencePath {}

// ---------------------------------------------------------------------------
// Type-variable map
// ---------------------------------------------------------------------------

/// Working memory for one call: per variable, the surviving candidate
/// concrete types and the values that informed them at each occurrence.
///
/// Value-semantic: every solver step produces a fresh map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeVarMap {
    entries: BTreeMap<String, VarEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarEntry {
    pub candidates: Vec<Type>,
    pub values_by_path: BTreeMap<EvidencePath, Vec<Value>>,
}

impl TypeVarMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, name: &str) -> Option<&VarEntry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Refine `prev` with new observations of `var` at one occurrence.
///
/// A variable seen for the first time starts from a snapshot of the
/// environment, restricted to types with at least the variable's arity.
/// Every observed value then filters the candidates through full-solver
/// membership; surviving parameterised candidates with an unknown slot are
/// narrowed against the value's extracted children via strict inference
/// (falling back to the unrefined slot when inference finds nothing, so a
/// heterogeneous container stays a candidate).
pub fn update_type_var_map(
    env: &[Type],
    prev: &TypeVarMap,
    var: &Type,
    index: usize,
    path: &PropPath,
    values: &[Value],
) -> TypeVarMap {
    let mut map = prev.clone();
    let entry = map
        .entries
        .entry(var.name().to_string())
        .or_insert_with(|| VarEntry {
            candidates: env
                .iter()
                .filter(|t| t.arity() >= var.arity())
                .cloned()
                .collect(),
            values_by_path: BTreeMap::new(),
        });
    let bucket = entry
        .values_by_path
        .entry(EvidencePath::new(index, path.clone()))
        .or_default();
    for value in values {
        bucket.push(value.clone());
    }

    for value in values {
        let mut survivors = Vec::new();
        for candidate in &entry.candidates {
            if !test(env, candidate, value) {
                continue;
            }
            match candidate.variant() {
                Variant::Unary if slot_is_unknown(candidate, "$1") => {
                    let inner = extract(candidate, "$1", value);
                    let refined = or_types(
                        determine_actual_types_strict(env, &inner),
                        slot_type(candidate, "$1"),
                    );
                    for sub in refined {
                        survivors.push(candidate.specialize(&[sub]));
                    }
                }
                Variant::Binary if slot_is_unknown(candidate, "$1") || slot_is_unknown(candidate, "$2") => {
                    let firsts = or_types(
                        determine_actual_types_strict(env, &extract(candidate, "$1", value)),
                        slot_type(candidate, "$1"),
                    );
                    let seconds = or_types(
                        determine_actual_types_strict(env, &extract(candidate, "$2", value)),
                        slot_type(candidate, "$2"),
                    );
                    for first in &firsts {
                        for second in &seconds {
                            survivors.push(candidate.specialize(&[first.clone(), second.clone()]));
                        }
                    }
                }
                _ => survivors.push(candidate.clone()),
            }
        }
        entry.candidates = survivors;
    }
    map
}

fn slot_is_unknown(ty: &Type, key: &str) -> bool {
    ty.child(key)
        .is_some_and(|c| c.ty.variant() == Variant::Unknown)
}

fn slot_type(ty: &Type, key: &str) -> Type {
    ty.child(key).expect("declared slot exists").ty.clone()
}

fn extract(ty: &Type, key: &str, value: &Value) -> Vec<Value> {
    match ty.child(key) {
        Some(child) => (child.extract)(value),
        None => Vec::new(),
    }
}

fn or_types(types: Vec<Type>, fallback: Type) -> Vec<Type> {
    if types.is_empty() {
        vec![fallback]
    } else {
        types
    }
}

// ---------------------------------------------------------------------------
// Candidate-type inference
// ---------------------------------------------------------------------------

/// Environment types every observed value is a member of, descending into
/// parameterised types. Values with no consistent type are discarded.
pub fn determine_actual_types_strict(env: &[Type], values: &[Value]) -> Vec<Type> {
    reject_sentinels(determine(env, env.to_vec(), &mut Vec::new(), values, false))
}

/// Like the strict form, but an otherwise-empty result collapses to the
/// `Inconsistent` sentinel in nested positions, so diagnostics can render a
/// `???` slot instead of dropping the container.
pub fn determine_actual_types_loose(env: &[Type], values: &[Value]) -> Vec<Type> {
    reject_sentinels(determine(env, env.to_vec(), &mut Vec::new(), values, true))
}

fn reject_sentinels(types: Vec<Type>) -> Vec<Type> {
    types
        .into_iter()
        .filter(|t| !matches!(t.variant(), Variant::Unknown | Variant::Inconsistent))
        .collect()
}

fn determine(
    env: &[Type],
    types: Vec<Type>,
    seen: &mut Vec<usize>,
    values: &[Value],
    loose: bool,
) -> Vec<Type> {
    if values.is_empty() {
        return vec![sigil_types::unknown()];
    }
    let mut working = types;
    for value in values {
        working = refine(env, working, seen, value, loose);
    }
    if working.is_empty() && loose {
        vec![sigil_types::inconsistent()]
    } else {
        working
    }
}

fn refine(env: &[Type], types: Vec<Type>, seen: &mut Vec<usize>, value: &Value, loose: bool) -> Vec<Type> {
    // Revisiting an ancestor means a cycle: no contribution.
    if let Some(id) = value.container_id() {
        if seen.contains(&id) {
            return Vec::new();
        }
    }
    let mut out = Vec::new();
    for ty in types {
        if ty.name() == NULLABLE_NAME {
            continue;
        }
        if !ty.recognize(value) {
            continue;
        }
        match ty.variant() {
            Variant::Unary if slot_is_unknown(&ty, "$1") => {
                let inner_values = extract(&ty, "$1", value);
                let inner = descend(env, seen, value, &inner_values, loose);
                for sub in inner {
                    out.push(ty.specialize(&[sub]));
                }
            }
            Variant::Binary => {
                let firsts = descend(env, seen, value, &extract(&ty, "$1", value), loose);
                let seconds = descend(env, seen, value, &extract(&ty, "$2", value), loose);
                for first in &firsts {
                    for second in &seconds {
                        out.push(ty.specialize(&[first.clone(), second.clone()]));
                    }
                }
            }
            _ => out.push(ty),
        }
    }
    out
}

fn descend(
    env: &[Type],
    seen: &mut Vec<usize>,
    parent: &Value,
    values: &[Value],
    loose: bool,
) -> Vec<Type> {
    let pushed = match parent.container_id() {
        Some(id) => {
            seen.push(id);
            true
        }
        None => false,
    };
    let result = determine(env, env.to_vec(), seen, values, loose);
    if pushed {
        seen.pop();
    }
    result
}

// ---------------------------------------------------------------------------
// Constraint solver
// ---------------------------------------------------------------------------

/// A solver success: the advanced map plus the specialised types the walk
/// settled on for the expected type.
#[derive(Debug, Clone)]
pub struct Satisfied {
    pub type_var_map: TypeVarMap,
    pub types: Vec<Type>,
}

/// A deferred failure. Carries raw context only; rendering the banner is
/// [`report::realize`]'s job, paid once for the failure that escapes.
#[derive(Debug, Clone)]
pub enum Violation {
    /// Structural membership failed at `path` inside argument `index`.
    InvalidValue {
        index: usize,
        path: PropPath,
        value: Value,
    },
    /// A variable-bound value failed a declared type class.
    ClassConstraint {
        class: TypeClass,
        index: usize,
        path: PropPath,
        value: Value,
    },
    /// A variable ran out of candidate concrete types.
    VarConstraint {
        index: usize,
        path: PropPath,
        values_by_path: BTreeMap<EvidencePath, Vec<Value>>,
    },
}

/// Walk an expected type against observed values, threading the map.
///
/// Recursion is driven by the type's variant: leaves validate, records
/// recurse field-wise in key order, parameterised types recurse slot-wise
/// and re-lift, variables check class constraints and refine the map. For a
/// parameterised variable, each surviving candidate's inner values (read
/// through the candidate's last-keyed extractors) must themselves satisfy
/// the variable's declared slot types.
pub fn satisfactory_types(
    env: &[Type],
    info: &TypeInfo,
    type_var_map: &TypeVarMap,
    expected: &Type,
    index: usize,
    path: &PropPath,
    values: &[Value],
) -> Result<Satisfied, Violation> {
    for value in values {
        if let Err(failure) = expected.validate(value) {
            let mut full_path = path.clone();
            full_path.extend(failure.path);
            return Err(Violation::InvalidValue {
                index,
                path: full_path,
                value: failure.value,
            });
        }
    }

    match expected.variant() {
        Variant::Variable => {
            if let Some(classes) = info.constraints.get(expected.name()) {
                for value in values {
                    for class in classes {
                        if !class.test(value) {
                            return Err(Violation::ClassConstraint {
                                class: class.clone(),
                                index,
                                path: path.clone(),
                                value: value.clone(),
                            });
                        }
                    }
                }
            }

            let map = update_type_var_map(env, type_var_map, expected, index, path, values);
            let entry = map
                .entry(expected.name())
                .expect("update_type_var_map creates the entry")
                .clone();
            if entry.candidates.is_empty() && !values.is_empty() {
                return Err(Violation::VarConstraint {
                    index,
                    path: path.clone(),
                    values_by_path: entry.values_by_path,
                });
            }

            // For `f a`-shaped variables, check each candidate's inner
            // values against the declared slot types. The variable's k-th
            // slot aligns with the candidate's last keys: the `a` in
            // `Functor f => f a` is the `b` of a pair-like candidate.
            let mut map = map;
            for candidate in &entry.candidates {
                let keys: Vec<String> = candidate.keys().map(str::to_string).collect();
                let offset = keys.len() - expected.arity();
                for (slot, key) in expected.keys().enumerate() {
                    let slot_ty = expected.child(key).expect("declared slot exists").ty.clone();
                    let mut slot_path = path.clone();
                    slot_path.push(key.to_string());
                    let inner_values: Vec<Value> = values
                        .iter()
                        .flat_map(|v| extract(candidate, &keys[offset + slot], v))
                        .collect();
                    for inner in inner_values {
                        let result = satisfactory_types(
                            env,
                            info,
                            &map,
                            &slot_ty,
                            index,
                            &slot_path,
                            std::slice::from_ref(&inner),
                        )?;
                        map = result.type_var_map;
                    }
                }
            }
            Ok(Satisfied {
                type_var_map: map,
                types: entry.candidates,
            })
        }

        Variant::Unary => {
            let inner_values: Vec<Value> = values
                .iter()
                .flat_map(|v| extract(expected, "$1", v))
                .collect();
            let mut slot_path = path.clone();
            slot_path.push("$1".to_string());
            let result = satisfactory_types(
                env,
                info,
                type_var_map,
                &slot_type(expected, "$1"),
                index,
                &slot_path,
                &inner_values,
            )?;
            let subs = or_types(result.types, slot_type(expected, "$1"));
            Ok(Satisfied {
                type_var_map: result.type_var_map,
                types: subs.iter().map(|sub| expected.specialize(&[sub.clone()])).collect(),
            })
        }

        Variant::Binary => {
            let firsts: Vec<Value> = values
                .iter()
                .flat_map(|v| extract(expected, "$1", v))
                .collect();
            let mut first_path = path.clone();
            first_path.push("$1".to_string());
            let first = satisfactory_types(
                env,
                info,
                type_var_map,
                &slot_type(expected, "$1"),
                index,
                &first_path,
                &firsts,
            )?;

            let seconds: Vec<Value> = values
                .iter()
                .flat_map(|v| extract(expected, "$2", v))
                .collect();
            let mut second_path = path.clone();
            second_path.push("$2".to_string());
            let second = satisfactory_types(
                env,
                info,
                &first.type_var_map,
                &slot_type(expected, "$2"),
                index,
                &second_path,
                &seconds,
            )?;

            let lefts = or_types(first.types, slot_type(expected, "$1"));
            let rights = or_types(second.types, slot_type(expected, "$2"));
            let mut types = Vec::new();
            for left in &lefts {
                for right in &rights {
                    types.push(expected.specialize(&[left.clone(), right.clone()]));
                }
            }
            Ok(Satisfied {
                type_var_map: second.type_var_map,
                types,
            })
        }

        Variant::Record => {
            let mut map = type_var_map.clone();
            for (key, child) in expected.children() {
                let field_values: Vec<Value> =
                    values.iter().flat_map(|v| (child.extract)(v)).collect();
                let mut field_path = path.clone();
                field_path.push(key.to_string());
                let result = satisfactory_types(
                    env,
                    info,
                    &map,
                    &child.ty,
                    index,
                    &field_path,
                    &field_values,
                )?;
                map = result.type_var_map;
            }
            Ok(Satisfied {
                type_var_map: map,
                types: vec![expected.clone()],
            })
        }

        _ => Ok(Satisfied {
            type_var_map: type_var_map.clone(),
            types: vec![expected.clone()],
        }),
    }
}

/// Full-solver membership: is `value` a member of `ty` in `env`?
///
/// Convenience for building derived predicates; also the filter
/// `update_type_var_map` narrows candidates with.
pub fn test(env: &[Type], ty: &Type, value: &Value) -> bool {
    let info = TypeInfo::new("name", BTreeMap::new(), vec![ty.clone()]);
    satisfactory_types(
        env,
        &info,
        &TypeVarMap::new(),
        ty,
        0,
        &Vec::new(),
        std::slice::from_ref(value),
    )
    .is_ok()
}
