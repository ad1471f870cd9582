//! Type representations for sigil.
//!
//! This crate defines the uniform type record the whole engine dispatches
//! on: a variant tag, a qualified display name, ordered child slots (each an
//! extractor plus a sub-type), and a shallow recognizer predicate. One
//! structural algorithm handles lists, records, pairs, and user-defined
//! containers identically because "what lives inside a container" is fully
//! described by the extractors.
//!
//! Checking and inference live in `sigil-infer`; this crate owns the
//! representation, the constructors, recursive membership (`validate`), and
//! the formatting machinery diagnostics are built on.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use sigil_diag::{ErrorKind, TypeError};
use sigil_value::Value;

/// A path of child-slot keys into a type tree (`["$1"]`, `["x", "$2"]`).
pub type PropPath = Vec<String>;

/// Qualified name of the catalog's `Nullable` type. Candidate-type inference
/// excludes it by name so it cannot dominate every nullable-shaped value.
pub const NULLABLE_NAME: &str = "sigil/Nullable";

// ---------------------------------------------------------------------------
// Type representation
// ---------------------------------------------------------------------------

/// Variant tag driving every structural operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Unknown,
    Inconsistent,
    Variable,
    Nullary,
    Unary,
    Binary,
    Enum,
    Record,
    Function,
}

/// Extracts the child values a container holds at one slot.
pub type Extractor = Rc<dyn Fn(&Value) -> Vec<Value>>;

/// One child slot: how to reach the contained values, and what type they
/// must inhabit.
#[derive(Clone)]
pub struct Child {
    pub extract: Extractor,
    pub ty: Type,
}

struct TypeInner {
    variant: Variant,
    /// Qualified display name ("sigil/Number"); empty for structural types.
    name: String,
    /// Insertion-ordered child slots.
    children: Vec<(String, Child)>,
    /// Enum members (deep-equality membership); empty for other variants.
    members: Vec<Value>,
    recognize: Rc<dyn Fn(&Value) -> bool>,
}

/// A type. Cheap to clone; immutable once constructed.
#[derive(Clone)]
pub struct Type(Rc<TypeInner>);

/// A failed recursive membership check: the offending value and the path of
/// child-slot keys that reached it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub value: Value,
    pub path: PropPath,
}

impl Type {
    pub fn variant(&self) -> Variant {
        self.0.variant
    }

    /// The qualified name; empty for structural types.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The name with any namespace prefix stripped.
    pub fn display_name(&self) -> &str {
        match self.0.name.rfind('/') {
            Some(idx) => &self.0.name[idx + 1..],
            None => &self.0.name,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.children.iter().map(|(k, _)| k.as_str())
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Child)> {
        self.0.children.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn child(&self, key: &str) -> Option<&Child> {
        self.0
            .children
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| c)
    }

    /// Number of child slots. For parameterised variables this is the
    /// declared arity; for concrete types, how many keyed slots they carry.
    pub fn arity(&self) -> usize {
        self.0.children.len()
    }

    pub fn members(&self) -> &[Value] {
        &self.0.members
    }

    /// Shallow membership.
    pub fn recognize(&self, value: &Value) -> bool {
        (self.0.recognize)(value)
    }

    /// Recursive membership: shallow recognition, then every extracted child
    /// against its slot's sub-type. Returns the first failure.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationFailure> {
        if !self.recognize(value) {
            return Err(ValidationFailure {
                value: value.clone(),
                path: Vec::new(),
            });
        }
        for (key, child) in &self.0.children {
            for inner in (child.extract)(value) {
                if let Err(mut failure) = child.ty.validate(&inner) {
                    failure.path.insert(0, key.clone());
                    return Err(failure);
                }
            }
        }
        Ok(())
    }

    /// Rebuild this parameterised type with new child sub-types, keeping its
    /// name, recognizer, and extractors. `subtypes` must match the slot
    /// count and order.
    pub fn specialize(&self, subtypes: &[Type]) -> Type {
        debug_assert_eq!(subtypes.len(), self.0.children.len());
        let children = self
            .0
            .children
            .iter()
            .zip(subtypes)
            .map(|((key, child), ty)| {
                (
                    key.clone(),
                    Child {
                        extract: Rc::clone(&child.extract),
                        ty: ty.clone(),
                    },
                )
            })
            .collect();
        Type(Rc::new(TypeInner {
            variant: self.0.variant,
            name: self.0.name.clone(),
            children,
            members: self.0.members.clone(),
            recognize: Rc::clone(&self.0.recognize),
        }))
    }

    /// Whether the printed form is multi-token and needs parentheses when
    /// nested inside another type.
    pub fn is_compound(&self) -> bool {
        match self.variant() {
            Variant::Unary | Variant::Binary | Variant::Function => true,
            Variant::Variable => !self.0.children.is_empty(),
            _ => false,
        }
    }
}

/// Structural equality: variant, name, enum members, and child slots
/// (keys and sub-types). Predicates and extractors are identified by the
/// constructor that produced them.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.variant() == other.variant()
            && self.name() == other.name()
            && self.members() == other.members()
            && self.0.children.len() == other.0.children.len()
            && self
                .0
                .children
                .iter()
                .zip(&other.0.children)
                .all(|((ka, ca), (kb, cb))| ka == kb && ca.ty == cb.ty)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({self})")
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Receives the pieces of a rendered type in strict left-to-right emission
/// order. `literal` styles fixed syntax; `child` styles (and by default
/// recurses into) the sub-type at `key`.
///
/// The renderer in `sigil-infer` uses a span-tracking styler to know the
/// exact columns every sub-type occupies; `Display` uses the identity
/// styler.
pub trait Styler {
    fn literal(&mut self, chunk: &str) -> String;

    fn child(&mut self, key: &str, ty: &Type) -> String;
}

/// Identity styler: renders plainly.
pub struct PlainStyler;

impl Styler for PlainStyler {
    fn literal(&mut self, chunk: &str) -> String {
        chunk.to_string()
    }

    fn child(&mut self, key: &str, ty: &Type) -> String {
        let _ = key;
        ty.format(self)
    }
}

impl Type {
    /// Render through a styler. Pieces are emitted strictly left-to-right
    /// (parentheses included) so stylers can track column positions.
    pub fn format(&self, styler: &mut dyn Styler) -> String {
        let mut out = String::new();
        match self.variant() {
            Variant::Unknown | Variant::Inconsistent => {
                out.push_str(&styler.literal("???"));
            }
            Variant::Nullary => {
                out.push_str(&styler.literal(self.display_name()));
            }
            Variant::Enum => {
                if self.name().is_empty() {
                    out.push_str(&styler.literal("("));
                    for (i, member) in self.members().iter().enumerate() {
                        if i > 0 {
                            out.push_str(&styler.literal(" | "));
                        }
                        out.push_str(&styler.literal(&member.to_string()));
                    }
                    out.push_str(&styler.literal(")"));
                } else {
                    out.push_str(&styler.literal(self.display_name()));
                }
            }
            Variant::Variable | Variant::Unary | Variant::Binary => {
                out.push_str(&styler.literal(self.display_name()));
                for (key, child) in &self.0.children {
                    out.push_str(&styler.literal(" "));
                    format_child(&mut out, styler, key, &child.ty, child.ty.is_compound());
                }
            }
            Variant::Function => {
                let slots = &self.0.children;
                let params = &slots[..slots.len() - 1];
                let (ret_key, ret) = &slots[slots.len() - 1];
                if params.len() == 1 {
                    let (key, child) = &params[0];
                    format_child(
                        &mut out,
                        styler,
                        key,
                        &child.ty,
                        child.ty.variant() == Variant::Function,
                    );
                } else {
                    out.push_str(&styler.literal("("));
                    for (i, (key, child)) in params.iter().enumerate() {
                        if i > 0 {
                            out.push_str(&styler.literal(", "));
                        }
                        format_child(
                            &mut out,
                            styler,
                            key,
                            &child.ty,
                            child.ty.variant() == Variant::Function,
                        );
                    }
                    out.push_str(&styler.literal(")"));
                }
                out.push_str(&styler.literal(" -> "));
                format_child(
                    &mut out,
                    styler,
                    ret_key,
                    &ret.ty,
                    ret.ty.variant() == Variant::Function,
                );
            }
            Variant::Record => {
                out.push_str(&styler.literal("{ "));
                for (i, (key, child)) in self.0.children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(&styler.literal(", "));
                    }
                    out.push_str(&styler.literal(key));
                    out.push_str(&styler.literal(" :: "));
                    format_child(&mut out, styler, key, &child.ty, false);
                }
                out.push_str(&styler.literal(" }"));
            }
        }
        out
    }
}

fn format_child(out: &mut String, styler: &mut dyn Styler, key: &str, ty: &Type, wrap: bool) {
    if wrap {
        out.push_str(&styler.literal("("));
    }
    out.push_str(&styler.child(key, ty));
    if wrap {
        out.push_str(&styler.literal(")"));
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(&mut PlainStyler))
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

fn make(
    variant: Variant,
    name: String,
    children: Vec<(String, Child)>,
    members: Vec<Value>,
    recognize: Rc<dyn Fn(&Value) -> bool>,
) -> Type {
    Type(Rc::new(TypeInner {
        variant,
        name,
        children,
        members,
        recognize,
    }))
}

fn empty_extract() -> Extractor {
    Rc::new(|_| Vec::new())
}

/// A leaf type: membership is the predicate alone.
pub fn nullary(name: impl Into<String>, predicate: impl Fn(&Value) -> bool + 'static) -> Type {
    make(
        Variant::Nullary,
        name.into(),
        Vec::new(),
        Vec::new(),
        Rc::new(predicate),
    )
}

/// A one-slot container type closed over its element type.
pub fn unary(
    name: impl Into<String>,
    predicate: impl Fn(&Value) -> bool + 'static,
    extract: impl Fn(&Value) -> Vec<Value> + 'static,
    inner: Type,
) -> Type {
    make(
        Variant::Unary,
        name.into(),
        vec![(
            "$1".to_string(),
            Child {
                extract: Rc::new(extract),
                ty: inner,
            },
        )],
        Vec::new(),
        Rc::new(predicate),
    )
}

/// A two-slot container type closed over both element types.
pub fn binary(
    name: impl Into<String>,
    predicate: impl Fn(&Value) -> bool + 'static,
    extract1: impl Fn(&Value) -> Vec<Value> + 'static,
    extract2: impl Fn(&Value) -> Vec<Value> + 'static,
    first: Type,
    second: Type,
) -> Type {
    make(
        Variant::Binary,
        name.into(),
        vec![
            (
                "$1".to_string(),
                Child {
                    extract: Rc::new(extract1),
                    ty: first,
                },
            ),
            (
                "$2".to_string(),
                Child {
                    extract: Rc::new(extract2),
                    ty: second,
                },
            ),
        ],
        Vec::new(),
        Rc::new(predicate),
    )
}

/// Membership by deep equality against an explicit member list. An empty
/// name renders the members themselves: `("foo" | "bar")`.
pub fn enum_type(name: impl Into<String>, members: Vec<Value>) -> Type {
    let table = members.clone();
    make(
        Variant::Enum,
        name.into(),
        Vec::new(),
        members,
        Rc::new(move |value| table.iter().any(|member| member == value)),
    )
}

/// A structural record type. Fields display in sorted key order; membership
/// requires every declared key to be present (extra keys are allowed).
///
/// Duplicate field names are a construction error.
pub fn record(fields: Vec<(String, Type)>) -> Result<Type, TypeError> {
    let mut sorted = fields;
    sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(TypeError::new(
                ErrorKind::MalformedType,
                format!("record field {} is declared more than once", sigil_diag::q(&pair[0].0)),
            ));
        }
    }
    let keys: Vec<String> = sorted.iter().map(|(k, _)| k.clone()).collect();
    let children = sorted
        .into_iter()
        .map(|(key, ty)| {
            let field = key.clone();
            (
                key,
                Child {
                    extract: Rc::new(move |value: &Value| {
                        value.field(&field).map(|v| vec![v.clone()]).unwrap_or_default()
                    }),
                    ty,
                },
            )
        })
        .collect();
    Ok(make(
        Variant::Record,
        String::new(),
        children,
        Vec::new(),
        Rc::new(move |value| keys.iter().all(|k| value.field(k).is_some())),
    ))
}

/// A function type: the last element is the return type. Slots are opaque to
/// structural recursion (empty extractors); argument and return checking
/// happens at call time through the dispatch layer.
pub fn function(types: Vec<Type>) -> Type {
    debug_assert!(types.len() >= 2, "function types need a parameter and a return type");
    let children = types
        .into_iter()
        .enumerate()
        .map(|(i, ty)| {
            (
                format!("${}", i + 1),
                Child {
                    extract: empty_extract(),
                    ty,
                },
            )
        })
        .collect();
    make(
        Variant::Function,
        String::new(),
        children,
        Vec::new(),
        Rc::new(|value: &Value| value.is_callable()),
    )
}

/// A type variable: recognises anything, constrains through the solver.
pub fn type_var(name: impl Into<String>) -> Type {
    make(
        Variant::Variable,
        name.into(),
        Vec::new(),
        Vec::new(),
        Rc::new(|_| true),
    )
}

/// A unary type variable (`f a`). The inner shape is displayed but not
/// observed: the slot's extractor is empty.
pub fn unary_type_var(name: impl Into<String>, inner: Type) -> Type {
    make(
        Variant::Variable,
        name.into(),
        vec![(
            "$1".to_string(),
            Child {
                extract: empty_extract(),
                ty: inner,
            },
        )],
        Vec::new(),
        Rc::new(|_| true),
    )
}

/// A binary type variable (`p a b`).
pub fn binary_type_var(name: impl Into<String>, first: Type, second: Type) -> Type {
    make(
        Variant::Variable,
        name.into(),
        vec![
            (
                "$1".to_string(),
                Child {
                    extract: empty_extract(),
                    ty: first,
                },
            ),
            (
                "$2".to_string(),
                Child {
                    extract: empty_extract(),
                    ty: second,
                },
            ),
        ],
        Vec::new(),
        Rc::new(|_| true),
    )
}

/// The "no information" sentinel: every value is a member. Printed `???`.
pub fn unknown() -> Type {
    make(
        Variant::Unknown,
        String::new(),
        Vec::new(),
        Vec::new(),
        Rc::new(|_| true),
    )
}

/// The "no consistent type" sentinel used by loose inference. No value is a
/// member. Printed `???`.
pub fn inconsistent() -> Type {
    make(
        Variant::Inconsistent,
        String::new(),
        Vec::new(),
        Vec::new(),
        Rc::new(|_| false),
    )
}

// ---------------------------------------------------------------------------
// Type classes and signatures
// ---------------------------------------------------------------------------

/// An external type class: a name plus a membership predicate. All the
/// engine ever asks of one.
#[derive(Clone)]
pub struct TypeClass {
    name: String,
    test: Rc<dyn Fn(&Value) -> bool>,
}

impl TypeClass {
    pub fn new(name: impl Into<String>, test: impl Fn(&Value) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            test: Rc::new(test),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.test)(value)
    }
}

impl fmt::Debug for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeClass({})", self.name)
    }
}

/// One signature: display name, per-variable type-class constraints, and
/// the curried parameter list (the last element is the return type).
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub constraints: BTreeMap<String, Vec<TypeClass>>,
    pub types: Vec<Type>,
}

impl TypeInfo {
    pub fn new(
        name: impl Into<String>,
        constraints: BTreeMap<String, Vec<TypeClass>>,
        types: Vec<Type>,
    ) -> Self {
        Self {
            name: name.into(),
            constraints,
            types,
        }
    }

    /// Number of parameters the signature declares.
    pub fn param_count(&self) -> usize {
        self.types.len().saturating_sub(1)
    }

    pub fn return_type(&self) -> &Type {
        self.types.last().expect("signatures carry a return type")
    }
}
