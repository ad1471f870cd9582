//! End-to-end tests for the engine surface: definition, curried dispatch,
//! placeholder slots, callback wrapping, and the error taxonomy.

use std::collections::BTreeMap;

use sigil::{
    __, create, enum_type, function, integer, nonzero_integer, nullable, number, record, type_var,
    unary_type_var, Def, ErrorKind, Options, TypeClass, TypedFunction, Value,
};

fn engine() -> Def {
    create(Options::default())
}

fn n(x: f64) -> Value {
    Value::from(x)
}

fn no_constraints() -> BTreeMap<String, Vec<TypeClass>> {
    BTreeMap::new()
}

fn add() -> TypedFunction {
    engine()
        .def(
            "add",
            no_constraints(),
            vec![number(), number(), number()],
            |args| {
                let x = args[0].as_number().expect("checked by the signature");
                let y = args[1].as_number().expect("checked by the signature");
                Ok(Value::from(x + y))
            },
        )
        .expect("well-formed signature")
}

// ---------------------------------------------------------------------------
// Application and arity
// ---------------------------------------------------------------------------

#[test]
fn saturated_application_runs_the_implementation() {
    assert_eq!(add().call(&[n(2.0), n(2.0)]).unwrap(), n(4.0));
}

#[test]
fn over_application_is_a_wrong_arity_error() {
    let err = add().call(&[n(2.0), n(2.0), n(2.0)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongArity);
    assert!(err.to_string().contains("received three arguments"));
}

#[test]
fn under_application_returns_a_curried_callable() {
    let add = add();
    let partial = add.call(&[n(40.0)]).unwrap();
    let partial = partial.as_function().expect("curried callable").clone();
    assert_eq!(partial.call(&[n(2.0)]).unwrap(), n(42.0));
}

#[test]
fn placeholders_leave_their_slot_open() {
    let add = add();
    let partial = add.call(&[__(), n(2.0)]).unwrap();
    let partial = partial.as_function().expect("curried callable").clone();
    assert_eq!(partial.call(&[n(40.0)]).unwrap(), n(42.0));
}

#[test]
fn zero_argument_application_preserves_state() {
    let add = add();
    let same = add.call(&[]).unwrap();
    let same = same.as_function().expect("curried callable").clone();
    let once = same.call(&[n(2.0)]).unwrap();
    let once = once.as_function().expect("curried callable").clone();
    assert_eq!(once.call(&[n(2.0)]).unwrap(), n(4.0));
}

#[test]
fn partially_applied_callables_are_reusable() {
    let add = add();
    let plus_one = add.call(&[n(1.0)]).unwrap();
    let plus_one = plus_one.as_function().expect("curried callable").clone();
    assert_eq!(plus_one.call(&[n(2.0)]).unwrap(), n(3.0));
    assert_eq!(plus_one.call(&[n(9.0)]).unwrap(), n(10.0));
}

#[test]
fn callables_print_their_signature() {
    let add = add();
    assert_eq!(add.to_string(), "add :: Number -> Number -> Number");
    let partial = add.call(&[n(1.0)]).unwrap();
    assert_eq!(partial.to_string(), "add :: Number -> Number -> Number");
}

// ---------------------------------------------------------------------------
// Structural membership
// ---------------------------------------------------------------------------

#[test]
fn invalid_arguments_are_rejected_at_arrival() {
    let err = add().call(&[Value::str("2"), Value::str("2")]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidValue);
    let message = err.to_string();
    assert!(message.contains("\"2\" :: String"));
    assert!(message.contains("not a member of \u{2018}Number\u{2019}"));
}

#[test]
fn integer_refinements_reject_at_the_right_slot() {
    let rem = engine()
        .def(
            "rem",
            no_constraints(),
            vec![integer(), nonzero_integer(), integer()],
            |args| {
                let x = args[0].as_number().expect("checked by the signature");
                let y = args[1].as_number().expect("checked by the signature");
                Ok(Value::from(x % y))
            },
        )
        .expect("well-formed signature");

    assert_eq!(rem.call(&[n(42.0), n(5.0)]).unwrap(), n(2.0));

    let err = rem.call(&[n(0.5), n(3.0)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidValue);
    assert!(err.to_string().contains("0.5 :: Number"));
    assert!(err.to_string().contains("\u{2018}Integer\u{2019}"));

    let err = rem.call(&[n(42.0), n(0.0)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidValue);
    assert!(err.to_string().contains("\u{2018}NonZeroInteger\u{2019}"));
}

#[test]
fn return_values_are_validated() {
    let bad = engine()
        .def("bad", no_constraints(), vec![number(), number()], |_| {
            Ok(Value::str("x"))
        })
        .expect("well-formed signature");
    let err = bad.call(&[n(1.0)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidValue);
    assert!(err.to_string().contains("not a member of \u{2018}Number\u{2019}"));
}

#[test]
fn record_signatures_validate_fields() {
    let point = record(vec![
        ("x".to_string(), number()),
        ("y".to_string(), number()),
    ])
    .expect("distinct fields");
    let norm = engine()
        .def("norm", no_constraints(), vec![point, number()], |args| {
            let x = args[0].field("x").and_then(Value::as_number).expect("checked");
            let y = args[0].field("y").and_then(Value::as_number).expect("checked");
            Ok(Value::from((x * x + y * y).sqrt()))
        })
        .expect("well-formed signature");

    let ok = Value::record([
        ("x".to_string(), n(3.0)),
        ("y".to_string(), n(4.0)),
    ]);
    assert_eq!(norm.call(&[ok]).unwrap(), n(5.0));

    let missing = Value::record([("x".to_string(), n(3.0))]);
    assert_eq!(
        norm.call(&[missing]).unwrap_err().kind,
        ErrorKind::InvalidValue
    );

    let wrong = Value::record([
        ("x".to_string(), n(3.0)),
        ("y".to_string(), Value::str("4")),
    ]);
    assert_eq!(
        norm.call(&[wrong]).unwrap_err().kind,
        ErrorKind::InvalidValue
    );
}

#[test]
fn enum_signatures_use_deep_equality() {
    let direction = enum_type("", vec![Value::str("asc"), Value::str("desc")]);
    let sign = engine()
        .def("sign", no_constraints(), vec![direction, number()], |args| {
            Ok(Value::from(if args[0] == Value::str("asc") { 1.0 } else { -1.0 }))
        })
        .expect("well-formed signature");
    assert_eq!(sign.call(&[Value::str("asc")]).unwrap(), n(1.0));
    assert_eq!(sign.call(&[Value::str("desc")]).unwrap(), n(-1.0));
    assert_eq!(
        sign.call(&[Value::str("up")]).unwrap_err().kind,
        ErrorKind::InvalidValue
    );
}

#[test]
fn nullable_parameters_accept_null_and_members() {
    let or_zero = engine()
        .def(
            "orZero",
            no_constraints(),
            vec![nullable(number()), number()],
            |args| {
                Ok(match &args[0] {
                    Value::Null => n(0.0),
                    other => other.clone(),
                })
            },
        )
        .expect("well-formed signature");
    assert_eq!(or_zero.call(&[Value::Null]).unwrap(), n(0.0));
    assert_eq!(or_zero.call(&[n(7.0)]).unwrap(), n(7.0));
    assert_eq!(
        or_zero.call(&[Value::str("x")]).unwrap_err().kind,
        ErrorKind::InvalidValue
    );
}

// ---------------------------------------------------------------------------
// Type variables
// ---------------------------------------------------------------------------

#[test]
fn identity_is_polymorphic() {
    let id = engine()
        .def(
            "id",
            no_constraints(),
            vec![type_var("a"), type_var("a")],
            |args| Ok(args[0].clone()),
        )
        .expect("well-formed signature");
    assert_eq!(id.call(&[n(42.0)]).unwrap(), n(42.0));
    assert_eq!(id.call(&[Value::Null]).unwrap(), Value::Null);
}

#[test]
fn type_variables_must_be_consistent_across_positions() {
    let cmp = engine()
        .def(
            "cmp",
            no_constraints(),
            vec![type_var("a"), type_var("a"), number()],
            |_| Ok(n(0.0)),
        )
        .expect("well-formed signature");
    assert_eq!(cmp.call(&[n(0.0), n(1.0)]).unwrap(), n(0.0));

    let err = cmp.call(&[n(0.0), Value::str("1")]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::VarConstraintViolation);
    let message = err.to_string();
    assert!(message.contains("0 :: Number"));
    assert!(message.contains("\"1\" :: String"));
}

#[test]
fn type_class_constraints_gate_variables() {
    let semigroup = TypeClass::new("Semigroup", |v| {
        matches!(v, Value::Array(_) | Value::Str(_))
    });
    let mut constraints = BTreeMap::new();
    constraints.insert("a".to_string(), vec![semigroup]);
    let concat = engine()
        .def(
            "concat",
            constraints,
            vec![type_var("a"), type_var("a"), type_var("a")],
            |args| match (&args[0], &args[1]) {
                (Value::Array(left), Value::Array(right)) => Ok(Value::array(
                    left.iter().chain(right.iter()).cloned().collect::<Vec<_>>(),
                )),
                (Value::Str(left), Value::Str(right)) => Ok(Value::str(format!("{left}{right}"))),
                _ => Ok(Value::Null),
            },
        )
        .expect("well-formed signature");

    assert_eq!(
        concat
            .call(&[
                Value::array(vec![n(1.0), n(2.0)]),
                Value::array(vec![n(3.0), n(4.0)]),
            ])
            .unwrap(),
        Value::array(vec![n(1.0), n(2.0), n(3.0), n(4.0)])
    );
    assert_eq!(
        concat
            .call(&[Value::str("ab"), Value::str("cd")])
            .unwrap(),
        Value::str("abcd")
    );

    let err = concat.call(&[Value::record([]), Value::record([])]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClassConstraintViolation);
    assert!(err.to_string().contains("Semigroup"));
}

#[test]
fn functor_mapping_with_a_wrapped_callback() {
    let functor = TypeClass::new("Functor", |v| matches!(v, Value::Array(_)));
    let mut constraints = BTreeMap::new();
    constraints.insert("f".to_string(), vec![functor]);
    let a = type_var("a");
    let b = type_var("b");
    let map = engine()
        .def(
            "map",
            constraints,
            vec![
                function(vec![a.clone(), b.clone()]),
                unary_type_var("f", a),
                unary_type_var("f", b),
            ],
            |args| {
                let f = args[0].as_function().expect("checked by the signature").clone();
                let items = args[1].as_array().expect("arrays implement Functor").to_vec();
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(f.call(std::slice::from_ref(item))?);
                }
                Ok(Value::array(out))
            },
        )
        .expect("well-formed signature");

    let inc = Value::function("inc", 1, |args| {
        Ok(Value::from(args[0].as_number().unwrap_or(0.0) + 1.0))
    });
    assert_eq!(
        map.call(&[inc.clone(), Value::array(vec![n(1.0), n(2.0), n(3.0)])])
            .unwrap(),
        Value::array(vec![n(2.0), n(3.0), n(4.0)])
    );

    let err = map.call(&[inc, Value::str("abc")]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClassConstraintViolation);
    assert!(err.to_string().contains("Functor"));
}

// ---------------------------------------------------------------------------
// Wrapped callbacks
// ---------------------------------------------------------------------------

#[test]
fn wrapped_callbacks_check_their_arity() {
    let apply = engine()
        .def(
            "apply",
            no_constraints(),
            vec![function(vec![number(), number()]), number(), number()],
            |args| {
                let f = args[0].as_function().expect("checked by the signature").clone();
                f.call(&[args[1].clone(), args[1].clone()])
            },
        )
        .expect("well-formed signature");
    let double = Value::function("double", 1, |args| {
        Ok(Value::from(args[0].as_number().unwrap_or(0.0) * 2.0))
    });
    let err = apply.call(&[double, n(3.0)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongArity);
    assert!(err
        .to_string()
        .contains("expected one argument but received two arguments"));
}

#[test]
fn callbacks_share_variable_bindings_with_the_frame() {
    let a = type_var("a");
    let twice = engine()
        .def(
            "twice",
            no_constraints(),
            vec![function(vec![a.clone(), a.clone()]), a.clone(), a],
            |args| {
                let f = args[0].as_function().expect("checked by the signature").clone();
                let once = f.call(&[args[1].clone()])?;
                f.call(&[once])
            },
        )
        .expect("well-formed signature");

    let inc = Value::function("inc", 1, |args| {
        Ok(Value::from(args[0].as_number().unwrap_or(0.0) + 1.0))
    });
    assert_eq!(twice.call(&[inc, n(40.0)]).unwrap(), n(42.0));

    // A callback whose result contradicts the binding established by the
    // outer argument is caught at the call site inside the implementation.
    let stringify = Value::function("stringify", 1, |args| Ok(Value::str(args[0].to_string())));
    let err = twice.call(&[stringify, n(1.0)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::VarConstraintViolation);
}

// ---------------------------------------------------------------------------
// Definition-time checks and the toggle
// ---------------------------------------------------------------------------

#[test]
fn definitions_cap_at_nine_parameters() {
    let err = engine()
        .def("big", no_constraints(), vec![number(); 11], |_| Ok(Value::Null))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArityRange);

    assert!(engine()
        .def("nine", no_constraints(), vec![number(); 10], |_| Ok(n(0.0)))
        .is_ok());
}

#[test]
fn empty_signatures_are_malformed() {
    let err = engine()
        .def("nothing", no_constraints(), Vec::new(), |_| Ok(Value::Null))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedType);
}

#[test]
fn disabled_checking_curries_without_validation() {
    let def = create(Options {
        check_types: false,
        env: sigil::env(),
    });
    let first = def
        .def(
            "first",
            no_constraints(),
            vec![number(), number(), number()],
            |args| Ok(args[0].clone()),
        )
        .expect("well-formed signature");

    let partial = first.call(&[Value::str("not a number")]).unwrap();
    let partial = partial.as_function().expect("curried callable").clone();
    assert_eq!(
        partial.call(&[Value::str("y")]).unwrap(),
        Value::str("not a number")
    );
}
