//! Rendered-banner corpus: the exact text of each diagnostic shape.
//!
//! Banners are part of the public contract (callers snapshot-test against
//! them), so these tests pin the full output, not fragments.

use std::collections::BTreeMap;

use insta::assert_snapshot;
use sigil::{
    array, create, function, number, type_var, unary_type_var, Def, Options, TypeClass,
    TypedFunction, Value,
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

#[test]
fn invalid_value_underlines_the_parameter() {
    let err = add().call(&[Value::str("2"), Value::str("2")]).unwrap_err();
    assert_snapshot!(err.to_string(), @r#"
    Invalid value

    add :: Number -> Number -> Number
           ^^^^^^
             1

    1)  "2" :: String

    The value at position 1 is not a member of ‘Number’.
    "#);
}

#[test]
fn invalid_value_underlines_the_inner_path() {
    let sum = engine()
        .def("sum", no_constraints(), vec![array(number()), number()], |args| {
            let total = args[0]
                .as_array()
                .expect("checked by the signature")
                .iter()
                .filter_map(Value::as_number)
                .sum::<f64>();
            Ok(Value::from(total))
        })
        .expect("well-formed signature");
    let err = sum
        .call(&[Value::array(vec![n(1.0), Value::str("x")])])
        .unwrap_err();
    assert_snapshot!(err.to_string(), @r#"
    Invalid value

    sum :: Array Number -> Number
                 ^^^^^^
                   1

    1)  "x" :: String

    The value at position 1 is not a member of ‘Number’.
    "#);
}

#[test]
fn invalid_return_value_underlines_the_return_type() {
    let bad = engine()
        .def("bad", no_constraints(), vec![number(), number()], |_| {
            Ok(Value::str("x"))
        })
        .expect("well-formed signature");
    let err = bad.call(&[n(1.0)]).unwrap_err();
    assert_snapshot!(err.to_string(), @r#"
    Invalid value

    bad :: Number -> Number
                     ^^^^^^
                       1

    1)  "x" :: String

    The value at position 1 is not a member of ‘Number’.
    "#);
}

#[test]
fn var_violation_underlines_incompatible_positions() {
    let cmp = engine()
        .def(
            "cmp",
            no_constraints(),
            vec![type_var("a"), type_var("a"), number()],
            |_| Ok(n(0.0)),
        )
        .expect("well-formed signature");
    let err = cmp.call(&[n(0.0), Value::str("1")]).unwrap_err();
    assert_snapshot!(err.to_string(), @r#"
    Type-variable constraint violation

    cmp :: a -> a -> Number
           ^    ^
           1    2

    1)  0 :: Number

    2)  "1" :: String

    Since there is no type of which all the above values are members, the type-variable constraint has been violated.
    "#);
}

#[test]
fn class_violation_underlines_the_constraint_and_the_position() {
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
            |args| Ok(args[0].clone()),
        )
        .expect("well-formed signature");
    let err = concat
        .call(&[Value::record([]), Value::record([])])
        .unwrap_err();
    assert_snapshot!(err.to_string(), @r#"
    Type-class constraint violation

    concat :: Semigroup a => a -> a -> a
              ^^^^^^^^^^^    ^
                             1

    1)  {} :: Object, StrMap ???

    ‘concat’ requires ‘a’ to satisfy the Semigroup type-class constraint; the value at position 1 does not.
    "#);
}

#[test]
fn class_violation_on_a_parameterised_variable() {
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
            |args| Ok(args[1].clone()),
        )
        .expect("well-formed signature");
    let inc = Value::function("inc", 1, |args| Ok(args[0].clone()));
    let err = map.call(&[inc, Value::str("abc")]).unwrap_err();
    assert_snapshot!(err.to_string(), @r#"
    Type-class constraint violation

    map :: Functor f => (a -> b) -> f a -> f b
           ^^^^^^^^^                ^^^
                                     1

    1)  "abc" :: String

    ‘map’ requires ‘f’ to satisfy the Functor type-class constraint; the value at position 1 does not.
    "#);
}

#[test]
fn over_application_renders_without_carets() {
    let err = add().call(&[n(2.0), n(2.0), n(2.0)]).unwrap_err();
    assert_snapshot!(err.to_string(), @r"
    Function applied to the wrong number of arguments

    add :: Number -> Number -> Number

    ‘add’ expected at most two arguments but received three arguments.
    ");
}

#[test]
fn callback_arity_underlines_the_callback_slot() {
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
    let double = Value::function("double", 1, |args| Ok(args[0].clone()));
    let err = apply.call(&[double, n(3.0)]).unwrap_err();
    assert_snapshot!(err.to_string(), @r"
    Function applied to the wrong number of arguments

    apply :: (Number -> Number) -> Number -> Number
              ^^^^^^^^^^^^^^^^
                     1

    1)  3, 3

    ‘Number -> Number’ expected one argument but received two arguments.
    ");
}
