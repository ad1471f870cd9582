//! Run-time type checking for curried functions over a dynamic value
//! universe.
//!
//! Declare a signature (nullary types, parameterised types, type variables,
//! type-class constraints, enums, records, function types) and get back a
//! callable that enforces it as arguments arrive, with pointer-accurate
//! multi-line diagnostics when enforcement fails.
//!
//! ```
//! use std::collections::BTreeMap;
//! use sigil::{create, number, Options, Value};
//!
//! let def = create(Options::default());
//! let add = def
//!     .def("add", BTreeMap::new(), vec![number(), number(), number()], |args| {
//!         let x = args[0].as_number().expect("checked");
//!         let y = args[1].as_number().expect("checked");
//!         Ok(Value::from(x + y))
//!     })
//!     .expect("well-formed signature");
//!
//! assert_eq!(add.call(&[Value::from(2.0), Value::from(2.0)]).unwrap(), Value::from(4.0));
//! assert!(add.call(&[Value::str("2"), Value::str("2")]).is_err());
//! ```

mod catalog;
mod dispatch;

use std::collections::BTreeMap;
use std::rc::Rc;

pub use catalog::{
    any, any_function, array, boolean, env, finite_number, integer, negative_number,
    nonnegative_integer, nonzero_finite_number, nonzero_integer, null, nullable, number, object,
    pair, positive_number, str_map, string, valid_number,
};
pub use dispatch::TypedFunction;
pub use sigil_diag::{ErrorKind, TypeError};
pub use sigil_infer::{
    determine_actual_types_loose, determine_actual_types_strict, test, TypeVarMap,
};
pub use sigil_types::{
    binary, binary_type_var, enum_type, function, inconsistent, nullary, record, type_var, unary,
    unary_type_var, unknown, Type, TypeClass, TypeInfo,
};
pub use sigil_value::{FnValue, Value};

/// The partial-application placeholder.
#[allow(non_snake_case)]
pub fn __() -> Value {
    Value::placeholder()
}

/// Engine configuration: the environment inference draws from, and whether
/// checking is on at all.
pub struct Options {
    pub check_types: bool,
    pub env: Vec<Type>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            check_types: true,
            env: catalog::env(),
        }
    }
}

/// Binds an environment and the type-checking toggle; hands out typed
/// callables.
#[derive(Clone)]
pub struct Def {
    env: Rc<Vec<Type>>,
    check_types: bool,
}

/// Bind an environment and a checking toggle.
pub fn create(options: Options) -> Def {
    Def {
        env: Rc::new(options.env),
        check_types: options.check_types,
    }
}

impl Def {
    /// Wrap `implementation` in a curried callable enforcing the signature.
    ///
    /// `types` is the curried parameter list; its last element is the
    /// return type. At most nine parameters are supported. With checking
    /// disabled the callable curries without solver activity.
    pub fn def(
        &self,
        name: &str,
        constraints: BTreeMap<String, Vec<TypeClass>>,
        types: Vec<Type>,
        implementation: impl Fn(&[Value]) -> Result<Value, TypeError> + 'static,
    ) -> Result<TypedFunction, TypeError> {
        if types.is_empty() {
            return Err(TypeError::new(
                ErrorKind::MalformedType,
                format!(
                    "Malformed type\n\n{} was declared without a return type.",
                    sigil_diag::q(name)
                ),
            ));
        }
        let params = types.len() - 1;
        if params > 9 {
            return Err(sigil_infer::report::arity_range(name, params));
        }
        let info = TypeInfo::new(name, constraints, types);
        Ok(TypedFunction::new(
            Rc::new(info),
            Rc::clone(&self.env),
            self.check_types,
            Rc::new(implementation),
        ))
    }
}
