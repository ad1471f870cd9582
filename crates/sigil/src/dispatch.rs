//! Curried dispatch: feeding arguments into the solver as they arrive.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use sigil_diag::TypeError;
use sigil_infer::{report, satisfactory_types, TypeVarMap};
use sigil_types::{Type, TypeInfo, Variant};
use sigil_value::Value;

/// The untyped implementation a signature wraps.
pub type Impl = Rc<dyn Fn(&[Value]) -> Result<Value, TypeError>>;

/// A typed callable: a signature plus an implementation, applied one or
/// more positional arguments at a time.
///
/// State is immutable; each partial application produces a fresh callable
/// carrying the stored arguments and the advanced type-variable map, so a
/// retained callable can be re-applied along independent branches.
#[derive(Clone)]
pub struct TypedFunction {
    inner: Rc<State>,
}

struct State {
    info: Rc<TypeInfo>,
    env: Rc<Vec<Type>>,
    check_types: bool,
    implementation: Impl,
    /// One slot per parameter; `None` is still open.
    values: Vec<Option<Value>>,
    type_var_map: TypeVarMap,
}

impl TypedFunction {
    pub(crate) fn new(
        info: Rc<TypeInfo>,
        env: Rc<Vec<Type>>,
        check_types: bool,
        implementation: Impl,
    ) -> Self {
        let slots = info.param_count();
        Self {
            inner: Rc::new(State {
                info,
                env,
                check_types,
                implementation,
                values: vec![None; slots],
                type_var_map: TypeVarMap::new(),
            }),
        }
    }

    /// The printed signature; also the repr of every value this callable
    /// turns into.
    pub fn signature(&self) -> String {
        report::signature_repr(&self.inner.info)
    }

    /// Number of still-open parameter slots.
    pub fn remaining(&self) -> usize {
        self.inner.values.iter().filter(|v| v.is_none()).count()
    }

    /// Apply positional arguments. The placeholder leaves its slot open.
    ///
    /// Returns the implementation's (validated) result once every slot is
    /// filled, or a function value carrying the advanced state otherwise.
    /// Supplying more arguments than there are open slots is an error.
    pub fn call(&self, args: &[Value]) -> Result<Value, TypeError> {
        let state = &self.inner;
        let open: Vec<usize> = state
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.is_none().then_some(i))
            .collect();
        if args.len() > open.len() {
            return Err(report::too_many_args(&state.info, open.len(), args.len()));
        }

        let mut values = state.values.clone();
        let mut map = state.type_var_map.clone();
        for (&slot, arg) in open.iter().zip(args) {
            if arg.is_placeholder() {
                continue;
            }
            if state.check_types {
                let result = satisfactory_types(
                    &state.env,
                    &state.info,
                    &map,
                    &state.info.types[slot],
                    slot,
                    &Vec::new(),
                    std::slice::from_ref(arg),
                );
                match result {
                    Ok(ok) => map = ok.type_var_map,
                    Err(violation) => {
                        return Err(report::realize(&state.env, &state.info, &violation))
                    }
                }
            }
            values[slot] = Some(arg.clone());
        }

        if values.iter().any(Option::is_none) {
            return Ok(self.advance(values, map).to_value());
        }
        self.invoke(values, map)
    }

    /// This callable as an ordinary function value.
    pub fn to_value(&self) -> Value {
        let this = self.clone();
        Value::function(self.signature(), self.remaining(), move |args| {
            this.call(args)
        })
    }

    fn advance(&self, values: Vec<Option<Value>>, type_var_map: TypeVarMap) -> TypedFunction {
        let state = &self.inner;
        TypedFunction {
            inner: Rc::new(State {
                info: Rc::clone(&state.info),
                env: Rc::clone(&state.env),
                check_types: state.check_types,
                implementation: Rc::clone(&state.implementation),
                values,
                type_var_map,
            }),
        }
    }

    fn invoke(&self, values: Vec<Option<Value>>, map: TypeVarMap) -> Result<Value, TypeError> {
        let state = &self.inner;
        let args: Vec<Value> = values
            .into_iter()
            .map(|v| v.expect("all slots are filled"))
            .collect();
        if !state.check_types {
            return (state.implementation)(&args);
        }

        // Function-typed arguments validate at call time under the frame's
        // map, so variables bind across the outer signature and the
        // callback. The cell lives exactly as long as this call.
        let shared = Rc::new(RefCell::new(map));
        let wrapped: Vec<Value> = args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                if state.info.types[i].variant() == Variant::Function {
                    wrap_callback(
                        Rc::clone(&state.info),
                        Rc::clone(&state.env),
                        i,
                        Rc::clone(&shared),
                        arg.clone(),
                    )
                } else {
                    arg.clone()
                }
            })
            .collect();

        let result = (state.implementation)(&wrapped)?;

        let ret_index = state.info.types.len() - 1;
        let final_map = shared.borrow().clone();
        let checked = satisfactory_types(
            &state.env,
            &state.info,
            &final_map,
            &state.info.types[ret_index],
            ret_index,
            &Vec::new(),
            std::slice::from_ref(&result),
        );
        match checked {
            Ok(_) => Ok(result),
            Err(violation) => Err(report::realize(&state.env, &state.info, &violation)),
        }
    }
}

impl fmt::Display for TypedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

impl fmt::Debug for TypedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedFunction({})", self.signature())
    }
}

/// Wrap a function-typed argument so user code invoking it checks argument
/// count, validates every argument against the declared parameter types
/// under the shared map, and validates the result.
fn wrap_callback(
    info: Rc<TypeInfo>,
    env: Rc<Vec<Type>>,
    index: usize,
    shared: Rc<RefCell<TypeVarMap>>,
    value: Value,
) -> Value {
    let Some(callback) = value.as_function().cloned() else {
        return value;
    };
    let declared = &info.types[index];
    let slots: Vec<(String, Type)> = declared
        .children()
        .map(|(key, child)| (key.to_string(), child.ty.clone()))
        .collect();
    let param_count = slots.len() - 1;
    let repr = callback.repr().to_string();

    Value::function(repr, param_count, move |args| {
        if args.len() != param_count {
            return Err(report::callback_arity(&info, index, param_count, args));
        }
        for (arg, (key, ty)) in args.iter().zip(&slots) {
            let map = shared.borrow().clone();
            let result = satisfactory_types(
                &env,
                &info,
                &map,
                ty,
                index,
                &vec![key.clone()],
                std::slice::from_ref(arg),
            );
            match result {
                Ok(ok) => *shared.borrow_mut() = ok.type_var_map,
                Err(violation) => return Err(report::realize(&env, &info, &violation)),
            }
        }

        let result = callback.call(args)?;

        let (ret_key, ret_ty) = slots.last().expect("function types carry a return slot");
        let map = shared.borrow().clone();
        let checked = satisfactory_types(
            &env,
            &info,
            &map,
            ret_ty,
            index,
            &vec![ret_key.clone()],
            std::slice::from_ref(&result),
        );
        match checked {
            Ok(ok) => {
                *shared.borrow_mut() = ok.type_var_map;
                Ok(result)
            }
            Err(violation) => Err(report::realize(&env, &info, &violation)),
        }
    })
}
