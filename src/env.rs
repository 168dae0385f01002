//! Enclosing-scope layer
//!
//! An [`Environment`] holds the named values and callables a clause may read
//! besides the function's own parameters. It is a shared handle: clones see
//! the same entries, and every evaluation reads the entries as they are at
//! that moment.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::EvalError;
use crate::value::Value;

/// A callable visible to clauses, e.g. `is_prime(n)`.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

#[derive(Default)]
struct Layer {
    values: BTreeMap<String, Value>,
    functions: BTreeMap<String, NativeFn>,
}

/// Named values and callables shared with clauses.
#[derive(Clone, Default)]
pub struct Environment {
    inner: Arc<RwLock<Layer>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Bind or rebind `name`.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        let mut layer = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        layer.values.insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let mut layer = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        layer.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let layer = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        layer.values.get(name).cloned()
    }

    /// Register a callable. Shadows a built-in of the same name.
    pub fn define_function<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        let mut layer = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        layer.functions.insert(name.into(), Arc::new(function));
    }

    pub fn function(&self, name: &str) -> Option<NativeFn> {
        let layer = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        layer.functions.get(name).cloned()
    }

    /// Every value and function name currently bound.
    pub fn names(&self) -> Vec<String> {
        let layer = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        layer
            .values
            .keys()
            .chain(layer.functions.keys())
            .cloned()
            .collect()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layer = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Environment")
            .field("values", &layer.values)
            .field("functions", &layer.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Built-in functions, always available after environment callables.
pub mod builtins {
    use super::*;

    pub const NAMES: &[&str] = &[
        "range",
        "len",
        "abs",
        "min",
        "max",
        "is_empty",
        "is_none",
        "is_some",
        "contains",
        "contains_key",
        "float",
        "int",
    ];

    pub fn is_builtin(name: &str) -> bool {
        NAMES.contains(&name)
    }

    /// Call built-in `name`. `None` if no such built-in exists.
    pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
        let result = match name {
            "range" => range(args),
            "len" => unary(name, args).and_then(|v| length(name, v).map(Value::Int)),
            "is_empty" => unary(name, args).and_then(|v| length(name, v).map(|n| Value::Bool(n == 0))),
            "abs" => unary(name, args).and_then(|v| match v {
                Value::Int(i) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::Overflow("abs".into())),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(bad_operand(name, other)),
            }),
            "min" | "max" => extremum(name, args),
            "is_none" => unary(name, args).map(|v| Value::Bool(matches!(v, Value::None))),
            "is_some" => unary(name, args).map(|v| Value::Bool(!matches!(v, Value::None))),
            "contains" => binary(name, args).and_then(|(c, e)| contains(c, e).map(Value::Bool)),
            "contains_key" => binary(name, args).and_then(|(m, k)| match (m, k) {
                (Value::Map(entries), Value::Str(key)) => Ok(Value::Bool(entries.contains_key(key))),
                (Value::Record { fields, .. }, Value::Str(key)) => {
                    Ok(Value::Bool(fields.contains_key(key)))
                }
                (m, k) => Err(mismatch(name, m, k)),
            }),
            "float" => unary(name, args).and_then(|v| {
                v.as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| bad_operand(name, v))
            }),
            "int" => unary(name, args).and_then(|v| match v {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                other => Err(bad_operand(name, other)),
            }),
            _ => return None,
        };
        Some(result)
    }

    /// Membership: ranges by numeric bounds, lists by loose equality, maps
    /// and records by key, strings by substring.
    pub fn contains(collection: &Value, element: &Value) -> Result<bool, EvalError> {
        match collection {
            Value::Range { start, end, inclusive } => {
                if !element.is_numeric() {
                    return Ok(false);
                }
                let above = match start {
                    Some(start) => bound_cmp(element, start)?.is_ge(),
                    None => true,
                };
                let below = match end {
                    Some(end) => {
                        let ord = bound_cmp(element, end)?;
                        if *inclusive {
                            ord.is_le()
                        } else {
                            ord.is_lt()
                        }
                    }
                    None => true,
                };
                Ok(above && below)
            }
            Value::List(items) => Ok(items.iter().any(|item| item.loosely_equals(element))),
            Value::Map(entries) => match element {
                Value::Str(key) => Ok(entries.contains_key(key)),
                _ => Ok(false),
            },
            Value::Str(haystack) => match element {
                Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
                other => Err(mismatch("contains", collection, other)),
            },
            other => Err(bad_operand("contains", other)),
        }
    }

    fn bound_cmp(element: &Value, bound: &Value) -> Result<std::cmp::Ordering, EvalError> {
        element
            .compare(bound)
            .ok_or_else(|| mismatch("contains", bound, element))
    }

    fn range(args: &[Value]) -> Result<Value, EvalError> {
        let ints = args
            .iter()
            .map(|a| a.as_int().ok_or_else(|| bad_operand("range", a)))
            .collect::<Result<Vec<_>, _>>()?;
        match ints.as_slice() {
            [end] => Ok(Value::range(0, *end)),
            [start, end] => Ok(Value::range(*start, *end)),
            _ => Err(EvalError::Arity {
                function: "range".into(),
                expected: "1 or 2".into(),
                got: args.len(),
            }),
        }
    }

    fn extremum(name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let items: &[Value] = match args {
            [Value::List(items)] => items,
            _ => args,
        };
        let mut best: Option<&Value> = None;
        for item in items {
            best = Some(match best {
                None => item,
                Some(current) => {
                    let ord = item
                        .compare(current)
                        .ok_or_else(|| mismatch(name, current, item))?;
                    let better = if name == "min" { ord.is_lt() } else { ord.is_gt() };
                    if better {
                        item
                    } else {
                        current
                    }
                }
            });
        }
        best.cloned().ok_or_else(|| EvalError::Arity {
            function: name.into(),
            expected: "at least 1".into(),
            got: 0,
        })
    }

    fn length(name: &str, value: &Value) -> Result<i64, EvalError> {
        let len = match value {
            Value::Str(s) => s.chars().count(),
            Value::List(items) => items.len(),
            Value::Map(entries) => entries.len(),
            other => return Err(bad_operand(name, other)),
        };
        i64::try_from(len).map_err(|_| EvalError::Overflow(name.into()))
    }

    fn unary<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, EvalError> {
        match args {
            [value] => Ok(value),
            _ => Err(EvalError::Arity {
                function: name.into(),
                expected: "1".into(),
                got: args.len(),
            }),
        }
    }

    fn binary<'a>(name: &str, args: &'a [Value]) -> Result<(&'a Value, &'a Value), EvalError> {
        match args {
            [a, b] => Ok((a, b)),
            _ => Err(EvalError::Arity {
                function: name.into(),
                expected: "2".into(),
                got: args.len(),
            }),
        }
    }

    fn bad_operand(op: &str, operand: &Value) -> EvalError {
        EvalError::BadOperand {
            op: op.into(),
            operand: operand.type_name().into(),
        }
    }

    fn mismatch(op: &str, left: &Value, right: &Value) -> EvalError {
        EvalError::TypeMismatch {
            op: op.into(),
            left: left.type_name().into(),
            right: right.type_name().into(),
        }
    }
}
