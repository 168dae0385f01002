//! Clause evaluator
//!
//! Evaluates a compiled [`Expr`] against a [`Scope`]: the call's local
//! bindings first, then the environment, then built-ins for calls.

use std::cmp::Ordering;

use crate::binding::Bindings;
use crate::env::{builtins, Environment};
use crate::error::EvalError;
use crate::translator::ast::{BinaryOp, CompareOp, Expr, LogicalOp, UnaryOp};
use crate::value::Value;

/// Two-layer name resolution for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    locals: &'a Bindings,
    globals: Option<&'a Environment>,
}

impl<'a> Scope<'a> {
    pub fn new(locals: &'a Bindings, globals: &'a Environment) -> Self {
        Scope {
            locals,
            globals: Some(globals),
        }
    }

    /// Locals only; used for decoration-time constant folding.
    pub fn locals_only(locals: &'a Bindings) -> Self {
        Scope {
            locals,
            globals: None,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.locals
            .get(name)
            .cloned()
            .or_else(|| self.globals.and_then(|env| env.get(name)))
    }

    fn call(&self, function: &str, args: &[Value]) -> Result<Value, EvalError> {
        if let Some(native) = self.globals.and_then(|env| env.function(function)) {
            return native(args);
        }
        builtins::call(function, args)
            .unwrap_or_else(|| Err(EvalError::UnknownFunction(function.to_string())))
    }
}

/// Evaluate `expr` to a value.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => scope
            .lookup(name)
            .ok_or_else(|| EvalError::UnboundName(name.clone())),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, scope)?;
            evaluate_unary(*op, value)
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            evaluate_binary(*op, &left, &right)
        }
        Expr::Compare { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            evaluate_compare(*op, &left, &right).map(Value::Bool)
        }
        Expr::Logical { op, left, right } => {
            let left = expect_bool(op_name(*op), evaluate(left, scope)?)?;
            match (op, left) {
                (LogicalOp::And, false) => Ok(Value::Bool(false)),
                (LogicalOp::Or, true) => Ok(Value::Bool(true)),
                _ => expect_bool(op_name(*op), evaluate(right, scope)?).map(Value::Bool),
            }
        }
        Expr::Contains { collection, element } => {
            let collection = evaluate(collection, scope)?;
            let element = evaluate(element, scope)?;
            builtins::contains(&collection, &element).map(Value::Bool)
        }
        Expr::Field { base, field } => match evaluate(base, scope)? {
            Value::Record { type_name, fields } => {
                fields
                    .get(field)
                    .cloned()
                    .ok_or_else(|| EvalError::UnknownField {
                        type_name,
                        field: field.clone(),
                    })
            }
            Value::Map(entries) => entries
                .get(field)
                .cloned()
                .ok_or_else(|| EvalError::MissingKey(field.clone())),
            other => Err(EvalError::UnknownField {
                type_name: other.type_name().to_string(),
                field: field.clone(),
            }),
        },
        Expr::Index { base, index } => {
            let base = evaluate(base, scope)?;
            let index = evaluate(index, scope)?;
            evaluate_index(&base, &index)
        }
        Expr::Range { start, end, inclusive } => {
            let bound = |b: &Option<Box<Expr>>| -> Result<Option<Box<Value>>, EvalError> {
                match b {
                    Some(e) => {
                        let v = evaluate(e, scope)?;
                        if !v.is_numeric() {
                            return Err(EvalError::BadOperand {
                                op: "..".into(),
                                operand: v.type_name().into(),
                            });
                        }
                        Ok(Some(Box::new(v)))
                    }
                    None => Ok(None),
                }
            };
            Ok(Value::Range {
                start: bound(start)?,
                end: bound(end)?,
                inclusive: *inclusive,
            })
        }
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            scope.call(function, &args)
        }
    }
}

/// Evaluate a clause, which must produce a boolean.
pub fn evaluate_clause(expr: &Expr, scope: &Scope<'_>) -> Result<bool, EvalError> {
    match evaluate(expr, scope)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::NotBoolean(other.to_string())),
    }
}

fn evaluate_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::Overflow("-".into())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (op, other) => Err(EvalError::BadOperand {
            op: match op {
                UnaryOp::Not => "!".into(),
                UnaryOp::Neg => "-".into(),
            },
            operand: other.type_name().into(),
        }),
    }
}

fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let overflow = || EvalError::Overflow(op.symbol().into());
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div | BinaryOp::Rem if *b == 0 => return Err(EvalError::DivideByZero),
                BinaryOp::Div => a.checked_div(*b),
                BinaryOp::Rem => a.checked_rem(*b),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
            match op {
                BinaryOp::Add => Ok(Value::Float(a + b)),
                BinaryOp::Sub => Ok(Value::Float(a - b)),
                BinaryOp::Mul => Ok(Value::Float(a * b)),
                BinaryOp::Div | BinaryOp::Rem if b == 0.0 => Err(EvalError::DivideByZero),
                BinaryOp::Div => Ok(Value::Float(a / b)),
                BinaryOp::Rem => Ok(Value::Float(a % b)),
            }
        }
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::List(a), Value::List(b)) if op == BinaryOp::Add => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        _ => Err(EvalError::TypeMismatch {
            op: op.symbol().into(),
            left: left.type_name().into(),
            right: right.type_name().into(),
        }),
    }
}

fn evaluate_compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => Ok(left.loosely_equals(right)),
        CompareOp::Ne => Ok(!left.loosely_equals(right)),
        _ => {
            let ord = left.compare(right).ok_or_else(|| EvalError::TypeMismatch {
                op: op.symbol().into(),
                left: left.type_name().into(),
                right: right.type_name().into(),
            })?;
            Ok(match op {
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Ge => ord != Ordering::Less,
                CompareOp::Eq | CompareOp::Ne => unreachable!("handled above"),
            })
        }
    }
}

fn evaluate_index(base: &Value, index: &Value) -> Result<Value, EvalError> {
    match (base, index) {
        (Value::List(items), Value::Int(i)) => {
            let len = items.len();
            // Negative indices count from the end
            let position = if *i < 0 {
                i64::try_from(len).ok().and_then(|n| n.checked_add(*i))
            } else {
                Some(*i)
            };
            position
                .and_then(|p| usize::try_from(p).ok())
                .and_then(|p| items.get(p))
                .cloned()
                .ok_or(EvalError::IndexOutOfRange { index: *i, len })
        }
        (Value::Map(entries), Value::Str(key)) => entries
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::MissingKey(key.clone())),
        (Value::Record { fields, .. }, Value::Str(key)) => fields
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::MissingKey(key.clone())),
        _ => Err(EvalError::TypeMismatch {
            op: "[]".into(),
            left: base.type_name().into(),
            right: index.type_name().into(),
        }),
    }
}

fn expect_bool(op: &str, value: Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| EvalError::BadOperand {
        op: op.into(),
        operand: value.type_name().into(),
    })
}

fn op_name(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::And => "&&",
        LogicalOp::Or => "||",
    }
}
