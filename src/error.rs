//! Error taxonomy
//!
//! - [`ConfigError`]: bad configuration or usage, raised at wrap time or on a
//!   call whose arguments cannot be bound.
//! - [`ContractViolation`]: a clause evaluated to `false`.
//! - [`EvalError`]: a clause could not be evaluated at all.
//! - [`ContractError`]: what [`Contracted::call`](crate::Contracted::call)
//!   returns; wraps the three above.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// Configuration and usage errors. Never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("clause `{clause}` does not parse: {message}")]
    Syntax { clause: String, message: String },

    #[error("clause `{clause}` uses unsupported syntax: {construct}")]
    Unsupported { clause: String, construct: String },

    #[error("unknown documentation style `{0}`")]
    UnknownStyle(String),

    #[error("invalid contract options: {0}")]
    InvalidOptions(String),

    #[error("invalid signature for `{function}`: {reason}")]
    InvalidSignature { function: String, reason: String },

    #[error("supertype cycle through `{0}`")]
    SupertypeCycle(String),

    #[error("missing argument for parameter `{0}`")]
    MissingArgument(String),

    #[error("too many positional arguments: expected at most {expected}, got {got}")]
    TooManyPositional { expected: usize, got: usize },

    #[error("unexpected keyword argument `{0}`")]
    UnexpectedKeyword(String),

    #[error("parameter `{0}` given both positionally and by keyword")]
    DuplicateArgument(String),
}

/// Errors raised while evaluating a compiled clause.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("name `{0}` is not bound")]
    UnboundName(String),

    #[error("unsupported operand types for `{op}`: {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    #[error("bad operand type for `{op}`: {operand}")]
    BadOperand { op: String, operand: String },

    #[error("integer overflow in `{0}`")]
    Overflow(String),

    #[error("division by zero")]
    DivideByZero,

    #[error("`{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("key {0:?} not found")]
    MissingKey(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{function}` expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },

    #[error("clause evaluated to {0}, expected a boolean")]
    NotBoolean(String),
}

/// Which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Precondition,
    TypeCheck,
    AnnotationPrecondition,
    Postcondition,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Precondition
            | ViolationKind::TypeCheck
            | ViolationKind::AnnotationPrecondition => write!(f, "Requirement"),
            ViolationKind::Postcondition => write!(f, "Guarantee"),
        }
    }
}

/// A failed check, with enough context to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractViolation {
    pub kind: ViolationKind,
    /// Name the function was wrapped under.
    pub function: String,
    /// Source text of the failing clause.
    pub clause: String,
    /// Parameter the check was attached to (type and annotation checks).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    pub arguments: Vec<Value>,
    pub keywords: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
}

impl ContractViolation {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_string())
    }
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}.", self.kind, self.clause)?;
        match &self.return_value {
            Some(ret) => write!(f, " Return value: {}", ret),
            None => {
                write!(f, " Arguments: {}", Value::List(self.arguments.clone()))?;
                if !self.keywords.is_empty() {
                    write!(f, " Keywords: {}", Value::Map(self.keywords.clone()))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ContractViolation {}

/// Everything a contracted call can fail with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Violation(#[from] ContractViolation),

    #[error("evaluating `{clause}` failed: {source}")]
    Evaluation {
        clause: String,
        #[source]
        source: EvalError,
    },
}

impl ContractError {
    pub fn violation(&self) -> Option<&ContractViolation> {
        match self {
            ContractError::Violation(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_violation(&self) -> bool {
        self.violation().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(kind: ViolationKind, return_value: Option<Value>) -> ContractViolation {
        ContractViolation {
            kind,
            function: "f".into(),
            clause: "a > 0".into(),
            parameter: None,
            arguments: vec![Value::Int(-1)],
            keywords: BTreeMap::new(),
            return_value,
        }
    }

    #[test]
    fn test_requirement_message() {
        let v = violation(ViolationKind::Precondition, None);
        assert_eq!(v.to_string(), "Requirement failed: a > 0. Arguments: [-1]");
    }

    #[test]
    fn test_guarantee_message() {
        let v = violation(ViolationKind::Postcondition, Some(Value::Int(3)));
        assert_eq!(v.to_string(), "Guarantee failed: a > 0. Return value: 3");
    }

    #[test]
    fn test_report_json() {
        let v = violation(ViolationKind::TypeCheck, None);
        let json: serde_json::Value = serde_json::from_str(&v.to_json()).unwrap();
        assert_eq!(json["kind"], "type_check");
        assert_eq!(json["arguments"][0], -1);
        assert!(json.get("return_value").is_none());
    }
}
