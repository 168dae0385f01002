//! # doc-contracts
//!
//! Design-by-contract for functions whose contracts live in their
//! documentation.
//!
//! This crate provides:
//! - `Requires:` / `Ensures:` sections read out of documentation blocks and
//!   compiled once, at wrap time
//! - Per-call binding of arguments to parameter names, including variadic
//!   positional and keyword parameters
//! - Type contracts inherited through registered supertypes
//! - An optional instance check on annotated parameters
//!
//! ## Usage
//!
//! ```rust
//! use doc_contracts::{CallArgs, Enforcer, Environment, Signature, Value};
//!
//! let doc = "
//!     Clamps a count into its window.
//!
//!     Requires:
//!         (0..limit).contains(&a)
//!
//!     Ensures:
//!         ret >= a
//! ";
//!
//! let env = Environment::new().with("limit", 10);
//! let double = Enforcer::default()
//!     .with_environment(env)
//!     .wrap("double", Signature::new().param("a"), Some(doc), |args: &CallArgs| {
//!         Value::Int(args.positional[0].as_int().unwrap_or(0) * 2)
//!     })
//!     .unwrap();
//!
//! assert_eq!(double.call(&CallArgs::new([4])).unwrap(), Value::Int(8));
//!
//! let err = double.call(&CallArgs::new([12])).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "Requirement failed: (0..limit).contains(&a). Arguments: [12]"
//! );
//! ```
//!
//! Clause expressions use Rust syntax: comparisons, `&&`/`||`, arithmetic,
//! field access, indexing, ranges, and calls to environment functions or the
//! built-ins (`len`, `abs`, `min`, `max`, ...).

pub mod binding;
pub mod cache;
pub mod enforcer;
pub mod env;
pub mod error;
pub mod parser;
pub mod translator;
pub mod types;
pub mod value;

pub use binding::{reconstruct, Bindings, CallArgs, Parameter, Signature};
pub use cache::ClauseCache;
pub use enforcer::{ContractOptions, Contracted, Enforcer};
pub use env::{Environment, NativeFn};
pub use error::{ConfigError, ContractError, ContractViolation, EvalError, ViolationKind};
pub use parser::{ClauseReader, ContractSpec, GoogleStyle, Style};
pub use types::{TypeCheck, TypeDef, TypeKind, TypeRef, TypeRegistry};
pub use value::Value;
