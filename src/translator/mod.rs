//! Translator module
//!
//! This module contains:
//! - `ast`: The clause expression tree
//! - `lowering`: `syn` expression → clause AST translation
//! - `evaluator`: Call-time evaluation against a scope
//! - `static_checker`: Wrap-time checks that don't need a call

pub mod ast;
pub mod evaluator;
pub mod lowering;
pub mod static_checker;

pub use ast::Expr;
pub use evaluator::{evaluate, evaluate_clause, Scope};
pub use static_checker::{check_clause_statically, StaticCheckResult};
