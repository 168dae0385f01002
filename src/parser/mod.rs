//! Parser module
//!
//! This module contains:
//! - `docstring`: Reads `Requires:` / `Ensures:` sections out of documentation blocks
//! - `contracts`: Compiles those sections into clauses

pub mod contracts;
pub mod docstring;

pub use contracts::{
    extract_contracts, AnnotationContract, Clause, ContractSpec, ContractType, DocContract,
};
pub use docstring::{ClauseReader, DocClauses, GoogleStyle, Section, Style};
