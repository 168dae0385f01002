//! Contract AST and parsing
//!
//! Defines the compiled form of a function's contract: ordered preconditions,
//! ordered postconditions, the name the result is bound to, and per-parameter
//! annotation contracts.

use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::error::ConfigError;
use crate::parser::docstring::{ClauseReader, DocClauses};
use crate::translator::ast::{Expr, SELF_PLACEHOLDER};
use crate::translator::lowering::compile_expr;

/// Name the result is bound to unless `return as <name>` says otherwise.
pub const DEFAULT_RESULT_NAME: &str = "ret";

/// A single compiled clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Type of contract (requires or ensures)
    pub contract_type: ContractType,
    /// Source text, as reported on failure
    pub source: String,
    /// The condition expression
    pub condition: Expr,
}

/// Type of contract clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractType {
    /// Precondition: `Requires:`
    Requires,
    /// Postcondition: `Ensures:`
    Ensures,
}

impl Clause {
    /// Compile `source` into a clause.
    pub fn compile(contract_type: ContractType, source: &str) -> Result<Self, ConfigError> {
        Ok(Clause {
            contract_type,
            source: source.to_string(),
            condition: compile_expr(source)?,
        })
    }

    /// Rewrite the `self` placeholder to `parameter` in both the condition
    /// and the reported source.
    pub fn bind_self(&self, parameter: &str) -> Clause {
        Clause {
            contract_type: self.contract_type,
            source: self_pattern()
                .replace_all(&self.source, parameter)
                .into_owned(),
            condition: self.condition.rename(SELF_PLACEHOLDER, parameter),
        }
    }
}

/// Preconditions a parameter inherits from its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationContract {
    pub parameter: String,
    pub type_name: String,
    pub clauses: Vec<Clause>,
}

/// The function-level part of a contract, compiled from one documentation
/// block. Shared through the clause cache.
#[derive(Debug, Clone, PartialEq)]
pub struct DocContract {
    pub requires: Vec<Clause>,
    pub ensures: Vec<Clause>,
    pub result_name: String,
}

impl Default for DocContract {
    fn default() -> Self {
        DocContract {
            requires: Vec::new(),
            ensures: Vec::new(),
            result_name: DEFAULT_RESULT_NAME.to_string(),
        }
    }
}

impl DocContract {
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.ensures.is_empty()
    }
}

/// Everything checked around one wrapped function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContractSpec {
    /// Shared with the clause cache.
    pub doc: Arc<DocContract>,
    /// In parameter declaration order.
    pub annotations: Vec<AnnotationContract>,
}

impl ContractSpec {
    pub fn requires(&self) -> &[Clause] {
        &self.doc.requires
    }

    pub fn ensures(&self) -> &[Clause] {
        &self.doc.ensures
    }

    pub fn result_name(&self) -> &str {
        &self.doc.result_name
    }

    /// True when there is no clause of any kind.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty() && self.annotations.iter().all(|a| a.clauses.is_empty())
    }

    /// Every compiled clause, function-level first.
    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.doc
            .requires
            .iter()
            .chain(&self.doc.ensures)
            .chain(self.annotations.iter().flat_map(|a| &a.clauses))
    }
}

/// Read and compile a documentation block's contract.
pub fn extract_contracts(doc: &str, reader: &dyn ClauseReader) -> Result<DocContract, ConfigError> {
    compile_clauses(reader.read(doc))
}

/// Compile already-read clause sources, consuming a leading
/// `return as <name>` postcondition.
pub fn compile_clauses(clauses: DocClauses) -> Result<DocContract, ConfigError> {
    let DocClauses { requires, mut ensures } = clauses;

    let result_name = match ensures.first().and_then(|first| parse_result_binding(first)) {
        Some(name) => {
            ensures.remove(0);
            name
        }
        None => DEFAULT_RESULT_NAME.to_string(),
    };

    Ok(DocContract {
        requires: requires
            .iter()
            .map(|source| Clause::compile(ContractType::Requires, source))
            .collect::<Result<_, _>>()?,
        ensures: ensures
            .iter()
            .map(|source| Clause::compile(ContractType::Ensures, source))
            .collect::<Result<_, _>>()?,
        result_name,
    })
}

/// `return as total` → `Some("total")`.
pub fn parse_result_binding(clause: &str) -> Option<String> {
    static RETURN_AS: OnceLock<Regex> = OnceLock::new();
    RETURN_AS
        .get_or_init(|| {
            Regex::new(r"^return\s+as\s+([A-Za-z_][A-Za-z0-9_]*)$").expect("valid regex")
        })
        .captures(clause.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn self_pattern() -> &'static Regex {
    static SELF_WORD: OnceLock<Regex> = OnceLock::new();
    SELF_WORD.get_or_init(|| {
        Regex::new(&format!(r"\b{}\b", SELF_PLACEHOLDER)).expect("valid regex")
    })
}
