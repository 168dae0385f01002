//! Parameter types and type contracts
//!
//! A parameter's [`TypeRef`] drives two checks: the optional instance check
//! (`type_checks`) and the type's own contract, looked up in a
//! [`TypeRegistry`]. A registered type's contract is its own `Requires:`
//! clauses followed by those of its supertypes, depth-first.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::ConfigError;
use crate::parser::docstring::{ClauseReader, Section};
use crate::value::Value;

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// Matches anything; never instance-checked.
    Any,
    None,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Range,
    /// A registered type, by name.
    Named(String),
    /// Parameterised type such as `List[int]`; never instance-checked.
    Generic { name: String, args: Vec<TypeRef> },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    /// Name used in type-check clauses and registry lookups.
    pub fn name(&self) -> String {
        match self {
            TypeRef::Any => "Any".into(),
            TypeRef::None => "None".into(),
            TypeRef::Bool => "bool".into(),
            TypeRef::Int => "int".into(),
            TypeRef::Float => "float".into(),
            TypeRef::Str => "str".into(),
            TypeRef::List => "list".into(),
            TypeRef::Map => "map".into(),
            TypeRef::Range => "range".into(),
            TypeRef::Named(name) => name.clone(),
            TypeRef::Generic { name, args } => format!(
                "{}[{}]",
                name,
                args.iter().map(TypeRef::name).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// How a registered type relates to runtime values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Values are [`Value::Record`]s naming this type or a subtype.
    Nominal,
    /// A distinct name for values of another type. Carries a contract but
    /// cannot be instance-checked.
    Alias(TypeRef),
}

/// A registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub supertypes: Vec<String>,
    /// Documentation block; its `Requires:` section is the type contract.
    pub doc: Option<String>,
    /// Extra clauses over `self`, appended after the documented ones.
    pub requires: Vec<String>,
}

impl TypeDef {
    /// A nominal type (a class).
    pub fn class(name: impl Into<String>) -> Self {
        TypeDef {
            name: name.into(),
            kind: TypeKind::Nominal,
            supertypes: Vec::new(),
            doc: None,
            requires: Vec::new(),
        }
    }

    /// A new-type alias of `base`.
    pub fn alias(name: impl Into<String>, base: TypeRef) -> Self {
        TypeDef {
            kind: TypeKind::Alias(base),
            ..TypeDef::class(name)
        }
    }

    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn requires(mut self, clause: impl Into<String>) -> Self {
        self.requires.push(clause.into());
        self
    }

    /// This type's own clauses, without supertypes.
    fn own_clauses(&self, reader: &dyn ClauseReader) -> Vec<String> {
        let mut clauses = self
            .doc
            .as_deref()
            .map(|doc| reader.read_section(doc, Section::Requires))
            .unwrap_or_default();
        clauses.extend(self.requires.iter().cloned());
        clauses
    }
}

/// How to instance-check one parameter, resolved at wrap time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCheck {
    /// Value kind must match.
    Builtin(TypeRef),
    /// Value must be a record of one of these type names.
    Nominal(BTreeSet<String>),
    /// Cannot be instance-checked; skipped.
    Unchecked,
}

impl TypeCheck {
    /// `Some(true/false)` for a checkable type, `None` when skipped.
    pub fn admits(&self, value: &Value) -> Option<bool> {
        match self {
            TypeCheck::Builtin(ty) => Some(matches!(
                (ty, value),
                (TypeRef::None, Value::None)
                    | (TypeRef::Bool, Value::Bool(_))
                    | (TypeRef::Int, Value::Int(_))
                    | (TypeRef::Float, Value::Float(_))
                    | (TypeRef::Str, Value::Str(_))
                    | (TypeRef::List, Value::List(_))
                    | (TypeRef::Map, Value::Map(_))
                    | (TypeRef::Range, Value::Range { .. })
            )),
            TypeCheck::Nominal(accepted) => Some(match value {
                Value::Record { type_name, .. } => accepted.contains(type_name),
                _ => false,
            }),
            TypeCheck::Unchecked => None,
        }
    }
}

/// Registered types by name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `def`, replacing any type of the same name.
    pub fn register(&mut self, def: TypeDef) -> &mut Self {
        self.types.insert(def.name.clone(), def);
        self
    }

    pub fn with(mut self, def: TypeDef) -> Self {
        self.register(def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Contract clauses of `ty`: own first, then each supertype's in order,
    /// recursively. Empty for builtins and unregistered names.
    pub fn contract_for(
        &self,
        ty: &TypeRef,
        reader: &dyn ClauseReader,
    ) -> Result<Vec<String>, ConfigError> {
        match ty {
            TypeRef::Named(name) => {
                let mut clauses = Vec::new();
                self.collect_clauses(name, reader, &mut Vec::new(), &mut clauses)?;
                Ok(clauses)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn collect_clauses(
        &self,
        name: &str,
        reader: &dyn ClauseReader,
        path: &mut Vec<String>,
        clauses: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        let Some(def) = self.types.get(name) else {
            return Ok(());
        };
        if path.iter().any(|p| p == name) {
            return Err(ConfigError::SupertypeCycle(name.to_string()));
        }
        path.push(name.to_string());
        clauses.extend(def.own_clauses(reader));
        for supertype in &def.supertypes {
            self.collect_clauses(supertype, reader, path, clauses)?;
        }
        path.pop();
        Ok(())
    }

    /// Whether `name` is `ancestor` or inherits from it.
    pub fn is_subtype(&self, name: &str, ancestor: &str) -> bool {
        let mut stack = vec![name];
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(def) = self.types.get(current) {
                stack.extend(def.supertypes.iter().map(String::as_str));
            }
        }
        false
    }

    /// Resolve the instance check for a declared type.
    pub fn type_check(&self, ty: &TypeRef) -> TypeCheck {
        match ty {
            TypeRef::Any | TypeRef::Generic { .. } => TypeCheck::Unchecked,
            TypeRef::Named(name) => match self.types.get(name).map(|def| &def.kind) {
                Some(TypeKind::Nominal) => TypeCheck::Nominal(
                    self.types
                        .keys()
                        .filter(|candidate| self.is_subtype(candidate, name))
                        .cloned()
                        .collect(),
                ),
                Some(TypeKind::Alias(_)) | None => TypeCheck::Unchecked,
            },
            builtin => TypeCheck::Builtin(builtin.clone()),
        }
    }
}
