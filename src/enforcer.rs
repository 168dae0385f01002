//! Contract enforcement around wrapped functions
//!
//! [`Enforcer::wrap`] does all parsing and compilation once; the returned
//! [`Contracted`] only reconstructs bindings and evaluates clauses per call.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::binding::{reconstruct, Bindings, CallArgs, Signature};
use crate::cache::ClauseCache;
use crate::env::Environment;
use crate::error::{ConfigError, ContractError, ContractViolation, ViolationKind};
use crate::parser::contracts::{
    extract_contracts, AnnotationContract, Clause, ContractSpec, ContractType, DocContract,
};
use crate::parser::docstring::Style;
use crate::translator::evaluator::{evaluate_clause, Scope};
use crate::translator::static_checker::{check_clause_statically, StaticCheckResult};
use crate::types::{TypeCheck, TypeRef, TypeRegistry};
use crate::value::Value;

/// Wrap-time options.
///
/// ```
/// use doc_contracts::ContractOptions;
///
/// let options = ContractOptions::from_json(r#"{ "type_checks": true }"#).unwrap();
/// assert!(options.type_checks);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContractOptions {
    /// Documentation dialect.
    pub style: Style,
    /// Instance-check annotated parameters before the body runs.
    pub type_checks: bool,
}

impl ContractOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidOptions(e.to_string()))
    }
}

/// Wrapper factory.
#[derive(Debug, Clone, Default)]
pub struct Enforcer {
    options: ContractOptions,
    environment: Environment,
    types: TypeRegistry,
    cache: Option<Arc<ClauseCache>>,
}

impl Enforcer {
    pub fn new(options: ContractOptions) -> Self {
        Enforcer {
            options,
            ..Self::default()
        }
    }

    /// Global layer for clause evaluation. Kept live: later changes made
    /// through any clone of `environment` are seen by wrapped functions.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    pub fn with_cache(mut self, cache: Arc<ClauseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(&self) -> &ContractOptions {
        &self.options
    }

    /// Wrap `function` under `name`, compiling its contract from `doc` and
    /// the contracts of its parameters' registered types.
    pub fn wrap<F>(
        &self,
        name: impl Into<String>,
        signature: Signature,
        doc: Option<&str>,
        function: F,
    ) -> Result<Contracted<F>, ConfigError>
    where
        F: Fn(&CallArgs) -> Value,
    {
        let name = name.into();
        signature.validate(&name)?;

        let spec = ContractSpec {
            doc: self.doc_contract(doc)?,
            annotations: self.annotation_contracts(&signature)?,
        };
        let type_checks = if self.options.type_checks {
            self.type_checks(&signature)
        } else {
            Vec::new()
        };

        self.check_statically(&name, &signature, &spec);

        let passthrough = spec.is_empty() && type_checks.is_empty();
        debug!(
            function = %name,
            requires = spec.requires().len(),
            ensures = spec.ensures().len(),
            annotations = spec.annotations.len(),
            type_checks = type_checks.len(),
            result = spec.result_name(),
            passthrough,
            "contract compiled"
        );

        Ok(Contracted {
            name,
            signature,
            spec,
            type_checks,
            environment: self.environment.clone(),
            passthrough,
            function,
        })
    }

    fn doc_contract(&self, doc: Option<&str>) -> Result<Arc<DocContract>, ConfigError> {
        let Some(doc) = doc else {
            return Ok(Arc::new(DocContract::default()));
        };
        match &self.cache {
            Some(cache) => cache.get_or_compile(self.options.style, doc),
            None => Ok(Arc::new(extract_contracts(doc, self.options.style.reader())?)),
        }
    }

    fn annotation_contracts(
        &self,
        signature: &Signature,
    ) -> Result<Vec<AnnotationContract>, ConfigError> {
        let reader = self.options.style.reader();
        let mut annotations = Vec::new();
        for (parameter, ty) in signature.annotated() {
            let sources = self.types.contract_for(ty, reader)?;
            if sources.is_empty() {
                continue;
            }
            let clauses = sources
                .iter()
                .map(|source| {
                    Clause::compile(ContractType::Requires, source)
                        .map(|clause| clause.bind_self(parameter))
                })
                .collect::<Result<Vec<_>, _>>()?;
            annotations.push(AnnotationContract {
                parameter: parameter.to_string(),
                type_name: ty.name(),
                clauses,
            });
        }
        Ok(annotations)
    }

    fn type_checks(&self, signature: &Signature) -> Vec<ParamCheck> {
        signature
            .annotated()
            .filter_map(|(parameter, ty)| match self.types.type_check(ty) {
                TypeCheck::Unchecked => None,
                check => Some(ParamCheck {
                    parameter: parameter.to_string(),
                    clause: format!("{}: {}", parameter, ty),
                    ty: ty.clone(),
                    check,
                }),
            })
            .collect()
    }

    /// Log clauses that reference unknown names or cannot depend on the call.
    fn check_statically(&self, function: &str, signature: &Signature, spec: &ContractSpec) {
        let mut known: BTreeSet<String> = signature
            .parameter_names()
            .into_iter()
            .map(str::to_string)
            .chain(self.environment.names())
            .collect();

        let before = spec
            .requires()
            .iter()
            .chain(spec.annotations.iter().flat_map(|a| &a.clauses));
        let mut findings: Vec<(&Clause, StaticCheckResult)> = before
            .map(|clause| (clause, check_clause_statically(clause, &known)))
            .collect();

        known.insert(spec.result_name().to_string());
        findings.extend(
            spec.ensures()
                .iter()
                .map(|clause| (clause, check_clause_statically(clause, &known))),
        );

        for (clause, finding) in findings.into_iter().filter(|(_, f)| f.is_suspicious()) {
            match finding {
                StaticCheckResult::Unbound(names) => warn!(
                    function,
                    clause = %clause.source,
                    names = ?names,
                    "clause references names unknown at wrap time"
                ),
                StaticCheckResult::Constant(value) => warn!(
                    function,
                    clause = %clause.source,
                    value,
                    "clause is constant"
                ),
                StaticCheckResult::Faulty(err) => warn!(
                    function,
                    clause = %clause.source,
                    error = %err,
                    "clause always fails to evaluate"
                ),
                StaticCheckResult::Resolved => {}
            }
        }
    }
}

/// Resolved instance check for one annotated parameter.
#[derive(Debug, Clone)]
struct ParamCheck {
    parameter: String,
    clause: String,
    ty: TypeRef,
    check: TypeCheck,
}

/// A function wrapped with its compiled contract.
pub struct Contracted<F> {
    name: String,
    signature: Signature,
    spec: ContractSpec,
    type_checks: Vec<ParamCheck>,
    environment: Environment,
    passthrough: bool,
    function: F,
}

impl<F> Contracted<F>
where
    F: Fn(&CallArgs) -> Value,
{
    /// Call the wrapped function with its contract enforced.
    ///
    /// Order: preconditions, type checks, annotation preconditions, body,
    /// postconditions. The first failing check aborts the call.
    pub fn call(&self, args: &CallArgs) -> Result<Value, ContractError> {
        if self.passthrough {
            return Ok((self.function)(args));
        }

        let mut bindings = reconstruct(&self.signature, args)?;
        trace!(function = %self.name, bindings = ?bindings, "bindings reconstructed");

        for clause in self.spec.requires() {
            self.check(clause, &bindings, ViolationKind::Precondition, None, args, None)?;
        }

        for param in &self.type_checks {
            let Some(value) = bindings.get(&param.parameter) else {
                continue;
            };
            trace!(function = %self.name, parameter = %param.parameter, ty = %param.ty, "type check");
            if param.check.admits(value) == Some(false) {
                return Err(self
                    .violation(
                        ViolationKind::TypeCheck,
                        &param.clause,
                        Some(&param.parameter),
                        args,
                        None,
                    )
                    .into());
            }
        }

        for annotation in &self.spec.annotations {
            for clause in &annotation.clauses {
                self.check(
                    clause,
                    &bindings,
                    ViolationKind::AnnotationPrecondition,
                    Some(&annotation.parameter),
                    args,
                    None,
                )?;
            }
        }

        let result = (self.function)(args);

        if self.spec.ensures().is_empty() {
            return Ok(result);
        }
        bindings.insert(self.spec.result_name().to_string(), result.clone());
        for clause in self.spec.ensures() {
            self.check(
                clause,
                &bindings,
                ViolationKind::Postcondition,
                None,
                args,
                Some(&result),
            )?;
        }

        Ok(result)
    }

    fn check(
        &self,
        clause: &Clause,
        bindings: &Bindings,
        kind: ViolationKind,
        parameter: Option<&str>,
        args: &CallArgs,
        result: Option<&Value>,
    ) -> Result<(), ContractError> {
        let scope = Scope::new(bindings, &self.environment);
        let holds = evaluate_clause(&clause.condition, &scope).map_err(|source| {
            ContractError::Evaluation {
                clause: clause.source.clone(),
                source,
            }
        })?;
        trace!(function = %self.name, clause = %clause.source, holds, "clause evaluated");
        if holds {
            Ok(())
        } else {
            Err(self
                .violation(kind, &clause.source, parameter, args, result)
                .into())
        }
    }

    fn violation(
        &self,
        kind: ViolationKind,
        clause: &str,
        parameter: Option<&str>,
        args: &CallArgs,
        result: Option<&Value>,
    ) -> ContractViolation {
        debug!(function = %self.name, clause, kind = ?kind, "contract violated");
        ContractViolation {
            kind,
            function: self.name.clone(),
            clause: clause.to_string(),
            parameter: parameter.map(str::to_string),
            arguments: args.positional.clone(),
            keywords: args.keywords.clone(),
            return_value: result.cloned(),
        }
    }
}

impl<F> Contracted<F> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn spec(&self) -> &ContractSpec {
        &self.spec
    }

    /// True when there is nothing to check and calls go straight through.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }
}

impl<F> std::fmt::Debug for Contracted<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contracted")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("spec", &self.spec)
            .field("passthrough", &self.passthrough)
            .finish_non_exhaustive()
    }
}
