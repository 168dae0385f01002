//! Binding reconstruction
//!
//! Rebuilds, for one call, the mapping from every parameter name to the value
//! the call binds it to: named parameters filled positionally, then by
//! keyword, then from defaults; surplus positional arguments captured into the
//! variadic-positional parameter; unclaimed keywords captured into the
//! variadic-keyword parameter.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::error::ConfigError;
use crate::types::TypeRef;
use crate::value::Value;

/// Local layer of a binding context: parameter name → bound value.
pub type Bindings = BTreeMap<String, Value>;

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Value>,
    pub annotation: Option<TypeRef>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            default: None,
            annotation: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_annotation(mut self, annotation: TypeRef) -> Self {
        self.annotation = Some(annotation);
        self
    }
}

/// Formal-parameter shape of a function: named parameters, then an optional
/// catch-all for extra positionals, keyword-only parameters, and an optional
/// catch-all for extra keywords.
///
/// ```
/// use doc_contracts::Signature;
///
/// let sig = Signature::new()
///     .param("a")
///     .param("b")
///     .var_positional("args")
///     .keyword_only_default("c", 1)
///     .keyword_only_default("d", 2)
///     .var_keyword("kwargs");
/// assert_eq!(sig.parameter_names().len(), 6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub params: Vec<Parameter>,
    pub var_positional: Option<String>,
    pub keyword_only: Vec<Parameter>,
    pub var_keyword: Option<String>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(self, name: impl Into<String>) -> Self {
        self.parameter(Parameter::new(name))
    }

    pub fn typed(self, name: impl Into<String>, annotation: TypeRef) -> Self {
        self.parameter(Parameter::new(name).with_annotation(annotation))
    }

    pub fn param_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.parameter(Parameter::new(name).with_default(default))
    }

    /// Add a positional-or-keyword parameter.
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.params.push(parameter);
        self
    }

    pub fn var_positional(mut self, name: impl Into<String>) -> Self {
        self.var_positional = Some(name.into());
        self
    }

    pub fn keyword_only(mut self, parameter: Parameter) -> Self {
        self.keyword_only.push(parameter);
        self
    }

    pub fn keyword_only_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.keyword_only(Parameter::new(name).with_default(default))
    }

    pub fn var_keyword(mut self, name: impl Into<String>) -> Self {
        self.var_keyword = Some(name.into());
        self
    }

    /// Every name the signature can bind, in declaration order.
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.params.iter().map(|p| p.name.as_str()).collect();
        names.extend(self.var_positional.as_deref());
        names.extend(self.keyword_only.iter().map(|p| p.name.as_str()));
        names.extend(self.var_keyword.as_deref());
        names
    }

    /// Parameters carrying a type annotation, in declaration order.
    pub fn annotated(&self) -> impl Iterator<Item = (&str, &TypeRef)> {
        self.params
            .iter()
            .chain(&self.keyword_only)
            .filter_map(|p| p.annotation.as_ref().map(|t| (p.name.as_str(), t)))
    }

    /// Reject duplicate names and a non-defaulted parameter after a
    /// defaulted one.
    pub fn validate(&self, function: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSignature {
            function: function.to_string(),
            reason,
        };

        let mut seen = BTreeSet::new();
        for name in self.parameter_names() {
            if !seen.insert(name) {
                return Err(invalid(format!("duplicate parameter `{}`", name)));
            }
        }

        let mut defaulted: Option<&str> = None;
        for param in &self.params {
            match (&param.default, defaulted) {
                (Some(_), _) => defaulted = Some(param.name.as_str()),
                (None, Some(previous)) => {
                    return Err(invalid(format!(
                        "parameter `{}` without default follows defaulted `{}`",
                        param.name, previous
                    )))
                }
                (None, None) => {}
            }
        }
        Ok(())
    }
}

/// Actual arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new<I, V>(positional: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        CallArgs {
            positional: positional.into_iter().map(Into::into).collect(),
            keywords: BTreeMap::new(),
        }
    }

    pub fn keyword(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    /// Positional argument `index`, or keyword `name`.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| self.keywords.get(name))
    }
}

/// Rebuild the local bindings `call` produces against `signature`.
pub fn reconstruct(signature: &Signature, call: &CallArgs) -> Result<Bindings, ConfigError> {
    let named = signature.params.len();
    let supplied = call.positional.len();
    let mut bindings = Bindings::new();
    let mut consumed = BTreeSet::new();

    // Named parameters, left to right
    for (param, value) in signature.params.iter().zip(&call.positional) {
        if call.keywords.contains_key(&param.name) {
            return Err(ConfigError::DuplicateArgument(param.name.clone()));
        }
        bindings.insert(param.name.clone(), value.clone());
    }

    match &signature.var_positional {
        Some(name) => {
            let extra = call.positional.get(named..).unwrap_or_default().to_vec();
            bindings.insert(name.clone(), Value::List(extra));
        }
        None if supplied > named => {
            return Err(ConfigError::TooManyPositional {
                expected: named,
                got: supplied,
            })
        }
        None => {}
    }

    // Named parameters past the supplied positionals: keyword, then default
    for param in signature.params.iter().skip(supplied) {
        let value = resolve(param, call)?;
        consumed.insert(param.name.as_str());
        bindings.insert(param.name.clone(), value);
    }

    for param in &signature.keyword_only {
        let value = resolve(param, call)?;
        consumed.insert(param.name.as_str());
        bindings.insert(param.name.clone(), value);
    }

    let residual: BTreeMap<String, Value> = call
        .keywords
        .iter()
        .filter(|(name, _)| !consumed.contains(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    if !residual.is_empty() {
        match &signature.var_keyword {
            Some(name) => {
                bindings.insert(name.clone(), Value::Map(residual));
            }
            None => {
                let first = residual.into_keys().next().unwrap_or_default();
                return Err(ConfigError::UnexpectedKeyword(first));
            }
        }
    }

    trace!(?bindings, "reconstructed bindings");
    Ok(bindings)
}

fn resolve(param: &Parameter, call: &CallArgs) -> Result<Value, ConfigError> {
    call.keywords
        .get(&param.name)
        .or(param.default.as_ref())
        .cloned()
        .ok_or_else(|| ConfigError::MissingArgument(param.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bindings<const N: usize>(entries: [(&str, Value); N]) -> Bindings {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_positional_only() {
        let sig = Signature::new().param("a").param("b").param("c");
        let got = reconstruct(&sig, &CallArgs::new([0, 6, 0])).unwrap();
        assert_eq!(
            got,
            bindings([("a", 0.into()), ("b", 6.into()), ("c", 0.into())])
        );
    }

    #[test]
    fn test_with_var_kwargs() {
        let sig = Signature::new()
            .param("a")
            .param("b")
            .param_default("c", 1)
            .var_keyword("kwargs");
        let got = reconstruct(&sig, &CallArgs::new([1, 2]).keyword("d", 2)).unwrap();
        assert_eq!(
            got,
            bindings([
                ("a", 1.into()),
                ("b", 2.into()),
                ("c", 1.into()),
                ("kwargs", Value::map([("d", 2)])),
            ])
        );
    }

    #[test]
    fn test_with_all() {
        let sig = Signature::new()
            .param("a")
            .param("b")
            .var_positional("args")
            .keyword_only_default("c", 1)
            .keyword_only_default("d", 2)
            .var_keyword("kwargs");
        let call = CallArgs::new([1, 2, 3, 4, 5]).keyword("e", 5).keyword("f", 6);
        let got = reconstruct(&sig, &call).unwrap();
        assert_eq!(
            got,
            bindings([
                ("a", 1.into()),
                ("b", 2.into()),
                ("args", vec![3, 4, 5].into()),
                ("c", 1.into()),
                ("d", 2.into()),
                ("kwargs", Value::map([("e", 5), ("f", 6)])),
            ])
        );
    }

    #[test]
    fn test_empty_var_kwargs_is_not_bound() {
        let sig = Signature::new().param("a").var_keyword("kwargs");
        let got = reconstruct(&sig, &CallArgs::new([1])).unwrap();
        assert_eq!(got, bindings([("a", 1.into())]));
    }

    #[test]
    fn test_empty_var_positional_is_bound() {
        let sig = Signature::new().param("a").var_positional("args");
        let got = reconstruct(&sig, &CallArgs::new([1])).unwrap();
        assert_eq!(got, bindings([("a", 1.into()), ("args", Value::List(vec![]))]));
    }

    #[test]
    fn test_defaulted_slot_filled_positionally_and_later_default_by_keyword() {
        let sig = Signature::new()
            .param("a")
            .param_default("b", 10)
            .param_default("c", 20)
            .param_default("d", 30);
        let call = CallArgs::new([1, 2]).keyword("d", 4);
        let got = reconstruct(&sig, &call).unwrap();
        assert_eq!(
            got,
            bindings([("a", 1.into()), ("b", 2.into()), ("c", 20.into()), ("d", 4.into())])
        );
    }

    #[test]
    fn test_all_defaults_filled_positionally() {
        let sig = Signature::new().param("a").param_default("b", 1);
        let got = reconstruct(&sig, &CallArgs::new([5, 6])).unwrap();
        assert_eq!(got, bindings([("a", 5.into()), ("b", 6.into())]));
    }

    #[test]
    fn test_required_parameter_by_keyword() {
        let sig = Signature::new().param("a").param("b");
        let got = reconstruct(&sig, &CallArgs::new([1]).keyword("b", 2)).unwrap();
        assert_eq!(got, bindings([("a", 1.into()), ("b", 2.into())]));
    }

    #[test]
    fn test_usage_errors() {
        let sig = Signature::new().param("a").param("b");
        assert_eq!(
            reconstruct(&sig, &CallArgs::new([1])),
            Err(ConfigError::MissingArgument("b".into()))
        );
        assert_eq!(
            reconstruct(&sig, &CallArgs::new([1, 2, 3])),
            Err(ConfigError::TooManyPositional { expected: 2, got: 3 })
        );
        assert_eq!(
            reconstruct(&sig, &CallArgs::new([1, 2]).keyword("z", 0)),
            Err(ConfigError::UnexpectedKeyword("z".into()))
        );
        assert_eq!(
            reconstruct(&sig, &CallArgs::new([1, 2]).keyword("a", 0)),
            Err(ConfigError::DuplicateArgument("a".into()))
        );

        let kw_only = Signature::new().keyword_only(Parameter::new("k"));
        assert_eq!(
            reconstruct(&kw_only, &CallArgs::default()),
            Err(ConfigError::MissingArgument("k".into()))
        );
    }

    #[test]
    fn test_validate() {
        let bad_order = Signature::new().param_default("a", 1).param("b");
        assert!(matches!(
            bad_order.validate("f"),
            Err(ConfigError::InvalidSignature { reason, .. }) if reason.contains("`b`")
        ));
        let duplicate = Signature::new().param("a").var_keyword("a");
        assert!(duplicate.validate("f").is_err());
        assert!(Signature::new().param("a").param_default("b", 1).validate("f").is_ok());
    }

    /// A named parameter shape: `required` plain parameters, then `defaulted`
    /// ones with defaults `100 + i`, optionally followed by `*args` and
    /// `**kwargs`.
    fn shape(required: usize, defaulted: usize, var_pos: bool, var_kw: bool) -> Signature {
        let mut sig = Signature::new();
        for i in 0..required {
            sig = sig.param(format!("p{}", i));
        }
        for i in 0..defaulted {
            sig = sig.param_default(format!("p{}", required + i), 100 + i as i64);
        }
        if var_pos {
            sig = sig.var_positional("args");
        }
        if var_kw {
            sig = sig.var_keyword("kwargs");
        }
        sig
    }

    proptest! {
        #[test]
        fn test_binding_matches_call_semantics(
            required in 0usize..4,
            defaulted in 0usize..4,
            var_pos in any::<bool>(),
            var_kw in any::<bool>(),
            extra_positional in 0usize..3,
            keyword_mask in proptest::collection::vec(any::<bool>(), 8),
            extra_keywords in 0usize..3,
        ) {
            let sig = shape(required, defaulted, var_pos, var_kw);
            let named = required + defaulted;

            // Supply every required parameter positionally and some defaulted
            // ones; overflow only when *args exists.
            let filled = required + (extra_positional.min(defaulted));
            let overflow = if var_pos && filled == named { extra_positional } else { 0 };
            let positional: Vec<Value> = (0..filled + overflow).map(|i| Value::Int(i as i64)).collect();

            let mut call = CallArgs { positional, keywords: BTreeMap::new() };
            for i in filled..named {
                if keyword_mask[i] {
                    call.keywords.insert(format!("p{}", i), Value::Int(1000 + i as i64));
                }
            }
            if var_kw {
                for i in 0..extra_keywords {
                    call.keywords.insert(format!("x{}", i), Value::Int(-(i as i64)));
                }
            }

            let got = reconstruct(&sig, &call).unwrap();

            let mut expected = Bindings::new();
            for i in 0..named {
                let value = if i < filled {
                    Value::Int(i as i64)
                } else if keyword_mask[i] {
                    Value::Int(1000 + i as i64)
                } else {
                    Value::Int(100 + (i - required) as i64)
                };
                expected.insert(format!("p{}", i), value);
            }
            if var_pos {
                let rest: Vec<Value> = (filled..filled + overflow).map(|i| Value::Int(i as i64)).collect();
                expected.insert("args".to_string(), Value::List(rest));
            }
            if var_kw && extra_keywords > 0 {
                let residual: BTreeMap<String, Value> = (0..extra_keywords)
                    .map(|i| (format!("x{}", i), Value::Int(-(i as i64))))
                    .collect();
                expected.insert("kwargs".to_string(), Value::Map(residual));
            }

            prop_assert_eq!(got, expected);
        }
    }
}
