use std::sync::Arc;

use anyhow::Result;
use doc_contracts::{
    reconstruct, CallArgs, ClauseCache, ContractError, ContractOptions, Enforcer, Environment,
    Signature, TypeDef, TypeRef, TypeRegistry, Value, ViolationKind,
};

const RANGES: &str = "
    Checks its arguments against fixed windows.

    Requires:
        (0..1).contains(&a)
        (6..7).contains(&b)

    Ensures:
        (6..8).contains(&ret)
";

fn sum(args: &CallArgs) -> Value {
    Value::Int(args.positional.iter().filter_map(Value::as_int).sum())
}

#[test]
fn test_range_membership_contract() -> Result<()> {
    let signature = Signature::new()
        .typed("a", TypeRef::Int)
        .typed("b", TypeRef::Float)
        .typed("c", TypeRef::Float);
    let f = Enforcer::default().wrap("f", signature, Some(RANGES), sum)?;

    assert_eq!(f.call(&CallArgs::new([0, 6, 0]))?, Value::Int(6));

    let err = f.call(&CallArgs::new([-1, 6, 0])).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Requirement failed: (0..1).contains(&a). Arguments: [-1, 6, 0]"
    );
    Ok(())
}

#[test]
fn test_environment_names_resolve() -> Result<()> {
    let doc = "
        Requires:
            (7..8).contains(&asdf)
    ";
    let env = Environment::new().with("asdf", 7);
    let f = Enforcer::default()
        .with_environment(env.clone())
        .wrap("f", Signature::new().param("a"), Some(doc), sum)?;
    assert_eq!(f.call(&CallArgs::new([1]))?, Value::Int(1));

    env.set("asdf", 9);
    assert!(f.call(&CallArgs::new([1])).unwrap_err().is_violation());
    Ok(())
}

#[test]
fn test_variadic_keyword_binding() -> Result<()> {
    let signature = Signature::new()
        .param("a")
        .param("b")
        .param_default("c", 1)
        .var_keyword("kwargs");
    let bindings = reconstruct(&signature, &CallArgs::new([1, 2]).keyword("d", 2))?;

    assert_eq!(bindings["a"], Value::Int(1));
    assert_eq!(bindings["b"], Value::Int(2));
    assert_eq!(bindings["c"], Value::Int(1));
    assert_eq!(bindings["kwargs"], Value::map([("d", 2)]));
    Ok(())
}

#[test]
fn test_full_signature_binding() -> Result<()> {
    let signature = Signature::new()
        .param("a")
        .param("b")
        .var_positional("args")
        .keyword_only_default("c", 1)
        .keyword_only_default("d", 2)
        .var_keyword("kwargs");
    let call = CallArgs::new([1, 2, 3, 4, 5]).keyword("e", 5).keyword("f", 6);
    let bindings = reconstruct(&signature, &call)?;

    assert_eq!(bindings.len(), 6);
    assert_eq!(bindings["args"], Value::from(vec![3, 4, 5]));
    assert_eq!(bindings["c"], Value::Int(1));
    assert_eq!(bindings["d"], Value::Int(2));
    assert_eq!(bindings["kwargs"], Value::map([("e", 5), ("f", 6)]));
    Ok(())
}

#[test]
fn test_kwargs_visible_to_clauses() -> Result<()> {
    let doc = "
        Requires:
            kwargs.contains_key(&\"scale\")
            kwargs[\"scale\"] > 0
    ";
    let signature = Signature::new().param("a").var_keyword("kwargs");
    let f = Enforcer::default().wrap("f", signature, Some(doc), sum)?;

    assert!(f.call(&CallArgs::new([1]).keyword("scale", 2)).is_ok());
    assert!(f.call(&CallArgs::new([1]).keyword("scale", 0)).is_err());
    // No extra keywords leaves `kwargs` unbound
    assert!(matches!(
        f.call(&CallArgs::new([1])),
        Err(ContractError::Evaluation { .. })
    ));
    Ok(())
}

#[test]
fn test_type_contract_without_function_contract() -> Result<()> {
    let types = TypeRegistry::new().with(TypeDef::alias("PositiveInteger", TypeRef::Int).doc(
        "
        Requires:
            self > 0
    ",
    ));
    let f = Enforcer::default().with_types(types).wrap(
        "f",
        Signature::new().typed("a", TypeRef::named("PositiveInteger")),
        None,
        sum,
    )?;

    assert_eq!(f.call(&CallArgs::new([3]))?, Value::Int(3));
    let err = f.call(&CallArgs::new([0])).unwrap_err();
    let violation = err.violation().expect("violation");
    assert_eq!(violation.kind, ViolationKind::AnnotationPrecondition);
    assert_eq!(violation.clause, "a > 0");
    Ok(())
}

#[test]
fn test_type_checks_from_json_options() -> Result<()> {
    let options = ContractOptions::from_json(r#"{ "type_checks": true }"#)?;
    let f = Enforcer::new(options).wrap("f", Signature::new().typed("a", TypeRef::Int), None, sum)?;

    assert!(f.call(&CallArgs::new([5])).is_ok());
    let err = f.call(&CallArgs::new([5.0])).unwrap_err();
    assert_eq!(err.violation().map(|v| v.kind), Some(ViolationKind::TypeCheck));
    Ok(())
}

#[test]
fn test_violation_report() -> Result<()> {
    let f = Enforcer::default().wrap(
        "f",
        Signature::new().param("a").var_keyword("kwargs"),
        Some(RANGES.replace("(6..7).contains(&b)", "a >= 0").as_str()),
        sum,
    )?;
    let err = f.call(&CallArgs::new([3]).keyword("tag", "x")).unwrap_err();
    let violation = match err {
        ContractError::Violation(violation) => violation,
        other => anyhow::bail!("expected a violation, got {other}"),
    };

    let report: serde_json::Value = serde_json::from_str(&violation.to_json())?;
    assert_eq!(report["kind"], "precondition");
    assert_eq!(report["function"], "f");
    assert_eq!(report["clause"], "(0..1).contains(&a)");
    assert_eq!(report["arguments"], serde_json::json!([3]));
    assert_eq!(report["keywords"], serde_json::json!({ "tag": "x" }));
    assert!(report.get("return_value").is_none());
    Ok(())
}

#[test]
fn test_shared_cache_across_enforcers() -> Result<()> {
    let cache = Arc::new(ClauseCache::new());
    let signature = Signature::new().param("a").param("b").param("c");
    let first = Enforcer::default()
        .with_cache(Arc::clone(&cache))
        .wrap("f", signature.clone(), Some(RANGES), sum)?;
    let second = Enforcer::default()
        .with_cache(Arc::clone(&cache))
        .wrap("g", signature, Some(RANGES), sum)?;

    assert!(Arc::ptr_eq(&first.spec().doc, &second.spec().doc));
    assert_eq!(cache.len(), 1);
    Ok(())
}
