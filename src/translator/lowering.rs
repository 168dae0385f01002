//! Clause translator: Rust syntax → clause AST
//!
//! Clause sources are parsed with `syn` as ordinary Rust expressions, then
//! lowered into [`Expr`]. Only the constructs listed in [`Expr`] are accepted;
//! anything else is rejected at wrap time so a bad clause never reaches a call.

use crate::error::ConfigError;
use crate::translator::ast::{BinaryOp, CompareOp, Expr, LogicalOp, UnaryOp};
use crate::value::Value;

/// Parse and lower one clause source.
pub fn compile_expr(source: &str) -> Result<Expr, ConfigError> {
    let parsed: syn::Expr = syn::parse_str(source).map_err(|e| ConfigError::Syntax {
        clause: source.to_string(),
        message: e.to_string(),
    })?;
    translate_expr(&parsed).map_err(|e| match e {
        TranslationError::Unsupported(construct) => ConfigError::Unsupported {
            clause: source.to_string(),
            construct,
        },
        TranslationError::ParseError(message) => ConfigError::Syntax {
            clause: source.to_string(),
            message,
        },
    })
}

/// Translation errors, mapped to [`ConfigError`] by [`compile_expr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    Unsupported(String),
    ParseError(String),
}

/// Lower a parsed Rust expression.
pub fn translate_expr(expr: &syn::Expr) -> Result<Expr, TranslationError> {
    match expr {
        syn::Expr::Lit(lit) => translate_literal(&lit.lit),
        syn::Expr::Path(path) => translate_path(path),
        syn::Expr::Paren(paren) => translate_expr(&paren.expr),
        syn::Expr::Group(group) => translate_expr(&group.expr),
        // `&x` reads `x`
        syn::Expr::Reference(reference) => translate_expr(&reference.expr),
        syn::Expr::Unary(unary) => {
            let operand = Box::new(translate_expr(&unary.expr)?);
            let op = match unary.op {
                syn::UnOp::Not(_) => UnaryOp::Not,
                syn::UnOp::Neg(_) => UnaryOp::Neg,
                // `*x` reads `x`
                syn::UnOp::Deref(_) => return Ok(*operand),
                _ => return Err(TranslationError::Unsupported("unary operator".into())),
            };
            Ok(Expr::Unary { op, operand })
        }
        syn::Expr::Binary(bin) => {
            let left = Box::new(translate_expr(&bin.left)?);
            let right = Box::new(translate_expr(&bin.right)?);
            translate_binary_op(bin.op, left, right)
        }
        syn::Expr::Range(range) => Ok(Expr::Range {
            start: range
                .start
                .as_deref()
                .map(translate_expr)
                .transpose()?
                .map(Box::new),
            end: range
                .end
                .as_deref()
                .map(translate_expr)
                .transpose()?
                .map(Box::new),
            inclusive: matches!(range.limits, syn::RangeLimits::Closed(_)),
        }),
        syn::Expr::Array(array) => Ok(Expr::List(
            array
                .elems
                .iter()
                .map(translate_expr)
                .collect::<Result<_, _>>()?,
        )),
        syn::Expr::Tuple(tuple) => Ok(Expr::List(
            tuple
                .elems
                .iter()
                .map(translate_expr)
                .collect::<Result<_, _>>()?,
        )),
        syn::Expr::Field(field) => {
            let base = Box::new(translate_expr(&field.base)?);
            match &field.member {
                syn::Member::Named(ident) => Ok(Expr::Field {
                    base,
                    field: ident.to_string(),
                }),
                // `t.0` indexes a tuple
                syn::Member::Unnamed(index) => Ok(Expr::Index {
                    base,
                    index: Box::new(Expr::Literal(Value::Int(i64::from(index.index)))),
                }),
            }
        }
        syn::Expr::Index(index) => Ok(Expr::Index {
            base: Box::new(translate_expr(&index.expr)?),
            index: Box::new(translate_expr(&index.index)?),
        }),
        syn::Expr::MethodCall(method) => translate_method_call(method),
        syn::Expr::Call(call) => translate_call(call),
        other => Err(TranslationError::Unsupported(describe(other).to_string())),
    }
}

fn translate_literal(lit: &syn::Lit) -> Result<Expr, TranslationError> {
    let value = match lit {
        syn::Lit::Int(int_lit) => Value::Int(
            int_lit
                .base10_parse::<i64>()
                .map_err(|e| TranslationError::ParseError(e.to_string()))?,
        ),
        syn::Lit::Float(float_lit) => Value::Float(
            float_lit
                .base10_parse::<f64>()
                .map_err(|e| TranslationError::ParseError(e.to_string()))?,
        ),
        syn::Lit::Bool(bool_lit) => Value::Bool(bool_lit.value),
        syn::Lit::Str(str_lit) => Value::Str(str_lit.value()),
        syn::Lit::Char(char_lit) => Value::Str(char_lit.value().to_string()),
        _ => return Err(TranslationError::Unsupported("literal".into())),
    };
    Ok(Expr::Literal(value))
}

fn translate_path(path: &syn::ExprPath) -> Result<Expr, TranslationError> {
    if path.qself.is_some() || path.path.segments.len() != 1 {
        return Err(TranslationError::Unsupported(format!(
            "path `{}`",
            path_to_string(&path.path)
        )));
    }
    let name = path.path.segments[0].ident.to_string();
    Ok(match name.as_str() {
        "None" => Expr::Literal(Value::None),
        _ => Expr::Name(name),
    })
}

fn translate_binary_op(
    op: syn::BinOp,
    left: Box<Expr>,
    right: Box<Expr>,
) -> Result<Expr, TranslationError> {
    let arithmetic = match op {
        syn::BinOp::Add(_) => Some(BinaryOp::Add),
        syn::BinOp::Sub(_) => Some(BinaryOp::Sub),
        syn::BinOp::Mul(_) => Some(BinaryOp::Mul),
        syn::BinOp::Div(_) => Some(BinaryOp::Div),
        syn::BinOp::Rem(_) => Some(BinaryOp::Rem),
        _ => None,
    };
    if let Some(op) = arithmetic {
        return Ok(Expr::Binary { op, left, right });
    }

    let comparison = match op {
        syn::BinOp::Eq(_) => Some(CompareOp::Eq),
        syn::BinOp::Ne(_) => Some(CompareOp::Ne),
        syn::BinOp::Lt(_) => Some(CompareOp::Lt),
        syn::BinOp::Le(_) => Some(CompareOp::Le),
        syn::BinOp::Gt(_) => Some(CompareOp::Gt),
        syn::BinOp::Ge(_) => Some(CompareOp::Ge),
        _ => None,
    };
    if let Some(op) = comparison {
        return Ok(Expr::Compare { op, left, right });
    }

    match op {
        syn::BinOp::And(_) => Ok(Expr::Logical { op: LogicalOp::And, left, right }),
        syn::BinOp::Or(_) => Ok(Expr::Logical { op: LogicalOp::Or, left, right }),
        _ => Err(TranslationError::Unsupported("binary operator".into())),
    }
}

/// `x.contains(&y)` becomes a membership test; any other `x.m(args)` becomes
/// `m(x, args)`.
fn translate_method_call(method: &syn::ExprMethodCall) -> Result<Expr, TranslationError> {
    if method.turbofish.is_some() {
        return Err(TranslationError::Unsupported("turbofish".into()));
    }
    let receiver = translate_expr(&method.receiver)?;
    let mut args = method
        .args
        .iter()
        .map(translate_expr)
        .collect::<Result<Vec<_>, _>>()?;
    let method_name = method.method.to_string();

    if method_name == "contains" && args.len() == 1 {
        return Ok(Expr::Contains {
            collection: Box::new(receiver),
            element: Box::new(args.remove(0)),
        });
    }

    args.insert(0, receiver);
    Ok(Expr::Call {
        function: method_name,
        args,
    })
}

fn translate_call(call: &syn::ExprCall) -> Result<Expr, TranslationError> {
    let function = match call.func.as_ref() {
        syn::Expr::Path(path) if path.qself.is_none() && path.path.segments.len() == 1 => {
            path.path.segments[0].ident.to_string()
        }
        _ => return Err(TranslationError::Unsupported("call target".into())),
    };
    let args = call
        .args
        .iter()
        .map(translate_expr)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::Call { function, args })
}

/// Short description of a construct we do not lower.
fn describe(expr: &syn::Expr) -> &'static str {
    match expr {
        syn::Expr::Assign(_) => "assignment",
        syn::Expr::Async(_) => "async block",
        syn::Expr::Await(_) => "await",
        syn::Expr::Block(_) => "block",
        syn::Expr::Break(_) => "break",
        syn::Expr::Cast(_) => "cast",
        syn::Expr::Closure(_) => "closure",
        syn::Expr::Continue(_) => "continue",
        syn::Expr::ForLoop(_) => "for loop",
        syn::Expr::If(_) => "if expression",
        syn::Expr::Let(_) => "let",
        syn::Expr::Loop(_) => "loop",
        syn::Expr::Macro(_) => "macro",
        syn::Expr::Match(_) => "match",
        syn::Expr::Repeat(_) => "array repeat",
        syn::Expr::Return(_) => "return",
        syn::Expr::Struct(_) => "struct literal",
        syn::Expr::Try(_) => "`?` operator",
        syn::Expr::Unsafe(_) => "unsafe block",
        syn::Expr::While(_) => "while loop",
        _ => "expression",
    }
}

/// Convert a path to a string representation
fn path_to_string(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|seg| seg.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    fn int(i: i64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Int(i)))
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            compile_expr("a >= 0").unwrap(),
            Expr::Compare {
                op: CompareOp::Ge,
                left: name("a"),
                right: int(0),
            }
        );
    }

    #[test]
    fn test_range_membership() {
        assert_eq!(
            compile_expr("(0..1).contains(&a)").unwrap(),
            Expr::Contains {
                collection: Box::new(Expr::Range {
                    start: Some(int(0)),
                    end: Some(int(1)),
                    inclusive: false,
                }),
                element: name("a"),
            }
        );
    }

    #[test]
    fn test_self_placeholder_is_a_name() {
        let expr = compile_expr("self.a > 1").unwrap();
        assert_eq!(expr.free_names().into_iter().collect::<Vec<_>>(), vec!["self"]);
    }

    #[test]
    fn test_method_call_sugar() {
        assert_eq!(
            compile_expr("xs.len()").unwrap(),
            Expr::Call {
                function: "len".into(),
                args: vec![Expr::Name("xs".into())],
            }
        );
    }

    #[test]
    fn test_logical_and_precedence() {
        let expr = compile_expr("a > 0 && b < 2 || c").unwrap();
        assert!(matches!(expr, Expr::Logical { op: LogicalOp::Or, .. }));
    }

    #[test]
    fn test_literals() {
        assert_eq!(compile_expr("None").unwrap(), Expr::Literal(Value::None));
        assert_eq!(compile_expr("2.5").unwrap(), Expr::Literal(Value::Float(2.5)));
        assert_eq!(
            compile_expr("\"k\"").unwrap(),
            Expr::Literal(Value::Str("k".into()))
        );
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            compile_expr("a >"),
            Err(ConfigError::Syntax { clause, .. }) if clause == "a >"
        ));
        // Not Rust syntax
        assert!(matches!(
            compile_expr("a in range(0, 1)"),
            Err(ConfigError::Syntax { .. })
        ));
    }

    #[test]
    fn test_unsupported_constructs() {
        for source in ["|x| x > 0", "{ a }", "a as f64", "xs.iter().map::<i64>()"] {
            assert!(
                matches!(compile_expr(source), Err(ConfigError::Unsupported { .. })),
                "{} should be rejected",
                source
            );
        }
    }

    #[test]
    fn test_qualified_paths_rejected() {
        assert!(matches!(
            compile_expr("std::i64::MAX > a"),
            Err(ConfigError::Unsupported { construct, .. }) if construct.contains("std::i64::MAX")
        ));
    }
}
