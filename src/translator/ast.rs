//! Clause expression AST
//!
//! The closed set of constructs a contract clause may use. Built once per
//! clause by [`lowering`](super::lowering) and evaluated per call by
//! [`evaluator`](super::evaluator).

use std::collections::BTreeSet;

use crate::value::Value;

/// Name a type contract uses for the value it constrains.
pub const SELF_PLACEHOLDER: &str = "self";

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuit `&&` / `||`.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `collection.contains(&element)`
    Contains {
        collection: Box<Expr>,
        element: Box<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Range {
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        inclusive: bool,
    },
    List(Vec<Expr>),
    /// Environment callable or built-in; method calls are lowered here with
    /// the receiver as first argument.
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl Expr {
    /// Every name the expression reads, excluding called function names.
    pub fn free_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.walk(&mut |expr| {
            if let Expr::Name(name) = expr {
                names.insert(name.clone());
            }
        });
        names
    }

    /// Names of every function the expression calls.
    pub fn called_functions(&self) -> BTreeSet<String> {
        let mut functions = BTreeSet::new();
        self.walk(&mut |expr| {
            if let Expr::Call { function, .. } = expr {
                functions.insert(function.clone());
            }
        });
        functions
    }

    /// Copy of the expression with every read of `from` replaced by `to`.
    pub fn rename(&self, from: &str, to: &str) -> Expr {
        let boxed = |e: &Expr| Box::new(e.rename(from, to));
        match self {
            Expr::Name(name) if name == from => Expr::Name(to.to_string()),
            Expr::Literal(_) | Expr::Name(_) => self.clone(),
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: boxed(operand),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: boxed(left),
                right: boxed(right),
            },
            Expr::Compare { op, left, right } => Expr::Compare {
                op: *op,
                left: boxed(left),
                right: boxed(right),
            },
            Expr::Logical { op, left, right } => Expr::Logical {
                op: *op,
                left: boxed(left),
                right: boxed(right),
            },
            Expr::Contains { collection, element } => Expr::Contains {
                collection: boxed(collection),
                element: boxed(element),
            },
            Expr::Field { base, field } => Expr::Field {
                base: boxed(base),
                field: field.clone(),
            },
            Expr::Index { base, index } => Expr::Index {
                base: boxed(base),
                index: boxed(index),
            },
            Expr::Range { start, end, inclusive } => Expr::Range {
                start: start.as_deref().map(boxed),
                end: end.as_deref().map(boxed),
                inclusive: *inclusive,
            },
            Expr::List(items) => Expr::List(items.iter().map(|e| e.rename(from, to)).collect()),
            Expr::Call { function, args } => Expr::Call {
                function: function.clone(),
                args: args.iter().map(|e| e.rename(from, to)).collect(),
            },
        }
    }

    fn walk(&self, visit: &mut dyn FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Name(_) => {}
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Binary { left, right, .. }
            | Expr::Compare { left, right, .. }
            | Expr::Logical { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Contains { collection, element } => {
                collection.walk(visit);
                element.walk(visit);
            }
            Expr::Field { base, .. } => base.walk(visit),
            Expr::Index { base, index } => {
                base.walk(visit);
                index.walk(visit);
            }
            Expr::Range { start, end, .. } => {
                if let Some(start) = start {
                    start.walk(visit);
                }
                if let Some(end) = end {
                    end.walk(visit);
                }
            }
            Expr::List(items) | Expr::Call { args: items, .. } => {
                for item in items {
                    item.walk(visit);
                }
            }
        }
    }
}
