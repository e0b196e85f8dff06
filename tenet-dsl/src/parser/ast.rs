//! AST type definitions
//!
//! The tree is strictly owned top-down: every node owns its children and
//! nothing is shared. A fresh tree is built for every evaluation.

use tenet_core::Value;

/// Binary operators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, boolean or null literal
    Literal(Value),
    Identifier(String),
    /// `object.property`
    Member {
        object: Box<Expr>,
        property: String,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `name(args...)`
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    /// Object literal; keys keep their source order
    Object(Vec<(String, Expr)>),
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Names of every function called anywhere in the tree.
    pub fn called_functions(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_calls(&mut names);
        names
    }

    fn collect_calls<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) | Expr::Identifier(_) => {}
            Expr::Member { object, .. } => object.collect_calls(names),
            Expr::Index { object, index } => {
                object.collect_calls(names);
                index.collect_calls(names);
            }
            Expr::Binary { left, right, .. } => {
                left.collect_calls(names);
                right.collect_calls(names);
            }
            Expr::Unary { operand, .. } => operand.collect_calls(names),
            Expr::Call { name, args } => {
                names.push(name);
                args.iter().for_each(|a| a.collect_calls(names));
            }
            Expr::Array(items) => items.iter().for_each(|i| i.collect_calls(names)),
            Expr::Object(entries) => entries.iter().for_each(|(_, v)| v.collect_calls(names)),
        }
    }
}
