//! Typed syntax tree handed over by the front end.
//!
//! Lexing, parsing, type checking and the tree rewrites (dead-code trimming,
//! short-circuit lowering, loop desugaring) all happen before this crate
//! sees a function. What arrives here is already valid: every variable is
//! declared and initialised before it is read, every expression carries its
//! resolved [`Type`], and `&&`/`||` no longer short-circuit.
//!
//! The helper constructors keep hand-written trees in tests and in
//! [`samples`] short.

pub mod samples;

use std::fmt;

/// Resolved type of an expression or declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not.
    Not,
    /// Bitwise complement.
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    LogicalAnd,
    LogicalOr,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    /// Type of `lhs op rhs` given the operand type.
    pub fn result_type(self, operand: Type) -> Type {
        if self.is_comparison() || self.is_logical() {
            Type::Bool
        } else {
            operand
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Bool(bool),
    Var(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Self {
            kind: ExprKind::Int(value),
            ty: Type::Int,
        }
    }

    pub fn bool(value: bool) -> Self {
        Self {
            kind: ExprKind::Bool(value),
            ty: Type::Bool,
        }
    }

    /// Read of an `int` variable.
    pub fn var(name: &str) -> Self {
        Self::typed_var(name, Type::Int)
    }

    pub fn typed_var(name: &str, ty: Type) -> Self {
        Self {
            kind: ExprKind::Var(name.to_string()),
            ty,
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let ty = match op {
            UnaryOp::Not => Type::Bool,
            UnaryOp::Neg | UnaryOp::BitNot => operand.ty,
        };
        Self {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let ty = op.result_type(lhs.ty);
        Self {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        }
    }

    pub fn ternary(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        let ty = then.ty;
        Self {
            kind: ExprKind::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Declare {
        name: String,
        ty: Type,
        init: Option<Expr>,
    },
    /// `name = value`, or `name op= value` when `op` is set.
    Assign {
        name: String,
        op: Option<BinaryOp>,
        value: Expr,
    },
    Expr(Expr),
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Return(Expr),
}

impl Stmt {
    /// `int name = init;`
    pub fn declare(name: &str, init: Expr) -> Self {
        Stmt::Declare {
            name: name.to_string(),
            ty: init.ty,
            init: Some(init),
        }
    }

    pub fn assign(name: &str, value: Expr) -> Self {
        Stmt::Assign {
            name: name.to_string(),
            op: None,
            value,
        }
    }

    pub fn compound(name: &str, op: BinaryOp, value: Expr) -> Self {
        Stmt::Assign {
            name: name.to_string(),
            op: Some(op),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub body: Vec<Stmt>,
}

impl Function {
    /// `int name(int p0, int p1, ...) { body }`
    pub fn new(name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        Self {
            name: name.to_string(),
            params: params
                .iter()
                .map(|p| Param {
                    name: p.to_string(),
                    ty: Type::Int,
                })
                .collect(),
            return_type: Type::Int,
            body,
        }
    }
}
