use tat_common::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// The typed AST for the stage-expression language: an explicit tagged
/// tree, never a host-language `eval`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Scalar),
    Name(String),
    List(Vec<Expr>),
    Call { name: String, args: Vec<Expr> },
    BinOp {
        op: BinOpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}
