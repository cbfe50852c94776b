use crate::search::{SignOp, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinOp {
    #[default]
    And,
    Or,
}

impl JoinOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinOp::And => "AND",
            JoinOp::Or => "OR",
        }
    }
}

/// Single comparison `left op right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub left: Token,
    pub op: SignOp,
    pub right: Token,
}

impl Expr {
    pub fn new(left: Token, op: SignOp, right: Token) -> Self {
        Self { left, op, right }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprItem {
    Expr(Expr),
    /// Parenthesized sub-filter.
    Group(Vec<ExprGroup>),
}

/// One entry of a parsed filter. `join` links it to the previous entry
/// of the same level and is ignored on the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprGroup {
    pub join: JoinOp,
    pub item: ExprItem,
}

impl ExprGroup {
    pub fn new(join: JoinOp, item: ExprItem) -> Self {
        Self { join, item }
    }

    pub fn and(left: Token, op: SignOp, right: Token) -> Self {
        Self::new(JoinOp::And, ExprItem::Expr(Expr::new(left, op, right)))
    }

    pub fn or(left: Token, op: SignOp, right: Token) -> Self {
        Self::new(JoinOp::Or, ExprItem::Expr(Expr::new(left, op, right)))
    }

    pub fn group(join: JoinOp, items: Vec<ExprGroup>) -> Self {
        Self::new(join, ExprItem::Group(items))
    }
}
