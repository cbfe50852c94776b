use std::{fmt, str::FromStr};

/// Comparison operator of a filter leaf.
///
/// The `Any*` forms match when at least one of the related values satisfies the comparison;
/// the plain forms are the ones multi-match grouping applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignOp {
    Eq,
    Neq,
    Like,
    Nlike,
    Lt,
    Lte,
    Gt,
    Gte,
    AnyEq,
    AnyNeq,
    AnyLike,
    AnyNlike,
    AnyLt,
    AnyLte,
    AnyGt,
    AnyGte,
}

impl SignOp {
    pub fn is_any_match(self) -> bool {
        matches!(
            self,
            SignOp::AnyEq
                | SignOp::AnyNeq
                | SignOp::AnyLike
                | SignOp::AnyNlike
                | SignOp::AnyLt
                | SignOp::AnyLte
                | SignOp::AnyGt
                | SignOp::AnyGte
        )
    }

    /// The plain operator an any-match form compares with.
    pub fn base(self) -> SignOp {
        match self {
            SignOp::AnyEq => SignOp::Eq,
            SignOp::AnyNeq => SignOp::Neq,
            SignOp::AnyLike => SignOp::Like,
            SignOp::AnyNlike => SignOp::Nlike,
            SignOp::AnyLt => SignOp::Lt,
            SignOp::AnyLte => SignOp::Lte,
            SignOp::AnyGt => SignOp::Gt,
            SignOp::AnyGte => SignOp::Gte,
            op => op,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignOp::Eq => "=",
            SignOp::Neq => "!=",
            SignOp::Like => "~",
            SignOp::Nlike => "!~",
            SignOp::Lt => "<",
            SignOp::Lte => "<=",
            SignOp::Gt => ">",
            SignOp::Gte => ">=",
            SignOp::AnyEq => "?=",
            SignOp::AnyNeq => "?!=",
            SignOp::AnyLike => "?~",
            SignOp::AnyNlike => "?!~",
            SignOp::AnyLt => "?<",
            SignOp::AnyLte => "?<=",
            SignOp::AnyGt => "?>",
            SignOp::AnyGte => "?>=",
        }
    }
}

impl fmt::Display for SignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "=" => SignOp::Eq,
            "!=" => SignOp::Neq,
            "~" => SignOp::Like,
            "!~" => SignOp::Nlike,
            "<" => SignOp::Lt,
            "<=" => SignOp::Lte,
            ">" => SignOp::Gt,
            ">=" => SignOp::Gte,
            "?=" => SignOp::AnyEq,
            "?!=" => SignOp::AnyNeq,
            "?~" => SignOp::AnyLike,
            "?!~" => SignOp::AnyNlike,
            "?<" => SignOp::AnyLt,
            "?<=" => SignOp::AnyLte,
            "?>" => SignOp::AnyGt,
            "?>=" => SignOp::AnyGte,
            other => return Err(format!("unknown sign operator {other:?}")),
        };
        Ok(op)
    }
}
