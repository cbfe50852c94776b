use std::{fmt, sync::Arc};

use serde_json::Value;

use crate::{
    dbx::{Expression, Params},
    resolver::MultiMatchSubquery,
};

/// Post-processing applied to the comparison expression a resolved field takes part in.
pub type AfterBuild = Arc<dyn Fn(Expression) -> Expression + Send + Sync>;

/// Outcome of resolving one field path.
#[derive(Clone, Default)]
pub struct ResolverResult {
    /// SQL operand: a column reference, function call, literal or `:placeholder`.
    pub identifier: String,
    /// Compare directly instead of wrapping in `COALESCE(.., '')`.
    pub no_coalesce: bool,
    pub params: Params,
    pub multi_match_sub_query: Option<MultiMatchSubquery>,
    pub after_build: Option<AfterBuild>,
}

impl ResolverResult {
    pub fn identifier(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), ..Default::default() }
    }

    pub fn null() -> Self {
        Self::identifier("NULL")
    }

    /// Binds `value` under `placeholder` and references it as the identifier.
    pub fn param(placeholder: &str, value: Value) -> Self {
        let mut params = Params::new();
        params.insert(placeholder.to_string(), value);
        Self { identifier: format!(":{placeholder}"), params, ..Default::default() }
    }

    pub fn with_no_coalesce(mut self, no_coalesce: bool) -> Self {
        self.no_coalesce = no_coalesce;
        self
    }

    pub fn with_multi_match(mut self, sub_query: MultiMatchSubquery) -> Self {
        self.multi_match_sub_query = Some(sub_query);
        self
    }

    pub fn with_after_build(mut self, after_build: AfterBuild) -> Self {
        self.after_build = Some(after_build);
        self
    }

    pub fn apply_after_build(&self, expr: Expression) -> Expression {
        match &self.after_build {
            Some(f) => f(expr),
            None => expr,
        }
    }
}

impl fmt::Debug for ResolverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverResult")
            .field("identifier", &self.identifier)
            .field("no_coalesce", &self.no_coalesce)
            .field("params", &self.params)
            .field("multi_match_sub_query", &self.multi_match_sub_query)
            .field("after_build", &self.after_build.is_some())
            .finish()
    }
}
