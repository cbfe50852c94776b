use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    dbx::{Dialect, Expression, Params},
    resolver::{FieldResolver, MultiMatchSubquery, ResolverResult},
    search::{macro_value, Expr, ExprGroup, ExprItem, FilterError, JoinOp, SignOp, Token},
};

/// Compiles a parsed filter tree into a WHERE expression.
///
/// Sibling comparisons joined with AND that go through the same multi-valued
/// join chain are folded into a single `EXISTS` over that chain, so all of
/// them are asserted on one related row.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    groups: Vec<ExprGroup>,
    now: Option<DateTime<Utc>>,
}

impl SearchFilter {
    pub fn new(groups: Vec<ExprGroup>) -> Self {
        Self { groups, now: None }
    }

    /// Pins the instant used by the date/time identifier macros.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn groups(&self) -> &[ExprGroup] {
        &self.groups
    }

    pub fn build_expr(&self, resolver: &mut dyn FieldResolver) -> Result<Expression, FilterError> {
        let mut builder = FilterBuilder { resolver, now: self.now.unwrap_or_else(Utc::now) };
        builder.build_groups(&self.groups)
    }
}

impl From<Vec<ExprGroup>> for SearchFilter {
    fn from(groups: Vec<ExprGroup>) -> Self {
        Self::new(groups)
    }
}

struct FilterBuilder<'r> {
    resolver: &'r mut dyn FieldResolver,
    now: DateTime<Utc>,
}

enum Item {
    Leaf(Leaf),
    Nested(Expression),
}

enum Slot {
    Plain(Expression),
    Grouped(usize),
}

impl FilterBuilder<'_> {
    fn build_groups(&mut self, groups: &[ExprGroup]) -> Result<Expression, FilterError> {
        if groups.is_empty() {
            return Err(FilterError::EmptyFilter);
        }

        // AND-runs separated by OR
        let mut runs: Vec<Vec<Item>> = Vec::new();
        for (i, group) in groups.iter().enumerate() {
            let item = match &group.item {
                ExprItem::Expr(expr) => Item::Leaf(self.resolve_leaf(expr)?),
                ExprItem::Group(inner) => Item::Nested(self.build_groups(inner)?),
            };
            match runs.last_mut() {
                Some(run) if i > 0 && group.join == JoinOp::And => run.push(item),
                _ => runs.push(vec![item]),
            }
        }

        let dialect = self.resolver.dialect();
        let mut exprs: Vec<Expression> = runs.into_iter().map(|run| combine_run(run, dialect)).collect();
        if exprs.len() == 1 {
            if let Some(expr) = exprs.pop() {
                return Ok(expr);
            }
        }
        Ok(Expression::or(exprs))
    }

    fn resolve_leaf(&mut self, expr: &Expr) -> Result<Leaf, FilterError> {
        let left = self.resolve_token(&expr.left)?;
        if left.identifier.is_empty() {
            return Err(FilterError::InvalidLeftOperand(expr.left.literal()));
        }

        let right = self.resolve_token(&expr.right)?;
        if right.identifier.is_empty() {
            return Err(FilterError::InvalidRightOperand(expr.right.literal()));
        }

        Ok(Leaf { left, op: expr.op, right })
    }

    fn resolve_token(&mut self, token: &Token) -> Result<ResolverResult, FilterError> {
        match token {
            Token::Identifier(name) => {
                if let Some(value) = macro_value(name, self.now) {
                    return Ok(self.bind(value));
                }

                match self.resolver.resolve(name) {
                    Ok(result) => Ok(result),
                    // bare literals, unless a field with that name exists
                    Err(err) => match name.to_ascii_lowercase().as_str() {
                        "null" => Ok(ResolverResult::null()),
                        "true" => Ok(ResolverResult::identifier("1")),
                        "false" => Ok(ResolverResult::identifier("0")),
                        _ => Err(err.into()),
                    },
                }
            }
            Token::Text(text) => Ok(self.bind(Value::String(text.clone()))),
            Token::Number(number) => Ok(self.bind(Value::from(number.into_inner()))),
        }
    }

    fn bind(&mut self, value: Value) -> ResolverResult {
        let placeholder = self.resolver.next_placeholder("f");
        ResolverResult::param(&placeholder, value)
    }
}

fn combine_run(run: Vec<Item>, dialect: Dialect) -> Expression {
    let signatures: Vec<Option<String>> = run
        .iter()
        .map(|item| match item {
            Item::Leaf(leaf) => leaf.group_signature(dialect),
            Item::Nested(_) => None,
        })
        .collect();
    let shared = |signature: &str| signatures.iter().flatten().filter(|s| s.as_str() == signature).count() > 1;

    let mut groups: Vec<(String, MultiMatchSubquery, Vec<Expression>)> = Vec::new();
    let mut slots = Vec::with_capacity(run.len());

    for (item, signature) in run.into_iter().zip(signatures.iter()) {
        let leaf = match item {
            Item::Nested(expr) => {
                slots.push(Slot::Plain(expr));
                continue;
            }
            Item::Leaf(leaf) => leaf,
        };

        let grouped = signature
            .as_deref()
            .filter(|&s| shared(s))
            .and_then(|s| leaf.multi_match_condition(dialect).map(|(sq, cond)| (s, sq, cond)));
        match grouped {
            Some((signature, sub_query, condition)) => {
                match groups.iter().position(|(s, _, _)| s == signature) {
                    Some(idx) => groups[idx].2.push(condition),
                    None => {
                        groups.push((signature.to_string(), sub_query, vec![condition]));
                        slots.push(Slot::Grouped(groups.len() - 1));
                    }
                }
            }
            None => slots.push(Slot::Plain(leaf.build(dialect))),
        }
    }

    for (_, sub_query, conditions) in &groups {
        tracing::debug!(
            from = %sub_query.from_table_alias,
            conditions = conditions.len(),
            "grouping multi-match conditions into one EXISTS"
        );
    }

    let mut parts: Vec<Expression> = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Plain(expr) => expr,
            Slot::Grouped(idx) => {
                let (_, sub_query, conditions) = &mut groups[idx];
                sub_query.exists(std::mem::take(conditions))
            }
        })
        .collect();

    if parts.len() == 1 {
        if let Some(expr) = parts.pop() {
            return expr;
        }
    }
    Expression::and(parts)
}

/// Resolved comparison, kept unbuilt until its AND-run is known.
struct Leaf {
    left: ResolverResult,
    op: SignOp,
    right: ResolverResult,
}

impl Leaf {
    /// Multi-match chain signature, for comparisons that may be grouped:
    /// a plain operator, no post-build wrapper and exactly one multi-valued side.
    fn group_signature(&self, dialect: Dialect) -> Option<String> {
        if self.op.is_any_match() || self.left.after_build.is_some() || self.right.after_build.is_some() {
            return None;
        }
        match (&self.left.multi_match_sub_query, &self.right.multi_match_sub_query) {
            (Some(sq), None) | (None, Some(sq)) if sq.is_complete() => Some(sq.signature(dialect)),
            _ => None,
        }
    }

    /// The comparison restated on the mirrored chain's value column.
    fn multi_match_condition(&self, dialect: Dialect) -> Option<(MultiMatchSubquery, Expression)> {
        let mut left = self.left.clone();
        let mut right = self.right.clone();

        let sub_query = match (left.multi_match_sub_query.take(), right.multi_match_sub_query.take()) {
            (Some(sq), None) => {
                left.identifier = sq.value_identifier.clone();
                sq
            }
            (None, Some(sq)) => {
                right.identifier = sq.value_identifier.clone();
                sq
            }
            _ => return None,
        };

        Some((sub_query, build_comparison(&left, self.op, &right, dialect)))
    }

    fn build(&self, dialect: Dialect) -> Expression {
        let expr = build_comparison(&self.left, self.op, &self.right, dialect);
        let expr = self.left.apply_after_build(expr);
        self.right.apply_after_build(expr)
    }
}

fn build_comparison(left: &ResolverResult, op: SignOp, right: &ResolverResult, dialect: Dialect) -> Expression {
    let (l, r) = (&left.identifier, &right.identifier);
    match op.base() {
        SignOp::Eq => resolve_equal_expr(true, left, right),
        SignOp::Neq => resolve_equal_expr(false, left, right),
        SignOp::Like => like_expr("LIKE", left, right, dialect),
        SignOp::Nlike => like_expr("NOT LIKE", left, right, dialect),
        SignOp::Lt => Expression::raw_with_params(format!("{l} < {r}"), merge_params(left, right)),
        SignOp::Lte => Expression::raw_with_params(format!("{l} <= {r}"), merge_params(left, right)),
        SignOp::Gt => Expression::raw_with_params(format!("{l} > {r}"), merge_params(left, right)),
        _ => Expression::raw_with_params(format!("{l} >= {r}"), merge_params(left, right)),
    }
}

fn merge_params(left: &ResolverResult, right: &ResolverResult) -> Params {
    let mut params = left.params.clone();
    params.extend(right.params.iter().map(|(k, v)| (k.clone(), v.clone())));
    params
}

fn like_expr(keyword: &str, left: &ResolverResult, right: &ResolverResult, dialect: Dialect) -> Expression {
    // a column on the right side is matched as a substring
    if right.params.is_empty() {
        return Expression::raw_with_params(
            format!("{} {keyword} {}", left.identifier, dialect.like_contains(&right.identifier)),
            left.params.clone(),
        );
    }

    let mut params = left.params.clone();
    params.extend(right.params.iter().map(|(k, v)| (k.clone(), wrap_like_value(v))));
    Expression::raw_with_params(
        format!("{} {keyword} {}{}", left.identifier, right.identifier, dialect.like_escape()),
        params,
    )
}

/// `%value%` with LIKE wildcards escaped, unless the value already carries an unescaped `%`.
fn wrap_like_value(value: &Value) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if contains_unescaped_char(&text, '%') {
        return Value::String(text);
    }
    Value::String(format!("%{}%", escape_unescaped_chars(&text, &['\\', '%', '_'])))
}

fn contains_unescaped_char(text: &str, ch: char) -> bool {
    let mut prev = None;
    for c in text.chars() {
        if c == ch && prev != Some('\\') {
            return true;
        }
        prev = if c == '\\' && prev == Some('\\') { None } else { Some(c) };
    }
    false
}

/// Backslash-escapes `chars`, keeping escapes already present.
fn escape_unescaped_chars(text: &str, chars: &[char]) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut iter = text.chars().peekable();
    while let Some(c) = iter.next() {
        if c == '\\' {
            if let Some(&next) = iter.peek().filter(|n| chars.contains(n)) {
                out.push('\\');
                out.push(next);
                iter.next();
                continue;
            }
        }
        if chars.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn is_empty_identifier(result: &ResolverResult) -> bool {
    matches!(result.identifier.to_ascii_lowercase().as_str(), "" | "null" | "''" | "\"\"" | "``")
}

fn has_empty_param_value(result: &ResolverResult) -> bool {
    result.params.values().any(|v| match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    })
}

fn is_known_non_empty_identifier(result: &ResolverResult) -> bool {
    match result.identifier.to_ascii_lowercase().as_str() {
        "1" | "0" | "false" | "true" => true,
        _ => !result.params.is_empty() && !has_empty_param_value(result) && !is_empty_identifier(result),
    }
}

/// `=`/`!=` with the fewest `COALESCE` wrappers able to treat NULL and `''` alike.
fn resolve_equal_expr(equal: bool, left: &ResolverResult, right: &ResolverResult) -> Expression {
    let is_left_empty = is_empty_identifier(left) || (left.params.len() == 1 && has_empty_param_value(left));
    let is_right_empty = is_empty_identifier(right) || (right.params.len() == 1 && has_empty_param_value(right));
    let (op, concat, null_expr) = if equal { ("=", "OR", "IS NULL") } else { ("!=", "AND", "IS NOT NULL") };
    let (l, r) = (left.identifier.as_str(), right.identifier.as_str());
    let params = merge_params(left, right);

    if left.no_coalesce || right.no_coalesce {
        return Expression::raw_with_params(format!("{l} {op} {r}"), params);
    }

    if is_left_empty && is_right_empty {
        return Expression::raw_with_params(format!("'' {op} ''"), params);
    }

    if is_known_non_empty_identifier(left) || is_known_non_empty_identifier(right) {
        let l = if is_left_empty { "''" } else { l };
        let r = if is_right_empty { "''" } else { r };
        return Expression::raw_with_params(format!("{l} {op} {r}"), params);
    }

    if is_left_empty {
        let sql = if equal {
            format!("('' {op} {r} {concat} {r} {null_expr})")
        } else {
            format!("'' {op} {r}")
        };
        return Expression::raw_with_params(sql, params);
    }

    if is_right_empty {
        let sql = if equal {
            format!("({l} {op} '' {concat} {l} {null_expr})")
        } else {
            format!("{l} {op} ''")
        };
        return Expression::raw_with_params(sql, params);
    }

    Expression::raw_with_params(format!("COALESCE({l}, '') {op} COALESCE({r}, '')"), params)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::resolver::SimpleFieldResolver;

    fn build(groups: Vec<ExprGroup>, dialect: Dialect) -> (String, Params) {
        let mut resolver = SimpleFieldResolver::new(dialect, ["title", "views", "status", "^meta(\\.\\w+)*$"]);
        let expr = SearchFilter::new(groups).build_expr(&mut resolver).unwrap();
        let mut params = Params::new();
        let sql = expr.build(dialect, &mut params);
        (sql, params)
    }

    fn id(name: &str) -> Token {
        Token::identifier(name)
    }

    #[test]
    fn binds_literals_and_uses_direct_compare_for_non_empty_values() {
        let (sql, params) = build(
            vec![
                ExprGroup::and(id("title"), SignOp::Eq, Token::text("hello")),
                ExprGroup::and(id("views"), SignOp::Gt, Token::number(10.0).unwrap()),
            ],
            Dialect::MySql,
        );
        assert_eq!(sql, "(`title` = :f0) AND (`views` > :f1)");
        assert_eq!(params.get("f0"), Some(&json!("hello")));
        assert_eq!(params.get("f1"), Some(&json!(10.0)));
    }

    #[test]
    fn equality_against_empty_values_normalizes_null() {
        let (sql, _) = build(vec![ExprGroup::and(id("title"), SignOp::Eq, id("null"))], Dialect::MySql);
        assert_eq!(sql, "(`title` = '' OR `title` IS NULL)");

        let (sql, _) = build(vec![ExprGroup::and(id("title"), SignOp::Neq, Token::text(""))], Dialect::MySql);
        assert_eq!(sql, "`title` != ''");

        let (sql, _) = build(vec![ExprGroup::and(id("null"), SignOp::Eq, id("title"))], Dialect::MySql);
        assert_eq!(sql, "('' = `title` OR `title` IS NULL)");

        let (sql, _) = build(vec![ExprGroup::and(id("null"), SignOp::Neq, Token::text(""))], Dialect::MySql);
        assert_eq!(sql, "'' != ''");
    }

    #[test]
    fn column_to_column_equality_coalesces_both_sides() {
        let (sql, _) = build(vec![ExprGroup::and(id("title"), SignOp::Eq, id("status"))], Dialect::Sqlite);
        assert_eq!(sql, "COALESCE(\"title\", '') = COALESCE(\"status\", '')");
    }

    #[test]
    fn json_operands_skip_coalesce() {
        let (sql, _) = build(vec![ExprGroup::and(id("meta.a"), SignOp::Neq, id("title"))], Dialect::MySql);
        assert_eq!(
            sql,
            "(IF(JSON_VALID(`meta`),JSON_EXTRACT(`meta`,'$.a'),JSON_EXTRACT(JSON_OBJECT('pb',`meta`),'$.pb.a'))) != `title`"
        );
    }

    #[test]
    fn bool_literals_fall_back_to_numbers() {
        let (sql, _) = build(vec![ExprGroup::and(id("status"), SignOp::Eq, id("true"))], Dialect::MySql);
        assert_eq!(sql, "`status` = 1");
    }

    #[test]
    fn like_wraps_and_escapes_text_params() {
        let (sql, params) = build(vec![ExprGroup::and(id("title"), SignOp::Like, Token::text("50_off"))], Dialect::Sqlite);
        assert_eq!(sql, "\"title\" LIKE :f0 ESCAPE '\\'");
        assert_eq!(params.get("f0"), Some(&json!("%50\\_off%")));

        let (sql, params) = build(vec![ExprGroup::and(id("title"), SignOp::Nlike, Token::text("a%"))], Dialect::MySql);
        assert_eq!(sql, "`title` NOT LIKE :f0");
        assert_eq!(params.get("f0"), Some(&json!("a%")));
    }

    #[test]
    fn like_against_a_column_matches_substrings() {
        let (sql, _) = build(vec![ExprGroup::and(id("title"), SignOp::Like, id("status"))], Dialect::MySql);
        assert_eq!(sql, "`title` LIKE CONCAT('%',`status`,'%')");
    }

    #[test]
    fn or_splits_runs_and_groups_nest() {
        let (sql, _) = build(
            vec![
                ExprGroup::and(id("views"), SignOp::Gte, Token::number(1.0).unwrap()),
                ExprGroup::or(id("views"), SignOp::Lte, Token::number(5.0).unwrap()),
                ExprGroup::group(
                    JoinOp::And,
                    vec![
                        ExprGroup::and(id("status"), SignOp::Eq, Token::text("a")),
                        ExprGroup::or(id("status"), SignOp::Eq, Token::text("b")),
                    ],
                ),
            ],
            Dialect::MySql,
        );
        assert_eq!(
            sql,
            "(`views` >= :f0) OR ((`views` <= :f1) AND ((`status` = :f2) OR (`status` = :f3)))"
        );
    }

    #[test]
    fn macros_are_bound_at_the_pinned_instant() {
        let mut resolver = SimpleFieldResolver::new(Dialect::MySql, ["title"]);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let expr = SearchFilter::new(vec![ExprGroup::and(id("title"), SignOp::Lt, id("@todayStart"))])
            .with_now(now)
            .build_expr(&mut resolver)
            .unwrap();

        let mut params = Params::new();
        assert_eq!(expr.build(Dialect::MySql, &mut params), "`title` < :f0");
        assert_eq!(params.get("f0"), Some(&json!("2024-05-01 00:00:00.000Z")));
    }

    #[test]
    fn reports_empty_filters_and_unresolvable_operands() {
        let mut resolver = SimpleFieldResolver::new(Dialect::MySql, ["title"]);
        assert_eq!(
            SearchFilter::new(vec![]).build_expr(&mut resolver).unwrap_err(),
            FilterError::EmptyFilter
        );

        let err = SearchFilter::new(vec![ExprGroup::and(id("secret"), SignOp::Eq, Token::text("x"))])
            .build_expr(&mut resolver)
            .unwrap_err();
        assert!(matches!(err, FilterError::Resolution(e) if e.path == "secret"));

        let err = SearchFilter::new(vec![ExprGroup::and(id("title"), SignOp::Eq, Token::identifier(""))])
            .build_expr(&mut resolver)
            .unwrap_err();
        assert!(matches!(err, FilterError::Resolution(_)));
    }

    #[test]
    fn like_escaping_helpers() {
        assert!(contains_unescaped_char("abc%abc", '%'));
        assert!(!contains_unescaped_char("abc\\%abc", '%'));
        assert!(contains_unescaped_char("abc\\\\%abc", '%'));

        assert_eq!(escape_unescaped_chars("a_b", &['\\', '%', '_']), "a\\_b");
        assert_eq!(escape_unescaped_chars("ab\\_c", &['\\', '%', '_']), "ab\\_c");
        assert_eq!(escape_unescaped_chars("a\\b", &['\\', '%', '_']), "a\\\\b");
    }
}
