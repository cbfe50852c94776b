use serde_json::Value;

use crate::dbx::{Dialect, Expression, Params, Query, QueryBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinInfo {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub on: Option<Expression>,
}

impl JoinInfo {
    /// Name the join is known by in the statement: its alias, else its table.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

#[derive(Debug, Clone)]
pub struct UnionInfo {
    pub all: bool,
    pub query: Query,
}

/// Fluent, mutable SELECT statement.
///
/// Joins are keyed by alias: registering a second join under an existing alias
/// replaces that join's kind and ON condition in place.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    dialect: Dialect,
    select: Vec<String>,
    distinct: bool,
    select_option: Option<String>,
    from: Vec<String>,
    joins: Vec<JoinInfo>,
    where_expr: Option<Expression>,
    group_by: Vec<String>,
    having: Option<Expression>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: u64,
    unions: Vec<UnionInfo>,
    params: Params,
}

impl SelectQuery {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            select: Vec::new(),
            distinct: false,
            select_option: None,
            from: Vec::new(),
            joins: Vec::new(),
            where_expr: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: 0,
            unions: Vec::new(),
            params: Params::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn select<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn and_select<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.select.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Keyword rendered right after `SELECT`, e.g. `SQL_CALC_FOUND_ROWS`.
    pub fn select_option(&mut self, option: impl Into<String>) -> &mut Self {
        self.select_option = Some(option.into());
        self
    }

    pub fn from<S: Into<String>>(&mut self, tables: impl IntoIterator<Item = S>) -> &mut Self {
        self.from = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_tables(&self) -> &[String] {
        &self.from
    }

    /// Alias (or table name) of the first FROM entry.
    pub fn main_reference(&self) -> Option<&str> {
        self.from.first().map(|table| match QueryBuilder::split_alias(table.trim()) {
            (_, Some(alias)) => alias,
            (name, None) => name,
        })
    }

    /// Adds a join; `table` may carry an alias (`"posts p"` or `"posts AS p"`).
    pub fn join(&mut self, kind: JoinKind, table: &str, on: Option<Expression>) -> &mut Self {
        let (name, alias) = QueryBuilder::split_alias(table.trim());
        let info = JoinInfo {
            kind,
            table: name.trim().to_string(),
            alias: alias.map(str::to_string),
            on,
        };

        match self.joins.iter_mut().find(|j| j.reference() == info.reference()) {
            Some(existing) => {
                existing.kind = info.kind;
                existing.on = info.on;
            }
            None => self.joins.push(info),
        }
        self
    }

    pub fn inner_join(&mut self, table: &str, on: Option<Expression>) -> &mut Self {
        self.join(JoinKind::Inner, table, on)
    }

    pub fn left_join(&mut self, table: &str, on: Option<Expression>) -> &mut Self {
        self.join(JoinKind::Left, table, on)
    }

    pub fn right_join(&mut self, table: &str, on: Option<Expression>) -> &mut Self {
        self.join(JoinKind::Right, table, on)
    }

    pub fn joins(&self) -> &[JoinInfo] {
        &self.joins
    }

    pub fn where_clause(&mut self, expr: Expression) -> &mut Self {
        self.where_expr = Some(expr);
        self
    }

    pub fn and_where(&mut self, expr: Expression) -> &mut Self {
        self.where_expr = Some(match self.where_expr.take() {
            Some(current) => Expression::and([current, expr]),
            None => expr,
        });
        self
    }

    pub fn or_where(&mut self, expr: Expression) -> &mut Self {
        self.where_expr = Some(match self.where_expr.take() {
            Some(current) => Expression::or([current, expr]),
            None => expr,
        });
        self
    }

    pub fn group_by<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn and_group_by<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn having(&mut self, expr: Expression) -> &mut Self {
        self.having = Some(expr);
        self
    }

    pub fn and_having(&mut self, expr: Expression) -> &mut Self {
        self.having = Some(match self.having.take() {
            Some(current) => Expression::and([current, expr]),
            None => expr,
        });
        self
    }

    pub fn or_having(&mut self, expr: Expression) -> &mut Self {
        self.having = Some(match self.having.take() {
            Some(current) => Expression::or([current, expr]),
            None => expr,
        });
        self
    }

    pub fn order_by<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.order_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn and_order_by<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.order_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn limit(&mut self, limit: Option<u64>) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = offset;
        self
    }

    pub fn union(&mut self, query: Query) -> &mut Self {
        self.unions.push(UnionInfo { all: false, query });
        self
    }

    pub fn union_all(&mut self, query: Query) -> &mut Self {
        self.unions.push(UnionInfo { all: true, query });
        self
    }

    pub fn bind(&mut self, params: Params) -> &mut Self {
        self.params = params;
        self
    }

    pub fn and_bind(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Renders the statement. Clause order: select, from, joins, where,
    /// group by, having, then order by/limit, then unions.
    pub fn build(&self) -> Query {
        let qb = QueryBuilder::new(self.dialect);
        let mut params = self.params.clone();

        let clauses = [
            qb.build_select(&self.select, self.distinct, self.select_option.as_deref()),
            qb.build_from(&self.from),
            qb.build_join(&self.joins, &mut params),
            qb.build_where(self.where_expr.as_ref(), &mut params),
            qb.build_group_by(&self.group_by),
            qb.build_having(self.having.as_ref(), &mut params),
        ];
        let mut sql = clauses
            .into_iter()
            .filter(|clause| !clause.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let order_and_limit = qb.build_order_by_and_limit(&self.order_by, self.limit, self.offset);
        if !order_and_limit.is_empty() {
            sql.push(' ');
            sql.push_str(&order_and_limit);
        }

        let unions = qb.build_union(&self.unions, &mut params);
        if !unions.is_empty() {
            sql = format!("({sql}) {unions}");
        }

        Query { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_clauses_in_order() {
        let mut q = SelectQuery::new(Dialect::MySql);
        q.select(["posts.*"])
            .from(["posts"])
            .left_join("users author", Some(Expression::raw("author.id = posts.author")))
            .where_clause(Expression::hash([("posts.status", "draft")]))
            .group_by(["posts.id"])
            .order_by(["posts.created DESC"])
            .limit(Some(10))
            .offset(20);

        let query = q.build();
        assert_eq!(
            query.sql,
            "SELECT `posts`.* FROM `posts` LEFT JOIN `users` `author` ON author.id = posts.author \
             WHERE `posts`.`status` = :p0 GROUP BY `posts`.`id` ORDER BY `posts`.`created` DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(query.params.get("p0"), Some(&json!("draft")));
    }

    #[test]
    fn join_with_same_alias_replaces_condition() {
        let mut q = SelectQuery::new(Dialect::Sqlite);
        q.from(["posts"])
            .left_join("users u", Some(Expression::raw("1=1")))
            .inner_join("users AS u", Some(Expression::raw("u.id = posts.author")));

        assert_eq!(q.joins().len(), 1);
        assert_eq!(q.joins()[0].kind, JoinKind::Inner);
        assert_eq!(
            q.build().sql,
            "SELECT * FROM \"posts\" INNER JOIN \"users\" AS \"u\" ON u.id = posts.author"
        );
    }

    #[test]
    fn and_where_combines_conditions() {
        let mut q = SelectQuery::new(Dialect::MySql);
        q.from(["posts"])
            .and_where(Expression::raw("a = 1"))
            .and_where(Expression::raw("b = 2"))
            .or_where(Expression::raw("c = 3"));
        assert_eq!(q.build().sql, "SELECT * FROM `posts` WHERE ((a = 1) AND (b = 2)) OR (c = 3)");
    }

    #[test]
    fn offset_without_limit_uses_max() {
        let mut q = SelectQuery::new(Dialect::MySql);
        q.from(["posts"]).offset(5);
        assert_eq!(
            q.build().sql,
            format!("SELECT * FROM `posts` LIMIT {} OFFSET 5", u64::MAX)
        );
    }

    #[test]
    fn unions_wrap_the_main_statement() {
        let mut other = SelectQuery::new(Dialect::MySql);
        other.from(["drafts"]).and_bind("x", json!(1));

        let mut q = SelectQuery::new(Dialect::MySql);
        q.from(["posts"]).union_all(other.build());

        let query = q.build();
        assert_eq!(query.sql, "(SELECT * FROM `posts`) UNION ALL (SELECT * FROM `drafts`)");
        assert_eq!(query.params.get("x"), Some(&json!(1)));
    }

    #[test]
    fn union_params_do_not_overwrite_main_bindings() {
        let mut drafts = SelectQuery::new(Dialect::MySql);
        drafts.from(["drafts"]).where_clause(Expression::hash([("status", "B")]));

        let mut q = SelectQuery::new(Dialect::MySql);
        q.from(["posts"]).where_clause(Expression::hash([("status", "A")])).union(drafts.build());

        let query = q.build();
        assert_eq!(
            query.sql,
            "(SELECT * FROM `posts` WHERE `status` = :p0) UNION (SELECT * FROM `drafts` WHERE `status` = :p1)"
        );
        assert_eq!(query.params.get("p0"), Some(&json!("A")));
        assert_eq!(query.params.get("p1"), Some(&json!("B")));
    }

    #[test]
    fn main_reference_prefers_alias() {
        let mut q = SelectQuery::new(Dialect::MySql);
        q.from(["posts p"]);
        assert_eq!(q.main_reference(), Some("p"));
        q.from(["posts"]);
        assert_eq!(q.main_reference(), Some("posts"));
    }
}
