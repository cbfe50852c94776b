use std::{borrow::Cow, collections::HashMap};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::dbx::{bind_next, Dialect, Expression, JoinInfo, Params, UnionInfo};

static SELECT_ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:\s+as\s+|\s+)([\w\-_\.]+)$").expect("valid alias regex"));

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\w+)").expect("valid placeholder regex"));

static ORDER_DIRECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(ASC|DESC)$").expect("valid order regex"));

/// Renders the individual clauses of a SELECT statement for one dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    pub dialect: Dialect,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Splits `"expr alias"` / `"expr AS alias"` into its parts.
    pub fn split_alias(source: &str) -> (&str, Option<&str>) {
        match SELECT_ALIAS_RE.captures(source) {
            Some(caps) => match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(alias)) => (&source[..whole.start()], Some(alias.as_str())),
                _ => (source, None),
            },
            None => (source, None),
        }
    }

    pub fn build_select(&self, columns: &[String], distinct: bool, option: Option<&str>) -> String {
        let mut select = String::from(if distinct { "SELECT DISTINCT" } else { "SELECT" });
        if let Some(option) = option.filter(|o| !o.is_empty()) {
            select.push(' ');
            select.push_str(option);
        }

        if columns.is_empty() {
            return format!("{select} *");
        }

        let columns: Vec<String> = columns
            .iter()
            .map(|column| {
                let column = column.trim();
                match Self::split_alias(column) {
                    (expr, Some(alias)) => format!(
                        "{} AS {}",
                        self.dialect.quote_column_name(expr),
                        self.dialect.quote_simple_column_name(alias)
                    ),
                    (expr, None) => self.dialect.quote_column_name(expr),
                }
            })
            .collect();

        format!("{select} {}", columns.join(", "))
    }

    pub fn build_table(&self, table: &str) -> String {
        match Self::split_alias(table.trim()) {
            (name, Some(alias)) => self.dialect.table_with_alias(name, alias),
            (name, None) => self.dialect.quote_table_name(name),
        }
    }

    pub fn build_from(&self, tables: &[String]) -> String {
        if tables.is_empty() {
            return String::new();
        }
        let tables: Vec<String> = tables.iter().map(|t| self.build_table(t)).collect();
        format!("FROM {}", tables.join(", "))
    }

    pub fn build_join(&self, joins: &[JoinInfo], params: &mut Params) -> String {
        joins
            .iter()
            .map(|join| {
                let table = match &join.alias {
                    Some(alias) => self.dialect.table_with_alias(&join.table, alias),
                    None => self.dialect.quote_table_name(&join.table),
                };
                let on = join
                    .on
                    .as_ref()
                    .map(|on| on.build(self.dialect, params))
                    .unwrap_or_default();
                if on.is_empty() {
                    format!("{} {table}", join.kind.as_sql())
                } else {
                    format!("{} {table} ON {on}", join.kind.as_sql())
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn build_where(&self, expr: Option<&Expression>, params: &mut Params) -> String {
        Self::build_condition("WHERE", expr, self.dialect, params)
    }

    pub fn build_group_by(&self, columns: &[String]) -> String {
        if columns.is_empty() {
            return String::new();
        }
        let columns: Vec<String> = columns.iter().map(|c| self.dialect.quote_column_name(c.trim())).collect();
        format!("GROUP BY {}", columns.join(", "))
    }

    pub fn build_having(&self, expr: Option<&Expression>, params: &mut Params) -> String {
        Self::build_condition("HAVING", expr, self.dialect, params)
    }

    pub fn build_order_by_and_limit(&self, columns: &[String], limit: Option<u64>, offset: u64) -> String {
        let mut parts = Vec::new();
        if !columns.is_empty() {
            let columns: Vec<String> = columns
                .iter()
                .map(|column| {
                    let column = column.trim();
                    match ORDER_DIRECTION_RE.captures(column) {
                        Some(caps) => {
                            let (Some(whole), Some(dir)) = (caps.get(0), caps.get(1)) else {
                                return self.dialect.quote_column_name(column);
                            };
                            format!(
                                "{} {}",
                                self.dialect.quote_column_name(&column[..whole.start()]),
                                dir.as_str().to_uppercase()
                            )
                        }
                        None => self.dialect.quote_column_name(column),
                    }
                })
                .collect();
            parts.push(format!("ORDER BY {}", columns.join(", ")));
        }

        let limit = self.dialect.limit_offset(limit, offset);
        if !limit.is_empty() {
            parts.push(limit);
        }
        parts.join(" ")
    }

    /// Appends the union members. Member params whose names are already taken in `params`
    /// are rebound under fresh names and their placeholders rewritten.
    pub fn build_union(&self, unions: &[UnionInfo], params: &mut Params) -> String {
        unions
            .iter()
            .map(|union| {
                let mut renamed: HashMap<&str, String> = HashMap::new();
                for (name, value) in &union.query.params {
                    if params.contains_key(name) {
                        renamed.insert(name.as_str(), bind_next(params, value.clone()));
                    } else {
                        params.insert(name.clone(), value.clone());
                    }
                }

                let sql = if renamed.is_empty() {
                    Cow::Borrowed(union.query.sql.as_str())
                } else {
                    PLACEHOLDER_RE.replace_all(&union.query.sql, |caps: &Captures| match renamed.get(&caps[1]) {
                        Some(name) => format!(":{name}"),
                        None => caps[0].to_string(),
                    })
                };
                let op = if union.all { "UNION ALL" } else { "UNION" };
                format!("{op} ({sql})")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_condition(keyword: &str, expr: Option<&Expression>, dialect: Dialect, params: &mut Params) -> String {
        match expr.map(|e| e.build(dialect, params)) {
            Some(sql) if !sql.is_empty() => format!("{keyword} {sql}"),
            _ => String::new(),
        }
    }
}

/// Finished statement text with its bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Params,
}
