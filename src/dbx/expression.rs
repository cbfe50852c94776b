use std::{collections::BTreeMap, fmt, sync::Arc};

use serde_json::Value;

use crate::dbx::{bind_next, Dialect, Params};

/// Anything that renders itself to an SQL fragment, binding its values into a shared sink.
pub trait SqlExpression: fmt::Debug + Send + Sync {
    fn build(&self, dialect: Dialect, params: &mut Params) -> String;
}

/// Right-hand side of a hash or IN entry.
#[derive(Debug, Clone)]
pub enum ExprValue {
    Value(Value),
    Expr(Expression),
}

impl From<Value> for ExprValue {
    fn from(value: Value) -> Self {
        ExprValue::Value(value)
    }
}

impl From<Expression> for ExprValue {
    fn from(expr: Expression) -> Self {
        ExprValue::Expr(expr)
    }
}

impl From<&str> for ExprValue {
    fn from(value: &str) -> Self {
        ExprValue::Value(Value::String(value.to_string()))
    }
}

impl From<String> for ExprValue {
    fn from(value: String) -> Self {
        ExprValue::Value(Value::String(value))
    }
}

impl From<i64> for ExprValue {
    fn from(value: i64) -> Self {
        ExprValue::Value(Value::from(value))
    }
}

impl From<bool> for ExprValue {
    fn from(value: bool) -> Self {
        ExprValue::Value(Value::Bool(value))
    }
}

/// Composable boolean SQL expression.
///
/// Every variant renders to a fragment plus bound parameters; an expression
/// that renders to the empty string is dropped by its parent combinator.
#[derive(Debug, Clone)]
pub enum Expression {
    Raw { sql: String, params: Params },
    And(Vec<Expression>),
    Or(Vec<Expression>),
    /// Column/value pairs, rendered in sorted column order and joined with AND.
    Hash(BTreeMap<String, ExprValue>),
    In { column: String, values: Vec<ExprValue>, negated: bool },
    Exists { inner: Box<Expression>, negated: bool },
    Not(Box<Expression>),
    Enclose(Box<Expression>),
    Custom(Arc<dyn SqlExpression>),
}

impl Expression {
    pub fn raw(sql: impl Into<String>) -> Self {
        Expression::Raw { sql: sql.into(), params: Params::new() }
    }

    pub fn raw_with_params(sql: impl Into<String>, params: Params) -> Self {
        Expression::Raw { sql: sql.into(), params }
    }

    pub fn and(parts: impl IntoIterator<Item = Expression>) -> Self {
        Expression::And(parts.into_iter().collect())
    }

    pub fn or(parts: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Or(parts.into_iter().collect())
    }

    pub fn hash<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ExprValue>,
    {
        Expression::Hash(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn in_list<V: Into<ExprValue>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Expression::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in_list<V: Into<ExprValue>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Expression::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn exists(inner: Expression) -> Self {
        Expression::Exists { inner: Box::new(inner), negated: false }
    }

    pub fn not_exists(inner: Expression) -> Self {
        Expression::Exists { inner: Box::new(inner), negated: true }
    }

    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    pub fn enclose(inner: Expression) -> Self {
        Expression::Enclose(Box::new(inner))
    }

    pub fn custom(expr: impl SqlExpression + 'static) -> Self {
        Expression::Custom(Arc::new(expr))
    }

    pub fn build(&self, dialect: Dialect, params: &mut Params) -> String {
        match self {
            Expression::Raw { sql, params: own } => {
                params.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
                sql.clone()
            }
            Expression::And(parts) => build_and_or(parts, "AND", dialect, params),
            Expression::Or(parts) => build_and_or(parts, "OR", dialect, params),
            Expression::Hash(pairs) => build_hash(pairs, dialect, params),
            Expression::In { column, values, negated } => build_in(column, values, *negated, dialect, params),
            Expression::Exists { inner, negated } => {
                let sql = inner.build(dialect, params);
                match (sql.is_empty(), negated) {
                    (true, true) => String::new(),
                    (true, false) => "0=1".to_string(),
                    (false, true) => format!("NOT EXISTS ({sql})"),
                    (false, false) => format!("EXISTS ({sql})"),
                }
            }
            Expression::Not(inner) => {
                let sql = inner.build(dialect, params);
                if sql.trim().is_empty() {
                    String::new()
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expression::Enclose(inner) => {
                let sql = inner.build(dialect, params);
                if sql.is_empty() {
                    String::new()
                } else {
                    format!("({sql})")
                }
            }
            Expression::Custom(expr) => expr.build(dialect, params),
        }
    }
}

impl SqlExpression for Expression {
    fn build(&self, dialect: Dialect, params: &mut Params) -> String {
        Expression::build(self, dialect, params)
    }
}

fn build_and_or(parts: &[Expression], op: &str, dialect: Dialect, params: &mut Params) -> String {
    let built: Vec<String> = parts
        .iter()
        .map(|part| part.build(dialect, params))
        .filter(|sql| !sql.is_empty())
        .collect();

    match built.len() {
        0 => String::new(),
        1 => built.into_iter().next().unwrap_or_default(),
        _ => format!("({})", built.join(&format!(") {op} ("))),
    }
}

fn build_hash(pairs: &BTreeMap<String, ExprValue>, dialect: Dialect, params: &mut Params) -> String {
    let mut parts = Vec::with_capacity(pairs.len());
    for (column, value) in pairs {
        let sql = match value {
            ExprValue::Value(Value::Null) => {
                format!("{} IS NULL", dialect.quote_column_name(column))
            }
            ExprValue::Value(Value::Array(items)) => {
                let values = items.iter().cloned().map(ExprValue::Value).collect::<Vec<_>>();
                build_in(column, &values, false, dialect, params)
            }
            ExprValue::Expr(expr) => {
                let sql = expr.build(dialect, params);
                if sql.is_empty() {
                    continue;
                }
                format!("({sql})")
            }
            ExprValue::Value(value) => {
                let name = bind_next(params, value.clone());
                format!("{} = :{name}", dialect.quote_column_name(column))
            }
        };
        parts.push(sql);
    }
    parts.join(" AND ")
}

fn build_in(column: &str, values: &[ExprValue], negated: bool, dialect: Dialect, params: &mut Params) -> String {
    if values.is_empty() {
        return if negated { String::new() } else { "0=1".to_string() };
    }

    let rendered: Vec<String> = values
        .iter()
        .map(|value| match value {
            ExprValue::Value(Value::Null) => "NULL".to_string(),
            ExprValue::Expr(expr) => expr.build(dialect, params),
            ExprValue::Value(value) => format!(":{}", bind_next(params, value.clone())),
        })
        .collect();

    let column = dialect.quote_column_name(column);
    if let [single] = rendered.as_slice() {
        let op = if negated { "<>" } else { "=" };
        return format!("{column}{op}{single}");
    }

    let op = if negated { "NOT IN" } else { "IN" };
    format!("{column} {op} ({})", rendered.join(", "))
}
