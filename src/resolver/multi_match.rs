use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::dbx::{Dialect, Expression, Params, SqlExpression};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\w+)").expect("valid placeholder regex"));

/// A LEFT JOIN registered while resolving a field path.
#[derive(Debug, Clone)]
pub struct Join {
    pub table: String,
    pub alias: String,
    pub on: Expression,
}

impl Join {
    pub fn new(table: impl Into<String>, alias: impl Into<String>, on: Expression) -> Self {
        Self { table: table.into(), alias: alias.into(), on }
    }
}

/// Correlated subquery mirroring a multi-valued join chain under its own aliases.
///
/// Renders `SELECT <value> AS multiMatchValue FROM <from> <alias> <joins> WHERE <alias>.id = <base>.id`,
/// which lets a comparison be asserted against every related value rather than any one of them.
#[derive(Debug, Clone, Default)]
pub struct MultiMatchSubquery {
    pub base_table_alias: String,
    pub from_table_name: String,
    pub from_table_alias: String,
    pub value_identifier: String,
    pub joins: Vec<Join>,
    pub params: Params,
}

impl MultiMatchSubquery {
    pub fn new(base_table_alias: impl Into<String>, from_table_name: impl Into<String>, from_table_alias: impl Into<String>) -> Self {
        Self {
            base_table_alias: base_table_alias.into(),
            from_table_name: from_table_name.into(),
            from_table_alias: from_table_alias.into(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.base_table_alias.is_empty()
            && !self.from_table_name.is_empty()
            && !self.from_table_alias.is_empty()
            && !self.value_identifier.is_empty()
    }

    /// `FROM ... WHERE <correlation>` body shared by the value subquery and the grouped EXISTS form.
    fn build_source(&self, dialect: Dialect, params: &mut Params) -> String {
        params.extend(self.params.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut parts = vec![format!(
            "FROM {}",
            dialect.table_with_alias(&self.from_table_name, &self.from_table_alias)
        )];
        for join in &self.joins {
            let table = dialect.table_with_alias(&join.table, &join.alias);
            let on = join.on.build(dialect, params);
            if on.is_empty() {
                parts.push(format!("LEFT JOIN {table}"));
            } else {
                parts.push(format!("LEFT JOIN {table} ON {on}"));
            }
        }
        parts.push(format!(
            "WHERE {} = {}",
            dialect.quote_column_name(&format!("{}.id", self.from_table_alias)),
            dialect.quote_column_name(&format!("{}.id", self.base_table_alias))
        ));
        parts.join(" ")
    }

    /// Identifies the join chain (with its bound values) independently of the selected value column.
    ///
    /// Placeholder names are replaced by their bind position, so two resolutions of the
    /// same path that drew different names still compare equal.
    pub fn signature(&self, dialect: Dialect) -> String {
        let mut scratch = Params::new();
        let source = self.build_source(dialect, &mut scratch);
        let source = PLACEHOLDER_RE.replace_all(&source, |caps: &Captures| match scratch.get_index_of(&caps[1]) {
            Some(idx) => format!(":${idx}"),
            None => caps[0].to_string(),
        });
        let values: Vec<String> = scratch.values().map(Value::to_string).collect();
        format!("{source} [{}]", values.join(","))
    }

    /// `EXISTS` over the mirrored chain with every condition asserted on the same related row.
    pub fn exists(&self, conditions: Vec<Expression>) -> Expression {
        Expression::custom(MultiMatchExists { subquery: self.clone(), conditions })
    }
}

impl SqlExpression for MultiMatchSubquery {
    fn build(&self, dialect: Dialect, params: &mut Params) -> String {
        if !self.is_complete() {
            return "0=1".to_string();
        }
        format!(
            "SELECT {} AS {} {}",
            dialect.quote_column_name(&self.value_identifier),
            dialect.quote_simple_column_name("multiMatchValue"),
            self.build_source(dialect, params)
        )
    }
}

#[derive(Debug, Clone)]
pub struct MultiMatchExists {
    subquery: MultiMatchSubquery,
    conditions: Vec<Expression>,
}

impl SqlExpression for MultiMatchExists {
    fn build(&self, dialect: Dialect, params: &mut Params) -> String {
        let sq = &self.subquery;
        if sq.base_table_alias.is_empty() || sq.from_table_name.is_empty() || sq.from_table_alias.is_empty() {
            return "0=1".to_string();
        }

        let mut sql = format!("EXISTS (SELECT 1 {}", sq.build_source(dialect, params));
        for condition in &self.conditions {
            let built = condition.build(dialect, params);
            if !built.is_empty() {
                sql.push_str(&format!(" AND ({built})"));
            }
        }
        sql.push(')');
        sql
    }
}
