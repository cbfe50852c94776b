use serde::{Deserialize, Serialize};

/// SQL flavour a statement is rendered for.
///
/// Quoting, alias syntax, limit clauses and the JSON helper fragments used by
/// the field resolver all vary per dialect.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite => '"',
        }
    }

    /// Quotes a single column name unless it is already quoted or is `*`.
    pub fn quote_simple_column_name(self, name: &str) -> String {
        let q = self.quote_char();
        if name.contains(q) || name == "*" {
            return name.to_string();
        }
        format!("{q}{name}{q}")
    }

    /// Quotes a single table name unless it is already quoted.
    pub fn quote_simple_table_name(self, name: &str) -> String {
        let q = self.quote_char();
        if name.contains(q) {
            return name.to_string();
        }
        format!("{q}{name}{q}")
    }

    /// Quotes a possibly schema-prefixed table name, segment by segment.
    pub fn quote_table_name(self, name: &str) -> String {
        if is_pass_through(name) {
            return name.to_string();
        }
        name.split('.')
            .map(|part| self.quote_simple_table_name(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a possibly table-prefixed column name.
    ///
    /// Function calls and placeholders pass through unchanged.
    pub fn quote_column_name(self, name: &str) -> String {
        if is_pass_through(name) {
            return name.to_string();
        }
        match name.rfind('.') {
            Some(pos) => format!(
                "{}.{}",
                self.quote_table_name(&name[..pos]),
                self.quote_simple_column_name(&name[pos + 1..])
            ),
            None => self.quote_simple_column_name(name),
        }
    }

    /// Renders `table alias` with the dialect's alias syntax.
    pub fn table_with_alias(self, table: &str, alias: &str) -> String {
        let table = self.quote_table_name(table);
        let alias = self.quote_simple_table_name(alias);
        match self {
            Dialect::MySql => format!("{table} {alias}"),
            Dialect::Sqlite => format!("{table} AS {alias}"),
        }
    }

    /// `LIMIT`/`OFFSET` suffix. An offset without a limit uses the dialect's "no limit" value.
    pub fn limit_offset(self, limit: Option<u64>, offset: u64) -> String {
        let limit = match (limit, offset) {
            (Some(limit), _) => limit.to_string(),
            (None, 0) => return String::new(),
            (None, _) => match self {
                Dialect::MySql => u64::MAX.to_string(),
                Dialect::Sqlite => "-1".to_string(),
            },
        };
        if offset > 0 {
            format!("LIMIT {limit} OFFSET {offset}")
        } else {
            format!("LIMIT {limit}")
        }
    }

    /// Per-element virtual table over a column holding a JSON array or a plain scalar.
    pub fn json_each_column(self, column: &str) -> String {
        let c = self.quote_column_name(column);
        match self {
            Dialect::MySql => format!(
                "JSON_TABLE(IF(JSON_VALID({c}),{c},JSON_ARRAY({c})),'$[*]' COLUMNS(`value` VARCHAR(255) PATH '$'))"
            ),
            Dialect::Sqlite => format!(
                "json_each(CASE WHEN json_valid({c}) THEN {c} ELSE json_array({c}) END)"
            ),
        }
    }

    /// Per-element virtual table over a bound JSON array parameter.
    pub fn json_each_param(self, placeholder: &str) -> String {
        match self {
            Dialect::MySql => format!(
                "JSON_TABLE(:{placeholder},'$[*]' COLUMNS(`value` VARCHAR(255) PATH '$'))"
            ),
            Dialect::Sqlite => format!("json_each(:{placeholder})"),
        }
    }

    /// Element count of a JSON array column. Empty and plain scalar values are normalized first.
    pub fn json_array_length(self, column: &str) -> String {
        let c = self.quote_column_name(column);
        match self {
            Dialect::MySql => format!(
                "JSON_LENGTH(IF(JSON_VALID({c}),{c},IF({c}='' OR {c} IS NULL,JSON_ARRAY(),JSON_ARRAY({c}))))"
            ),
            Dialect::Sqlite => format!(
                "json_array_length(CASE WHEN json_valid({c}) THEN {c} ELSE (CASE WHEN {c} = '' OR {c} IS NULL THEN json_array() ELSE json_array({c}) END) END)"
            ),
        }
    }

    /// Extracts `path` from a JSON column. Non-JSON values are wrapped so the
    /// empty path still yields the raw value.
    pub fn json_extract(self, column: &str, path: &str) -> String {
        let c = self.quote_column_name(column);
        let path = if path.is_empty() || path.starts_with('[') {
            path.to_string()
        } else {
            format!(".{path}")
        };
        match self {
            Dialect::MySql => format!(
                "(IF(JSON_VALID({c}),JSON_EXTRACT({c},'${path}'),JSON_EXTRACT(JSON_OBJECT('pb',{c}),'$.pb{path}')))"
            ),
            Dialect::Sqlite => format!(
                "(CASE WHEN json_valid({c}) THEN JSON_EXTRACT({c}, '${path}') ELSE JSON_EXTRACT(json_object('pb', {c}), '$.pb{path}') END)"
            ),
        }
    }

    /// Wraps an SQL operand into a `%operand%` LIKE pattern.
    pub fn like_contains(self, operand: &str) -> String {
        match self {
            Dialect::MySql => format!("CONCAT('%',{operand},'%')"),
            Dialect::Sqlite => format!("('%' || {operand} || '%')"),
        }
    }

    /// Explicit escape clause appended to LIKE comparisons, if the dialect needs one.
    pub fn like_escape(self) -> &'static str {
        match self {
            Dialect::MySql => "",
            Dialect::Sqlite => " ESCAPE '\\'",
        }
    }

    pub fn random_function(self) -> &'static str {
        match self {
            Dialect::MySql => "RAND()",
            Dialect::Sqlite => "RANDOM()",
        }
    }
}

fn is_pass_through(name: &str) -> bool {
    name.contains('(') || name.contains("{{") || name.contains("[[")
}
