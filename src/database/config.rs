use serde::{Deserialize, Serialize};

use crate::dbx::Dialect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub dialect: Dialect,
    /// Lets plain record paths reach hidden fields such as a non-visible `email`.
    pub allow_hidden_fields: bool,
    pub max_nested_relations: usize,
    pub default_per_page: usize,
    pub max_per_page: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: Dialect::MySql,
            allow_hidden_fields: false,
            max_nested_relations: 6,
            default_per_page: 30,
            max_per_page: 500,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mysql() -> Self {
        Self::default()
    }

    pub fn sqlite() -> Self {
        Self {
            dialect: Dialect::Sqlite,
            ..Self::default()
        }
    }

    pub fn with_hidden_fields(mut self, allow: bool) -> Self {
        self.allow_hidden_fields = allow;
        self
    }

    pub fn with_max_nested_relations(mut self, max: usize) -> Self {
        self.max_nested_relations = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config = serde_json::from_value(json!({ "dialect": "sqlite", "maxNestedRelations": 2 })).unwrap();
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.max_nested_relations, 2);
        assert_eq!(config.max_per_page, 500);
        assert!(!config.allow_hidden_fields);
    }
}
