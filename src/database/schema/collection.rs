use serde::{Deserialize, Serialize};

use crate::database::{Index, SchemaField};

pub const BASE_SYSTEM_FIELDS: &[&str] = &["id", "created", "updated"];
pub const AUTH_SYSTEM_FIELDS: &[&str] = &[
    "id",
    "created",
    "updated",
    "username",
    "verified",
    "emailVisibility",
    "email",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    #[default]
    Base,
    Auth,
    View,
}

/// A runtime-defined record collection: identity, kind, ordered schema and raw index definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CollectionType,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub schema: Vec<SchemaField>,
    #[serde(default)]
    pub indexes: Vec<String>,
}

impl Collection {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: CollectionType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            system: false,
            schema: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn base(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, CollectionType::Base)
    }

    pub fn auth(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, CollectionType::Auth)
    }

    pub fn with_field(mut self, field: SchemaField) -> Self {
        self.schema.push(field);
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.indexes.push(index.into());
        self
    }

    pub fn is_auth(&self) -> bool {
        self.kind == CollectionType::Auth
    }

    pub fn is_view(&self) -> bool {
        self.kind == CollectionType::View
    }

    pub fn field_by_name(&self, name: &str) -> Option<&SchemaField> {
        self.schema.iter().find(|f| f.name == name)
    }

    /// Columns every record of this collection carries outside its schema.
    pub fn system_field_names(&self) -> &'static [&'static str] {
        if self.is_auth() { AUTH_SYSTEM_FIELDS } else { BASE_SYSTEM_FIELDS }
    }

    pub fn has_system_field(&self, name: &str) -> bool {
        self.system_field_names().contains(&name)
    }

    /// True if some valid unique index covers exactly `column` (case-insensitive).
    pub fn has_single_column_unique_index(&self, column: &str) -> bool {
        self.indexes.iter().map(|raw| Index::parse(raw)).any(|idx| {
            idx.is_valid()
                && idx.unique
                && idx.columns.len() == 1
                && idx.columns[0].name.eq_ignore_ascii_case(column)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_collection_shape() {
        let coll: Collection = serde_json::from_value(json!({
            "id": "posts_id",
            "name": "posts",
            "type": "base",
            "schema": [
                { "name": "title", "type": "text" },
                { "name": "author", "type": "relation", "options": { "collectionId": "_pb_users_", "maxSelect": 1 } }
            ],
            "indexes": ["CREATE UNIQUE INDEX idx_title ON posts (title)"]
        }))
        .unwrap();

        assert_eq!(coll.schema.len(), 2);
        assert!(coll.field_by_name("author").is_some());
        assert!(coll.field_by_name("missing").is_none());
        assert!(coll.has_single_column_unique_index("TITLE"));
        assert!(!coll.has_single_column_unique_index("author"));
    }

    #[test]
    fn auth_collections_expose_extra_system_fields() {
        let users = Collection::auth("_pb_users_", "users");
        assert!(users.has_system_field("email"));
        assert!(!Collection::base("p", "posts").has_system_field("email"));
    }

    #[test]
    fn multi_column_unique_index_does_not_count() {
        let coll = Collection::base("c", "comments")
            .with_index("CREATE UNIQUE INDEX idx ON comments (post, author)");
        assert!(!coll.has_single_column_unique_index("post"));
    }
}
