use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::{FileOptions, RelationOptions, SchemaError, SelectOptions};

/// Field type together with the options that matter for query compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Email,
    Url,
    Editor,
    Date,
    Json,
    Select(SelectOptions),
    File(FileOptions),
    Relation(RelationOptions),
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Bool => "bool",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Editor => "editor",
            FieldKind::Date => "date",
            FieldKind::Json => "json",
            FieldKind::Select(_) => "select",
            FieldKind::File(_) => "file",
            FieldKind::Relation(_) => "relation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchemaField", into = "RawSchemaField")]
pub struct SchemaField {
    pub id: String,
    pub name: String,
    pub system: bool,
    pub required: bool,
    pub kind: FieldKind,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            system: false,
            required: false,
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    pub fn select(name: impl Into<String>, max_select: u32) -> Self {
        Self::new(name, FieldKind::Select(SelectOptions { max_select, values: Vec::new() }))
    }

    pub fn file(name: impl Into<String>, max_select: u32) -> Self {
        Self::new(name, FieldKind::File(FileOptions { max_select, ..Default::default() }))
    }

    pub fn relation(name: impl Into<String>, collection_id: impl Into<String>, max_select: Option<u32>) -> Self {
        Self::new(name, FieldKind::Relation(RelationOptions::new(collection_id, max_select)))
    }

    pub fn is_json(&self) -> bool {
        matches!(self.kind, FieldKind::Json)
    }

    /// Select, file and relation fields may store a JSON array of values.
    pub fn is_arrayable(&self) -> bool {
        matches!(self.kind, FieldKind::Select(_) | FieldKind::File(_) | FieldKind::Relation(_))
    }

    /// Declared multiplicity; `None` for kinds that never hold more than one value.
    pub fn is_multiple(&self) -> Option<bool> {
        match &self.kind {
            FieldKind::Select(opts) => Some(opts.is_multiple()),
            FieldKind::File(opts) => Some(opts.is_multiple()),
            FieldKind::Relation(opts) => Some(opts.is_multiple()),
            _ => None,
        }
    }

    pub fn relation_options(&self) -> Option<&RelationOptions> {
        match &self.kind {
            FieldKind::Relation(opts) => Some(opts),
            _ => None,
        }
    }
}

/// Wire shape of a schema field: `{id, name, type, system, required, options}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSchemaField {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Value,
}

fn decode_options<T: serde::de::DeserializeOwned>(field: &str, options: Value) -> Result<T, SchemaError> {
    let options = if options.is_null() { Value::Object(Default::default()) } else { options };
    serde_json::from_value(options).map_err(|e| SchemaError::InvalidFieldOptions {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

impl TryFrom<RawSchemaField> for SchemaField {
    type Error = SchemaError;

    fn try_from(raw: RawSchemaField) -> Result<Self, Self::Error> {
        let kind = match raw.kind.as_str() {
            "text" => FieldKind::Text,
            "number" => FieldKind::Number,
            "bool" => FieldKind::Bool,
            "email" => FieldKind::Email,
            "url" => FieldKind::Url,
            "editor" => FieldKind::Editor,
            "date" => FieldKind::Date,
            "json" => FieldKind::Json,
            "select" => FieldKind::Select(decode_options(&raw.name, raw.options)?),
            "file" => FieldKind::File(decode_options(&raw.name, raw.options)?),
            "relation" => FieldKind::Relation(decode_options(&raw.name, raw.options)?),
            other => {
                return Err(SchemaError::UnknownFieldType {
                    field: raw.name,
                    kind: other.to_string(),
                });
            }
        };

        Ok(Self {
            id: raw.id,
            name: raw.name,
            system: raw.system,
            required: raw.required,
            kind,
        })
    }
}

impl From<SchemaField> for RawSchemaField {
    fn from(field: SchemaField) -> Self {
        let kind = field.kind.type_name().to_string();
        let options = match field.kind {
            FieldKind::Select(opts) => serde_json::to_value(opts),
            FieldKind::File(opts) => serde_json::to_value(opts),
            FieldKind::Relation(opts) => serde_json::to_value(opts),
            _ => Ok(Value::Object(Default::default())),
        }
        .unwrap_or(Value::Null);

        Self {
            id: field.id,
            name: field.name,
            kind,
            system: field.system,
            required: field.required,
            options,
        }
    }
}
