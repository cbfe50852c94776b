use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::database::Collection;

pub const REQUEST_CONTEXT_DEFAULT: &str = "default";

/// Authenticated record of the current request.
#[derive(Debug, Clone)]
pub struct AuthRecord {
    pub collection: Arc<Collection>,
    pub id: String,
    /// Exported record fields. `email` is always kept, whatever its visibility.
    pub data: Map<String, Value>,
}

impl AuthRecord {
    pub fn new(collection: Arc<Collection>, id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self { collection, id: id.into(), data }
    }

    /// Field map exposed as `@request.auth.*`.
    pub fn export(&self) -> Map<String, Value> {
        let mut data = self.data.clone();
        data.insert("id".into(), Value::String(self.id.clone()));
        data.insert("collectionId".into(), Value::String(self.collection.id.clone()));
        data.insert("collectionName".into(), Value::String(self.collection.name.clone()));
        data
    }
}

/// Request data reachable from `@request.*` filter paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestInfo {
    pub context: String,
    pub method: String,
    pub query: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub data: Map<String, Value>,
    #[serde(skip)]
    pub auth: Option<AuthRecord>,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            context: REQUEST_CONTEXT_DEFAULT.to_string(),
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_auth(mut self, auth: AuthRecord) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Nested map backing static `@request.*` lookups.
    pub fn to_static_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("context".into(), Value::String(self.context.clone()));
        map.insert("method".into(), Value::String(self.method.clone()));
        map.insert("query".into(), Value::Object(self.query.clone()));
        map.insert("headers".into(), Value::Object(self.headers.clone()));
        map.insert("data".into(), Value::Object(self.data.clone()));
        if let Some(auth) = &self.auth {
            map.insert("auth".into(), Value::Object(auth.export()));
        }
        map
    }
}

/// Walks `keys` through nested objects. `None` if any key is missing or a non-object is hit midway.
pub fn extract_nested<'v>(map: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    let (first, rest) = keys.split_first()?;
    let value = map.get(*first)?;
    if rest.is_empty() {
        return Some(value);
    }
    match value {
        Value::Object(inner) => extract_nested(inner, rest),
        _ => None,
    }
}

/// Casts `value` to a list of unique, non-empty strings, in first-seen order.
///
/// A string containing `[` is tried as a JSON array first.
pub fn to_unique_string_list(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(s)) if s.contains('[') => match serde_json::from_str::<Vec<Value>>(s) {
            Ok(items) => items.iter().filter_map(scalar_to_string).collect(),
            Err(_) => vec![s.clone()],
        },
        Some(other) => scalar_to_string(other).into_iter().collect(),
    };

    let mut unique: Vec<String> = Vec::with_capacity(raw.len());
    for item in raw {
        if !item.is_empty() && !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
