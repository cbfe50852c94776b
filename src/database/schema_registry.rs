use std::{
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use indexmap::IndexMap;
use serde_json::Value;

use crate::database::{Collection, CollectionProvider, SchemaError};

pub type SchemaRegistry = Arc<RwLock<InternalSchemaRegistry>>;

/// In-memory collection definitions keyed by id, in registration order.
#[derive(Debug, Default)]
pub struct InternalSchemaRegistry {
    collections: IndexMap<String, Arc<Collection>>,
}

impl InternalSchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_protected(self) -> SchemaRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Inserts or replaces a collection. A collection with the same name but a different id is replaced too.
    pub fn save(&mut self, collection: Collection) -> Arc<Collection> {
        let stale = self
            .collections
            .iter()
            .find(|(id, c)| **id != collection.id && c.name.eq_ignore_ascii_case(&collection.name))
            .map(|(id, _)| id.clone());
        if let Some(id) = stale {
            self.collections.shift_remove(&id);
        }

        let collection = Arc::new(collection);
        self.collections.insert(collection.id.clone(), Arc::clone(&collection));
        tracing::debug!(id = %collection.id, name = %collection.name, "collection saved");
        collection
    }

    pub fn get(&self, name_or_id: &str) -> Option<Arc<Collection>> {
        self.collections
            .get(name_or_id)
            .or_else(|| self.collections.values().find(|c| c.name.eq_ignore_ascii_case(name_or_id)))
            .map(Arc::clone)
    }

    pub fn delete(&mut self, name_or_id: &str) -> Option<Arc<Collection>> {
        let id = self.get(name_or_id)?.id.clone();
        self.collections.shift_remove(&id)
    }

    pub fn list_collections(&self) -> Vec<String> {
        self.collections.values().map(|c| c.name.clone()).collect()
    }

    /// Loads a single collection object or an array of them. Returns how many were saved.
    pub fn load_from_json(&mut self, value: Value) -> Result<usize, SchemaError> {
        let collections: Vec<Collection> = match value {
            Value::Array(_) => serde_json::from_value(value)?,
            Value::Object(_) => vec![serde_json::from_value(value)?],
            _ => return Err(SchemaError::UnexpectedShape),
        };

        let count = collections.len();
        for collection in collections {
            self.save(collection);
        }
        Ok(count)
    }

    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        self.load_from_json(value)
    }
}

impl CollectionProvider for InternalSchemaRegistry {
    fn find_collection_by_name_or_id(&self, name_or_id: &str) -> Option<Arc<Collection>> {
        self.get(name_or_id)
    }
}

pub trait RegistryCommon {
    fn new_registry() -> Self;
    fn save(&self, collection: Collection) -> Arc<Collection>;
    fn get(&self, name_or_id: &str) -> Option<Arc<Collection>>;
    fn delete(&self, name_or_id: &str) -> Option<Arc<Collection>>;
    fn list_collections(&self) -> Vec<String>;
    fn load_from_json(&self, value: Value) -> Result<usize, SchemaError>;
    fn load_from_file(&self, path: &Path) -> Result<usize, SchemaError>;
}

impl RegistryCommon for SchemaRegistry {
    fn new_registry() -> Self {
        InternalSchemaRegistry::new().into_protected()
    }

    fn save(&self, collection: Collection) -> Arc<Collection> {
        self.write().unwrap_or_else(PoisonError::into_inner).save(collection)
    }

    fn get(&self, name_or_id: &str) -> Option<Arc<Collection>> {
        self.read().unwrap_or_else(PoisonError::into_inner).get(name_or_id)
    }

    fn delete(&self, name_or_id: &str) -> Option<Arc<Collection>> {
        self.write().unwrap_or_else(PoisonError::into_inner).delete(name_or_id)
    }

    fn list_collections(&self) -> Vec<String> {
        self.read().unwrap_or_else(PoisonError::into_inner).list_collections()
    }

    fn load_from_json(&self, value: Value) -> Result<usize, SchemaError> {
        self.write().unwrap_or_else(PoisonError::into_inner).load_from_json(value)
    }

    fn load_from_file(&self, path: &Path) -> Result<usize, SchemaError> {
        self.write().unwrap_or_else(PoisonError::into_inner).load_from_file(path)
    }
}

impl CollectionProvider for SchemaRegistry {
    fn find_collection_by_name_or_id(&self, name_or_id: &str) -> Option<Arc<Collection>> {
        self.read().unwrap_or_else(PoisonError::into_inner).get(name_or_id)
    }
}
