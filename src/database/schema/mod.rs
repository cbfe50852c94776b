use std::sync::Arc;

pub mod schema_error;
pub use schema_error::*;

pub mod field_options;
pub use field_options::*;

pub mod schema_field;
pub use schema_field::*;

pub mod index;
pub use index::*;

pub mod collection;
pub use collection::*;

pub trait CollectionProvider {
    /// Looks a collection up by id, or by name ignoring case.
    fn find_collection_by_name_or_id(&self, name_or_id: &str) -> Option<Arc<Collection>>;
}
