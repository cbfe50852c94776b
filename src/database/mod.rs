pub mod config;
pub use config::*;

pub mod schema;
pub use schema::*;

pub mod schema_registry;
pub use schema_registry::*;

pub mod _tests;
