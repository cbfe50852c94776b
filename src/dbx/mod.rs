pub mod dialect;
pub use dialect::*;

pub mod params;
pub use params::*;

pub mod expression;
pub use expression::*;

pub mod query_builder;
pub use query_builder::*;

pub mod select_query;
pub use select_query::*;
