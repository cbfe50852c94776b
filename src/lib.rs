pub mod dbx;
pub use dbx::{Dialect, Expression, Query, SelectQuery};

pub mod database;
pub use database::{Collection, CollectionProvider, Config, FieldKind, RegistryCommon, SchemaField, SchemaRegistry};

pub mod resolver;
pub use resolver::{FieldResolver, RecordFieldResolver, RequestInfo, ResolutionError, ResolverResult, SimpleFieldResolver};

pub mod search;
pub use search::{ExprGroup, FilterError, SearchFilter, SearchProvider, SignOp, SortField, Token};
