use crate::{
    dbx::{Dialect, SelectQuery},
    resolver::{ResolutionError, ResolverResult},
};

/// Turns filter field paths into SQL operands for one query compilation.
pub trait FieldResolver {
    fn dialect(&self) -> Dialect;

    fn resolve(&mut self, field: &str) -> Result<ResolverResult, ResolutionError>;

    /// Next unique placeholder name with the given prefix, for values bound during this compilation.
    fn next_placeholder(&mut self, prefix: &str) -> String;

    /// Applies whatever the resolved fields need (joins, DISTINCT) to the final query.
    fn update_query(&self, _query: &mut SelectQuery) {}
}
