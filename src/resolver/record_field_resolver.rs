use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    database::{Collection, CollectionProvider, Config, FieldKind},
    dbx::{Dialect, Expression, SelectQuery},
    resolver::{
        extract_nested, split_modifier, FieldResolver, Join, Modifier, RequestInfo, ResolutionCause,
        ResolutionError, ResolverResult, ResolverRunner,
    },
};

/// Field resolver for record queries on one base collection.
///
/// Holds everything a single compilation accumulates: the joins registered by
/// resolved paths, the collections loaded so far and the placeholder counter.
/// Supported paths include:
///
/// ```text
/// id
/// someSelect:each
/// project.screen.status
/// screen.project_via_prototype.name
/// @request.context
/// @request.method
/// @request.query.filter
/// @request.headers.x_token
/// @request.auth.someRelation.name
/// @request.data.someRelation.name
/// @request.data.someField
/// @request.data.someSelect:each
/// @request.data.someField:isset
/// @collection.product.name
/// ```
pub struct RecordFieldResolver<'a> {
    provider: &'a dyn CollectionProvider,
    base_collection: Arc<Collection>,
    request_info: Option<&'a RequestInfo>,
    static_request_info: Map<String, Value>,
    config: Config,
    loaded_collections: Vec<Arc<Collection>>,
    joins: Vec<Join>,
    placeholder_counter: usize,
}

impl<'a> RecordFieldResolver<'a> {
    pub fn new(
        provider: &'a dyn CollectionProvider,
        base_collection: Arc<Collection>,
        request_info: Option<&'a RequestInfo>,
        config: &Config,
    ) -> Self {
        let static_request_info = request_info.map(RequestInfo::to_static_map).unwrap_or_default();
        Self {
            provider,
            loaded_collections: vec![Arc::clone(&base_collection)],
            base_collection,
            request_info,
            static_request_info,
            config: config.clone(),
            joins: Vec::new(),
            placeholder_counter: 0,
        }
    }

    pub fn base_collection(&self) -> &Arc<Collection> {
        &self.base_collection
    }

    pub fn request_info(&self) -> Option<&'a RequestInfo> {
        self.request_info
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Returns an already loaded collection, else asks the provider and caches the answer.
    pub fn load_collection(&mut self, name_or_id: &str) -> Option<Arc<Collection>> {
        if let Some(found) = self
            .loaded_collections
            .iter()
            .find(|c| c.id == name_or_id || c.name.eq_ignore_ascii_case(name_or_id))
        {
            return Some(Arc::clone(found));
        }

        let collection = self.provider.find_collection_by_name_or_id(name_or_id)?;
        self.loaded_collections.push(Arc::clone(&collection));
        Some(collection)
    }

    /// Caches a collection obtained elsewhere, e.g. the auth record's.
    pub fn remember_collection(&mut self, collection: &Arc<Collection>) {
        if !self.loaded_collections.iter().any(|c| c.id == collection.id) {
            self.loaded_collections.push(Arc::clone(collection));
        }
    }

    /// Registers a join. A join with the same alias is replaced in place.
    pub fn register_join(&mut self, table: impl Into<String>, alias: impl Into<String>, on: Expression) {
        let join = Join::new(table, alias, on);
        match self.joins.iter_mut().find(|j| j.alias == join.alias) {
            Some(existing) => {
                tracing::trace!(alias = %join.alias, "replacing join");
                *existing = join;
            }
            None => {
                tracing::trace!(alias = %join.alias, table = %join.table, "registering join");
                self.joins.push(join);
            }
        }
    }

    /// Resolves a path into the static request map (`@request.` prefix already removed).
    pub fn resolve_static_request_field(&mut self, path: &[String]) -> Result<ResolverResult, ResolutionCause> {
        let Some((last, parents)) = path.split_last() else {
            return Err(ResolutionCause::EmptyPath);
        };
        let (last, modifier) = split_modifier(last)?;

        let mut keys: Vec<&str> = parents.iter().map(String::as_str).collect();
        keys.push(last);
        let found = extract_nested(&self.static_request_info, &keys);

        if modifier == Some(Modifier::Isset) {
            return Ok(ResolverResult::identifier(if found.is_some() { "TRUE" } else { "FALSE" }));
        }

        let value = match found {
            None | Some(Value::Null) => return Ok(ResolverResult::null()),
            Some(Value::String(s)) => {
                let is_number_field = self
                    .base_collection
                    .field_by_name(last)
                    .is_some_and(|f| matches!(f.kind, FieldKind::Number));
                match s.trim().parse::<f64>() {
                    Ok(n) if is_number_field => Value::from(n),
                    _ => Value::String(s.clone()),
                }
            }
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.clone(),
            Some(v) => Value::String(v.to_string()),
        };

        let placeholder = self.next_placeholder("t");
        Ok(ResolverResult::param(&placeholder, value))
    }
}

impl FieldResolver for RecordFieldResolver<'_> {
    fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    fn resolve(&mut self, field: &str) -> Result<ResolverResult, ResolutionError> {
        match ResolverRunner::new(self, field).run() {
            Ok(result) => {
                tracing::debug!(field, identifier = %result.identifier, "resolved field");
                Ok(result)
            }
            Err(err) => {
                tracing::warn!(field, error = %err, "failed to resolve field");
                Err(err)
            }
        }
    }

    fn next_placeholder(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.placeholder_counter);
        self.placeholder_counter += 1;
        name
    }

    fn update_query(&self, query: &mut SelectQuery) {
        if self.joins.is_empty() {
            return;
        }
        query.distinct(true);
        for join in &self.joins {
            query.left_join(&format!("{} {}", join.table, join.alias), Some(join.on.clone()));
        }
    }
}
