use std::sync::Arc;

use serde_json::Value;

use crate::{
    database::{Collection, RelationOptions, SchemaField},
    dbx::Expression,
    resolver::{
        columnify, split_modifier, to_unique_string_list, BackRelation, FieldResolver, Join, Modifier,
        MultiMatchSubquery, RecordFieldResolver, ResolutionCause, ResolutionError, ResolverResult,
        COLLECTION_PREFIX, RECORD_FIELD_ALLOW_LIST, REQUEST_AUTH_PREFIX, REQUEST_DATA_PREFIX, REQUEST_PREFIX,
    },
};

/// `@request.auth.*` fields answered from the static request map, without a join.
const PLAIN_REQUEST_AUTH_FIELDS: &[&str] = &[
    "@request.auth.id",
    "@request.auth.collectionId",
    "@request.auth.collectionName",
    "@request.auth.username",
    "@request.auth.email",
    "@request.auth.emailVisibility",
    "@request.auth.verified",
    "@request.auth.created",
    "@request.auth.updated",
];

/// Where the walk currently stands: collection, its alias in the main query and
/// in the multi-match mirror, and whether a multi-valued hop was crossed.
#[derive(Debug, Clone)]
struct ActiveState {
    collection: Arc<Collection>,
    alias: String,
    mm_alias: String,
    with_multi_match: bool,
}

enum Step {
    Continue(ActiveState),
    Done(ResolverResult),
}

/// Resolves a single field path. Consumed by [`ResolverRunner::run`].
pub struct ResolverRunner<'r, 'a> {
    resolver: &'r mut RecordFieldResolver<'a>,
    field_name: String,
    allow_hidden_fields: bool,
    nullify_missing_field: bool,
    multi_match: MultiMatchSubquery,
}

impl<'r, 'a> ResolverRunner<'r, 'a> {
    pub fn new(resolver: &'r mut RecordFieldResolver<'a>, field_name: &str) -> Self {
        Self {
            resolver,
            field_name: field_name.to_string(),
            allow_hidden_fields: false,
            nullify_missing_field: false,
            multi_match: MultiMatchSubquery::default(),
        }
    }

    pub fn run(mut self) -> Result<ResolverResult, ResolutionError> {
        if !RECORD_FIELD_ALLOW_LIST.is_allowed(&self.field_name) {
            return Err(ResolutionError::new(&self.field_name, ResolutionCause::DisallowedField));
        }
        self.dispatch().map_err(|cause| ResolutionError::new(&self.field_name, cause))
    }

    fn dispatch(&mut self) -> Result<ResolverResult, ResolutionCause> {
        let segments: Vec<String> = self.field_name.split('.').map(str::to_string).collect();
        let base = Arc::clone(self.resolver.base_collection());
        let base_alias = columnify(&base.name);
        let root = segments.first().map(String::as_str).unwrap_or_default();

        self.allow_hidden_fields =
            self.resolver.config().allow_hidden_fields || root == COLLECTION_PREFIX || root == REQUEST_PREFIX;
        self.nullify_missing_field = root == REQUEST_PREFIX;

        let mm_alias = format!("__mm_{base_alias}");
        self.multi_match = MultiMatchSubquery::new(&base_alias, &base_alias, &mm_alias);

        let state = ActiveState {
            collection: base,
            alias: base_alias,
            mm_alias,
            with_multi_match: false,
        };

        match root {
            COLLECTION_PREFIX => self.process_collection_field(&segments),
            REQUEST_PREFIX => self.process_request_field(state, &segments),
            _ => self.process_active_props(state, &segments),
        }
    }

    fn process_collection_field(&mut self, segments: &[String]) -> Result<ResolverResult, ResolutionCause> {
        if segments.len() < 3 {
            return Err(ResolutionCause::InvalidCollectionPath);
        }

        let (name, custom_alias) = match segments[1].split_once(':') {
            Some((name, alias)) => (name, alias),
            None => (segments[1].as_str(), ""),
        };

        let collection = self
            .resolver
            .load_collection(name)
            .ok_or_else(|| ResolutionCause::UnknownCollection(name.to_string()))?;

        let alias = if custom_alias.is_empty() {
            columnify(&format!("__collection_{}", collection.name))
        } else {
            columnify(&format!("__collection_alias_{custom_alias}"))
        };
        let table = columnify(&collection.name);
        let mm_alias = format!("__mm{alias}");

        self.resolver.register_join(&table, &alias, Expression::raw("1=1"));
        self.multi_match.joins.push(Join::new(&table, &mm_alias, Expression::raw("1=1")));

        let state = ActiveState {
            collection,
            alias,
            mm_alias,
            with_multi_match: true,
        };
        self.process_active_props(state, &segments[2..])
    }

    fn process_request_field(&mut self, state: ActiveState, segments: &[String]) -> Result<ResolverResult, ResolutionCause> {
        if self.resolver.request_info().is_none() {
            return Ok(ResolverResult::null());
        }

        if self.field_name.starts_with(REQUEST_AUTH_PREFIX) {
            return self.process_request_auth_field(state, segments);
        }

        if self.field_name.starts_with(REQUEST_DATA_PREFIX) && segments.len() > 2 {
            let (name, modifier) = split_modifier(&segments[2])?;
            let Some(field) = state.collection.field_by_name(name).cloned() else {
                return self.resolver.resolve_static_request_field(&segments[1..]);
            };

            if field.relation_options().is_some() && segments.len() > 3 {
                return self.process_request_data_relation(state, &field, segments);
            }
            if field.is_arrayable() && segments.len() == 3 {
                match modifier {
                    Some(Modifier::Each) => return self.process_request_data_each(&state, &field),
                    Some(Modifier::Length) => return Ok(self.process_request_data_length(&field)),
                    _ => {}
                }
            }
        }

        self.resolver.resolve_static_request_field(&segments[1..])
    }

    fn request_data_value(&self, field: &SchemaField) -> Vec<String> {
        let data = self.resolver.request_info().and_then(|info| info.data.get(&field.name));
        to_unique_string_list(data)
    }

    fn process_request_data_length(&self, field: &SchemaField) -> ResolverResult {
        ResolverResult::identifier(self.request_data_value(field).len().to_string())
    }

    fn process_request_data_each(&mut self, state: &ActiveState, field: &SchemaField) -> Result<ResolverResult, ResolutionCause> {
        let multiple = field.is_multiple().ok_or_else(|| ResolutionCause::OptionsInitialization {
            field: field.name.clone(),
            reason: "field does not support multiple values".into(),
        })?;

        let raw_json = Value::String(Value::from(self.request_data_value(field)).to_string());
        let dialect = self.resolver.dialect();

        let placeholder = self.resolver.next_placeholder("dataEach");
        let je_alias = format!("__dataEach_{}_je", columnify(&field.name));
        self.resolver
            .register_join(dialect.json_each_param(&placeholder), &je_alias, Expression::raw("1=1"));

        let mut result = ResolverResult::identifier(format!("{je_alias}.value"));
        result.params.insert(placeholder.clone(), raw_json.clone());

        if state.with_multi_match || multiple {
            let mm_placeholder = format!("mm{placeholder}");
            let mm_alias = format!("__mm{je_alias}");
            self.multi_match
                .joins
                .push(Join::new(dialect.json_each_param(&mm_placeholder), &mm_alias, Expression::raw("1=1")));
            self.multi_match.params.insert(mm_placeholder, raw_json);
            self.multi_match.value_identifier = format!("{mm_alias}.value");
            result = result.with_multi_match(self.multi_match.clone());
        }

        Ok(result)
    }

    fn process_request_data_relation(
        &mut self,
        state: ActiveState,
        field: &SchemaField,
        segments: &[String],
    ) -> Result<ResolverResult, ResolutionCause> {
        let options = relation_options_of(field)?;
        let collection = self
            .resolver
            .load_collection(&options.collection_id)
            .ok_or_else(|| ResolutionCause::UnknownCollection(options.collection_id.clone()))?;

        let ids = self.request_data_value(field);
        if ids.is_empty() {
            return Ok(ResolverResult::null());
        }

        let table = columnify(&collection.name);
        let alias = columnify(&format!("__data_{}_{}", collection.name, field.name));
        let mm_alias = columnify(&format!("__data_mm_{}_{}", collection.name, field.name));

        self.resolver
            .register_join(&table, &alias, Expression::in_list(format!("{alias}.id"), ids.clone()));
        self.multi_match
            .joins
            .push(Join::new(&table, &mm_alias, Expression::in_list(format!("{mm_alias}.id"), ids)));

        let state = ActiveState {
            collection,
            alias,
            mm_alias,
            with_multi_match: state.with_multi_match || options.is_multiple(),
        };
        self.process_active_props(state, &segments[3..])
    }

    fn process_request_auth_field(&mut self, state: ActiveState, segments: &[String]) -> Result<ResolverResult, ResolutionCause> {
        if PLAIN_REQUEST_AUTH_FIELDS.contains(&self.field_name.as_str()) {
            return self.resolver.resolve_static_request_field(&segments[1..]);
        }

        let Some(auth) = self.resolver.request_info().and_then(|info| info.auth.as_ref()) else {
            return Ok(ResolverResult::null());
        };
        let collection = Arc::clone(&auth.collection);
        let auth_id = auth.id.clone();
        self.resolver.remember_collection(&collection);

        let table = columnify(&collection.name);
        let alias = format!("__auth_{table}");
        let mm_alias = format!("__mm_{alias}");

        self.resolver.register_join(
            &table,
            &alias,
            Expression::hash([(format!("{alias}.id"), Value::String(auth_id.clone()))]),
        );
        self.multi_match.joins.push(Join::new(
            &table,
            &mm_alias,
            Expression::hash([(format!("{mm_alias}.id"), Value::String(auth_id))]),
        ));

        let state = ActiveState {
            collection,
            alias,
            mm_alias,
            ..state
        };
        self.process_active_props(state, &segments[2..])
    }

    /// Walks relation hops until the last segment, which is resolved to a column.
    fn process_active_props(&mut self, state: ActiveState, props: &[String]) -> Result<ResolverResult, ResolutionCause> {
        let max_nested = self.resolver.config().max_nested_relations;
        let mut state = state;

        for (i, prop) in props.iter().enumerate() {
            if i == props.len() - 1 {
                return self.resolve_last_prop(state, prop);
            }

            let collection = Arc::clone(&state.collection);
            let field = collection.field_by_name(prop);

            if let Some(field) = field.filter(|f| f.is_json()) {
                return Ok(self.resolve_json_path(&state, field, &props[i + 1..]));
            }

            if i >= max_nested {
                return Err(ResolutionCause::MaxNestedRelations(prop.clone()));
            }

            state = match field {
                Some(field) => self.join_direct_relation(state, field, prop)?,
                None => match self.join_back_relation(state, prop)? {
                    Step::Continue(next) => next,
                    Step::Done(result) => return Ok(result),
                },
            };
        }

        Err(ResolutionCause::EmptyPath)
    }

    fn missing(&self, cause: ResolutionCause) -> Result<Step, ResolutionCause> {
        if self.nullify_missing_field {
            Ok(Step::Done(ResolverResult::null()))
        } else {
            Err(cause)
        }
    }

    fn join_back_relation(&mut self, state: ActiveState, prop: &str) -> Result<Step, ResolutionCause> {
        let Some(back) = BackRelation::parse(prop) else {
            return self.missing(ResolutionCause::UnknownField(prop.to_string()));
        };
        let Some(back_collection) = self.resolver.load_collection(&back.collection) else {
            return self.missing(ResolutionCause::UnknownCollection(back.collection));
        };
        let Some(back_field) = back_collection.field_by_name(&back.field) else {
            return self.missing(ResolutionCause::UnknownField(back.field));
        };

        let Some(options) = back_field.relation_options() else {
            return Err(ResolutionCause::InvalidBackRelation(prop.to_string()));
        };
        if options.collection_id.is_empty() {
            return Err(ResolutionCause::OptionsInitialization {
                field: back_field.name.clone(),
                reason: "missing related collection id".into(),
            });
        }
        if options.collection_id != state.collection.id {
            return Err(ResolutionCause::InvalidBackRelation(prop.to_string()));
        }

        let multiple = options.is_multiple() || !back_collection.has_single_column_unique_index(&back_field.name);

        let clean_prop = columnify(prop);
        let clean_field = columnify(&back_field.name);
        let table = columnify(&back_collection.name);
        let new_alias = format!("{}_{clean_prop}", state.alias);
        let new_mm_alias = format!("{}_{clean_prop}", state.mm_alias);

        let on = self.back_relation_condition(&state.alias, &new_alias, &clean_field, &clean_prop, multiple);
        self.resolver.register_join(&table, &new_alias, on);

        let mm_on = self.back_relation_condition(&state.mm_alias, &new_mm_alias, &clean_field, &clean_prop, multiple);
        self.multi_match.joins.push(Join::new(&table, &new_mm_alias, mm_on));

        Ok(Step::Continue(ActiveState {
            collection: Arc::clone(&back_collection),
            alias: new_alias,
            mm_alias: new_mm_alias,
            with_multi_match: state.with_multi_match || multiple,
        }))
    }

    /// Single: `new.field = active.id`. Multiple: `active.id` must be one of the elements of `new.field`.
    fn back_relation_condition(&self, active: &str, new_alias: &str, field: &str, prop: &str, multiple: bool) -> Expression {
        if !multiple {
            return Expression::raw(format!("{new_alias}.{field} = {active}.id"));
        }
        let je_alias = format!("{active}_{prop}_je");
        let json_each = self.resolver.dialect().json_each_column(&format!("{new_alias}.{field}"));
        Expression::raw(format!("{active}.id IN (SELECT {je_alias}.value FROM {json_each} {je_alias})"))
    }

    fn join_direct_relation(&mut self, state: ActiveState, field: &SchemaField, prop: &str) -> Result<ActiveState, ResolutionCause> {
        let Some(options) = field.relation_options() else {
            return Err(ResolutionCause::NotARelation(prop.to_string()));
        };
        let options = relation_options_checked(field, options)?;

        let collection = self
            .resolver
            .load_collection(&options.collection_id)
            .ok_or_else(|| ResolutionCause::UnknownCollection(options.collection_id.clone()))?;

        let multiple = options.is_multiple();
        let clean = columnify(&field.name);
        let table = columnify(&collection.name);
        let new_alias = format!("{}_{clean}", state.alias);
        let new_mm_alias = format!("{}_{clean}", state.mm_alias);

        if multiple {
            let dialect = self.resolver.dialect();

            let je_alias = format!("{}_{clean}_je", state.alias);
            self.resolver.register_join(
                dialect.json_each_column(&format!("{}.{clean}", state.alias)),
                &je_alias,
                Expression::raw("1=1"),
            );
            self.resolver
                .register_join(&table, &new_alias, Expression::raw(format!("{new_alias}.id = {je_alias}.value")));

            let mm_je_alias = format!("{}_{clean}_je", state.mm_alias);
            self.multi_match.joins.push(Join::new(
                dialect.json_each_column(&format!("{}.{clean}", state.mm_alias)),
                &mm_je_alias,
                Expression::raw("1=1"),
            ));
            self.multi_match.joins.push(Join::new(
                &table,
                &new_mm_alias,
                Expression::raw(format!("{new_mm_alias}.id = {mm_je_alias}.value")),
            ));
        } else {
            self.resolver.register_join(
                &table,
                &new_alias,
                Expression::raw(format!("{new_alias}.id = {}.{clean}", state.alias)),
            );
            self.multi_match.joins.push(Join::new(
                &table,
                &new_mm_alias,
                Expression::raw(format!("{new_mm_alias}.id = {}.{clean}", state.mm_alias)),
            ));
        }

        Ok(ActiveState {
            collection,
            alias: new_alias,
            mm_alias: new_mm_alias,
            with_multi_match: state.with_multi_match || multiple,
        })
    }

    fn resolve_json_path(&mut self, state: &ActiveState, field: &SchemaField, rest: &[String]) -> ResolverResult {
        let path: String = rest
            .iter()
            .enumerate()
            .map(|(j, segment)| {
                if segment.parse::<i64>().is_ok() {
                    format!("[{segment}]")
                } else if j > 0 {
                    format!(".{}", columnify(segment))
                } else {
                    columnify(segment)
                }
            })
            .collect();

        let dialect = self.resolver.dialect();
        let clean = columnify(&field.name);
        let mut result = ResolverResult::identifier(dialect.json_extract(&format!("{}.{clean}", state.alias), &path))
            .with_no_coalesce(true);

        if state.with_multi_match {
            self.multi_match.value_identifier = dialect.json_extract(&format!("{}.{clean}", state.mm_alias), &path);
            result = result.with_multi_match(self.multi_match.clone());
        }
        result
    }

    fn resolve_last_prop(&mut self, state: ActiveState, prop: &str) -> Result<ResolverResult, ResolutionCause> {
        let dialect = self.resolver.dialect();

        if state.collection.has_system_field(prop) {
            let column = columnify(prop);
            let mut result = ResolverResult::identifier(format!("{}.{column}", state.alias));

            if prop == "email" && !self.allow_hidden_fields {
                let visibility = format!("{}.emailVisibility = TRUE", state.alias);
                result = result.with_after_build(Arc::new(move |expr: Expression| {
                    Expression::enclose(Expression::and([expr, Expression::raw(visibility.clone())]))
                }));
            }

            if state.with_multi_match {
                self.multi_match.value_identifier = format!("{}.{column}", state.mm_alias);
                result = result.with_multi_match(self.multi_match.clone());
            }
            return Ok(result);
        }

        let (name, modifier) = split_modifier(prop)?;
        let Some(field) = state.collection.field_by_name(name).cloned() else {
            if self.nullify_missing_field {
                return Ok(ResolverResult::null());
            }
            return Err(ResolutionCause::UnknownField(name.to_string()));
        };

        let clean = columnify(&field.name);
        let column = format!("{}.{clean}", state.alias);
        let mm_column = format!("{}.{clean}", state.mm_alias);
        let mut with_multi_match = state.with_multi_match;

        let (mut result, mm_value) = match modifier {
            Some(Modifier::Length) if field.is_arrayable() => (
                ResolverResult::identifier(dialect.json_array_length(&column)),
                dialect.json_array_length(&mm_column),
            ),
            Some(Modifier::Each) if field.is_arrayable() => {
                let multiple = field.is_multiple().ok_or_else(|| ResolutionCause::OptionsInitialization {
                    field: field.name.clone(),
                    reason: "field does not support multiple values".into(),
                })?;
                with_multi_match |= multiple;

                let je_alias = format!("{}_{clean}_je", state.alias);
                self.resolver
                    .register_join(dialect.json_each_column(&column), &je_alias, Expression::raw("1=1"));

                let mm_je_alias = format!("{}_{clean}_je", state.mm_alias);
                if with_multi_match {
                    self.multi_match.joins.push(Join::new(
                        dialect.json_each_column(&mm_column),
                        &mm_je_alias,
                        Expression::raw("1=1"),
                    ));
                }
                (ResolverResult::identifier(format!("{je_alias}.value")), format!("{mm_je_alias}.value"))
            }
            _ if field.is_json() => (
                ResolverResult::identifier(dialect.json_extract(&column, "")).with_no_coalesce(true),
                dialect.json_extract(&mm_column, ""),
            ),
            _ => (ResolverResult::identifier(column), mm_column),
        };

        if with_multi_match {
            self.multi_match.value_identifier = mm_value;
            result = result.with_multi_match(self.multi_match.clone());
        }
        Ok(result)
    }
}

fn relation_options_of(field: &SchemaField) -> Result<&RelationOptions, ResolutionCause> {
    let options = field
        .relation_options()
        .ok_or_else(|| ResolutionCause::NotARelation(field.name.clone()))?;
    relation_options_checked(field, options)
}

fn relation_options_checked<'f>(
    field: &SchemaField,
    options: &'f RelationOptions,
) -> Result<&'f RelationOptions, ResolutionCause> {
    if options.collection_id.is_empty() {
        return Err(ResolutionCause::OptionsInitialization {
            field: field.name.clone(),
            reason: "missing related collection id".into(),
        });
    }
    Ok(options)
}
