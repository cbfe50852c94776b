use crate::{
    database::Config,
    dbx::{Query, SelectQuery},
    resolver::FieldResolver,
    search::{FilterError, SearchFilter, SortField},
};

/// Statements produced for one paginated search. Executing them is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQueries {
    pub models: Query,
    /// `COUNT(DISTINCT ..)` over the same filters; `None` when the total was skipped.
    pub count: Option<Query>,
    pub page: usize,
    pub per_page: usize,
}

/// Applies filters, sorting and pagination to a base select query.
pub struct SearchProvider<'r> {
    resolver: &'r mut dyn FieldResolver,
    config: Config,
    query: SelectQuery,
    filters: Vec<SearchFilter>,
    sort: Vec<SortField>,
    page: i64,
    per_page: i64,
    skip_total: bool,
    count_col: String,
}

impl<'r> SearchProvider<'r> {
    pub fn new(resolver: &'r mut dyn FieldResolver, config: &Config, query: SelectQuery) -> Self {
        Self {
            resolver,
            config: config.clone(),
            query,
            filters: Vec::new(),
            sort: Vec::new(),
            page: 1,
            per_page: config.default_per_page as i64,
            skip_total: false,
            count_col: "id".to_string(),
        }
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn per_page(mut self, per_page: i64) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn skip_total(mut self, skip_total: bool) -> Self {
        self.skip_total = skip_total;
        self
    }

    /// Column counted by the total query, relative to the main table.
    pub fn count_col(mut self, count_col: impl Into<String>) -> Self {
        self.count_col = count_col.into();
        self
    }

    pub fn add_filter(mut self, filter: impl Into<SearchFilter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn add_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    /// Adds every field of a `-created,title` style sort list.
    pub fn parse_sort(mut self, sort: &str) -> Self {
        self.sort.extend(SortField::parse_list(sort));
        self
    }

    /// `page` clamped to at least 1; `per_page` defaulted when not positive and capped at the maximum.
    fn normalized_pagination(&self) -> (usize, usize) {
        let page = usize::try_from(self.page).unwrap_or(0).max(1);
        let per_page = match usize::try_from(self.per_page) {
            Ok(0) | Err(_) => self.config.default_per_page,
            Ok(n) => n.min(self.config.max_per_page),
        };
        (page, per_page.max(1))
    }

    pub fn build(self) -> Result<SearchQueries, FilterError> {
        let mut models = self.query.clone();

        for filter in &self.filters {
            let expr = filter.build_expr(&mut *self.resolver)?;
            models.and_where(expr);
        }

        for sort in &self.sort {
            let term = sort.build_expr(&mut *self.resolver)?;
            models.and_order_by([term]);
        }

        self.resolver.update_query(&mut models);

        let (page, per_page) = self.normalized_pagination();

        let count = (!self.skip_total).then(|| {
            let dialect = models.dialect();
            let column = match models.main_reference() {
                Some(main) => dialect.quote_column_name(&format!("{main}.{}", self.count_col)),
                None => dialect.quote_column_name(&self.count_col),
            };
            let mut count = models.clone();
            count
                .distinct(false)
                .select([format!("COUNT(DISTINCT {column}) AS count")])
                .order_by(std::iter::empty::<String>())
                .limit(None)
                .offset(0);
            count.build()
        });

        models
            .limit(Some(per_page as u64))
            .offset((page - 1).saturating_mul(per_page) as u64);

        tracing::debug!(
            page,
            per_page,
            filters = self.filters.len(),
            sort = self.sort.len(),
            skip_total = self.skip_total,
            "built search queries"
        );

        Ok(SearchQueries { models: models.build(), count, page, per_page })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dbx::Dialect,
        resolver::SimpleFieldResolver,
        search::{ExprGroup, SignOp, Token},
    };

    fn base_query(dialect: Dialect) -> SelectQuery {
        let mut q = SelectQuery::new(dialect);
        q.select(["posts.*"]).from(["posts"]);
        q
    }

    #[test]
    fn normalizes_pagination() {
        let config = Config::default();
        let mut resolver = SimpleFieldResolver::new(Dialect::MySql, ["title"]);

        let queries = SearchProvider::new(&mut resolver, &config, base_query(Dialect::MySql))
            .page(0)
            .per_page(-3)
            .build()
            .unwrap();
        assert_eq!((queries.page, queries.per_page), (1, 30));
        assert!(queries.models.sql.ends_with("LIMIT 30"), "{}", queries.models.sql);

        let queries = SearchProvider::new(&mut resolver, &config, base_query(Dialect::MySql))
            .page(3)
            .per_page(10_000)
            .build()
            .unwrap();
        assert_eq!((queries.page, queries.per_page), (3, 500));
        assert!(queries.models.sql.ends_with("LIMIT 500 OFFSET 1000"), "{}", queries.models.sql);
    }

    #[test]
    fn huge_page_saturates_the_offset() {
        let config = Config::default();
        let mut resolver = SimpleFieldResolver::new(Dialect::MySql, ["title"]);

        let queries = SearchProvider::new(&mut resolver, &config, base_query(Dialect::MySql))
            .page(i64::MAX)
            .per_page(500)
            .build()
            .unwrap();
        assert_eq!(queries.per_page, 500);
        assert!(
            queries.models.sql.ends_with(&format!("LIMIT 500 OFFSET {}", usize::MAX)),
            "{}",
            queries.models.sql
        );
    }

    #[test]
    fn builds_models_and_count_queries() {
        let config = Config::sqlite();
        let mut resolver = SimpleFieldResolver::new(Dialect::Sqlite, ["title", "created"]);

        let queries = SearchProvider::new(&mut resolver, &config, base_query(Dialect::Sqlite))
            .add_filter(vec![ExprGroup::and(Token::identifier("title"), SignOp::Neq, Token::text(""))])
            .parse_sort("-created")
            .page(2)
            .per_page(5)
            .build()
            .unwrap();

        assert_eq!(
            queries.models.sql,
            "SELECT \"posts\".* FROM \"posts\" WHERE \"title\" != '' ORDER BY \"created\" DESC LIMIT 5 OFFSET 5"
        );
        let count = queries.count.unwrap();
        assert_eq!(
            count.sql,
            "SELECT COUNT(DISTINCT \"posts\".\"id\") AS \"count\" FROM \"posts\" WHERE \"title\" != ''"
        );
        assert_eq!(count.params, queries.models.params);
    }

    #[test]
    fn skip_total_omits_the_count_query() {
        let config = Config::default();
        let mut resolver = SimpleFieldResolver::new(Dialect::MySql, ["title"]);
        let queries = SearchProvider::new(&mut resolver, &config, base_query(Dialect::MySql))
            .skip_total(true)
            .build()
            .unwrap();
        assert!(queries.count.is_none());
    }

    #[test]
    fn invalid_sort_fails_the_build() {
        let config = Config::default();
        let mut resolver = SimpleFieldResolver::new(Dialect::MySql, ["title"]);
        let err = SearchProvider::new(&mut resolver, &config, base_query(Dialect::MySql))
            .parse_sort("nope")
            .build()
            .unwrap_err();
        assert!(matches!(err, FilterError::Resolution(_)));
    }
}
