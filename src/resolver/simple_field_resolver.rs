use crate::{
    dbx::Dialect,
    resolver::{columnify, AllowList, FieldResolver, ResolutionCause, ResolutionError, ResolverResult},
};

/// Resolves plain columns of a single table, without relations.
///
/// `a.b.c` is read as column `a` holding JSON, extracted at `$.b.c`.
#[derive(Debug, Clone)]
pub struct SimpleFieldResolver {
    dialect: Dialect,
    allowed_fields: AllowList,
    placeholder_counter: usize,
}

impl SimpleFieldResolver {
    pub fn new<S: AsRef<str>>(dialect: Dialect, allowed_fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            dialect,
            allowed_fields: AllowList::new(allowed_fields),
            placeholder_counter: 0,
        }
    }
}

impl FieldResolver for SimpleFieldResolver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn resolve(&mut self, field: &str) -> Result<ResolverResult, ResolutionError> {
        if !self.allowed_fields.is_allowed(field) {
            return Err(ResolutionError::new(field, ResolutionCause::DisallowedField));
        }

        let mut parts = field.split('.');
        let column = parts.next().map(columnify).unwrap_or_default();
        if column.is_empty() {
            return Err(ResolutionError::new(field, ResolutionCause::EmptyPath));
        }

        let path: String = parts
            .map(|part| {
                if part.parse::<i64>().is_ok() {
                    format!("[{part}]")
                } else {
                    format!(".{}", columnify(part))
                }
            })
            .collect();

        if path.is_empty() {
            return Ok(ResolverResult::identifier(self.dialect.quote_simple_column_name(&column)));
        }
        let path = path.strip_prefix('.').unwrap_or(&path);
        Ok(ResolverResult::identifier(self.dialect.json_extract(&column, path)).with_no_coalesce(true))
    }

    fn next_placeholder(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.placeholder_counter);
        self.placeholder_counter += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_plain_and_json_columns() {
        let mut r = SimpleFieldResolver::new(Dialect::MySql, ["title", "^meta(\\.\\w+)*$"]);

        let res = r.resolve("title").unwrap();
        assert_eq!(res.identifier, "`title`");
        assert!(!res.no_coalesce);

        let res = r.resolve("meta.a.0").unwrap();
        assert_eq!(
            res.identifier,
            "(IF(JSON_VALID(`meta`),JSON_EXTRACT(`meta`,'$.a[0]'),JSON_EXTRACT(JSON_OBJECT('pb',`meta`),'$.pb.a[0]')))"
        );
        assert!(res.no_coalesce);
    }

    #[test]
    fn rejects_fields_outside_the_allow_list() {
        let mut r = SimpleFieldResolver::new(Dialect::Sqlite, ["title"]);
        let err = r.resolve("secret").unwrap_err();
        assert_eq!(err.path, "secret");
        assert_eq!(err.cause, ResolutionCause::DisallowedField);
    }
}
