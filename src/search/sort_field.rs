use std::fmt;

use crate::{
    resolver::FieldResolver,
    search::FilterError,
};

pub const RANDOM_SORT_KEY: &str = "@random";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn new(name: impl Into<String>, direction: SortDirection) -> Self {
        Self { name: name.into(), direction }
    }

    pub fn asc(name: impl Into<String>) -> Self {
        Self::new(name, SortDirection::Asc)
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self::new(name, SortDirection::Desc)
    }

    /// Parses `-created,+title,id`: a leading `-` sorts descending, `+` or nothing ascending.
    pub fn parse_list(input: &str) -> Vec<SortField> {
        input
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(|field| match field.strip_prefix('-') {
                Some(name) => SortField::desc(name),
                None => SortField::asc(field.strip_prefix('+').unwrap_or(field)),
            })
            .collect()
    }

    /// ORDER BY term for this field. Only column-like operands are accepted.
    pub fn build_expr(&self, resolver: &mut dyn FieldResolver) -> Result<String, FilterError> {
        if self.name == RANDOM_SORT_KEY {
            return Ok(resolver.dialect().random_function().to_string());
        }

        let result = resolver.resolve(&self.name)?;
        if !result.params.is_empty()
            || result.identifier.is_empty()
            || result.identifier.eq_ignore_ascii_case("null")
        {
            return Err(FilterError::InvalidSortField(self.name.clone()));
        }

        Ok(format!("{} {}", result.identifier, self.direction))
    }
}
