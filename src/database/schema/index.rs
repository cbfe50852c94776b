use once_cell::sync::Lazy;
use regex::Regex;

static INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)create\s+(unique\s+)?\s*index\s*(if\s+not\s+exists\s+)?(\S*)\s+on\s+(\S*)\s*\(([\s\S]*)\)(?:\s*where\s+([\s\S]*))?",
    )
    .expect("valid index regex")
});

static INDEX_COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(.+?)(?:\s+collate\s+(\w+))?(?:\s+(asc|desc))?$").expect("valid index column regex")
});

const TRIM_CHARS: &[char] = &['`', '"', '\'', '[', ']'];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub collate: String,
    pub sort: String,
}

/// A parsed `CREATE [UNIQUE] INDEX` statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub unique: bool,
    pub optional: bool,
    pub schema_name: String,
    pub index_name: String,
    pub table_name: String,
    pub columns: Vec<IndexColumn>,
    pub where_clause: String,
}

impl Index {
    /// Parses a CREATE INDEX statement. Unparseable input yields an invalid (default) index.
    pub fn parse(expr: &str) -> Self {
        let Some(caps) = INDEX_RE.captures(expr) else {
            return Self::default();
        };
        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");

        let names: Vec<&str> = group(3).split('.').collect();
        let (schema_name, index_name) = match names.as_slice() {
            [schema, name] => (clean_name(schema), clean_name(name)),
            _ => (String::new(), clean_name(group(3))),
        };

        let columns = split_top_level(group(5), ',')
            .into_iter()
            .filter_map(|raw| {
                let col = INDEX_COLUMN_RE.captures(raw.trim())?;
                let name = clean_name(col.get(1)?.as_str());
                if name.is_empty() {
                    return None;
                }
                Some(IndexColumn {
                    name,
                    collate: col.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
                    sort: col.get(3).map(|m| m.as_str().trim().to_uppercase()).unwrap_or_default(),
                })
            })
            .collect();

        Self {
            unique: !group(1).trim().is_empty(),
            optional: !group(2).trim().is_empty(),
            schema_name,
            index_name,
            table_name: clean_name(group(4)),
            columns,
            where_clause: group(6).trim().to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.index_name.is_empty() && !self.table_name.is_empty() && !self.columns.is_empty()
    }
}

fn clean_name(raw: &str) -> String {
    raw.trim().chars().filter(|c| !TRIM_CHARS.contains(c)).collect::<String>().trim().to_string()
}

/// Splits on `sep` outside of parentheses and quotes.
fn split_top_level(source: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in source.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&source[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unique_single_column_index() {
        let idx = Index::parse("CREATE UNIQUE INDEX `idx_slug` ON `posts` (`slug`)");
        assert!(idx.is_valid());
        assert!(idx.unique);
        assert!(!idx.optional);
        assert_eq!(idx.index_name, "idx_slug");
        assert_eq!(idx.table_name, "posts");
        assert_eq!(idx.columns, vec![IndexColumn { name: "slug".into(), ..Default::default() }]);
    }

    #[test]
    fn parses_schema_collate_sort_and_where() {
        let idx = Index::parse(
            "create index if not exists main.idx_title on posts (title collate nocase desc, lower(body)) where status = 'x'",
        );
        assert!(idx.optional);
        assert!(!idx.unique);
        assert_eq!(idx.schema_name, "main");
        assert_eq!(idx.columns.len(), 2);
        assert_eq!(idx.columns[0].name, "title");
        assert_eq!(idx.columns[0].collate, "nocase");
        assert_eq!(idx.columns[0].sort, "DESC");
        assert_eq!(idx.columns[1].name, "lower(body)");
        assert_eq!(idx.where_clause, "status = 'x'");
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(!Index::parse("not an index").is_valid());
    }
}
