use once_cell::sync::Lazy;
use regex::Regex;

/// Field paths a record filter may reference.
pub static RECORD_FIELD_ALLOW_LIST: Lazy<AllowList> = Lazy::new(|| {
    AllowList::new([
        r"^\w+[\w\.:]*$",
        r"^@request\.context$",
        r"^@request\.method$",
        r"^@request\.auth\.[\w\.:]*\w+$",
        r"^@request\.data\.[\w\.:]*\w+$",
        r"^@request\.query\.[\w\.:]*\w+$",
        r"^@request\.headers\.\w+$",
        r"^@collection\.\w+(:\w+)?\.[\w\.:]*\w+$",
    ])
});

#[derive(Debug, Clone)]
enum FieldPattern {
    Exact(String),
    Regex(Regex),
}

/// Exact names and `^...$` regex patterns.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    patterns: Vec<FieldPattern>,
}

impl AllowList {
    /// Patterns starting with `^` and ending with `$` are compiled as regexes; invalid ones are skipped.
    pub fn new<S: AsRef<str>>(patterns: impl IntoIterator<Item = S>) -> Self {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref();
                if p.len() > 1 && p.starts_with('^') && p.ends_with('$') {
                    match Regex::new(p) {
                        Ok(re) => Some(FieldPattern::Regex(re)),
                        Err(e) => {
                            tracing::warn!(pattern = p, error = %e, "skipping invalid allow-list pattern");
                            None
                        }
                    }
                } else {
                    Some(FieldPattern::Exact(p.to_string()))
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_allowed(&self, field: &str) -> bool {
        self.patterns.iter().any(|pattern| match pattern {
            FieldPattern::Exact(name) => name == field,
            FieldPattern::Regex(re) => re.is_match(field),
        })
    }
}
