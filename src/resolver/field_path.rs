use once_cell::sync::Lazy;
use regex::Regex;

use crate::resolver::ResolutionCause;

static NON_COLUMN_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\.\*\-_@#]+").expect("valid columnify regex"));

static BACK_RELATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)_via_(\w+)$").expect("valid back relation regex"));

pub const COLLECTION_PREFIX: &str = "@collection";
pub const REQUEST_PREFIX: &str = "@request";
pub const REQUEST_AUTH_PREFIX: &str = "@request.auth.";
pub const REQUEST_DATA_PREFIX: &str = "@request.data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Each,
    Isset,
    Length,
}

impl Modifier {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "each" => Some(Modifier::Each),
            "isset" => Some(Modifier::Isset),
            "length" => Some(Modifier::Length),
            _ => None,
        }
    }
}

/// Strips everything that cannot appear in a column identifier.
pub fn columnify(s: &str) -> String {
    NON_COLUMN_CHARS_RE.replace_all(s, "").into_owned()
}

/// Splits `name:modifier`. A segment with no colon, or more than one, carries no modifier.
pub fn split_modifier(segment: &str) -> Result<(&str, Option<Modifier>), ResolutionCause> {
    let mut parts = segment.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(modifier), None) => match Modifier::parse(modifier) {
            Some(m) => Ok((name, Some(m))),
            None => Err(ResolutionCause::UnknownModifier(segment.to_string())),
        },
        _ => Ok((segment, None)),
    }
}

/// `<collection>_via_<field>` segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackRelation {
    pub collection: String,
    pub field: String,
}

impl BackRelation {
    pub fn parse(segment: &str) -> Option<Self> {
        let caps = BACK_RELATION_RE.captures(segment)?;
        Some(Self {
            collection: caps.get(1)?.as_str().to_string(),
            field: caps.get(2)?.as_str().to_string(),
        })
    }
}
