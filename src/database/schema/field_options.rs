use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelationOptions {
    pub collection_id: String,
    pub cascade_delete: bool,
    pub min_select: Option<u32>,
    /// `None` means unbounded.
    pub max_select: Option<u32>,
}

impl RelationOptions {
    pub fn new(collection_id: impl Into<String>, max_select: Option<u32>) -> Self {
        Self {
            collection_id: collection_id.into(),
            max_select,
            ..Default::default()
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.max_select.is_none_or(|max| max > 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectOptions {
    pub max_select: u32,
    pub values: Vec<String>,
}

impl SelectOptions {
    pub fn is_multiple(&self) -> bool {
        self.max_select > 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileOptions {
    pub max_select: u32,
    pub max_size: u64,
    pub mime_types: Vec<String>,
    pub protected: bool,
}

impl FileOptions {
    pub fn is_multiple(&self) -> bool {
        self.max_select > 1
    }
}
