use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single markdown record in the archive, keyed by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub path: String,
    pub category: String,
    pub content: String,
    pub last_updated: String,
}

impl Document {
    pub fn new(
        path: impl Into<String>,
        category: impl Into<String>,
        content: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            path: path.into(),
            category: category.into(),
            content: content.into(),
            last_updated: format_date(date),
        }
    }

    /// Final path segment, e.g. `Main_Bio.md` for `/Bio/Main_Bio.md`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Partial update applied by `ArchiveStore::update`.
/// `path` set means the document is renamed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DocumentPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Patch that turns `original` into `edited`, carrying only changed fields.
    pub fn diff(original: &Document, edited: &Document) -> Self {
        fn changed(a: &str, b: &str) -> Option<String> {
            (a != b).then(|| b.to_string())
        }
        Self {
            path: changed(&original.path, &edited.path),
            category: changed(&original.category, &edited.category),
            content: changed(&original.content, &edited.content),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.category.is_none() && self.content.is_none()
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
