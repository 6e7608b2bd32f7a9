//! Archive store — the ordered set of markdown documents.
//!
//! Single writer. The store never persists itself and never touches the
//! session; the owning runtime does both after each successful mutation.

use chrono::NaiveDate;
use archive_types::{
    ArchiveError, Result,
    document::{format_date, today, Document, DocumentPatch},
};

#[derive(Debug, Clone, Default)]
pub struct ArchiveStore {
    documents: Vec<Document>,
}

impl ArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a persisted list. Later duplicates of a path are
    /// dropped so the uniqueness invariant holds from the start.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut store = Self::new();
        for doc in documents {
            if store.contains(&doc.path) {
                log::warn!("Dropping duplicate archive entry {}", doc.path);
                continue;
            }
            store.documents.push(doc);
        }
        store
    }

    /// Documents in insertion order
    pub fn list(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, path: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Category names in first-seen order, for grouped display
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for doc in &self.documents {
            if !seen.contains(&doc.category.as_str()) {
                seen.push(&doc.category);
            }
        }
        seen
    }

    pub fn create(&mut self, doc: Document) -> Result<Document> {
        check_path(&doc.path)?;
        if self.contains(&doc.path) {
            return Err(ArchiveError::DuplicatePath(doc.path));
        }
        self.documents.push(doc.clone());
        Ok(doc)
    }

    pub fn update(&mut self, path: &str, patch: DocumentPatch) -> Result<Document> {
        self.update_at(path, patch, today())
    }

    /// Replace the document at `path` with a patched copy stamped `date`.
    /// The store is left unchanged on error.
    pub fn update_at(&mut self, path: &str, patch: DocumentPatch, date: NaiveDate) -> Result<Document> {
        let index = self
            .position(path)
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))?;

        if let Some(new_path) = patch.path.as_deref() {
            check_path(new_path)?;
            if new_path != path && self.contains(new_path) {
                return Err(ArchiveError::DuplicatePath(new_path.to_string()));
            }
        }

        let current = &self.documents[index];
        let updated = Document {
            path: patch.path.unwrap_or_else(|| current.path.clone()),
            category: patch.category.unwrap_or_else(|| current.category.clone()),
            content: patch.content.unwrap_or_else(|| current.content.clone()),
            last_updated: format_date(date),
        };
        self.documents[index] = updated.clone();
        Ok(updated)
    }

    pub fn delete(&mut self, path: &str) -> Result<Document> {
        let index = self
            .position(path)
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))?;
        Ok(self.documents.remove(index))
    }

    /// First free path derived from `base` (`/New/Untitled.md`,
    /// `/New/Untitled-2.md`, ...).
    pub fn unique_path(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        let (stem, ext) = match base.rfind('.') {
            Some(dot) if dot > base.rfind('/').unwrap_or(0) => (&base[..dot], &base[dot..]),
            _ => (base, ""),
        };
        (2..)
            .map(|n| format!("{stem}-{n}{ext}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.path == path)
    }
}

/// Paths are absolute: non-empty and rooted at `/`.
fn check_path(path: &str) -> Result<()> {
    if path.trim().is_empty() || !path.starts_with('/') {
        return Err(ArchiveError::InvalidArguments(format!(
            "path must start with '/', got {path:?}"
        )));
    }
    Ok(())
}
