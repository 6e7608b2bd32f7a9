//! Prompt assembly — serializes the archive into the system instruction.
//!
//! Pure and deterministic: identical inputs produce identical output and
//! documents appear in the order given.

use archive_types::document::Document;

pub const KNOWLEDGE_BASE_HEADING: &str = "### THE KNOWLEDGE BASE (CURRENT ARCHIVE)";
const EMPTY_ARCHIVE: &str = "(no documents)";

pub fn assemble(instructions: &str, documents: &[Document]) -> String {
    let body = if documents.is_empty() {
        EMPTY_ARCHIVE.to_string()
    } else {
        documents
            .iter()
            .map(format_document)
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!("{instructions}\n\n{KNOWLEDGE_BASE_HEADING}\n{body}\n")
}

fn format_document(doc: &Document) -> String {
    format!(
        "---\nFILE PATH: {}\nCATEGORY: {}\nLAST UPDATED: {}\nCONTENT:\n{}\n---",
        doc.path, doc.category, doc.last_updated, doc.content
    )
}
