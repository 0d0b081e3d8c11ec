//! Persistence collaborator contract
//!
//! The merge engine only produces bytes; where they land is the caller's
//! business. This module captures the save/fetch/delete contract the
//! surrounding application implements against its document store, plus an
//! in-memory implementation used by tests.

use thiserror::Error;

/// Metadata stored alongside a generated document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMeta {
    pub file_name: String,
    pub content_type: String,
    pub quote_number: Option<String>,
}

/// Errors a document store can produce.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
}

/// CRUD contract over the external document store.
pub trait DocumentStore {
    fn save(&mut self, bytes: &[u8], meta: &DocumentMeta) -> Result<String, StoreError>;
    fn fetch(&self, id: &str) -> Result<Vec<u8>, StoreError>;
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and local tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: u64,
    documents: Vec<(String, DocumentMeta, Vec<u8>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn save(&mut self, bytes: &[u8], meta: &DocumentMeta) -> Result<String, StoreError> {
        self.next_id += 1;
        let id = format!("doc-{}", self.next_id);
        self.documents
            .push((id.clone(), meta.clone(), bytes.to_vec()));
        Ok(id)
    }

    fn fetch(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.documents
            .iter()
            .find(|(doc_id, _, _)| doc_id == id)
            .map(|(_, _, bytes)| bytes.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.documents.len();
        self.documents.retain(|(doc_id, _, _)| doc_id != id);
        if self.documents.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
