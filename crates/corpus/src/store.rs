use crate::document::Document;
use crate::error::{CorpusError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Source of documents for the matchers.
///
/// `revision` must change whenever the document set changes so that callers can
/// invalidate anything derived from a previous snapshot.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn revision(&self) -> u64;

    /// Full retrieval, in store iteration order
    async fn all(&self) -> Result<Vec<Arc<Document>>>;

    /// LIKE-style filter: documents where `needle` occurs (case-insensitively) in
    /// the title, description, any tag or the body; at most `limit`, store order.
    async fn find_containing(&self, needle: &str, limit: usize) -> Result<Vec<Arc<Document>>> {
        let needle = needle.to_lowercase();
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|doc| doc.contains_text(&needle))
            .take(limit)
            .collect())
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    revision: u64,
    documents: Vec<Arc<Document>>,
}

/// In-memory store with copy-on-write snapshots
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<Document>) -> Result<Self> {
        let store = Self::new();
        store.replace_all(documents)?;
        Ok(store)
    }

    /// Swap the whole document set; ids must be unique
    pub fn replace_all(&self, documents: Vec<Document>) -> Result<()> {
        let mut seen = HashSet::with_capacity(documents.len());
        for doc in &documents {
            if !seen.insert(doc.id.as_str()) {
                return Err(CorpusError::DuplicateId(doc.id.clone()));
            }
        }

        let documents = documents.into_iter().map(Arc::new).collect();
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.documents = documents;
        guard.revision += 1;
        Ok(())
    }

    /// Insert or replace by id (replacement keeps the original position)
    pub fn upsert(&self, document: Document) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let document = Arc::new(document);
        match guard.documents.iter().position(|d| d.id == document.id) {
            Some(idx) => guard.documents[idx] = document,
            None => guard.documents.push(document),
        }
        guard.revision += 1;
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.documents.len();
        guard.documents.retain(|d| d.id != id);
        let removed = guard.documents.len() != before;
        if removed {
            guard.revision += 1;
        }
        removed
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Document>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.documents.iter().find(|d| d.id == id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .documents
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Document>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .documents
            .clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn revision(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision
    }

    async fn all(&self) -> Result<Vec<Arc<Document>>> {
        Ok(self.snapshot())
    }
}
