//! Fixtures shared by the unit tests of this crate

use async_trait::async_trait;
use postsearch_corpus::{CorpusError, Document, DocumentStore, MemoryStore, StoredEmbedding};
use postsearch_vector_store::{normalize, Embedder, Result as VectorResult, VectorStoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const BOW_DIMENSION: usize = 256;

pub fn blog_corpus() -> Vec<Document> {
    vec![
        Document::new("/blog/getting-started-nuxt", "Getting Started with Nuxt 3")
            .description("A comprehensive guide to building applications with Nuxt 3")
            .tags(["nuxt", "vue", "javascript"])
            .date("2024-03-22")
            .body("Install the CLI, scaffold a project and explore the directory layout."),
        Document::new("/blog/fascinating-world-of-cats", "The Fascinating World of Cats")
            .description("Exploring the curious behaviour of our feline friends")
            .tags(["cats", "pets"])
            .date("2024-01-10")
            .body("Cats sleep for most of the day and hunt at dusk."),
        Document::new("/blog/typescript-tips", "TypeScript Tips and Tricks")
            .description("Practical advice for writing safer TypeScript")
            .tags(["typescript", "programming"])
            .date("2023-11-02")
            .body("Prefer unknown over any and let inference do the work."),
    ]
}

pub fn memory_store(documents: Vec<Document>) -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::from_documents(documents).unwrap())
}

/// Blog corpus with every document embedded by [`BagOfWords`]
pub async fn embedded_blog_corpus() -> Vec<Document> {
    let embedder = BagOfWords::new();
    let mut docs = Vec::new();
    for doc in blog_corpus() {
        let vector = embedder.embed(&doc.embedding_text()).await.unwrap();
        docs.push(doc.embedding(StoredEmbedding::Document(vector)));
    }
    docs
}

/// Hashes lowercase words into buckets; texts sharing words are similar
pub struct BagOfWords {
    supported: bool,
    calls: AtomicUsize,
}

impl BagOfWords {
    pub fn new() -> Self {
        Self {
            supported: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; BOW_DIMENSION];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
            vector[(bucket % BOW_DIMENSION as u64) as usize] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for BagOfWords {
    fn dimension(&self) -> usize {
        BOW_DIMENSION
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn embed_batch(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| Self::vector(text)).collect())
    }
}

/// Embedder whose model never loads
pub struct BrokenModel;

#[async_trait]
impl Embedder for BrokenModel {
    fn dimension(&self) -> usize {
        BOW_DIMENSION
    }

    async fn ensure_ready(&self) -> VectorResult<()> {
        Err(VectorStoreError::ModelLoad("weights missing".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> VectorResult<Vec<Vec<f32>>> {
        Err(VectorStoreError::ModelLoad("weights missing".to_string()))
    }
}

/// Store whose backend is always down
pub struct UnavailableStore;

#[async_trait]
impl DocumentStore for UnavailableStore {
    fn revision(&self) -> u64 {
        0
    }

    async fn all(&self) -> postsearch_corpus::Result<Vec<Arc<Document>>> {
        Err(CorpusError::StoreUnavailable("connection refused".to_string()))
    }
}
