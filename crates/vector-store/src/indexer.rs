use crate::embeddings::Embedder;
use crate::error::{Result, VectorStoreError};
use postsearch_chunker::{ChunkType, Chunker, TextChunk};
use postsearch_corpus::{Document, EmbeddedChunk, StoredEmbedding};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// What a stored vector covers
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingGranularity {
    /// One vector for `title. description`
    #[default]
    Document,
    /// One vector per structural chunk of the body
    Chunks,
}

impl EmbeddingGranularity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Chunks => "chunks",
        }
    }
}

impl FromStr for EmbeddingGranularity {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "document" | "doc" => Ok(Self::Document),
            "chunks" | "chunk" => Ok(Self::Chunks),
            other => Err(VectorStoreError::InvalidConfig(format!(
                "Unknown embedding granularity '{other}' (expected 'document' or 'chunks')"
            ))),
        }
    }
}

/// Outcome counts of one indexing run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub documents: usize,
    pub embedded: usize,
    /// Unqualified documents (missing title or description)
    pub skipped: usize,
    /// Documents whose embedding failed; they carry an `embedding_error`
    pub failed: usize,
    pub chunks: usize,
}

/// Build-time embedding generation over a corpus
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    granularity: EmbeddingGranularity,
    chunker: Chunker,
}

impl Indexer {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            granularity: EmbeddingGranularity::default(),
            chunker: Chunker::default(),
        }
    }

    #[must_use]
    pub const fn granularity(mut self, granularity: EmbeddingGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    #[must_use]
    pub fn chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Embed every qualifying document.
    ///
    /// Per-document failures are recorded on the document and the run continues.
    /// A model-load failure aborts the run since nothing can be embedded.
    pub async fn index(&self, documents: Vec<Document>) -> Result<(Vec<Document>, IndexReport)> {
        self.embedder.ensure_ready().await?;

        let mut report = IndexReport {
            documents: documents.len(),
            ..IndexReport::default()
        };
        let mut indexed = Vec::with_capacity(documents.len());

        for mut doc in documents {
            doc.embedding = StoredEmbedding::None;
            doc.embedding_error = None;

            if !doc.qualifies_for_embedding() {
                log::debug!("Skipping '{}': missing title or description", doc.id);
                report.skipped += 1;
                indexed.push(doc);
                continue;
            }

            match self.embed_document(&doc).await {
                Ok(embedding) => {
                    if let StoredEmbedding::Chunks(chunks) = &embedding {
                        report.chunks += chunks.len();
                    }
                    doc.embedding = embedding;
                    report.embedded += 1;
                }
                Err(err) if err.is_model_load() => return Err(err),
                Err(err) => {
                    log::warn!("Embedding generation failed for '{}': {err}", doc.id);
                    doc.embedding_error = Some(format!("Embedding generation failed: {err}"));
                    report.failed += 1;
                }
            }
            indexed.push(doc);
        }

        log::info!(
            "Indexed {} documents ({} embedded, {} skipped, {} failed, granularity {})",
            report.documents,
            report.embedded,
            report.skipped,
            report.failed,
            self.granularity.as_str()
        );
        Ok((indexed, report))
    }

    async fn embed_document(&self, doc: &Document) -> Result<StoredEmbedding> {
        match self.granularity {
            EmbeddingGranularity::Document => {
                let vector = self.embedder.embed(&doc.embedding_text()).await?;
                Ok(StoredEmbedding::Document(vector))
            }
            EmbeddingGranularity::Chunks => {
                let mut chunks = self.chunker.chunk_markdown(&doc.body);
                if chunks.is_empty() {
                    chunks.push(TextChunk::new(0, doc.embedding_text(), ChunkType::Document));
                }

                let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
                let vectors = self.embedder.embed_batch(&texts).await?;
                if vectors.len() != chunks.len() {
                    return Err(VectorStoreError::EmbeddingError(format!(
                        "Expected {} chunk embeddings, got {}",
                        chunks.len(),
                        vectors.len()
                    )));
                }

                let embedded = chunks
                    .into_iter()
                    .zip(vectors)
                    .map(|(chunk, vector)| EmbeddedChunk {
                        chunk_id: format!("{}#{}", doc.id, chunk.ordinal),
                        text: chunk.text,
                        chunk_type: chunk.chunk_type,
                        heading_level: chunk.heading_level,
                        vector,
                    })
                    .collect();
                Ok(StoredEmbedding::Chunks(embedded))
            }
        }
    }
}
