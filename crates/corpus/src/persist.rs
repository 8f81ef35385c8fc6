use crate::document::Document;
use crate::error::{CorpusError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CORPUS_SCHEMA_VERSION: u32 = 1;

/// On-disk corpus: documents with their build-time embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
    pub schema_version: u32,
    pub documents: Vec<Document>,
}

pub async fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let corpus: CorpusFile = serde_json::from_slice(&bytes)?;
    if corpus.schema_version != CORPUS_SCHEMA_VERSION {
        return Err(CorpusError::SchemaVersion {
            found: corpus.schema_version,
            expected: CORPUS_SCHEMA_VERSION,
        });
    }
    log::debug!(
        "Loaded corpus {:?}: {} documents",
        path,
        corpus.documents.len()
    );
    Ok(corpus.documents)
}

pub async fn save_corpus(path: impl AsRef<Path>, documents: &[Document]) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let corpus = CorpusFile {
        schema_version: CORPUS_SCHEMA_VERSION,
        documents: documents.to_vec(),
    };
    let bytes = serde_json::to_vec_pretty(&corpus)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::StoredEmbedding;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn corpus_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("corpus.json");

        let docs = vec![
            Document::new("/blog/a", "Alpha")
                .description("first")
                .embedding(StoredEmbedding::Document(vec![0.6, 0.8])),
            Document::new("/blog/b", "Beta"),
        ];
        save_corpus(&path, &docs).await.unwrap();

        let loaded = load_corpus(&path).await.unwrap();
        assert_eq!(loaded, docs);
    }

    #[tokio::test]
    async fn rejects_unknown_schema_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("corpus.json");
        tokio::fs::write(&path, r#"{"schema_version": 9, "documents": []}"#)
            .await
            .unwrap();

        let err = load_corpus(&path).await.unwrap_err();
        assert!(matches!(err, CorpusError::SchemaVersion { found: 9, .. }));
    }
}
