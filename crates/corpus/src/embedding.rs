use postsearch_chunker::ChunkType;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// One embedded passage of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk_id: String,
    pub text: String,
    pub chunk_type: ChunkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    pub vector: Vec<f32>,
}

/// Precomputed embedding(s) of a document, parsed once at the store boundary
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StoredEmbedding {
    /// No semantic signal for this document
    #[default]
    None,
    /// One vector for the whole document
    Document(Vec<f32>),
    /// Per-chunk vectors; document similarity is the best chunk's similarity
    Chunks(Vec<EmbeddedChunk>),
}

impl StoredEmbedding {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Dimension of the stored vectors (first chunk for chunked embeddings)
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Document(vector) => Some(vector.len()),
            Self::Chunks(chunks) => chunks.first().map(|chunk| chunk.vector.len()),
        }
    }

    /// All stored vectors, in chunk order
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        let (single, chunks): (Option<&[f32]>, &[EmbeddedChunk]) = match self {
            Self::None => (None, &[]),
            Self::Document(vector) => (Some(vector.as_slice()), &[]),
            Self::Chunks(chunks) => (None, chunks.as_slice()),
        };
        single
            .into_iter()
            .chain(chunks.iter().map(|chunk| chunk.vector.as_slice()))
    }

    /// Parse any of the accepted raw shapes.
    ///
    /// Accepted: `null`, an array of numbers, a JSON string holding an array of
    /// numbers, or an array of chunk objects. Anything else (including empty
    /// vectors and non-numeric entries) yields [`StoredEmbedding::None`] with the
    /// reason returned alongside.
    pub fn from_json(value: &Value) -> (Self, Option<String>) {
        match value {
            Value::Null => (Self::None, None),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(inner @ Value::Array(_)) => Self::from_json(&inner),
                Ok(_) => (Self::None, Some("embedding string is not an array".into())),
                Err(err) => (
                    Self::None,
                    Some(format!("embedding string is not valid JSON: {err}")),
                ),
            },
            Value::Array(items) if items.is_empty() => {
                (Self::None, Some("embedding is empty".into()))
            }
            Value::Array(items) if items.iter().all(Value::is_object) => parse_chunks(items),
            Value::Array(items) => parse_vector(items).map_or_else(
                || (Self::None, Some("embedding contains non-numeric values".into())),
                |vector| (Self::Document(vector), None),
            ),
            other => (
                Self::None,
                Some(format!("unsupported embedding shape: {}", json_kind(other))),
            ),
        }
    }
}

impl Serialize for StoredEmbedding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Document(vector) => vector.serialize(serializer),
            Self::Chunks(chunks) => chunks.serialize(serializer),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_vector(items: &[Value]) -> Option<Vec<f32>> {
    items
        .iter()
        .map(|item| item.as_f64().map(|v| v as f32).filter(|v| v.is_finite()))
        .collect()
}

fn parse_chunks(items: &[Value]) -> (StoredEmbedding, Option<String>) {
    let mut chunks = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match serde_json::from_value::<EmbeddedChunk>(item.clone()) {
            Ok(chunk)
                if !chunk.vector.is_empty() && chunk.vector.iter().all(|v| v.is_finite()) =>
            {
                chunks.push(chunk);
            }
            _ => skipped += 1,
        }
    }

    if chunks.is_empty() {
        return (
            StoredEmbedding::None,
            Some(format!("no usable chunk embeddings ({skipped} malformed)")),
        );
    }
    let note = (skipped > 0).then(|| format!("{skipped} malformed chunk embeddings skipped"));
    (StoredEmbedding::Chunks(chunks), note)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_flat_vector() {
        let (parsed, note) = StoredEmbedding::from_json(&json!([0.5, -0.25, 1.0]));
        assert_eq!(parsed, StoredEmbedding::Document(vec![0.5, -0.25, 1.0]));
        assert!(note.is_none());
        assert_eq!(parsed.dimension(), Some(3));
    }

    #[test]
    fn parses_stringified_vector() {
        let (parsed, _) = StoredEmbedding::from_json(&json!("[1, 2]"));
        assert_eq!(parsed, StoredEmbedding::Document(vec![1.0, 2.0]));
    }

    #[test]
    fn parses_chunk_list() {
        let raw = json!([
            {"chunk_id": "/blog/a#0", "text": "intro paragraph", "chunk_type": "paragraph", "vector": [1.0, 0.0]},
            {"chunk_id": "/blog/a#1", "text": "Heading text", "chunk_type": "heading", "heading_level": 2, "vector": [0.0, 1.0]}
        ]);
        let (parsed, note) = StoredEmbedding::from_json(&raw);
        assert!(note.is_none());
        match parsed {
            StoredEmbedding::Chunks(chunks) => {
                assert_eq!(chunks.len(), 2);
                assert_eq!(chunks[1].heading_level, Some(2));
                assert_eq!(chunks[1].chunk_type, ChunkType::Heading);
            }
            other => panic!("expected chunks, got {other:?}"),
        }
    }

    #[test]
    fn malformed_shapes_become_none() {
        for raw in [
            json!([]),
            json!(["a", "b"]),
            json!("not json"),
            json!("{\"a\": 1}"),
            json!({"vector": [1.0]}),
            json!([{"chunk_id": "x"}]),
            json!(42),
        ] {
            let (parsed, note) = StoredEmbedding::from_json(&raw);
            assert!(parsed.is_none(), "{raw} should not parse");
            assert!(note.is_some(), "{raw} should explain why");
        }
    }

    #[test]
    fn values_outside_f32_range_are_rejected() {
        let (parsed, note) = StoredEmbedding::from_json(&json!([1e300, 0.5]));
        assert!(parsed.is_none());
        assert!(note.is_some());

        let raw = json!([
            {"chunk_id": "/blog/a#0", "text": "ok", "chunk_type": "paragraph", "vector": [1.0, 0.0]},
            {"chunk_id": "/blog/a#1", "text": "huge", "chunk_type": "paragraph", "vector": [-1e300, 0.0]}
        ]);
        let (parsed, note) = StoredEmbedding::from_json(&raw);
        assert_eq!(parsed.vectors().count(), 1);
        assert_eq!(note.as_deref(), Some("1 malformed chunk embeddings skipped"));
    }

    #[test]
    fn null_is_silent_none() {
        let (parsed, note) = StoredEmbedding::from_json(&Value::Null);
        assert!(parsed.is_none());
        assert!(note.is_none());
    }

    #[test]
    fn vectors_iterates_all_chunks() {
        let chunk = |id: &str, v: Vec<f32>| EmbeddedChunk {
            chunk_id: id.to_string(),
            text: String::new(),
            chunk_type: ChunkType::Paragraph,
            heading_level: None,
            vector: v,
        };
        let embedding =
            StoredEmbedding::Chunks(vec![chunk("a", vec![1.0]), chunk("b", vec![2.0])]);
        let collected: Vec<&[f32]> = embedding.vectors().collect();
        assert_eq!(collected, vec![&[1.0f32][..], &[2.0f32][..]]);
        assert_eq!(StoredEmbedding::None.vectors().count(), 0);
    }

    #[test]
    fn serializes_to_raw_shapes() {
        assert_eq!(serde_json::to_value(StoredEmbedding::None).unwrap(), Value::Null);
        assert_eq!(
            serde_json::to_value(StoredEmbedding::Document(vec![1.0, 2.0])).unwrap(),
            json!([1.0, 2.0])
        );
    }
}
