use crate::embedding::StoredEmbedding;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Number of characters kept in a result excerpt (before the ellipsis)
pub const EXCERPT_CHARS: usize = 150;

static MARKUP_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#*`]").expect("static regex"));

/// Immutable snapshot of one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument")]
pub struct Document {
    /// Unique, stable identifier (usually the content path, e.g. `/blog/getting-started`)
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub date: String,
    /// Raw body text (Markdown)
    pub body: String,
    pub embedding: StoredEmbedding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
}

/// Wire shape accepted at the store boundary
#[derive(Deserialize)]
struct RawDocument {
    #[serde(alias = "path", alias = "_path")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    date: String,
    #[serde(default, alias = "content")]
    body: String,
    #[serde(default, alias = "embeddings")]
    embedding: serde_json::Value,
    #[serde(default, alias = "embeddingError")]
    embedding_error: Option<String>,
    #[serde(default, alias = "readingTime")]
    reading_time: Option<u32>,
    #[serde(default, alias = "wordCount")]
    word_count: Option<usize>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let (embedding, note) = StoredEmbedding::from_json(&raw.embedding);
        if let Some(note) = note {
            log::warn!("Ignoring stored embedding of '{}': {note}", raw.id);
        }
        Self {
            id: raw.id,
            title: raw.title,
            description: raw.description,
            tags: raw.tags,
            date: raw.date,
            body: raw.body,
            embedding,
            embedding_error: raw.embedding_error,
            reading_time: raw.reading_time,
            word_count: raw.word_count,
        }
    }
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            date: String::new(),
            body: String::new(),
            embedding: StoredEmbedding::None,
            embedding_error: None,
            reading_time: None,
            word_count: None,
        }
    }

    /// Builder: set description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set tags
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set date
    #[must_use]
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Builder: set body
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder: set embedding
    #[must_use]
    pub fn embedding(mut self, embedding: StoredEmbedding) -> Self {
        self.embedding = embedding;
        self
    }

    /// Last path segment of the id, if any
    #[must_use]
    pub fn slug(&self) -> Option<&str> {
        self.id.rsplit('/').next().filter(|slug| !slug.is_empty())
    }

    /// Key used to merge the same document across ranked lists
    #[must_use]
    pub fn merge_key(&self) -> &str {
        self.slug().unwrap_or(&self.id)
    }

    /// Only posts with both a title and a description are embedded
    #[must_use]
    pub fn qualifies_for_embedding(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }

    /// Text fed to the embedding model in whole-document mode: `title. description`
    #[must_use]
    pub fn embedding_text(&self) -> String {
        let mut text = self.title.trim().to_string();
        let description = self.description.trim();
        if !description.is_empty() {
            if !text.is_empty() {
                text.push_str(". ");
            }
            text.push_str(description);
        }
        text
    }

    /// First [`EXCERPT_CHARS`] characters of the description (or body), markup stripped
    #[must_use]
    pub fn excerpt(&self) -> String {
        let source = if self.description.trim().is_empty() {
            &self.body
        } else {
            &self.description
        };
        let cleaned = MARKUP_CHARS.replace_all(source, "");
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut excerpt: String = collapsed.chars().take(EXCERPT_CHARS).collect();
        excerpt.push_str("...");
        excerpt
    }

    /// Case-insensitive substring test over title, description, tags and body.
    ///
    /// `needle_lower` must already be lowercased.
    #[must_use]
    pub fn contains_text(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle_lower))
            || self.body.to_lowercase().contains(needle_lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn slug_is_last_path_segment() {
        let doc = Document::new("/blog/getting-started-nuxt", "Getting Started");
        assert_eq!(doc.slug(), Some("getting-started-nuxt"));
        assert_eq!(doc.merge_key(), "getting-started-nuxt");
    }

    #[test]
    fn merge_key_falls_back_to_id() {
        let doc = Document::new("/blog/", "Index");
        assert_eq!(doc.slug(), None);
        assert_eq!(doc.merge_key(), "/blog/");
    }

    #[test]
    fn embedding_text_joins_title_and_description() {
        let doc = Document::new("a", " Cats ").description("Feline companions");
        assert_eq!(doc.embedding_text(), "Cats. Feline companions");
        assert!(doc.qualifies_for_embedding());

        let untitled = Document::new("b", "").description("Only a description");
        assert!(!untitled.qualifies_for_embedding());
    }

    #[test]
    fn excerpt_truncates_and_strips_markup() {
        let doc = Document::new("a", "t").description(format!("**{}**", "x".repeat(200)));
        let excerpt = doc.excerpt();
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS + 3);
        assert!(excerpt.starts_with("xxx"));
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn excerpt_falls_back_to_body() {
        let doc = Document::new("a", "t").body("# Heading\n\nBody `code`");
        assert_eq!(doc.excerpt(), "Heading Body code...");
    }

    #[test]
    fn contains_text_checks_every_field() {
        let doc = Document::new("a", "Getting Started with Nuxt 3")
            .description("A guide")
            .tags(["vue", "Tutorial"])
            .body("Server-side rendering");
        assert!(doc.contains_text("nuxt 3"));
        assert!(doc.contains_text("guide"));
        assert!(doc.contains_text("tutorial"));
        assert!(doc.contains_text("rendering"));
        assert!(!doc.contains_text("cats"));
    }

    #[test]
    fn deserializes_polymorphic_embedding_once() {
        let doc: Document = serde_json::from_value(json!({
            "path": "/blog/cats",
            "title": "Cats",
            "description": "Purring",
            "tags": ["cats"],
            "date": "2024-03-18",
            "embedding": "[0.1, 0.2]"
        }))
        .unwrap();
        assert_eq!(doc.id, "/blog/cats");
        assert_eq!(doc.embedding, StoredEmbedding::Document(vec![0.1, 0.2]));

        let broken: Document = serde_json::from_value(json!({
            "id": "/blog/broken",
            "embedding": [null, "x"]
        }))
        .unwrap();
        assert!(broken.embedding.is_none());
    }
}
