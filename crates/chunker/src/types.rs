use serde::{Deserialize, Serialize};

/// A structurally bounded passage of a post body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of the chunk within the document (0-indexed, emission order)
    pub ordinal: usize,

    /// Extracted plain text, whitespace collapsed
    pub text: String,

    /// Structural kind of the block the text came from
    pub chunk_type: ChunkType,

    /// Heading level (1-6) for heading chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
}

impl TextChunk {
    #[must_use]
    pub const fn new(ordinal: usize, text: String, chunk_type: ChunkType) -> Self {
        Self {
            ordinal,
            text,
            chunk_type,
            heading_level: None,
        }
    }

    /// Builder: set heading level
    #[must_use]
    pub const fn heading_level(mut self, level: u8) -> Self {
        self.heading_level = Some(level);
        self
    }

    #[must_use]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Block kinds the chunker segments on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Heading,
    Paragraph,
    Code,
    Quote,
    List,
    /// Whole-document fallback chunk
    Document,
}

impl ChunkType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Paragraph => "paragraph",
            Self::Code => "code",
            Self::Quote => "quote",
            Self::List => "list",
            Self::Document => "document",
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
