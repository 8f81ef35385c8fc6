use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for Markdown chunking behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Minimum extracted plain-text length (in characters) for a block to become a chunk
    pub min_chunk_chars: usize,

    /// Hard cap on chunk length in characters; longer blocks are cut at this boundary
    pub max_chunk_chars: usize,

    /// Emit fenced/indented code blocks as chunks
    pub include_code: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chunk_chars: 20,
            max_chunk_chars: 2_000,
            include_code: true,
        }
    }
}

impl ChunkerConfig {
    /// Prose-only chunking (code blocks are skipped)
    pub fn prose_only() -> Self {
        Self {
            include_code: false,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_chars == 0 {
            return Err(ChunkerError::invalid_config("max_chunk_chars must be > 0"));
        }

        if self.min_chunk_chars > self.max_chunk_chars {
            return Err(ChunkerError::invalid_config(format!(
                "min_chunk_chars ({}) cannot exceed max_chunk_chars ({})",
                self.min_chunk_chars, self.max_chunk_chars
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ChunkerConfig::default().validate().is_ok());
        assert!(ChunkerConfig::prose_only().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = ChunkerConfig {
            min_chunk_chars: 50,
            max_chunk_chars: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
