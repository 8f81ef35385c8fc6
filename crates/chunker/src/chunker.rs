use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::types::{ChunkType, TextChunk};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};

/// Splits Markdown bodies into passage chunks on top-level block boundaries
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

/// Text accumulated for the top-level block currently open
struct OpenBlock {
    /// `None` when the block kind is not emitted (HTML, skipped code)
    chunk_type: Option<ChunkType>,
    heading_level: Option<u8>,
    text: String,
}

impl OpenBlock {
    fn for_tag(tag: &Tag<'_>, include_code: bool) -> Self {
        let (chunk_type, heading_level) = match tag {
            Tag::Heading { level, .. } => (Some(ChunkType::Heading), Some(heading_level(*level))),
            Tag::Paragraph => (Some(ChunkType::Paragraph), None),
            Tag::CodeBlock(_) if include_code => (Some(ChunkType::Code), None),
            Tag::CodeBlock(_) | Tag::HtmlBlock => (None, None),
            Tag::BlockQuote(_) => (Some(ChunkType::Quote), None),
            Tag::List(_) => (Some(ChunkType::List), None),
            _ => (Some(ChunkType::Paragraph), None),
        };
        Self {
            chunk_type,
            heading_level,
            text: String::new(),
        }
    }

    fn push_separator(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
            self.text.push('\n');
        }
    }
}

impl Chunker {
    #[must_use]
    pub const fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Create a chunker after validating the configuration
    pub fn try_new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Segment a Markdown body into chunks.
    ///
    /// Blocks whose extracted text is shorter than `min_chunk_chars` are dropped.
    /// When no block qualifies, a single [`ChunkType::Document`] chunk covering the
    /// full extracted text is returned (or nothing for an empty body).
    #[must_use]
    pub fn chunk_markdown(&self, markdown: &str) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut depth = 0usize;
        let mut current: Option<OpenBlock> = None;

        for event in Parser::new_ext(markdown, parser_options()) {
            match event {
                Event::Start(tag) => {
                    if depth == 0 {
                        current = Some(OpenBlock::for_tag(&tag, self.config.include_code));
                    } else if let Some(block) = current.as_mut() {
                        if is_block_tag(&tag) {
                            block.push_separator();
                        }
                    }
                    depth += 1;
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some(block) = current.take() {
                            self.emit(block, &mut chunks);
                        }
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some(block) = current.as_mut() {
                        block.text.push_str(&text);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some(block) = current.as_mut() {
                        block.text.push('\n');
                    }
                }
                _ => {}
            }
        }

        if chunks.is_empty() {
            let full_text = extract_plain_text(markdown);
            if !full_text.is_empty() {
                log::debug!(
                    "No structural chunk reached {} chars, falling back to whole text",
                    self.config.min_chunk_chars
                );
                chunks.push(TextChunk::new(0, full_text, ChunkType::Document));
            }
        }

        chunks
    }

    fn emit(&self, block: OpenBlock, chunks: &mut Vec<TextChunk>) {
        let Some(chunk_type) = block.chunk_type else {
            return;
        };

        let text = if chunk_type == ChunkType::Code {
            normalize_code(&block.text)
        } else {
            collapse_whitespace(&block.text)
        };
        if text.chars().count() < self.config.min_chunk_chars {
            return;
        }
        let text = truncate_chars(text, self.config.max_chunk_chars);

        let mut chunk = TextChunk::new(chunks.len(), text, chunk_type);
        if let Some(level) = block.heading_level {
            chunk = chunk.heading_level(level);
        }
        chunks.push(chunk);
    }
}

/// Extract the readable text of a Markdown document (markup removed, whitespace collapsed)
#[must_use]
pub fn extract_plain_text(markdown: &str) -> String {
    let mut raw = String::with_capacity(markdown.len());
    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Text(text) | Event::Code(text) => {
                raw.push_str(&text);
                raw.push(' ');
            }
            Event::SoftBreak | Event::HardBreak | Event::End(_) => raw.push(' '),
            _ => {}
        }
    }
    collapse_whitespace(&raw)
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

fn is_block_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph
            | Tag::Heading { .. }
            | Tag::CodeBlock(_)
            | Tag::BlockQuote(_)
            | Tag::List(_)
            | Tag::Item
            | Tag::TableRow
            | Tag::TableCell
    )
}

const fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_code(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text,
    }
}
