use crate::document::Document;
use crate::error::{CorpusError, Result};
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

/// Reading speed used for `reading_time`
pub const WORDS_PER_MINUTE: usize = 180;

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    date: Option<serde_yaml::Value>,
}

/// Load every `*.md` file under `dir` as a post.
///
/// Ids are content paths rooted at the directory name: `content/blog/cats.md`
/// becomes `/blog/cats`. Files are visited in file-name order so ids and store
/// iteration order are stable between runs.
pub fn load_markdown_dir(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CorpusError::Other(format!(
            "Posts directory does not exist: {}",
            dir.display()
        )));
    }
    let collection = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CorpusError::Other(format!("Walk failed: {e}")))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "md") {
            continue;
        }

        let rel = path.strip_prefix(dir).unwrap_or(path).with_extension("");
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let id = if collection.is_empty() {
            format!("/{rel}")
        } else {
            format!("/{collection}/{rel}")
        };

        let text = std::fs::read_to_string(path)?;
        documents.push(parse_markdown_post(id, &text, path)?);
    }

    log::info!("Loaded {} posts from {}", documents.len(), dir.display());
    Ok(documents)
}

/// Parse one Markdown post with optional YAML front matter (`---` fenced)
pub fn parse_markdown_post(id: impl Into<String>, text: &str, source: &Path) -> Result<Document> {
    let (front, body) = split_front_matter(text);
    let front: FrontMatter = match front {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml)
            .map_err(|e| CorpusError::front_matter(source, e.to_string()))?,
        _ => FrontMatter::default(),
    };

    let word_count = body.split_whitespace().count();
    let reading_time = u32::try_from(word_count.div_ceil(WORDS_PER_MINUTE)).unwrap_or(u32::MAX);

    let mut doc = Document::new(id, front.title)
        .description(front.description)
        .tags(front.tags)
        .date(front.date.as_ref().map(yaml_scalar_to_string).unwrap_or_default())
        .body(body.trim());
    doc.word_count = Some(word_count);
    doc.reading_time = Some(reading_time);
    Ok(doc)
}

fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };

    let mut offset = 0usize;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const NUXT_POST: &str = "---\ntitle: Getting Started with Nuxt 3\ndescription: A comprehensive guide to Nuxt 3.\ntags:\n  - nuxt\n  - vue\ndate: 2024-03-22\n---\n\n# Intro\n\nNuxt 3 is a powerful framework.\n";

    #[test]
    fn parses_front_matter_and_body() {
        let doc = parse_markdown_post("/blog/nuxt", NUXT_POST, Path::new("nuxt.md")).unwrap();
        assert_eq!(doc.title, "Getting Started with Nuxt 3");
        assert_eq!(doc.description, "A comprehensive guide to Nuxt 3.");
        assert_eq!(doc.tags, vec!["nuxt", "vue"]);
        assert_eq!(doc.date, "2024-03-22");
        assert_eq!(doc.body, "# Intro\n\nNuxt 3 is a powerful framework.");
        assert_eq!(doc.word_count, Some(8));
        assert_eq!(doc.reading_time, Some(1));
    }

    #[test]
    fn missing_front_matter_keeps_whole_text_as_body() {
        let doc = parse_markdown_post("/blog/raw", "Just text", Path::new("raw.md")).unwrap();
        assert_eq!(doc.title, "");
        assert_eq!(doc.body, "Just text");
    }

    #[test]
    fn invalid_front_matter_is_an_error() {
        let err = parse_markdown_post("/blog/bad", "---\ntags: [unclosed\n---\nbody", Path::new("bad.md"))
            .unwrap_err();
        assert!(matches!(err, CorpusError::FrontMatter { .. }));
    }

    #[test]
    fn reading_time_rounds_up() {
        let body = "word ".repeat(181);
        let doc = parse_markdown_post("/blog/long", &body, Path::new("long.md")).unwrap();
        assert_eq!(doc.reading_time, Some(2));
    }

    #[test]
    fn loads_directory_with_content_paths() {
        let tmp = TempDir::new().unwrap();
        let blog = tmp.path().join("blog");
        std::fs::create_dir_all(blog.join("2024")).unwrap();
        std::fs::write(blog.join("nuxt.md"), NUXT_POST).unwrap();
        std::fs::write(blog.join("2024").join("cats.md"), "---\ntitle: Cats\n---\nMeow").unwrap();
        std::fs::write(blog.join("notes.txt"), "ignored").unwrap();

        let docs = load_markdown_dir(&blog).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["/blog/2024/cats", "/blog/nuxt"]);
    }
}
