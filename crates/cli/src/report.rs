use postsearch_search::{RankedItem, SearchResponse};
use postsearch_vector_store::IndexReport;
use std::fmt::Write as _;
use std::path::Path;

pub fn render_index_summary(out: &Path, report: &IndexReport) -> String {
    let mut text = format!(
        "Indexed {} documents into {}\n",
        report.documents,
        out.display()
    );
    let _ = writeln!(text, "  embedded: {}", report.embedded);
    if report.chunks > 0 {
        let _ = writeln!(text, "  chunks:   {}", report.chunks);
    }
    let _ = writeln!(text, "  skipped:  {} (missing title or description)", report.skipped);
    let _ = write!(text, "  failed:   {}", report.failed);
    text
}

pub fn render_results(query: &str, response: &SearchResponse) -> String {
    let mut text = String::new();
    if response.results.is_empty() {
        let _ = write!(text, "No results for '{}'", query.trim());
    }
    for (i, item) in response.results.iter().enumerate() {
        let _ = writeln!(
            text,
            "{}. {} [{}] (score: {})",
            i + 1,
            item.title,
            item.source.map_or("-", |s| s.as_str()),
            display_score(item)
        );
        let mut meta = item.id.clone();
        if !item.date.is_empty() {
            let _ = write!(meta, " | {}", item.date);
        }
        if !item.tags.is_empty() {
            let _ = write!(meta, " | {}", item.tags.join(", "));
        }
        let _ = writeln!(text, "   {meta}");
        if !item.excerpt.is_empty() {
            let _ = writeln!(text, "   {}", item.excerpt);
        }
        text.push('\n');
    }

    let info = &response.info;
    let _ = write!(
        text,
        "{}keyword: {}, fuzzy: {}, semantic: {}{}{}",
        if response.results.is_empty() { "\n" } else { "" },
        info.total_keyword_results,
        info.total_fuzzy_results,
        info.total_semantic_results,
        if info.is_hybrid { ", fused" } else { "" },
        if info.semantic_supported {
            ""
        } else {
            " (semantic unavailable)"
        }
    );
    text
}

fn display_score(item: &RankedItem) -> String {
    item.fused_score
        .map(|s| format!("{s:.4}"))
        .or_else(|| item.similarity.map(|s| format!("{s:.3}")))
        .or_else(|| item.fuzzy_score.map(|s| format!("{s:.3}")))
        .unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsearch_corpus::Document;
    use postsearch_search::{SearchInfo, SignalSource};

    #[test]
    fn renders_ranked_items_and_counts() {
        let doc = Document::new("/blog/typescript-tips", "TypeScript Tips and Tricks")
            .description("Practical advice")
            .tags(["typescript"])
            .date("2023-11-02");
        let response = SearchResponse {
            results: vec![RankedItem::from_document(&doc)
                .similarity(0.8123)
                .source(SignalSource::Semantic)],
            info: SearchInfo {
                total_semantic_results: 1,
                semantic_supported: true,
                ..SearchInfo::default()
            },
        };

        let text = render_results("tips", &response);
        assert!(text.starts_with("1. TypeScript Tips and Tricks [semantic] (score: 0.812)"));
        assert!(text.contains("/blog/typescript-tips | 2023-11-02 | typescript"));
        assert!(text.ends_with("keyword: 0, fuzzy: 0, semantic: 1"));
    }

    #[test]
    fn renders_empty_response() {
        let text = render_results("  zebra ", &SearchResponse::empty(false));
        assert_eq!(
            text,
            "No results for 'zebra'\nkeyword: 0, fuzzy: 0, semantic: 0 (semantic unavailable)"
        );
    }
}
