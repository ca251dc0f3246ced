//! Retrieval context assembly.

use learnpath_knowledge::SearchResult;

/// Characters of each document's content included in the context.
pub const CONTENT_SNIPPET_CHARS: usize = 1000;

const SEPARATOR: &str = "\n---\n";

/// Render search results as one context block, capped at `max_chars` characters.
pub fn build_context(results: &[SearchResult], max_chars: usize) -> String {
    let context = results
        .iter()
        .map(|r| {
            format!(
                "Source: {}\nTitle: {}\nContent: {}",
                non_empty_or(&r.source, "unknown"),
                non_empty_or(&r.title, "Untitled"),
                truncate_chars(&r.content, CONTENT_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    truncate_chars(&context, max_chars).to_string()
}

/// Distinct result sources in first-seen order.
pub fn collect_sources(results: &[SearchResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        if !sources.iter().any(|s| s == &result.source) {
            sources.push(result.source.clone());
        }
    }
    sources
}

/// Longest prefix of at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
