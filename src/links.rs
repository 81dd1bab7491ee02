//! URL list extraction for the optional `processed_urls` artifact.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'`{}|\\^\[\]]+"#).unwrap());

/// Every `http(s)://` URL in `text`, first-seen order, without duplicates.
///
/// Escaped ampersands are restored and trailing sentence punctuation is
/// trimmed, so `see https://a.b/c?x=1&amp;y=2.` yields `https://a.b/c?x=1&y=2`.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    URL.find_iter(text)
        .map(|m| {
            m.as_str()
                .replace("&amp;", "&")
                .trim_end_matches(['.', ',', ';', ':', '!', '?', ')'])
                .to_string()
        })
        .filter(|url| !url.ends_with("://"))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
