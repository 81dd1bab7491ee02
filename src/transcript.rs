//! `youtube_transcript` documents from the timed-text endpoint.

use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use tracing::{info, warn};

use crate::envelope::{error_source, DocumentBuilder, SourceKind};
use crate::fetch::{fetch_text, RemoteClient};

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://)?(?:www\.)?(?:youtube\.com/(?:[^/\n\s]+/\S+/|(?:v|e(?:mbed)?)/|\S*?[?&]v=)|youtu\.be/)([a-zA-Z0-9_-]{11})",
    )
    .unwrap()
});

/// The 11-character video id in a watch, embed or short link.
pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn timedtext_url(timedtext_base: &str, lang: &str, video_id: &str) -> String {
    format!("{}?lang={}&v={}", timedtext_base, lang, video_id)
}

/// Caption lines from a timed-text XML document, in order.
pub fn parse_timedtext(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.local_name().as_ref() == b"text" => {
                current = Some(String::new());
            }
            Event::Text(t) => {
                if let Some(line) = current.as_mut() {
                    line.push_str(&t.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"text" => {
                if let Some(line) = current.take() {
                    lines.push(line);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(lines)
}

fn fetch_transcript(
    client: &dyn RemoteClient,
    timedtext_base: &str,
    lang: &str,
    video_id: &str,
) -> Result<String, String> {
    let xml = fetch_text(client, &timedtext_url(timedtext_base, lang, video_id))
        .map_err(|e| e.to_string())?;
    let lines = parse_timedtext(&xml)?;
    if lines.is_empty() {
        return Err(format!("No transcript available for video {}", video_id));
    }
    Ok(lines.join("\n"))
}

/// Build the `youtube_transcript` document. Never fails: a missing id or
/// transcript is reported inside the document.
pub fn process_transcript(
    client: &dyn RemoteClient,
    timedtext_base: &str,
    lang: &str,
    url: &str,
) -> String {
    let Some(video_id) = extract_video_id(url) else {
        warn!(url, "No video id in URL");
        return error_source(
            SourceKind::YouTubeTranscript,
            url,
            "Could not extract video ID from URL.",
        );
    };

    match fetch_transcript(client, timedtext_base, lang, video_id) {
        Ok(transcript) => {
            info!(video_id, "Transcript processed");
            let mut doc = DocumentBuilder::source(SourceKind::YouTubeTranscript, url);
            doc.open("transcript");
            doc.text(&transcript);
            doc.finish()
        }
        Err(reason) => {
            warn!(video_id, error = %reason, "Transcript fetch failed");
            error_source(SourceKind::YouTubeTranscript, url, &reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryClient;

    const BASE: &str = "https://www.youtube.com/api/timedtext";

    #[test]
    fn video_id_forms() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(url), Some("dQw4w9WgXcQ"), "{}", url);
        }
        assert_eq!(extract_video_id("https://www.youtube.com/feed/library"), None);
    }

    #[test]
    fn timedtext_lines_are_unescaped() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.2">Hello &amp; welcome</text><text start="1.2" dur="2">to the show</text></transcript>"#;
        assert_eq!(
            parse_timedtext(xml).unwrap(),
            vec!["Hello & welcome", "to the show"]
        );
    }

    #[test]
    fn transcript_document() {
        let client = MemoryClient::new().with_text(
            &timedtext_url(BASE, "en", "dQw4w9WgXcQ"),
            r#"<transcript><text start="0" dur="1">a &lt; b</text><text start="1" dur="1">done</text></transcript>"#,
        );
        let doc = process_transcript(&client, BASE, "en", "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(
            doc,
            "<source type=\"youtube_transcript\" url=\"https://youtu.be/dQw4w9WgXcQ\">\n<transcript>\na &lt; b\ndone\n</transcript>\n</source>"
        );
    }

    #[test]
    fn failures_become_error_sources() {
        let client = MemoryClient::new();
        let doc = process_transcript(&client, BASE, "en", "https://youtube.com/feed/library");
        assert!(doc.contains("<error>Could not extract video ID from URL.</error>"));

        let doc = process_transcript(&client, BASE, "en", "https://youtu.be/dQw4w9WgXcQ");
        assert!(doc.contains("<error>request to"));
        assert!(doc.ends_with("</error>\n</source>"));

        let empty = MemoryClient::new().with_text(&timedtext_url(BASE, "en", "dQw4w9WgXcQ"), "");
        let doc = process_transcript(&empty, BASE, "en", "https://youtu.be/dQw4w9WgXcQ");
        assert!(doc.contains("No transcript available"));
    }
}
