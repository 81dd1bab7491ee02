//! Lossy text compression for the interchange document.
//!
//! [`normalize`] first tries a strict markup parse. When the input is
//! well-formed, every run of character data between two tags is replaced by
//! [`clean_text`] of that run while tags and attributes are written back
//! untouched. When it is not, the whole input is cleaned as flat text. The
//! path taken, and the parse failure that forced the fallback, are reported
//! in [`Normalized::mode`].
//!
//! `clean_text` is idempotent: cleaning already-cleaned text is a no-op.

use std::collections::HashSet;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::markup::escape_markup;

/// Declaration written ahead of structured output.
pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='utf-8'?>\n";

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\n\r]+").unwrap());

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^a-zA-Z0-9\s_.,!?:;@#$%^&*()+\-=\[\]{}|\\<>`~'"/]+"#).unwrap()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOPWORDS.iter().copied().collect());

/// English stopword list (NLTK corpus).
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Collapse line breaks, strip characters outside the allow-set, collapse
/// whitespace, lowercase, and drop stopwords.
pub fn clean_text(text: &str) -> String {
    let text = LINE_BREAKS.replace_all(text, "\n");
    let text = DISALLOWED.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ").to_lowercase();
    text.split_whitespace()
        .filter(|word| !is_stopword(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Which path [`normalize`] took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeMode {
    /// Tree preserved, character data cleaned.
    Structured,
    /// Input was not well-formed; the whole text was cleaned flat.
    Flat { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub mode: NormalizeMode,
}

impl Normalized {
    pub fn is_structured(&self) -> bool {
        matches!(self.mode, NormalizeMode::Structured)
    }
}

/// Why strict parsing rejected the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed markup at byte {position}: {message}")]
pub struct MarkupError {
    pub position: u64,
    pub message: String,
}

pub fn normalize(raw: &str) -> Normalized {
    match clean_structured(raw) {
        Ok(text) => Normalized {
            text,
            mode: NormalizeMode::Structured,
        },
        Err(e) => {
            warn!(error = %e, "Markup parsing failed, normalizing without structure");
            Normalized {
                text: clean_text(raw),
                mode: NormalizeMode::Flat {
                    reason: e.to_string(),
                },
            }
        }
    }
}

/// Strictly parse `input` without producing output.
pub fn check_well_formed(input: &str) -> Result<(), MarkupError> {
    Parser::new(input).run(|_| Ok(()))
}

fn clean_structured(input: &str) -> Result<String, MarkupError> {
    let mut writer = Writer::new(Vec::new());
    let mut pending = String::new();

    Parser::new(input).run(|item| {
        let event = match item {
            Item::Text(text) => {
                pending.push_str(&text);
                return Ok(());
            }
            Item::Markup(event) => event,
        };
        if !pending.is_empty() {
            let cleaned = clean_text(&pending);
            pending.clear();
            if !cleaned.is_empty() {
                writer
                    .write_event(Event::Text(BytesText::from_escaped(escape_markup(&cleaned))))
                    .map_err(|e| e.to_string())?;
            }
        }
        writer.write_event(event).map_err(|e| e.to_string())
    })?;

    let body = String::from_utf8(writer.into_inner()).map_err(|e| MarkupError {
        position: 0,
        message: e.to_string(),
    })?;
    Ok(format!("{}{}", XML_DECLARATION, body))
}

/// What the parser hands its consumer: decoded character data inside the
/// root, or a tag event to be written back as-is.
enum Item<'a> {
    Text(String),
    Markup(Event<'a>),
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
    open: Vec<Vec<u8>>,
    seen_root: bool,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut reader = Reader::from_str(input);
        let config = reader.config_mut();
        config.check_end_names = true;
        config.trim_text(false);
        Self {
            reader,
            open: Vec::new(),
            seen_root: false,
        }
    }

    fn fail(&self, message: impl Into<String>) -> MarkupError {
        MarkupError {
            position: self.reader.buffer_position() as u64,
            message: message.into(),
        }
    }

    fn in_root(&self) -> bool {
        !self.open.is_empty()
    }

    fn run<F>(mut self, mut sink: F) -> Result<(), MarkupError>
    where
        F: FnMut(Item<'a>) -> Result<(), String>,
    {
        loop {
            let event = self
                .reader
                .read_event()
                .map_err(|e| self.fail(e.to_string()))?;
            let item = match event {
                Event::Start(start) => {
                    self.check_start(&start)?;
                    self.seen_root = true;
                    self.open.push(start.name().as_ref().to_vec());
                    Item::Markup(Event::Start(start))
                }
                Event::Empty(start) => {
                    self.check_start(&start)?;
                    self.seen_root = true;
                    Item::Markup(Event::Empty(start))
                }
                Event::End(end) => {
                    match self.open.pop() {
                        Some(name) if name.as_slice() == end.name().as_ref() => {}
                        Some(name) => {
                            return Err(self.fail(format!(
                                "expected </{}>",
                                String::from_utf8_lossy(&name)
                            )))
                        }
                        None => return Err(self.fail("closing tag without an open element")),
                    }
                    Item::Markup(Event::End(end))
                }
                Event::Text(text) => {
                    if text.windows(3).any(|w| w == b"]]>") {
                        return Err(self.fail("']]>' in character data"));
                    }
                    let decoded = text.unescape().map_err(|e| self.fail(e.to_string()))?;
                    self.check_chars(&decoded)?;
                    if !self.in_root() {
                        if decoded.trim().is_empty() {
                            continue;
                        }
                        return Err(self.fail("text outside the root element"));
                    }
                    Item::Text(decoded.into_owned())
                }
                Event::CData(data) => {
                    if !self.in_root() {
                        return Err(self.fail("CDATA outside the root element"));
                    }
                    let bytes: &[u8] = &data;
                    let decoded = std::str::from_utf8(bytes).map_err(|e| self.fail(e.to_string()))?;
                    self.check_chars(decoded)?;
                    Item::Text(decoded.to_string())
                }
                Event::Decl(_) => {
                    if self.seen_root {
                        return Err(self.fail("declaration after the root element"));
                    }
                    continue;
                }
                Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
                Event::Eof => break,
            };
            sink(item).map_err(|message| self.fail(message))?;
        }

        if let Some(name) = self.open.last() {
            return Err(self.fail(format!(
                "unclosed element <{}>",
                String::from_utf8_lossy(name)
            )));
        }
        if !self.seen_root {
            return Err(self.fail("no root element"));
        }
        Ok(())
    }

    fn check_start(&self, start: &BytesStart<'_>) -> Result<(), MarkupError> {
        if self.seen_root && !self.in_root() {
            return Err(self.fail("more than one root element"));
        }
        let name = start.name();
        if !is_valid_name(name.as_ref()) {
            return Err(self.fail(format!(
                "invalid element name '{}'",
                String::from_utf8_lossy(name.as_ref())
            )));
        }
        for attr in start.attributes().with_checks(true) {
            let attr = attr.map_err(|e| self.fail(e.to_string()))?;
            if !is_valid_name(attr.key.as_ref()) {
                return Err(self.fail("invalid attribute name"));
            }
            if attr.value.contains(&b'<') {
                return Err(self.fail("'<' in attribute value"));
            }
            let value = attr.unescape_value().map_err(|e| self.fail(e.to_string()))?;
            self.check_chars(&value)?;
        }
        Ok(())
    }

    fn check_chars(&self, text: &str) -> Result<(), MarkupError> {
        match text.chars().find(|&c| !is_xml_char(c)) {
            Some(c) => Err(self.fail(format!("character U+{:04X} not allowed", c as u32))),
            None => Ok(()),
        }
    }
}

/// The XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\u{9}'
            | '\u{A}'
            | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

fn is_valid_name(name: &[u8]) -> bool {
    let Ok(name) = std::str::from_utf8(name) else {
        return false;
    };
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}
