//! `<source>` envelopes and the line-oriented document builder.
//!
//! Every assembler writes through [`DocumentBuilder`], which tracks the
//! open element stack. [`DocumentBuilder::finish`] closes whatever is still
//! open, so a document can never leave a dangling tag even when an
//! assembler bails out of a section early.

use std::fmt;

use crate::markup::{cdata, escape_attribute, escape_markup};

/// The `type` attribute of a `<source>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    GitHubRepository,
    GitHubPullRequest,
    GitHubIssue,
    ArxivPaper,
    SciHubPaper,
    LocalDirectory,
    YouTubeTranscript,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::GitHubRepository => "github_repository",
            SourceKind::GitHubPullRequest => "github_pull_request",
            SourceKind::GitHubIssue => "github_issue",
            SourceKind::ArxivPaper => "arxiv_paper",
            SourceKind::SciHubPaper => "sci_hub_paper",
            SourceKind::LocalDirectory => "local_directory",
            SourceKind::YouTubeTranscript => "youtube_transcript",
        }
    }

    /// Name of the identifying attribute for this kind.
    pub fn identity_attribute(&self) -> &'static str {
        match self {
            SourceKind::SciHubPaper => "identifier",
            SourceKind::LocalDirectory => "path",
            _ => "url",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only builder for one interchange document.
///
/// Lines are joined with `\n` on [`finish`](Self::finish).
#[derive(Debug)]
pub struct DocumentBuilder {
    lines: Vec<String>,
    open: Vec<&'static str>,
}

impl DocumentBuilder {
    /// Start a document with an opened `<source>` envelope.
    pub fn source(kind: SourceKind, identity: &str) -> Self {
        let mut builder = Self {
            lines: Vec::new(),
            open: Vec::new(),
        };
        builder.lines.push(format!(
            r#"<source type="{}" {}="{}">"#,
            kind.as_str(),
            kind.identity_attribute(),
            escape_attribute(identity)
        ));
        builder.open.push("source");
        builder
    }

    /// Open a bare element on its own line.
    pub fn open(&mut self, tag: &'static str) -> &mut Self {
        self.lines.push(format!("<{}>", tag));
        self.open.push(tag);
        self
    }

    /// Open an element carrying a single attribute.
    pub fn open_with(&mut self, tag: &'static str, attr: &str, value: &str) -> &mut Self {
        self.lines
            .push(format!(r#"<{} {}="{}">"#, tag, attr, escape_attribute(value)));
        self.open.push(tag);
        self
    }

    /// Close the innermost open element. A no-op once only `<source>`
    /// remains; that one belongs to [`finish`](Self::finish).
    pub fn close(&mut self) -> &mut Self {
        if self.open.len() > 1 {
            if let Some(tag) = self.open.pop() {
                self.lines.push(format!("</{}>", tag));
            }
        }
        self
    }

    /// `<tag>escaped text</tag>` on one line.
    pub fn element(&mut self, tag: &str, text: &str) -> &mut Self {
        self.lines
            .push(format!("<{0}>{1}</{0}>", tag, escape_markup(text)));
        self
    }

    /// Escaped text on its own line.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.lines.push(escape_markup(text).into_owned());
        self
    }

    /// A CDATA section on its own line.
    pub fn cdata(&mut self, text: &str) -> &mut Self {
        self.lines.push(cdata(text));
        self
    }

    /// Already well-formed markup, such as a nested source document.
    pub fn fragment(&mut self, markup: String) -> &mut Self {
        self.lines.push(markup);
        self
    }

    /// Open `<file name="...">`, write the escaped content, close it.
    pub fn file(&mut self, name: &str, content: &str) -> &mut Self {
        self.open_with("file", "name", name);
        self.text(content);
        self.close()
    }

    /// Depth of currently open elements, including `<source>`.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Close every open element and render the document.
    pub fn finish(mut self) -> String {
        while let Some(tag) = self.open.pop() {
            self.lines.push(format!("</{}>", tag));
        }
        self.lines.join("\n")
    }
}

/// A complete source document carrying only an `<error>` child.
pub fn error_source(kind: SourceKind, identity: &str, message: &str) -> String {
    let mut doc = DocumentBuilder::source(kind, identity);
    doc.element("error", message);
    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_attributes_per_kind() {
        let doc = DocumentBuilder::source(SourceKind::SciHubPaper, "10.1/x").finish();
        assert_eq!(
            doc,
            "<source type=\"sci_hub_paper\" identifier=\"10.1/x\">\n</source>"
        );
        let doc = DocumentBuilder::source(SourceKind::LocalDirectory, "./docs").finish();
        assert!(doc.starts_with("<source type=\"local_directory\" path=\"./docs\">"));
    }

    #[test]
    fn finish_closes_everything_open() {
        let mut doc = DocumentBuilder::source(SourceKind::GitHubIssue, "https://github.com/o/r/issues/1");
        doc.open("issue_info").open("comments").open("comment");
        doc.element("author", "octocat");
        assert_eq!(doc.depth(), 4);
        let out = doc.finish();
        assert!(out.ends_with("</comment>\n</comments>\n</issue_info>\n</source>"));
    }

    #[test]
    fn close_never_pops_source() {
        let mut doc = DocumentBuilder::source(SourceKind::GitHubRepository, "u");
        doc.close().close();
        assert_eq!(doc.depth(), 1);
        assert_eq!(doc.finish().matches("</source>").count(), 1);
    }

    #[test]
    fn file_block_layout() {
        let mut doc = DocumentBuilder::source(SourceKind::GitHubRepository, "u");
        doc.file("src/a.py", "x = 1 < 2");
        assert_eq!(
            doc.finish(),
            "<source type=\"github_repository\" url=\"u\">\n<file name=\"src/a.py\">\nx = 1 &lt; 2\n</file>\n</source>"
        );
    }

    #[test]
    fn error_source_is_balanced() {
        let doc = error_source(
            SourceKind::YouTubeTranscript,
            "https://youtu.be/bad",
            "Could not extract video ID from URL.",
        );
        assert_eq!(
            doc,
            "<source type=\"youtube_transcript\" url=\"https://youtu.be/bad\">\n<error>Could not extract video ID from URL.</error>\n</source>"
        );
    }
}
