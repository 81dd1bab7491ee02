//! Size and token estimates for the two output artifacts.

use std::fmt;

use crate::normalize::{NormalizeMode, Normalized};

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Rough token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Diagnostics printed after a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReport {
    pub raw_tokens: usize,
    pub raw_bytes: usize,
    pub compressed_tokens: usize,
    pub compressed_bytes: usize,
    /// `None` when the normalizer kept the markup structure.
    pub flat_reason: Option<String>,
}

impl TokenReport {
    pub fn new(raw: &str, normalized: &Normalized) -> Self {
        Self {
            raw_tokens: estimate_tokens(raw),
            raw_bytes: raw.len(),
            compressed_tokens: estimate_tokens(&normalized.text),
            compressed_bytes: normalized.text.len(),
            flat_reason: match &normalized.mode {
                NormalizeMode::Structured => None,
                NormalizeMode::Flat { reason } => Some(reason.clone()),
            },
        }
    }

    /// Percentage of estimated tokens removed by normalization.
    pub fn savings_percent(&self) -> usize {
        if self.raw_tokens == 0 {
            0
        } else {
            self.raw_tokens.saturating_sub(self.compressed_tokens) * 100 / self.raw_tokens
        }
    }
}

impl fmt::Display for TokenReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  Uncompressed:  {:>10} tokens  {:>10}",
            self.raw_tokens,
            format_bytes(self.raw_bytes as u64)
        )?;
        writeln!(
            f,
            "  Compressed:    {:>10} tokens  {:>10}  (-{}%)",
            self.compressed_tokens,
            format_bytes(self.compressed_bytes as u64),
            self.savings_percent()
        )?;
        match &self.flat_reason {
            None => write!(f, "  Normalizer:    structure preserved"),
            Some(reason) => write!(f, "  Normalizer:    flat text ({})", reason),
        }
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_rounds_up_by_chars() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // counted in chars, not bytes
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn report_reflects_mode() {
        let normalized = Normalized {
            text: "abcd".into(),
            mode: NormalizeMode::Flat {
                reason: "no root element".into(),
            },
        };
        let report = TokenReport::new("abcdefghijklmnop", &normalized);
        assert_eq!(report.raw_tokens, 4);
        assert_eq!(report.compressed_tokens, 1);
        assert_eq!(report.savings_percent(), 75);
        let shown = report.to_string();
        assert!(shown.contains("flat text (no root element)"));
        assert!(shown.contains("16 B"));
    }

    #[test]
    fn bytes_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
