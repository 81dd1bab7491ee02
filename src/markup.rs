//! Escaping for content embedded in the interchange document.
//!
//! Element text only needs `&`, `<` and `>` replaced; quotes are left as-is
//! so source code stays readable for the model. Attribute values are
//! additionally quote-escaped because they sit inside `"..."`.

use std::borrow::Cow;

/// Escape `&`, `<` and `>` for use as element text.
///
/// Returns the input borrowed when nothing needs escaping.
pub fn escape_markup(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Escape a value for a double-quoted attribute.
pub fn escape_attribute(value: &str) -> String {
    escape_markup(value).replace('"', "&quot;")
}

/// Wrap raw text in a CDATA section.
///
/// A literal `]]>` inside the text would terminate the section early, so
/// it is split across two adjacent sections.
pub fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
