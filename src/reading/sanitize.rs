//! HTML entity escaping for text that is persisted and rendered later.

/// Escape `& < > " ' /` so stored text can never open a tag or attribute.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape_html`] for plain-text display (e.g. a terminal).
#[must_use]
pub fn unescape_html(text: &str) -> String {
    const ENTITIES: [(&str, char); 6] =
        [("&lt;", '<'), ("&gt;", '>'), ("&quot;", '"'), ("&#x27;", '\''), ("&#x2F;", '/'), ("&amp;", '&')];
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<img src="x" onerror='y'/>"#),
            "&lt;img src=&quot;x&quot; onerror=&#x27;y&#x27;&#x2F;&gt;"
        );
    }

    #[test]
    fn ampersand_is_escaped_first_class() {
        assert_eq!(escape_html("a & b &amp;"), "a &amp; b &amp;amp;");
    }

    #[test]
    fn unescape_inverts_escape() {
        let raw = r#"It's <b>"ours"</b> & yours &amp; more"#;
        assert_eq!(unescape_html(&escape_html(raw)), raw);
        assert_eq!(unescape_html("a & b &copy;"), "a & b &copy;");
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(escape_html("The Lantern shines."), "The Lantern shines.");
    }
}
