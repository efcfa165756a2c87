//! HTML sanitization for free-text report sections
//!
//! Analyst-facing comment fields accept rich text from upstream tools; the
//! stored value is reduced to an allow-listed tag/attribute set before it
//! ever reaches the database. Structured fields are never sanitized.

use std::collections::HashSet;

/// Tags permitted in sanitized free-text sections.
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "br", "em", "i", "li", "ol", "p", "s", "span", "strong", "u", "ul",
];

/// Strip the input down to the allow-listed tag set, dropping scripts,
/// event handlers, and unknown attributes.
pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = ALLOWED_TAGS.iter().copied().collect();

    ammonia::Builder::default()
        .tags(tags)
        .link_rel(Some("noopener noreferrer"))
        .clean(html)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(sanitize_html("no markup here"), "no markup here");
    }

    #[test]
    fn test_allowed_tags_survive() {
        let input = "<p>Mutation in <strong>TP53</strong> detected</p>";
        assert_eq!(sanitize_html(input), input);
    }

    #[test]
    fn test_script_stripped() {
        let cleaned = sanitize_html("<p>ok</p><script>alert('x')</script>");
        assert!(!cleaned.contains("script"));
        assert!(cleaned.contains("<p>ok</p>"));
    }

    #[test]
    fn test_event_handler_attribute_stripped() {
        let cleaned = sanitize_html(r#"<p onclick="steal()">text</p>"#);
        assert!(!cleaned.contains("onclick"));
        assert!(cleaned.contains("text"));
    }

    #[test]
    fn test_unknown_tag_unwrapped() {
        let cleaned = sanitize_html("<table><tr><td>cell</td></tr></table>");
        assert!(!cleaned.contains("<table>"));
        assert!(cleaned.contains("cell"));
    }
}
