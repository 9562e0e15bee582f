#[cfg(feature = "cmark")]
mod cmark;
mod fallback;

use std::sync::LazyLock;

use regex::{Captures, Regex};

#[cfg(feature = "cmark")]
pub use cmark::CmarkRenderer;
pub use fallback::FallbackRenderer;

pub const LINK_TARGET: &str = "_blank";
pub const LINK_REL: &str = "noopener noreferrer";

/// Turns Markdown source into HTML for the preview.
pub trait MarkdownRenderer {
    fn name(&self) -> &'static str;
    fn render(&self, text: &str) -> String;
}

#[cfg(feature = "cmark")]
fn full_engine() -> Option<Box<dyn MarkdownRenderer>> {
    Some(Box::new(CmarkRenderer::new()))
}

#[cfg(not(feature = "cmark"))]
fn full_engine() -> Option<Box<dyn MarkdownRenderer>> {
    None
}

/// Picks the full engine when it is compiled in, the fallback otherwise.
pub fn detect_renderer(force_fallback: bool) -> Box<dyn MarkdownRenderer> {
    match full_engine() {
        Some(engine) if !force_fallback => engine,
        _ => Box::new(FallbackRenderer),
    }
}

static ANCHOR_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a((?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*/?>"#)
        .expect("static anchor pattern")
});
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+([^\s=/>]+)(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?"#)
        .expect("static attribute pattern")
});

/// Rewrites every `<a>` opening tag so it opens a new browsing context
/// without access to the opener. Safe to apply more than once.
///
/// Attributes are read whole, so `target=` or `rel=` text inside another
/// attribute's quoted value is left alone.
pub fn enforce_link_targets(html: &str) -> String {
    ANCHOR_OPEN
        .replace_all(html, |c: &Captures<'_>| {
            let mut tag = String::from("<a");
            for attr in ATTRIBUTE.captures_iter(c.get(1).map_or("", |m| m.as_str())) {
                let name = &attr[1];
                if name.eq_ignore_ascii_case("target") || name.eq_ignore_ascii_case("rel") {
                    continue;
                }
                tag.push_str(&attr[0]);
            }
            tag.push_str(&format!(" target=\"{LINK_TARGET}\" rel=\"{LINK_REL}\">"));
            tag
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::{detect_renderer, enforce_link_targets};

    #[test]
    fn link_hardening_replaces_existing_attributes() {
        let html = r#"<p><a href="x" target="_self" rel="opener">x</a> <abbr>y</abbr></p>"#;
        assert_eq!(
            enforce_link_targets(html),
            r#"<p><a href="x" target="_blank" rel="noopener noreferrer">x</a> <abbr>y</abbr></p>"#
        );
    }

    #[test]
    fn link_hardening_is_idempotent() {
        let once = enforce_link_targets(r#"<A HREF='y'>y</A><a>bare</a>"#);
        assert_eq!(enforce_link_targets(&once), once);
        assert!(once.contains(r#"<a target="_blank" rel="noopener noreferrer">bare</a>"#));
        assert!(once.contains(r#"<a HREF='y' target="_blank""#));
    }

    #[test]
    fn attribute_names_inside_quoted_values_are_not_stripped() {
        let html = enforce_link_targets(r#"<a href="u" title="see target=top">a</a>"#);
        assert_eq!(
            html,
            r#"<a href="u" title="see target=top" target="_blank" rel="noopener noreferrer">a</a>"#
        );

        let html = enforce_link_targets(r#"<a href="u rel=opener" target=_self>a</a>"#);
        assert_eq!(
            html,
            r#"<a href="u rel=opener" target="_blank" rel="noopener noreferrer">a</a>"#
        );
        assert_eq!(enforce_link_targets(&html), html);
    }

    #[test]
    fn fallback_hrefs_with_attribute_text_keep_their_target() {
        let html = enforce_link_targets(&detect_renderer(true).render("[a](u target=x)"));
        assert!(
            html.contains(r#"<a href="u target=x" target="_blank" rel="noopener noreferrer">a</a>"#),
            "{html}"
        );

        let html = enforce_link_targets(&detect_renderer(true).render("[a](u rel=x)"));
        assert!(
            html.contains(r#"<a href="u rel=x" target="_blank" rel="noopener noreferrer">a</a>"#),
            "{html}"
        );
    }

    #[cfg(feature = "cmark")]
    #[test]
    fn cmark_titles_with_attribute_text_keep_their_target() {
        let html = enforce_link_targets(
            &detect_renderer(false).render("[a](https://x.example \"see target=top\")"),
        );
        assert!(
            html.contains(
                r#"<a href="https://x.example" title="see target=top" target="_blank" rel="noopener noreferrer">a</a>"#
            ),
            "{html}"
        );

        let html =
            enforce_link_targets(&detect_renderer(false).render("[a](https://x.example \"rel=opener\")"));
        assert!(
            html.contains(
                r#"<a href="https://x.example" title="rel=opener" target="_blank" rel="noopener noreferrer">a</a>"#
            ),
            "{html}"
        );
    }

    #[test]
    fn forced_fallback_is_honoured() {
        assert_eq!(detect_renderer(true).name(), "fallback");
    }

    #[cfg(feature = "cmark")]
    #[test]
    fn full_engine_is_preferred_when_available() {
        assert_eq!(detect_renderer(false).name(), "pulldown-cmark");
    }

    #[test]
    fn both_renderers_harden_links() {
        for force in [true, false] {
            let html = detect_renderer(force).render("[a](https://a.example)");
            assert!(html.contains("target=\"_blank\""), "{html}");
            assert!(html.contains("rel=\"noopener noreferrer\""), "{html}");
        }
    }
}
