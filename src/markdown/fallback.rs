use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::MarkdownRenderer;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static markdown pattern")
}

static FENCE: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)```(.*?)```"));
static HEADINGS: LazyLock<[Regex; 6]> = LazyLock::new(|| {
    [6, 5, 4, 3, 2, 1].map(|level| re(&format!(r"(?m)^{} (.*)$", "#".repeat(level))))
});
static RULE: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^(?:-{3,}|\*{3,}|_{3,})$"));
static QUOTE: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^&gt; .*(?:\n&gt;.*)*"));
static QUOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^&gt; ?"));
static BULLETS: LazyLock<Regex> = LazyLock::new(|| re(r"(?:^|\n)(- .*(?:\n(?:  )?- .*)*)"));
static BULLET_MARKER: LazyLock<Regex> = LazyLock::new(|| re(r"^(?:  )?- "));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?:^|\n)(\d+\. .*(?:\n(?: {3})?\d+\. .*)*)"));
static NUMBER_MARKER: LazyLock<Regex> = LazyLock::new(|| re(r"^(?: {3})?\d+\. "));
static IMAGE: LazyLock<Regex> = LazyLock::new(|| re(r"!\[([^\]]*)\]\(([^)]+)\)"));
static LINK: LazyLock<Regex> = LazyLock::new(|| re(r"\[([^\]]+)\]\(([^)]+)\)"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| re(r"`([^`]+)`"));
static BOLD_ITALIC: LazyLock<Regex> = LazyLock::new(|| re(r"\*\*\*([^*]+)\*\*\*"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| re(r"\*\*([^*]+)\*\*"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| re(r"\*([^*]+)\*"));
static STRIKE: LazyLock<Regex> = LazyLock::new(|| re(r"~~([^~]+)~~"));
static UNDERLINE: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)&lt;ins&gt;(.*?)&lt;/ins&gt;"));

const BLOCK_PREFIXES: [&str; 11] = [
    "<h", "<ul>", "<ol>", "<pre>", "<blockquote>", "<img", "<hr", "</ul>", "</ol>", "</pre>",
    "</blockquote>",
];

/// Markdown by ordered text substitution.
///
/// Each stage runs once over the output of the previous one, so constructs
/// only combine by adjacency: emphasis spanning a list item boundary or a
/// quote nested in a quote comes out however the stages happen to leave it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackRenderer;

impl MarkdownRenderer for FallbackRenderer {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn render(&self, text: &str) -> String {
        let mut out = escape_html(&text.replace("\r\n", "\n"));

        out = FENCE
            .replace_all(&out, |c: &Captures<'_>| {
                let code = &c[1];
                let code = code.strip_prefix('\n').unwrap_or(code);
                let code = code.strip_suffix('\n').unwrap_or(code);
                format!("<pre><code>{code}</code></pre>")
            })
            .into_owned();

        for (pattern, level) in HEADINGS.iter().zip((1..=6).rev()) {
            out = pattern
                .replace_all(&out, format!("<h{level}>${{1}}</h{level}>"))
                .into_owned();
        }

        out = RULE.replace_all(&out, "<hr>").into_owned();

        out = QUOTE
            .replace_all(&out, |c: &Captures<'_>| {
                format!("<blockquote>{}</blockquote>", QUOTE_MARKER.replace_all(&c[0], ""))
            })
            .into_owned();

        out = list(&BULLETS, &BULLET_MARKER, "ul", &out);
        out = list(&NUMBERED, &NUMBER_MARKER, "ol", &out);

        out = IMAGE
            .replace_all(&out, r#"<img alt="${1}" src="${2}">"#)
            .into_owned();
        out = LINK
            .replace_all(
                &out,
                r#"<a href="${2}" target="_blank" rel="noopener noreferrer">${1}</a>"#,
            )
            .into_owned();

        out = INLINE_CODE
            .replace_all(&out, "<code>${1}</code>")
            .into_owned();
        out = BOLD_ITALIC
            .replace_all(&out, "<strong><em>${1}</em></strong>")
            .into_owned();
        out = BOLD.replace_all(&out, "<strong>${1}</strong>").into_owned();
        out = ITALIC.replace_all(&out, "<em>${1}</em>").into_owned();
        out = STRIKE.replace_all(&out, "<del>${1}</del>").into_owned();
        out = UNDERLINE.replace_all(&out, "<ins>${1}</ins>").into_owned();

        wrap_paragraphs(&out).replace("  \n", "<br>\n")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn list(block: &Regex, marker: &Regex, tag: &str, text: &str) -> String {
    block
        .replace_all(text, |c: &Captures<'_>| {
            let items: String = c[1]
                .split('\n')
                .map(|line| format!("<li>{}</li>", marker.replace(line, "")))
                .collect();
            format!("\n<{tag}>{items}</{tag}>")
        })
        .into_owned()
}

/// Wraps every non-empty line outside `<pre>` and `<blockquote>` blocks that
/// does not already start with a block tag.
fn wrap_paragraphs(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    let mut open_block: Option<&str> = None;

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if let Some(close) = open_block {
            out.push_str(line);
            if line.contains(close) {
                open_block = None;
            }
            continue;
        }

        if line.is_empty() || BLOCK_PREFIXES.iter().any(|p| line.starts_with(p)) {
            out.push_str(line);
        } else {
            out.push_str("<p>");
            out.push_str(line);
            out.push_str("</p>");
        }

        for (open, close) in [("<pre>", "</pre>"), ("<blockquote>", "</blockquote>")] {
            if line.starts_with(open) && !line.contains(close) {
                open_block = Some(close);
            }
        }
    }
    out
}
