//! Plain-text fallback for HTML bodies.

use std::sync::LazyLock;

use regex::Regex;

static STYLE_OR_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(style|script)\b[^>]*>.*?</(style|script)>").expect("valid regex")
});

static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|tr)>").expect("valid regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Strip markup from `html`, keeping paragraph breaks.
///
/// Good enough for the messages this crate renders; not a general HTML
/// renderer.
pub fn html_to_text(html: &str) -> String {
    let text = STYLE_OR_SCRIPT.replace_all(html, "");
    let text = BLOCK_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<String> = text
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line.trim(), " ").into_owned())
        .collect();
    BLANK_LINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    // `&amp;` last so "&amp;lt;" decodes to "&lt;" and not "<".
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&copy;", "\u{a9}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_style_blocks_and_tags() {
        let html = "<html><head><style>p { color: red; }</style></head>\
                    <body><h1>Hi</h1><p>Click <a href=\"x\">here</a>.</p></body></html>";
        assert_eq!(html_to_text(html), "Hi\nClick here.");
    }

    #[test]
    fn decodes_entities_once() {
        assert_eq!(html_to_text("<p>Tom &amp; Jerry &amp;lt;3</p>"), "Tom & Jerry &lt;3");
    }

    #[test]
    fn collapses_whitespace_and_blank_runs() {
        let html = "<p>  one   two </p>\n\n\n\n<p>three</p>";
        assert_eq!(html_to_text(html), "one two\n\nthree");
    }
}
