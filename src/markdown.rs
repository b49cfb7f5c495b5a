//! Minimal markdown renderer for generated summaries.
//!
//! Supports ATX headings (`#`..`######`), `-`/`*`/`+` bullet lists, `1.` ordered
//! lists, paragraphs, `**bold**`/`__bold__` and `*italic*`/`_italic_`. Everything
//! else is emitted as escaped text.
use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").expect("static regex"));
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("static regex"));
static ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s+(.*)$").expect("static regex"));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(\S(?:.*?\S)?)\*\*|__(\S(?:.*?\S)?)__").expect("static regex"));
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*(\S(?:.*?\S)?)\*|\b_(\S(?:.*?\S)?)_\b").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Paragraph,
    Bullets,
    Ordered,
}

/// Render the supported markdown subset to HTML.
pub fn to_html(input: &str) -> String {
    let mut out = String::new();
    let mut block = Block::None;

    for line in input.lines() {
        if line.trim().is_empty() {
            close(&mut out, &mut block);
            continue;
        }

        if let Some(caps) = HEADING.captures(line) {
            close(&mut out, &mut block);
            let level = caps[1].len();
            out.push_str(&format!("<h{level}>{}</h{level}>\n", inline(&caps[2])));
        } else if let Some(caps) = BULLET.captures(line) {
            open(&mut out, &mut block, Block::Bullets);
            out.push_str(&format!("<li>{}</li>\n", inline(&caps[1])));
        } else if let Some(caps) = ORDERED.captures(line) {
            open(&mut out, &mut block, Block::Ordered);
            out.push_str(&format!("<li>{}</li>\n", inline(&caps[1])));
        } else if block == Block::Paragraph {
            out.push_str("<br>\n");
            out.push_str(&inline(line.trim()));
        } else {
            open(&mut out, &mut block, Block::Paragraph);
            out.push_str(&inline(line.trim()));
        }
    }
    close(&mut out, &mut block);
    out
}

fn open(out: &mut String, block: &mut Block, want: Block) {
    if *block == want {
        return;
    }
    close(out, block);
    out.push_str(match want {
        Block::Paragraph => "<p>",
        Block::Bullets => "<ul>\n",
        Block::Ordered => "<ol>\n",
        Block::None => "",
    });
    *block = want;
}

fn close(out: &mut String, block: &mut Block) {
    out.push_str(match block {
        Block::Paragraph => "</p>\n",
        Block::Bullets => "</ul>\n",
        Block::Ordered => "</ol>\n",
        Block::None => "",
    });
    *block = Block::None;
}

/// Escape, then bold, then italic. Bold runs first so `**` is never read as
/// two italic markers.
fn inline(text: &str) -> String {
    let escaped = escape(text);
    let bold = BOLD.replace_all(&escaped, |caps: &regex::Captures<'_>| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        format!("<strong>{inner}</strong>")
    });
    ITALIC
        .replace_all(&bold, |caps: &regex::Captures<'_>| {
            let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            format!("<em>{inner}</em>")
        })
        .into_owned()
}

fn escape(text: &str) -> String {
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

/// Strip markup for terminal output: headings become upper-case lines, bullets
/// become `• `, emphasis markers are dropped.
pub fn to_plain(input: &str) -> String {
    let mut lines = Vec::new();
    for line in input.lines() {
        let plain = if let Some(caps) = HEADING.captures(line) {
            strip_emphasis(&caps[2]).to_uppercase()
        } else if let Some(caps) = BULLET.captures(line) {
            format!("  • {}", strip_emphasis(&caps[1]))
        } else {
            strip_emphasis(line)
        };
        lines.push(plain);
    }
    lines.join("\n")
}

fn strip_emphasis(text: &str) -> String {
    let bold = BOLD.replace_all(text, |caps: &regex::Captures<'_>| {
        caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str()).to_string()
    });
    ITALIC
        .replace_all(&bold, |caps: &regex::Captures<'_>| {
            caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str()).to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_bullets() {
        let md = "### Overall Sentiment\nMostly **bullish**.\n\n### Key Takeaways\n- Prices *up*\n- Volume steady\n";
        assert_eq!(
            to_html(md),
            "<h3>Overall Sentiment</h3>\n<p>Mostly <strong>bullish</strong>.</p>\n<h3>Key Takeaways</h3>\n<ul>\n<li>Prices <em>up</em></li>\n<li>Volume steady</li>\n</ul>\n"
        );
    }

    #[test]
    fn bullet_star_is_not_italic() {
        assert_eq!(
            to_html("* one *two*\n* three"),
            "<ul>\n<li>one <em>two</em></li>\n<li>three</li>\n</ul>\n"
        );
    }

    #[test]
    fn ordered_list_then_paragraph() {
        assert_eq!(
            to_html("1. first\n2. second\nafter"),
            "<ol>\n<li>first</li>\n<li>second</li>\n</ol>\n<p>after</p>\n"
        );
    }

    #[test]
    fn paragraph_lines_are_joined_with_breaks() {
        assert_eq!(to_html("line one\nline two"), "<p>line one<br>\nline two</p>\n");
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            to_html("<script>alert(\"x\")</script> & **<b>**"),
            "<p>&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; <strong>&lt;b&gt;</strong></p>\n"
        );
    }

    #[test]
    fn underscores_inside_words_are_kept() {
        assert_eq!(to_html("snake_case_name and _it_"), "<p>snake_case_name and <em>it</em></p>\n");
    }

    #[test]
    fn unmatched_markers_are_literal() {
        assert_eq!(to_html("5 * 3 = 15"), "<p>5 * 3 = 15</p>\n");
        assert_eq!(to_html("**open"), "<p>**open</p>\n");
    }

    #[test]
    fn plain_rendering() {
        assert_eq!(
            to_plain("### Key Takeaways\n- **Strong** demand"),
            "KEY TAKEAWAYS\n  • Strong demand"
        );
    }
}
