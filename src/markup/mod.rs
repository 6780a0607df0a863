//! HTML token stream to FB2 markup.
//!
//! FB2 has no native bold/italic/color primitives rich enough for feed
//! content, so presentation is expressed through named `<style>` markers
//! backed by the document stylesheet. The mapper walks the token stream
//! once, emitting markup per tag from a lookup table and tracking every
//! opened marker on a stack, so the emitted open/close skeleton is always
//! balanced and LIFO-ordered even when the source markup is not.

use std::sync::LazyLock;

use regex::Regex;

use crate::tokenizer::{TagKind, Token};

/// Names an image that survived extraction: `{digits}.jpg` / `{digits}.jpeg`.
static GENERATED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.jpe?g$").expect("valid regex"));

/// True if `name` is a reference produced by the image extractor.
pub fn is_generated_name(name: &str) -> bool {
    GENERATED_NAME.is_match(name)
}

/// Map a token stream to FB2 body markup.
pub fn to_markup(tokens: Vec<Token>) -> String {
    let mut tokens: Vec<Token> = tokens
        .into_iter()
        .filter(|token| match token {
            Token::Text(text) => !text.trim().is_empty(),
            Token::Tag { name, .. } if name == "img" => {
                token.param("src").is_some_and(is_generated_name)
            }
            Token::Tag { .. } => true,
        })
        .collect();

    remove_degenerate_pairs(&mut tokens);

    let mut out = String::new();
    // every entry records exactly what its open emitted a need for
    let mut open_styles: Vec<(String, String)> = Vec::new();

    for token in &tokens {
        match token {
            Token::Text(text) => out.push_str(&html_escape::encode_text(text)),
            Token::Tag { name, kind, .. } => {
                // img, hr, br, ol and ul produce their fragment on any
                // occurrence, whatever the tag kind
                if let Some(piece) = void_fragment(name, token) {
                    out.push_str(&piece);
                    continue;
                }

                match kind {
                    TagKind::Open => match name.as_str() {
                        "li" | "dt" | "dd" => out.push_str("<empty-line/>"),
                        _ => {
                            if let Some((open, close)) = paired_fragments(name, token) {
                                out.push_str(&open);
                                open_styles.push((name.clone(), close));
                            }
                        }
                    },
                    TagKind::Close => {
                        if open_styles.iter().any(|(n, _)| n == name) {
                            // unwind anything left open inside this element
                            while let Some((n, close)) = open_styles.pop() {
                                out.push_str(&close);
                                if &n == name {
                                    break;
                                }
                            }
                        }
                        // a stray close with no matching open emits nothing
                    }
                    TagKind::SelfClose => {}
                }
            }
        }
    }

    // the source stream may leave elements unclosed; the skeleton may not
    while let Some((_, close)) = open_styles.pop() {
        out.push_str(&close);
    }

    out
}

/// Delete immediately-adjacent open/close pairs of the same tag name,
/// repeatedly, so nested empty markup collapses to nothing.
pub fn remove_degenerate_pairs(tokens: &mut Vec<Token>) {
    loop {
        let mut changed = false;
        let mut i = 0;
        while i + 1 < tokens.len() {
            let degenerate = matches!(
                (&tokens[i], &tokens[i + 1]),
                (
                    Token::Tag { name: a, kind: TagKind::Open, .. },
                    Token::Tag { name: b, kind: TagKind::Close, .. },
                ) if a == b
            );
            if degenerate {
                tokens.remove(i + 1);
                tokens.remove(i);
                changed = true;
                i = i.saturating_sub(1);
            } else {
                i += 1;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Fragments emitted for any occurrence of the tag, open or close.
fn void_fragment(name: &str, token: &Token) -> Option<String> {
    match name {
        // filtered upstream, so src is always a generated name here
        "img" => token
            .param("src")
            .map(|src| format!(r##"<image l:href="#{src}"/>"##)),
        "hr" => Some("<subtitle>* * *</subtitle>".to_string()),
        "br" | "ol" | "ul" => Some("<empty-line/>".to_string()),
        _ => None,
    }
}

/// The opening fragment and the matching closing fragment for a container
/// tag, or `None` for tags that contribute no markup of their own.
fn paired_fragments(name: &str, token: &Token) -> Option<(String, String)> {
    let fragments = match name {
        "strike" | "s" => (style_open("s"), style_close(1)),
        "u" => (style_open("u"), style_close(1)),
        "b" | "strong" => (style_open("b"), style_close(1)),
        "i" | "em" => (style_open("i"), style_close(1)),
        "big" => (style_open("large"), style_close(1)),
        "small" => (style_open("small"), style_close(1)),
        "font" => font_fragments(token),
        "a" => (
            style_open("u") + &style_open(&color_style(LINK_COLOR)),
            style_close(2),
        ),
        "h1" => (style_open("xxlarge") + &style_open("b"), style_close(2)),
        "h2" | "h3" => (style_open("xlarge") + &style_open("b"), style_close(2)),
        "h4" | "h5" | "h6" => (style_open("large") + &style_open("b"), style_close(2)),
        "code" | "pre" | "tt" => (
            format!("<code>{}", style_open("mono")),
            format!("{}</code>", style_close(1)),
        ),
        // same name and meaning in FB2, attributes stripped
        "sup" | "sub" | "p" | "cite" | "table" | "tr" | "th" | "td" => {
            (format!("<{name}>"), format!("</{name}>"))
        }
        _ => return None,
    };
    Some(fragments)
}

/// Hyperlinks render as underlined muted-gray text.
const LINK_COLOR: &str = "#222222";

fn font_fragments(token: &Token) -> (String, String) {
    if let Some(color) = token.param("color") {
        return (style_open(&color_style(color)), style_close(1));
    }
    if let Some(style) = token.param("size").and_then(size_style) {
        return (style_open(style), style_close(1));
    }
    // nothing usable: contribute no markers at all (the close side of the
    // stack entry is empty, so balance still holds)
    (String::new(), String::new())
}

fn style_open(name: &str) -> String {
    format!("<style name=\"{name}\">")
}

fn style_close(count: usize) -> String {
    "</style>".repeat(count)
}

/// Grayscale color class for an HTML color value, `col0`–`colf`.
fn color_style(color: &str) -> String {
    format!("col{:x}", color_bucket(color))
}

/// Bucket an HTML color into one of 16 grayscale levels by luminance
/// (0.3R + 0.59G + 0.11B). Unparseable colors land in bucket 0.
pub fn color_bucket(color: &str) -> u8 {
    let Some((r, g, b)) = parse_color(color) else {
        return 0;
    };
    let luminance = 0.3 * f64::from(r) + 0.59 * f64::from(g) + 0.11 * f64::from(b);
    (luminance as u8) / 16
}

fn parse_color(color: &str) -> Option<(u8, u8, u8)> {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        return match hex.len() {
            6 => {
                let value = u32::from_str_radix(hex, 16).ok()?;
                Some(((value >> 16) as u8, (value >> 8) as u8, value as u8))
            }
            3 => {
                let value = u32::from_str_radix(hex, 16).ok()?;
                let (r, g, b) = ((value >> 8) & 0xf, (value >> 4) & 0xf, value & 0xf);
                Some(((r * 17) as u8, (g * 17) as u8, (b * 17) as u8))
            }
            _ => None,
        };
    }
    named_color(color)
}

fn named_color(name: &str) -> Option<(u8, u8, u8)> {
    let rgb = match name.to_ascii_lowercase().as_str() {
        "black" => (0x00, 0x00, 0x00),
        "silver" => (0xc0, 0xc0, 0xc0),
        "gray" | "grey" => (0x80, 0x80, 0x80),
        "white" => (0xff, 0xff, 0xff),
        "maroon" => (0x80, 0x00, 0x00),
        "red" => (0xff, 0x00, 0x00),
        "purple" => (0x80, 0x00, 0x80),
        "fuchsia" => (0xff, 0x00, 0xff),
        "green" => (0x00, 0x80, 0x00),
        "lime" => (0x00, 0xff, 0x00),
        "olive" => (0x80, 0x80, 0x00),
        "yellow" => (0xff, 0xff, 0x00),
        "navy" => (0x00, 0x00, 0x80),
        "blue" => (0x00, 0x00, 0xff),
        "teal" => (0x00, 0x80, 0x80),
        "aqua" => (0x00, 0xff, 0xff),
        _ => return None,
    };
    Some(rgb)
}

/// Font-size attribute to size style, per the fixed threshold table.
/// Size 3 is the body default and maps to no style at all.
fn size_style(size: &str) -> Option<&'static str> {
    let size: i32 = size.trim().parse().ok()?;
    match size {
        s if s < 3 => Some("small"),
        3 => None,
        s if s < 5 => Some("large"),
        s if s < 7 => Some("xlarge"),
        _ => Some("xxlarge"),
    }
}

/// Every style name the mapper can emit, plus `sc`, in stylesheet order.
pub fn style_names() -> Vec<String> {
    let mut names: Vec<String> = [
        "s", "u", "i", "b", "mono", "small", "large", "xlarge", "xxlarge", "sc",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    names.extend((0..16).map(|level| format!("col{level:x}")));
    names
}

/// CSS rule for one style name, in the `.name {property;}` shape the
/// document stylesheet uses.
pub fn style_rule(name: &str) -> String {
    let body = match name {
        "s" => "text-decoration: line-through;".to_string(),
        "u" => "text-decoration: underline;".to_string(),
        "i" => "font-style: italic;".to_string(),
        "b" => "font-weight: bold;".to_string(),
        "mono" => "font-family: monospace;".to_string(),
        "small" => "font-size: small;".to_string(),
        "large" => "font-size: large;".to_string(),
        "xlarge" => "font-size: x-large;".to_string(),
        "xxlarge" => "font-size: xx-large;".to_string(),
        "sc" => "font-variant: small-caps;".to_string(),
        _ => {
            let level = u8::from_str_radix(name.trim_start_matches("col"), 16).unwrap_or(0);
            let value = level * 17;
            format!("color: #{value:02x}{value:02x}{value:02x};")
        }
    };
    format!(".{name} {{{body}}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn markup(html: &str) -> String {
        to_markup(tokenize(html))
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(markup("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn test_bold_world() {
        assert_eq!(
            markup("<p>Hello <b>world</b></p>"),
            "<p>Hello <style name=\"b\">world</style></p>"
        );
    }

    #[test]
    fn test_heading_opens_two_markers() {
        assert_eq!(
            markup("<h1>Title</h1>"),
            "<style name=\"xxlarge\"><style name=\"b\">Title</style></style>"
        );
        assert_eq!(
            markup("<h4>Minor</h4>"),
            "<style name=\"large\"><style name=\"b\">Minor</style></style>"
        );
    }

    #[test]
    fn test_link_is_underlined_muted() {
        assert_eq!(
            markup(r#"<a href="http://x/">go</a>"#),
            "<style name=\"u\"><style name=\"col2\">go</style></style>"
        );
    }

    #[test]
    fn test_code_wraps_mono_style() {
        assert_eq!(
            markup("<code>x()</code>"),
            "<code><style name=\"mono\">x()</style></code>"
        );
    }

    #[test]
    fn test_font_color_buckets() {
        assert_eq!(
            markup(r##"<font color="#000000">k</font>"##),
            "<style name=\"col0\">k</style>"
        );
        assert_eq!(
            markup(r##"<font color="#FFFFFF">w</font>"##),
            "<style name=\"colf\">w</style>"
        );
    }

    #[test]
    fn test_font_size_threshold_table() {
        assert_eq!(
            markup(r#"<font size="2">x</font>"#),
            "<style name=\"small\">x</style>"
        );
        assert_eq!(markup(r#"<font size="3">x</font>"#), "x");
        assert_eq!(
            markup(r#"<font size="4">x</font>"#),
            "<style name=\"large\">x</style>"
        );
        assert_eq!(
            markup(r#"<font size="5">x</font>"#),
            "<style name=\"xlarge\">x</style>"
        );
        assert_eq!(
            markup(r#"<font size="7">x</font>"#),
            "<style name=\"xxlarge\">x</style>"
        );
    }

    #[test]
    fn test_font_without_usable_params() {
        assert_eq!(markup(r#"<font face="Arial">x</font>"#), "x");
    }

    #[test]
    fn test_color_bucket_boundaries() {
        assert_eq!(color_bucket("#000000"), 0);
        assert_eq!(color_bucket("#FFFFFF"), 15);
        assert_eq!(color_bucket("#222222"), 2);
        assert_eq!(color_bucket("white"), 15);
        assert_eq!(color_bucket("#fff"), 15);
        // unparseable defaults to black
        assert_eq!(color_bucket("chartreuse-ish"), 0);
    }

    #[test]
    fn test_img_only_generated_names() {
        assert_eq!(
            markup(r#"<img src="17.jpg">"#),
            r##"<image l:href="#17.jpg"/>"##
        );
        assert_eq!(markup(r#"<img src="4.jpeg">"#), r##"<image l:href="#4.jpeg"/>"##);
        assert_eq!(markup(r#"<img src="http://x/y.png">"#), "");
        assert_eq!(markup(r#"<img src="a4.jpg">"#), "");
        assert_eq!(markup("<img>"), "");
    }

    #[test]
    fn test_separator_and_breaks() {
        assert_eq!(markup("<hr>"), "<subtitle>* * *</subtitle>");
        assert_eq!(markup("a<br>b"), "a<empty-line/>b");
        assert_eq!(
            markup("<ul><li>one</li></ul>"),
            "<empty-line/><empty-line/>one<empty-line/>"
        );
    }

    #[test]
    fn test_passthrough_tags_lose_attributes() {
        assert_eq!(
            markup(r#"<p class="lead" id="x">t</p>"#),
            "<p>t</p>"
        );
        assert_eq!(
            markup(r#"<table border="1"><tr><td>c</td></tr></table>"#),
            "<table><tr><td>c</td></tr></table>"
        );
    }

    #[test]
    fn test_unsupported_tag_children_survive() {
        assert_eq!(
            markup("<blockquote>quoted <i>text</i></blockquote>"),
            "quoted <style name=\"i\">text</style>"
        );
    }

    #[test]
    fn test_degenerate_pairs_removed() {
        assert_eq!(markup("<b></b>after"), "after");
        // nested empties collapse through repeated application
        assert_eq!(markup("<b><i></i></b>x"), "x");
        // whitespace between the pair does not keep it alive
        assert_eq!(markup("<b>  </b>x"), "x");
    }

    #[test]
    fn test_remove_degenerate_pairs_fixed_point() {
        let mut tokens = vec![
            Token::open("b"),
            Token::open("i"),
            Token::open("u"),
            Token::close("u"),
            Token::close("i"),
            Token::close("b"),
        ];
        remove_degenerate_pairs(&mut tokens);
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_self_close_is_not_degenerate() {
        let mut tokens = vec![Token::self_close("p"), Token::close("p")];
        remove_degenerate_pairs(&mut tokens);
        assert_eq!(tokens.len(), 2);
    }

    fn assert_balanced(markup: &str) {
        let opens = markup.matches("<style name=").count();
        let closes = markup.matches("</style>").count();
        assert_eq!(opens, closes, "unbalanced markers in {markup}");
    }

    #[test]
    fn test_unclosed_styles_are_drained() {
        let result = markup("<b>bold <i>both");
        assert_eq!(
            result,
            "<style name=\"b\">bold <style name=\"i\">both</style></style>"
        );
        assert_balanced(&result);
    }

    #[test]
    fn test_stray_close_emits_nothing() {
        let result = markup("plain</b> text");
        assert_eq!(result, "plain text");
        assert_balanced(&result);
    }

    #[test]
    fn test_crossing_tags_unwind_lifo() {
        // <b><i></b></i> — closing b unwinds i first, the stray </i> is dropped
        let result = markup("<b>x<i>y</b>z</i>");
        assert_eq!(
            result,
            "<style name=\"b\">x<style name=\"i\">y</style></style>z"
        );
        assert_balanced(&result);
    }

    #[test]
    fn test_unbalanced_font_size_three_stays_balanced() {
        // size 3 opens nothing; its close must not underflow anything
        let result = markup(r#"<b>a<font size="3">b</font>c</b>"#);
        assert_eq!(result, "<style name=\"b\">abc</style>");
        assert_balanced(&result);
    }

    #[test]
    fn test_style_names_cover_colors() {
        let names = style_names();
        assert!(names.contains(&"col0".to_string()));
        assert!(names.contains(&"colf".to_string()));
        assert!(names.contains(&"sc".to_string()));
        assert_eq!(names.len(), 26);
    }

    #[test]
    fn test_style_rules() {
        assert_eq!(style_rule("s"), ".s {text-decoration: line-through;}");
        assert_eq!(style_rule("col0"), ".col0 {color: #000000;}");
        assert_eq!(style_rule("colf"), ".colf {color: #ffffff;}");
    }
}
