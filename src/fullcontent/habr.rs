//! Habr article extraction.
//!
//! Fetches the mobile page variant and slices the article container out of
//! the token stream; comments are appended after a separator, with the
//! speaker label of each comment reformatted to an italicized arrow line.

use std::sync::LazyLock;

use regex::Regex;

use crate::fullcontent::SiteExtractor;
use crate::tokenizer::{tag_content, tokenize, tokens_to_html, TagKind, Token};

static HABR_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(https?://)?(www\.)?(m\.)?(habra)?habr\.ru/((blogs/\w+)|(linker/go)|(company/\w+/blog)|(post))/(?P<num>\d+)/?$",
    )
    .expect("valid regex")
});

pub struct HabrExtractor;

impl SiteExtractor for HabrExtractor {
    fn matches(&self, url: &str) -> bool {
        HABR_URL.is_match(url)
    }

    fn canonicalize(&self, url: &str) -> String {
        HABR_URL.replace(url, "http://m.habr.ru/post/$num/").into_owned()
    }

    fn extract(&self, html: &str) -> Option<String> {
        let tokens = tokenize(html);

        let article = tag_content(&tokens, "div", Some(("class", "txt")))?;
        let mut result: Vec<Token> = article.to_vec();

        if let Some(comments) = tag_content(&tokens, "div", Some(("class", "cmts"))) {
            result.push(Token::self_close("hr"));
            result.extend(reformat_comments(comments));
        }

        if result.is_empty() {
            return None;
        }
        Some(tokens_to_html(&result))
    }
}

/// Replace each speaker-label block (`div class="m"` wrapping one text
/// token) with `-> {name}` in italics and a line break. The name is
/// whatever precedes the first comma of the label.
fn reformat_comments(tokens: &[Token]) -> Vec<Token> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let is_label = i + 2 < tokens.len()
            && tokens[i].is_open_with("div", "class", "m")
            && matches!(&tokens[i + 1], Token::Text(_))
            && matches!(&tokens[i + 2], Token::Tag { name, kind: TagKind::Close, .. } if name == "div");

        if is_label {
            if let Token::Text(label) = &tokens[i + 1] {
                let speaker = label.split(',').next().unwrap_or(label.as_str()).trim();
                out.push(Token::open("i"));
                out.push(Token::text(format!("-> {speaker}")));
                out.push(Token::close("i"));
                out.push(Token::self_close("br"));
            }
            i += 3;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    out
}
