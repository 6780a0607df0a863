//! Generic readability-style content extraction.
//!
//! Used when no site-specific extractor claims a URL. Walks the token
//! stream once with a stack of candidate containers, scoring each by tag
//! kind, class/id hints, text mass and comma count, then discounting by
//! link density. The best-scoring container's content is returned; a page
//! with no plausible container yields nothing.

use std::sync::LazyLock;

use regex::Regex;

use crate::tokenizer::{tokenize, tokens_to_html, TagKind, Token};

static RE_POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|main|page|post|text|blog|story")
        .expect("valid regex")
});

static RE_NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)banner|combx|comment|contact|foot|masthead|media|meta|promo|related|scroll|shoutbox|sidebar|sponsor|shopping|tags|tool|widget|nav|menu|share|social|ad-",
    )
    .expect("valid regex")
});

/// Candidate container currently open.
struct Frame {
    name: String,
    start: usize,
    base_score: f64,
    text_len: usize,
    link_text_len: usize,
    commas: usize,
}

/// A closed candidate with its final score and token range.
struct Candidate {
    start: usize,
    end: usize,
    score: f64,
    text_len: usize,
}

#[derive(Default)]
pub struct GenericExtractor;

/// Containers worth scoring.
fn base_score(name: &str) -> Option<f64> {
    match name {
        "article" | "main" => Some(30.0),
        "section" => Some(15.0),
        "div" => Some(5.0),
        "td" | "blockquote" => Some(3.0),
        _ => None,
    }
}

fn hint_score(token: &Token) -> f64 {
    let mut score = 0.0;
    for key in ["class", "id"] {
        if let Some(value) = token.param(key) {
            if RE_POSITIVE.is_match(value) {
                score += 25.0;
            }
            if RE_NEGATIVE.is_match(value) {
                score -= 25.0;
            }
        }
    }
    score
}

/// Minimum amount of text a container must hold to count as an article.
const MIN_TEXT_LEN: usize = 140;

impl GenericExtractor {
    pub fn extract(&self, html: &str) -> Option<String> {
        let tokens = tokenize(html);
        let best = best_candidate(&tokens)?;
        Some(tokens_to_html(&tokens[best.start..best.end]))
    }
}

fn best_candidate(tokens: &[Token]) -> Option<Candidate> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut link_depth = 0usize;

    let finalize = |frame: Frame, end: usize, candidates: &mut Vec<Candidate>| {
        let text_len = frame.text_len;
        let link_ratio = if text_len > 0 {
            frame.link_text_len as f64 / text_len as f64
        } else {
            1.0
        };
        let mass = ((text_len / 100) as f64).min(3.0);
        let score = (frame.base_score + frame.commas as f64 + mass * 5.0) * (1.0 - link_ratio);
        candidates.push(Candidate {
            start: frame.start,
            end,
            score,
            text_len,
        });
    };

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Text(text) => {
                let len = text.trim().len();
                if len == 0 {
                    continue;
                }
                if let Some(frame) = stack.last_mut() {
                    frame.text_len += len;
                    frame.commas += text.matches(',').count();
                    if link_depth > 0 {
                        frame.link_text_len += len;
                    }
                }
            }
            Token::Tag { name, kind, .. } => match kind {
                TagKind::Open => {
                    if name == "a" {
                        link_depth += 1;
                    }
                    if let Some(base) = base_score(name) {
                        stack.push(Frame {
                            name: name.clone(),
                            start: index + 1,
                            base_score: base + hint_score(token),
                            text_len: 0,
                            link_text_len: 0,
                            commas: 0,
                        });
                    }
                }
                TagKind::Close => {
                    if name == "a" {
                        link_depth = link_depth.saturating_sub(1);
                    }
                    if stack.iter().any(|f| &f.name == name) {
                        while let Some(frame) = stack.pop() {
                            let done = &frame.name == name;
                            // text mass flows into the enclosing candidate
                            if let Some(parent) = stack.last_mut() {
                                parent.text_len += frame.text_len;
                                parent.link_text_len += frame.link_text_len;
                                parent.commas += frame.commas;
                            }
                            finalize(frame, index, &mut candidates);
                            if done {
                                break;
                            }
                        }
                    }
                }
                TagKind::SelfClose => {}
            },
        }
    }

    // unclosed containers still count, ending at the stream end
    while let Some(frame) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.text_len += frame.text_len;
            parent.link_text_len += frame.link_text_len;
            parent.commas += frame.commas;
        }
        finalize(frame, tokens.len(), &mut candidates);
    }

    candidates
        .into_iter()
        .filter(|c| c.text_len >= MIN_TEXT_LEN && c.score > 0.0)
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_page() -> String {
        let body = "A sentence with words, commas, and a reasonable length to it. ".repeat(8);
        format!(
            r#"<html><body>
            <nav class="nav"><a href="/">home</a><a href="/about">about</a></nav>
            <div class="content"><p>{body}</p></div>
            <div class="sidebar"><a href="/x">link</a><a href="/y">other link</a></div>
            </body></html>"#
        )
    }

    #[test]
    fn test_extracts_main_container() {
        let content = GenericExtractor.extract(&article_page()).unwrap();
        assert!(content.contains("A sentence with words"));
        assert!(!content.contains("about"));
    }

    #[test]
    fn test_prefers_semantic_article_tag() {
        let long = "Plenty of plain readable text, with commas, again and again. ".repeat(8);
        let page = format!(
            r#"<div><a href="/">x</a></div><article><p>{long}</p></article>"#
        );
        let content = GenericExtractor.extract(&page).unwrap();
        assert!(content.contains("Plenty of plain readable text"));
    }

    #[test]
    fn test_link_farm_yields_nothing() {
        let links = r#"<a href="/1">one</a><a href="/2">two</a>"#.repeat(30);
        let page = format!(r#"<div class="links">{links}</div>"#);
        assert!(GenericExtractor.extract(&page).is_none());
    }

    #[test]
    fn test_short_page_yields_nothing() {
        assert!(GenericExtractor
            .extract("<div><p>too short</p></div>")
            .is_none());
    }
}
