//! HTML tokenization.
//!
//! A thin layer over the html5ever tokenizer producing the flat token
//! stream the rest of the pipeline consumes: text, open tags, close tags
//! and self-closing tags, each tag with an ordered parameter list. Comments,
//! doctypes and the contents of `script`/`style` elements are discarded
//! here, entities are decoded by the tokenizer itself.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind as HtmlTagKind, Token as HtmlToken, TokenSink, TokenSinkResult,
    Tokenizer, TokenizerOpts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClose,
}

/// One parsed piece of markup. Owned exclusively by whichever processing
/// step is examining it; produced once, never re-parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Tag {
        name: String,
        kind: TagKind,
        params: Vec<(String, String)>,
    },
}

impl Token {
    pub fn text(content: impl Into<String>) -> Self {
        Token::Text(content.into())
    }

    pub fn open(name: impl Into<String>) -> Self {
        Token::Tag {
            name: name.into(),
            kind: TagKind::Open,
            params: Vec::new(),
        }
    }

    pub fn close(name: impl Into<String>) -> Self {
        Token::Tag {
            name: name.into(),
            kind: TagKind::Close,
            params: Vec::new(),
        }
    }

    pub fn self_close(name: impl Into<String>) -> Self {
        Token::Tag {
            name: name.into(),
            kind: TagKind::SelfClose,
            params: Vec::new(),
        }
    }

    pub fn with_param(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            Token::Tag {
                name,
                kind,
                mut params,
            } => {
                params.push((key.into(), value.into()));
                Token::Tag { name, kind, params }
            }
            text => text,
        }
    }

    /// Parameter value by name, if this is a tag that carries it.
    pub fn param(&self, key: &str) -> Option<&str> {
        match self {
            Token::Tag { params, .. } => params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            Token::Text(_) => None,
        }
    }

    /// True for an open tag with the given name whose parameter `key`
    /// equals `value`.
    pub fn is_open_with(&self, tag_name: &str, key: &str, value: &str) -> bool {
        matches!(self, Token::Tag { name, kind: TagKind::Open, .. } if name == tag_name)
            && self.param(key) == Some(value)
    }
}

/// Collects html5ever tokens into the crate's own token type.
struct TokenCollector {
    tokens: Vec<Token>,
    /// Name of the raw-text element we are currently discarding, if any.
    skipping: Option<String>,
}

impl TokenSink for TokenCollector {
    type Handle = ();

    fn process_token(&mut self, token: HtmlToken, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            HtmlToken::TagToken(tag) => {
                let name = tag.name.to_string();

                if let Some(skipped) = &self.skipping {
                    if tag.kind == HtmlTagKind::EndTag && &name == skipped {
                        self.skipping = None;
                    }
                    return TokenSinkResult::Continue;
                }

                let kind = match tag.kind {
                    HtmlTagKind::StartTag if tag.self_closing => TagKind::SelfClose,
                    HtmlTagKind::StartTag => TagKind::Open,
                    HtmlTagKind::EndTag => TagKind::Close,
                };

                if kind == TagKind::Open && (name == "script" || name == "style") {
                    self.skipping = Some(name.clone());
                    let raw = if name == "script" {
                        RawKind::ScriptData
                    } else {
                        RawKind::Rawtext
                    };
                    return TokenSinkResult::RawData(raw);
                }

                let params = tag
                    .attrs
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect();

                self.tokens.push(Token::Tag { name, kind, params });
            }
            HtmlToken::CharacterTokens(text) => {
                if self.skipping.is_none() {
                    // html5ever splits text at entity boundaries; keep one
                    // token per run of text so adjacency checks stay simple
                    if let Some(Token::Text(prev)) = self.tokens.last_mut() {
                        prev.push_str(&text);
                    } else {
                        self.tokens.push(Token::Text(text.to_string()));
                    }
                }
            }
            HtmlToken::NullCharacterToken
            | HtmlToken::CommentToken(_)
            | HtmlToken::DoctypeToken(_)
            | HtmlToken::EOFToken
            | HtmlToken::ParseError(_) => {}
        }
        TokenSinkResult::Continue
    }
}

/// Tokenize an HTML fragment. Single pass, never re-suspended.
pub fn tokenize(html: &str) -> Vec<Token> {
    let collector = TokenCollector {
        tokens: Vec::new(),
        skipping: None,
    };

    let mut input = BufferQueue::new();
    input.push_back(StrTendril::from(html));

    let mut tokenizer = Tokenizer::new(collector, TokenizerOpts::default());
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    tokenizer.sink.tokens
}

/// Serialize tokens back to HTML. Used by site extractors to hand their
/// filtered token slice to the downstream pipeline.
pub fn tokens_to_html(tokens: &[Token]) -> String {
    let mut html = String::new();
    for token in tokens {
        match token {
            Token::Text(text) => html.push_str(&html_escape::encode_text(text)),
            Token::Tag { name, kind, params } => match kind {
                TagKind::Close => {
                    html.push_str("</");
                    html.push_str(name);
                    html.push('>');
                }
                TagKind::Open | TagKind::SelfClose => {
                    html.push('<');
                    html.push_str(name);
                    for (key, value) in params {
                        html.push(' ');
                        html.push_str(key);
                        html.push_str("=\"");
                        html.push_str(&html_escape::encode_double_quoted_attribute(value));
                        html.push('"');
                    }
                    if *kind == TagKind::SelfClose {
                        html.push('/');
                    }
                    html.push('>');
                }
            },
        }
    }
    html
}

/// The tokens between the first open tag matching `name` (and, when given,
/// a parameter equal to `value`) and its balancing close tag, both
/// exclusive. Balance tracking counts same-named open and close tags, so
/// arbitrarily nested content is handled. If the closing tag never comes,
/// everything after the open tag is returned.
pub fn tag_content<'a>(
    tokens: &'a [Token],
    name: &str,
    param: Option<(&str, &str)>,
) -> Option<&'a [Token]> {
    let start = tokens.iter().position(|t| match param {
        Some((key, value)) => t.is_open_with(name, key, value),
        None => matches!(t, Token::Tag { name: n, kind: TagKind::Open, .. } if n == name),
    })? + 1;

    let mut balance = 1i32;
    for (offset, token) in tokens[start..].iter().enumerate() {
        if let Token::Tag { name: n, kind, .. } = token {
            if n == name {
                match kind {
                    TagKind::Open => balance += 1,
                    TagKind::Close => balance -= 1,
                    TagKind::SelfClose => {}
                }
                if balance == 0 {
                    return Some(&tokens[start..start + offset]);
                }
            }
        }
    }
    Some(&tokens[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("<p>Hello <b>world</b></p>");
        assert_eq!(
            tokens,
            vec![
                Token::open("p"),
                Token::text("Hello "),
                Token::open("b"),
                Token::text("world"),
                Token::close("b"),
                Token::close("p"),
            ]
        );
    }

    #[test]
    fn test_tokenize_params_ordered() {
        let tokens = tokenize(r#"<img src="1.jpg" alt="x">"#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].param("src"), Some("1.jpg"));
        assert_eq!(tokens[0].param("alt"), Some("x"));
        assert_eq!(tokens[0].param("title"), None);
    }

    #[test]
    fn test_tokenize_self_closing() {
        let tokens = tokenize("<hr/><br>");
        assert_eq!(
            tokens,
            vec![Token::self_close("hr"), Token::open("br")]
        );
    }

    #[test]
    fn test_tokenize_decodes_entities() {
        let tokens = tokenize("a &amp; b");
        assert_eq!(tokens, vec![Token::text("a & b")]);
    }

    #[test]
    fn test_tokenize_drops_comments_and_scripts() {
        let tokens = tokenize("<p>x</p><!-- hidden --><script>var a = '<b>';</script><p>y</p>");
        assert_eq!(
            tokens,
            vec![
                Token::open("p"),
                Token::text("x"),
                Token::close("p"),
                Token::open("p"),
                Token::text("y"),
                Token::close("p"),
            ]
        );
    }

    #[test]
    fn test_tokenize_drops_style_content() {
        let tokens = tokenize("<style>p { color: red; }</style><u>z</u>");
        assert_eq!(
            tokens,
            vec![Token::open("u"), Token::text("z"), Token::close("u")]
        );
    }

    #[test]
    fn test_tokens_to_html_round() {
        let tokens = vec![
            Token::open("div").with_param("class", "txt"),
            Token::text("a < b"),
            Token::self_close("br"),
            Token::close("div"),
        ];
        assert_eq!(
            tokens_to_html(&tokens),
            r#"<div class="txt">a &lt; b<br/></div>"#
        );
    }

    #[test]
    fn test_tag_content_balanced() {
        let tokens = tokenize(r#"<div class="txt">a<div>b</div>c</div>tail"#);
        let inner = tag_content(&tokens, "div", Some(("class", "txt"))).unwrap();
        assert_eq!(
            inner,
            &[
                Token::text("a"),
                Token::open("div"),
                Token::text("b"),
                Token::close("div"),
                Token::text("c"),
            ]
        );
    }

    #[test]
    fn test_tag_content_missing() {
        let tokens = tokenize("<p>no container</p>");
        assert!(tag_content(&tokens, "div", Some(("class", "txt"))).is_none());
    }

    #[test]
    fn test_tag_content_unclosed_returns_rest() {
        let tokens = tokenize(r#"<div class="txt">a<b>c"#);
        let inner = tag_content(&tokens, "div", Some(("class", "txt"))).unwrap();
        assert_eq!(inner.len(), 3);
    }
}
