//! Front-matter extraction from markdown documents.
//!
//! A document carries front matter when its block tokens start with a horizontal rule,
//! followed by a paragraph of `key: value` lines, followed by a closing horizontal rule.
//! One blank-line token is tolerated on either side of the paragraph:
//!
//! ```text
//! ---
//! slug: getting-started
//! title: Getting started
//! lang: en
//! ---
//! # Body starts here
//! ```
//!
//! Tokenization is delegated to `pulldown-cmark`. CommonMark reads a paragraph directly
//! followed by `---` as a setext heading, so such headings are split back into a
//! paragraph token and a rule token before the front-matter check runs.

use std::collections::BTreeMap;
use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Rule,
    Space,
    Paragraph,
    Heading,
    Code,
    Other,
}

/// A top-level block of the document with its raw source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub raw: &'a str,
    pub range: Range<usize>,
}

impl<'a> Token<'a> {
    fn new(text: &'a str, kind: TokenKind, range: Range<usize>) -> Self {
        Self {
            kind,
            raw: &text[range.clone()],
            range,
        }
    }
}

/// Metadata fields from a document's front-matter block. Later duplicate keys win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter(BTreeMap<String, String>);

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get), treating an empty value as absent.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FrontMatter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Front matter and body of one document.
///
/// `body` is `Some` exactly when a front-matter block was recognized; it may be empty.
/// A document without front matter must not be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument<'a> {
    pub front_matter: FrontMatter,
    pub body: Option<&'a str>,
}

impl ParsedDocument<'_> {
    pub fn has_front_matter(&self) -> bool {
        self.body.is_some()
    }
}

/// Splits a document into top-level block tokens, inserting `Space` tokens for blank-line gaps.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut blocks: Vec<(TokenKind, Range<usize>)> = Vec::new();
    let mut depth = 0usize;

    for (event, range) in Parser::new_ext(text, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    blocks.push((kind_of(&tag), range));
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Rule if depth == 0 => blocks.push((TokenKind::Rule, range)),
            _ => {}
        }
    }

    let mut tokens = Vec::with_capacity(blocks.len());
    let mut prev_end: Option<usize> = None;
    for (kind, range) in blocks {
        if let Some(end) = prev_end {
            if has_blank_line(text, end, range.start) {
                tokens.push(Token::new(text, TokenKind::Space, end..range.start));
            }
        }
        prev_end = Some(range.end);

        if kind == TokenKind::Heading {
            if let Some((paragraph, rule)) = split_setext_rule(text, range.clone()) {
                tokens.push(Token::new(text, TokenKind::Paragraph, paragraph));
                tokens.push(Token::new(text, TokenKind::Rule, rule));
                continue;
            }
        }
        tokens.push(Token::new(text, kind, range));
    }
    tokens
}

/// Extracts front matter and body from a raw document.
pub fn parse(text: &str) -> ParsedDocument<'_> {
    let tokens = tokenize(text);
    let Some((block, closing)) = find_front_matter(&tokens) else {
        debug!(tokens = tokens.len(), "No front-matter block recognized");
        return ParsedDocument {
            front_matter: FrontMatter::new(),
            body: None,
        };
    };

    let front_matter = parse_pairs(block.raw);
    let rest = &text[closing.range.end..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    debug!(fields = front_matter.len(), body_len = body.len(), "Parsed front matter");
    ParsedDocument {
        front_matter,
        body: Some(body),
    }
}

/// Splits each non-empty line at its first colon into a trimmed key and value.
fn parse_pairs(raw: &str) -> FrontMatter {
    raw.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn find_front_matter<'t, 'a>(tokens: &'t [Token<'a>]) -> Option<(&'t Token<'a>, &'t Token<'a>)> {
    if tokens.first()?.kind != TokenKind::Rule {
        return None;
    }
    let mut idx = 1;
    if tokens.get(idx)?.kind == TokenKind::Space {
        idx += 1;
    }
    let block = tokens.get(idx)?;
    if block.kind != TokenKind::Paragraph {
        return None;
    }
    idx += 1;
    if tokens.get(idx)?.kind == TokenKind::Space {
        idx += 1;
    }
    let closing = tokens.get(idx)?;
    (closing.kind == TokenKind::Rule).then_some((block, closing))
}

fn kind_of(tag: &Tag<'_>) -> TokenKind {
    match tag {
        Tag::Paragraph => TokenKind::Paragraph,
        Tag::Heading { .. } => TokenKind::Heading,
        Tag::CodeBlock(_) => TokenKind::Code,
        _ => TokenKind::Other,
    }
}

fn has_blank_line(text: &str, prev_end: usize, next_start: usize) -> bool {
    if prev_end >= next_start {
        return false;
    }
    let breaks = text[prev_end..next_start].matches('\n').count()
        + usize::from(text[..prev_end].ends_with('\n'));
    breaks >= 2
}

/// For a setext heading underlined with hyphens, returns the ranges of its text and its underline.
fn split_setext_rule(text: &str, range: Range<usize>) -> Option<(Range<usize>, Range<usize>)> {
    let raw = &text[range.clone()];
    let trimmed = raw.trim_end_matches(['\n', '\r']);
    let underline_start = trimmed.rfind('\n')? + 1;
    let underline = trimmed[underline_start..].trim();
    if underline.is_empty() || !underline.chars().all(|c| c == '-') {
        return None;
    }
    let split = range.start + underline_start;
    Some((range.start..split, split..range.end))
}
