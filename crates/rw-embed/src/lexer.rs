//! Markdown lexing into [`Token`] trees.
//!
//! The [`Lexer`] trait is the seam the splicer and resolver lex through.
//! [`MarkdownLexer`] is the default implementation over `pulldown-cmark`.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::token::{LinkDef, LinkTable, Token, TokenKind, TokenList};
use crate::util::heading_level_to_num;

/// Turns markdown text into a token sequence with its link table.
///
/// Implementations must be deterministic: lexing the same text twice yields
/// equal token lists.
pub trait Lexer: Send + Sync {
    fn lex(&self, text: &str) -> TokenList;
}

/// `pulldown-cmark` backed lexer.
///
/// Produces block-level tokens at the top level with inline tokens nested
/// underneath, and a link table built from the reference definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownLexer;

impl MarkdownLexer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn parser_options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_GFM
    }
}

impl Lexer for MarkdownLexer {
    fn lex(&self, text: &str) -> TokenList {
        let parser = Parser::new_ext(text, Self::parser_options());

        let links: LinkTable = parser
            .reference_definitions()
            .iter()
            .map(|(label, def)| {
                (
                    label.to_owned(),
                    LinkDef {
                        href: def.dest.to_string(),
                        title: def.title.as_ref().map(ToString::to_string),
                    },
                )
            })
            .collect();

        let mut builder = TreeBuilder::new(text);
        for (event, range) in parser.into_offset_iter() {
            builder.event(event, range);
        }

        TokenList::with_links(builder.finish(), links)
    }
}

/// Assembles a token tree from a flat event stream.
struct TreeBuilder<'a> {
    source: &'a str,
    /// Open container tokens, innermost last.
    stack: Vec<Token>,
    /// Finished top-level tokens.
    root: Vec<Token>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    fn raw(&self, range: Range<usize>) -> String {
        self.source.get(range).unwrap_or_default().to_owned()
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => {
                let token = self.start_token(tag, range);
                self.stack.push(token);
            }
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text, range),
            Event::Code(code) => {
                let mut token = self.leaf(TokenKind::Codespan, range);
                token.text = code.to_string();
                self.attach(token);
            }
            Event::Html(html) => {
                if self.in_leaf_block() {
                    self.push_text(&html);
                } else {
                    let mut token = self.leaf(TokenKind::Html, range);
                    token.text = html.to_string();
                    self.attach(token);
                }
            }
            Event::InlineHtml(html) => {
                let mut token = self.leaf(TokenKind::Html, range);
                token.text = html.to_string();
                self.attach(token);
            }
            Event::SoftBreak => self.text("\n", range),
            Event::HardBreak => {
                let token = self.leaf(TokenKind::Br, range);
                self.attach(token);
            }
            Event::Rule => {
                let token = self.leaf(TokenKind::Hr, range);
                self.attach(token);
            }
            Event::TaskListMarker(_)
            | Event::FootnoteReference(_)
            | Event::InlineMath(_)
            | Event::DisplayMath(_) => {
                let token = self.leaf(TokenKind::Other, range);
                self.attach(token);
            }
        }
    }

    fn leaf(&self, kind: TokenKind, range: Range<usize>) -> Token {
        Token {
            raw: self.raw(range),
            ..Token::new(kind)
        }
    }

    fn start_token(&self, tag: Tag<'_>, range: Range<usize>) -> Token {
        let mut token = match tag {
            Tag::Paragraph => Token::new(TokenKind::Paragraph),
            Tag::Heading { level, .. } => Token {
                depth: Some(heading_level_to_num(level)),
                ..Token::new(TokenKind::Heading)
            },
            Tag::BlockQuote(_) => Token::new(TokenKind::Blockquote),
            Tag::CodeBlock(kind) => Token {
                lang: match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => Some(info.to_string()),
                    _ => None,
                },
                ..Token::new(TokenKind::Code)
            },
            Tag::HtmlBlock => Token::new(TokenKind::Html),
            Tag::List(_) => Token::new(TokenKind::List),
            Tag::Item => Token::new(TokenKind::ListItem),
            Tag::Table(_) => Token::new(TokenKind::Table),
            Tag::TableHead => Token::new(TokenKind::TableHead),
            Tag::TableRow => Token::new(TokenKind::TableRow),
            Tag::TableCell => Token::new(TokenKind::TableCell),
            Tag::Emphasis => Token::new(TokenKind::Em),
            Tag::Strong => Token::new(TokenKind::Strong),
            Tag::Strikethrough => Token::new(TokenKind::Del),
            Tag::Link {
                dest_url, title, ..
            } => Token {
                href: Some(dest_url.to_string()),
                title: Some(title.to_string()),
                ..Token::new(TokenKind::Link)
            },
            Tag::Image {
                dest_url, title, ..
            } => Token {
                href: Some(dest_url.to_string()),
                title: Some(title.to_string()),
                ..Token::new(TokenKind::Image)
            },
            _ => Token::new(TokenKind::Other),
        };
        token.raw = self.raw(range);
        token
    }

    fn end(&mut self, tag: TagEnd) {
        let Some(mut token) = self.stack.pop() else {
            return;
        };
        if matches!(tag, TagEnd::CodeBlock) && token.text.ends_with('\n') {
            token.text.pop();
        }
        self.attach(token);
    }

    /// Code and html blocks keep their content as text, not child tokens.
    fn in_leaf_block(&self) -> bool {
        self.stack
            .last()
            .is_some_and(|top| matches!(top.kind, TokenKind::Code | TokenKind::Html))
    }

    fn text(&mut self, text: &str, range: Range<usize>) {
        if self.in_leaf_block() {
            self.push_text(text);
            return;
        }
        let mut token = self.leaf(TokenKind::Text, range);
        token.text = text.to_owned();
        self.attach(token);
    }

    fn push_text(&mut self, text: &str) {
        if let Some(top) = self.stack.last_mut() {
            top.text.push_str(text);
        }
    }

    fn attach(&mut self, token: Token) {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.text.push_str(&token.text);
                parent.tokens.push(token);
            }
            None => self.root.push(token),
        }
    }

    fn finish(mut self) -> Vec<Token> {
        // Unbalanced streams should not happen, but never drop content.
        while let Some(token) = self.stack.pop() {
            self.attach(token);
        }
        self.root
    }
}
