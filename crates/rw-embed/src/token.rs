//! Token model shared by the lexer, resolver and splicer.
//!
//! Tokens are value objects: the splicer copies, slices and concatenates them
//! but never edits a token produced by the lexer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

/// Token discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Paragraph,
    Heading,
    Blockquote,
    Code,
    Html,
    List,
    ListItem,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Hr,
    Text,
    Codespan,
    Em,
    Strong,
    Del,
    Link,
    Image,
    Br,
    Other,
}

/// A lexical unit of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Token kind.
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Source text the token was produced from.
    pub raw: String,
    /// Plain text content (code body for code blocks, markup for html).
    pub text: String,
    /// Link or image target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Link or image title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Fenced code info string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Heading level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,
    /// Nested tokens for container kinds.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<Token>,
}

impl Token {
    /// Create an empty token of the given kind.
    #[must_use]
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            raw: String::new(),
            text: String::new(),
            href: None,
            title: None,
            lang: None,
            depth: None,
            tokens: Vec::new(),
        }
    }

    /// Create a standalone html token whose raw and text are both `html`.
    #[must_use]
    pub fn html(html: impl Into<String>) -> Self {
        let html = html.into();
        Self {
            raw: html.clone(),
            text: html,
            ..Self::new(TokenKind::Html)
        }
    }
}

/// A link reference definition (`[label]: href "title"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkDef {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Link reference definitions of one parsed document, keyed by label.
pub type LinkTable = BTreeMap<String, LinkDef>;

/// A token sequence together with its link table.
///
/// Cloning copies the token vector but shares the link table allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenList {
    pub tokens: Vec<Token>,
    pub links: Arc<LinkTable>,
}

impl TokenList {
    /// Create a token list with an empty link table.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            links: Arc::default(),
        }
    }

    /// Create a token list with the given link table.
    #[must_use]
    pub fn with_links(tokens: Vec<Token>, links: LinkTable) -> Self {
        Self {
            tokens,
            links: Arc::new(links),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_token() {
        let token = Token::html("<b>hi</b>");
        assert_eq!(token.kind, TokenKind::Html);
        assert_eq!(token.raw, "<b>hi</b>");
        assert_eq!(token.text, "<b>hi</b>");
        assert!(token.tokens.is_empty());
    }

    #[test]
    fn test_clone_shares_link_table() {
        let mut links = LinkTable::new();
        links.insert(
            "docs".to_owned(),
            LinkDef {
                href: "https://example.com".to_owned(),
                title: None,
            },
        );
        let list = TokenList::with_links(vec![Token::html("x")], links);
        let copy = list.clone();

        assert!(Arc::ptr_eq(&list.links, &copy.links));
        assert_eq!(copy.tokens, list.tokens);
    }

    #[test]
    fn test_serialize_uses_type_field() {
        let mut link = Token::new(TokenKind::Link);
        link.href = Some("a.md".to_owned());
        let json = serde_json::to_value(&link).unwrap();

        assert_eq!(json["type"], "link");
        assert_eq!(json["href"], "a.md");
        assert!(json.get("title").is_none());
        assert!(json.get("tokens").is_none());
    }
}
