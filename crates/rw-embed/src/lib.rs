//! Embed directive resolution for markdown token streams.
//!
//! Links carrying an `:include` directive in their title pull external
//! content into the document: markdown pages, code files (whole, a line
//! range or a named fragment), mermaid diagrams and raw HTML or media
//! markup. This crate finds those links, fetches their targets concurrently
//! and splices the lexed content in right after the link's block.
//!
//! # Architecture
//!
//! - [`parse_directives`]: `:key[=value]` options out of a link title
//! - [`Classifier`]: decides whether a link is an embed and of which kind
//! - [`EmbedResolver`]: fetches and transforms embeds on a thread pool
//! - [`EmbedRenderer`]: whole-document orchestration with a [`DocumentStore`] memo
//!
//! Content is pulled through the [`Fetch`] trait ([`HttpFetcher`], [`FsFetcher`],
//! or [`MockFetcher`] behind the `mock` feature) and lexed through [`Lexer`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rw_embed::{EmbedRenderer, EmbedResolver, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new().origin("https://docs.example.com");
//! let renderer = EmbedRenderer::new(EmbedResolver::new(Arc::new(fetcher)));
//!
//! let tokens = renderer.prerender("[setup](setup.md ':include')\n");
//! ```

mod cache;
mod classify;
mod consts;
mod directive;
mod fetch;
mod front_matter;
mod lexer;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod resolver;
mod splice;
mod token;
mod util;

pub use cache::{DocumentCache, DocumentStore, NullStore};
pub use classify::{Classifier, EmbedKind, EmbedSpec, LineRange};
pub use directive::{Directives, OptionValue, parse_directives};
pub use fetch::{Fetch, FetchError, FsFetcher, HttpFetcher};
pub use front_matter::{FrontMatter, YamlFrontMatter};
pub use lexer::{Lexer, MarkdownLexer};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockFetcher;
pub use resolver::{
    EmbedDirective, EmbedResolver, Fragment, Resolution, ResolvedEmbed, extract_fragment,
    extract_lines, rewrite_relative_links,
};
pub use splice::{EmbedRenderer, MoveRecord, Splicer, insertion_point};
pub use token::{LinkDef, LinkTable, Token, TokenKind, TokenList};
pub use util::{QUOTE_MARK, escape_backticks, strip_indent, unescape_backticks};
