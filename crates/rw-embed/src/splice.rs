//! Whole-document embed expansion.
//!
//! [`EmbedRenderer::prerender`] lexes a document, collects embed directives
//! from the links directly under each top-level token, resolves them and
//! splices the resulting runs back in. Runs land immediately after their host
//! token, and several runs for one host keep document order, no matter in
//! which order the fetches complete.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::{DocumentCache, DocumentStore};
use crate::classify::Classifier;
use crate::resolver::{EmbedDirective, EmbedResolver, ResolvedEmbed};
use crate::token::{LinkTable, Token, TokenKind, TokenList};

/// A run of tokens already spliced into the document.
///
/// `start` is in original coordinates: the host's index plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub start: usize,
    pub length: usize,
    pub ordinal: usize,
}

/// Current insertion point for a run hosted by original token `index`.
///
/// Every applied run that sits before the slot shifts it: runs of earlier
/// hosts, and runs of the same host that come earlier in document order.
#[must_use]
pub fn insertion_point(records: &[MoveRecord], index: usize, ordinal: usize) -> usize {
    let slot = index + 1;
    let shift: usize = records
        .iter()
        .filter(|r| r.start < slot || (r.start == slot && r.ordinal < ordinal))
        .map(|r| r.length)
        .sum();
    slot + shift
}

/// Applies resolved embeds to a token list one at a time.
#[derive(Debug)]
pub struct Splicer {
    tokens: Vec<Token>,
    links: Arc<LinkTable>,
    records: Vec<MoveRecord>,
}

impl Splicer {
    #[must_use]
    pub fn new(list: TokenList) -> Self {
        Self {
            tokens: list.tokens,
            links: list.links,
            records: Vec::new(),
        }
    }

    /// Splice one result in. Results without tokens leave the document as is.
    pub fn apply(&mut self, resolved: ResolvedEmbed) {
        let Some(embedded) = resolved.tokens else {
            return;
        };
        let EmbedDirective { index, ordinal, .. } = resolved.directive;

        if !embedded.links.is_empty() {
            let links = Arc::make_mut(&mut self.links);
            for (label, def) in embedded.links.as_ref() {
                links.insert(label.clone(), def.clone());
            }
        }

        let at = insertion_point(&self.records, index, ordinal).min(self.tokens.len());
        let length = embedded.tokens.len();
        self.tokens.splice(at..at, embedded.tokens);
        self.records.push(MoveRecord {
            start: index + 1,
            length,
            ordinal,
        });
    }

    /// Runs applied so far.
    #[must_use]
    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    #[must_use]
    pub fn finish(self) -> TokenList {
        TokenList {
            tokens: self.tokens,
            links: self.links,
        }
    }
}

/// Expands embed directives in markdown documents.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rw_embed::{EmbedRenderer, EmbedResolver, FsFetcher, NullStore, TokenKind};
///
/// let renderer = EmbedRenderer::new(EmbedResolver::new(Arc::new(FsFetcher::new("docs"))))
///     .with_store(Arc::new(NullStore));
///
/// let list = renderer.prerender("# Title\n\nPlain [link](other.md).\n");
/// assert_eq!(list.tokens[0].kind, TokenKind::Heading);
/// assert_eq!(list.len(), 2);
/// ```
#[derive(Clone)]
pub struct EmbedRenderer {
    resolver: EmbedResolver,
    classifier: Classifier,
    store: Arc<dyn DocumentStore>,
}

impl EmbedRenderer {
    /// Create a renderer backed by the process-wide [`DocumentCache`].
    #[must_use]
    pub fn new(resolver: EmbedResolver) -> Self {
        Self {
            resolver,
            classifier: Classifier::new(),
            store: DocumentCache::global(),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = store;
        self
    }

    /// Lex `raw` and expand every embed it contains.
    ///
    /// Results are memoized by exact text, so repeated calls for the same
    /// document fetch nothing. A document is only memoized once every
    /// directive has reported.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the [`Lexer`](crate::Lexer) or
    /// [`Fetch`](crate::Fetch) implementation; nothing is cached then.
    pub fn prerender(&self, raw: &str) -> TokenList {
        if let Some(cached) = self.store.get(raw) {
            tracing::debug!(bytes = raw.len(), "Embed cache hit");
            return cached;
        }

        let start = Instant::now();
        let lexed = self.resolver.lexer().lex(raw);
        let directives = self.collect_directives(&lexed.tokens);

        if directives.is_empty() {
            self.store.insert(raw, lexed.clone());
            return lexed;
        }

        let total = directives.len();
        let mut splicer = Splicer::new(lexed);
        let mut resolution = self.resolver.resolve(directives);
        for resolved in resolution.by_ref() {
            splicer.apply(resolved);
        }
        let missing = resolution.remaining();
        tracing::debug!(
            directives = total,
            embedded = splicer.records().len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Resolved embeds"
        );

        let result = splicer.finish();
        if missing == 0 {
            self.store.insert(raw, result.clone());
        } else {
            tracing::warn!(missing, "Embed results lost, not caching document");
        }
        result
    }

    /// Embeds among the direct children of each top-level token, in document order.
    fn collect_directives(&self, tokens: &[Token]) -> Vec<EmbedDirective> {
        tokens
            .iter()
            .enumerate()
            .flat_map(|(index, token)| {
                token
                    .tokens
                    .iter()
                    .filter(|child| child.kind == TokenKind::Link)
                    .filter_map(move |link| {
                        let href = link.href.as_deref().unwrap_or_default();
                        let title = link.title.as_deref().unwrap_or_default();
                        self.classifier.classify(href, title).map(|embed| (index, embed))
                    })
            })
            .enumerate()
            .map(|(ordinal, (index, embed))| EmbedDirective {
                index,
                ordinal,
                embed,
            })
            .collect()
    }
}
