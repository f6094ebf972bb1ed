//! Concurrent fetch-and-transform of embed directives.
//!
//! [`EmbedResolver::resolve`] builds a rayon pool with one worker per
//! directive, so every fetch of a document starts at once and a slow fetch
//! holds up only its own document. It hands back a [`Resolution`] iterator
//! that yields results in completion order and ends once every directive
//! has reported. A panic in a task is re-raised on the consuming thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, LazyLock};
use std::thread;

use rayon::{ThreadPool, ThreadPoolBuilder};
use regex::{Captures, Regex};

use crate::classify::{EmbedKind, EmbedSpec, LineRange};
use crate::consts::{CODE_FENCE, MERMAID_CLASS};
use crate::fetch::Fetch;
use crate::front_matter::FrontMatter;
use crate::lexer::{Lexer, MarkdownLexer};
use crate::token::{Token, TokenKind, TokenList};
use crate::util::{escape_backticks, has_scheme, parent_path, strip_indent, unescape_backticks};

/// Inline markdown link: `[label](target)`.
static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]]+)\]\(([^)]+)\)").expect("markdown link pattern is valid")
});

/// An embed found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedDirective {
    /// Index of the owning top-level token in the lexed document.
    pub index: usize,
    /// Position of this directive among all directives, in document order.
    pub ordinal: usize,
    pub embed: EmbedSpec,
}

/// Outcome of resolving one directive.
#[derive(Debug, Clone)]
pub struct ResolvedEmbed {
    /// The directive, with `embed.lang` carrying any `:line=` annotation.
    pub directive: EmbedDirective,
    /// Replacement tokens, or `None` when no body could be obtained.
    pub tokens: Option<TokenList>,
}

/// What a fetch task sends back: its result, or the payload it panicked with.
type TaskOutcome = thread::Result<ResolvedEmbed>;

/// Results of one [`EmbedResolver::resolve`] call, in completion order.
///
/// # Panics
///
/// Iterating re-raises the panic of any task that panicked.
pub struct Resolution {
    receiver: Receiver<TaskOutcome>,
    remaining: usize,
    /// Keeps the workers alive until every queued task has run.
    _pool: Option<ThreadPool>,
}

impl Resolution {
    /// Number of directives that have not reported yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for Resolution {
    type Item = ResolvedEmbed;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // Every task reports, panicking ones included, so a closed channel
        // means the pool was torn down; `remaining` stays non-zero then.
        match self.receiver.recv().ok()? {
            Ok(resolved) => {
                self.remaining -= 1;
                Some(resolved)
            }
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Fetches and transforms embed bodies into token runs.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rw_embed::{EmbedDirective, EmbedResolver, FsFetcher, Classifier};
///
/// let resolver = EmbedResolver::new(Arc::new(FsFetcher::new("docs")));
/// let embed = Classifier::new().classify("missing.md", ":include").unwrap();
/// let results: Vec<_> = resolver
///     .resolve(vec![EmbedDirective { index: 0, ordinal: 0, embed }])
///     .collect();
///
/// assert_eq!(results.len(), 1);
/// assert!(results[0].tokens.is_none());
/// ```
#[derive(Clone)]
pub struct EmbedResolver {
    fetcher: Arc<dyn Fetch>,
    lexer: Arc<dyn Lexer>,
    front_matter: Option<Arc<dyn FrontMatter>>,
    origin: Option<String>,
}

impl EmbedResolver {
    /// Create a resolver using the markdown lexer.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            lexer: Arc::new(MarkdownLexer::new()),
            front_matter: None,
            origin: None,
        }
    }

    /// Lex documents and embedded content with `lexer`.
    #[must_use]
    pub fn with_lexer(mut self, lexer: Arc<dyn Lexer>) -> Self {
        self.lexer = lexer;
        self
    }

    /// Strip front matter from markdown embeds before lexing.
    #[must_use]
    pub fn with_front_matter(mut self, front_matter: Arc<dyn FrontMatter>) -> Self {
        self.front_matter = Some(front_matter);
        self
    }

    /// Origin used to absolutize relative links inside markdown embeds
    /// fetched from scheme-less URLs.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Lexer used for embedded content.
    #[must_use]
    pub fn lexer(&self) -> &Arc<dyn Lexer> {
        &self.lexer
    }

    /// Resolve all directives concurrently.
    ///
    /// Every directive produces exactly one [`ResolvedEmbed`], delivered as
    /// soon as its task completes. Each call gets its own pool with one
    /// worker per directive.
    pub fn resolve(&self, directives: Vec<EmbedDirective>) -> Resolution {
        let (sender, receiver) = mpsc::channel();
        let remaining = directives.len();

        let pool = if remaining == 0 {
            None
        } else {
            match fetch_pool(remaining) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to create fetch pool, resolving inline");
                    for directive in directives {
                        self.run_task(directive, &sender);
                    }
                    return Resolution {
                        receiver,
                        remaining,
                        _pool: None,
                    };
                }
            }
        };

        if let Some(pool) = &pool {
            for directive in directives {
                let sender = sender.clone();
                let resolver = self.clone();
                pool.spawn(move || resolver.run_task(directive, &sender));
            }
        }

        Resolution {
            receiver,
            remaining,
            _pool: pool,
        }
    }

    fn run_task(&self, directive: EmbedDirective, sender: &Sender<TaskOutcome>) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.resolve_one(directive)));
        // The receiver may already be gone if the caller stopped early.
        let _ = sender.send(outcome);
    }

    /// Resolve a single directive on the current thread.
    pub fn resolve_one(&self, mut directive: EmbedDirective) -> ResolvedEmbed {
        let body = match &directive.embed.url {
            Some(url) => self.fetcher.fetch(url),
            None => directive.embed.html.clone(),
        };

        let tokens = body
            .filter(|body| !body.is_empty())
            .map(|body| self.transform(&mut directive.embed, &body));

        tracing::debug!(
            index = directive.index,
            ordinal = directive.ordinal,
            url = directive.embed.url.as_deref().unwrap_or("<inline>"),
            tokens = tokens.as_ref().map_or(0, TokenList::len),
            "Resolved embed"
        );

        ResolvedEmbed { directive, tokens }
    }

    fn transform(&self, embed: &mut EmbedSpec, body: &str) -> TokenList {
        match embed.kind {
            EmbedKind::Markdown => self.markdown(embed.url.as_deref().unwrap_or_default(), body),
            EmbedKind::Code => self.code(embed, body),
            EmbedKind::Mermaid => TokenList::new(vec![Token::html(format!(
                "<div class=\"{MERMAID_CLASS}\">\n{body}\n</div>"
            ))]),
            EmbedKind::Html => TokenList::new(vec![Token::html(body)]),
        }
    }

    fn markdown(&self, url: &str, body: &str) -> TokenList {
        let text = rewrite_relative_links(body, &self.link_base(url));
        let text = match &self.front_matter {
            Some(hook) => hook.strip(&text),
            None => text,
        };
        self.lexer.lex(&text)
    }

    /// Directory relative links in an embed fetched from `url` resolve against.
    fn link_base(&self, url: &str) -> String {
        let dir = parent_path(url);
        if has_scheme(url) {
            return dir.to_owned();
        }
        match &self.origin {
            Some(origin) => {
                let origin = origin.trim_end_matches('/');
                if dir.is_empty() {
                    origin.to_owned()
                } else if dir.starts_with('/') {
                    format!("{origin}{dir}")
                } else {
                    format!("{origin}/{dir}")
                }
            }
            None if dir.is_empty() || dir.starts_with('/') => dir.to_owned(),
            None => format!("/{dir}"),
        }
    }

    fn code(&self, embed: &mut EmbedSpec, body: &str) -> TokenList {
        let mut lang = embed.lang.clone().unwrap_or_default();

        let text = if let Some(fragment) = &embed.fragment {
            match extract_fragment(body, fragment) {
                Some(extracted) => {
                    append_line(&mut lang, extracted.line);
                    extracted.text
                }
                None => {
                    tracing::warn!(fragment = %fragment, "Fragment not found in embed");
                    String::new()
                }
            }
        } else if let Some(range) = embed.lines {
            append_line(&mut lang, range.from);
            extract_lines(body, range)
        } else {
            body.to_owned()
        };

        if !lang.is_empty() {
            embed.lang = Some(lang.clone());
        }

        let fenced = format!(
            "{CODE_FENCE}{lang}\n{}\n{CODE_FENCE}\n",
            escape_backticks(&text)
        );
        let mut list = self.lexer.lex(&fenced);
        restore_backticks(&mut list.tokens);
        list
    }
}

fn fetch_pool(workers: usize) -> Result<ThreadPool, rayon::ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("rw-embed-fetch-{i}"))
        .build()
}

/// Rewrite `[label](./target)` to `[label](<base>/./target)`.
///
/// Links whose target does not start with `.` are left alone, as are all
/// links when `base` is empty.
#[must_use]
pub fn rewrite_relative_links(text: &str, base: &str) -> String {
    if base.is_empty() {
        return text.to_owned();
    }
    MARKDOWN_LINK_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let target = &caps[2];
            if target.starts_with('.') {
                format!("[{}]({base}/{target})", &caps[1])
            } else {
                caps[0].to_owned()
            }
        })
        .into_owned()
}

/// A named region extracted from a code file.
#[derive(Debug, PartialEq, Eq)]
pub struct Fragment {
    /// 1-based line on which the fragment body starts.
    pub line: usize,
    /// Body with common indentation and surrounding whitespace removed.
    pub text: String,
}

/// Find the region delimited by `### [name]` or `/// [name]` markers.
#[must_use]
pub fn extract_fragment(body: &str, name: &str) -> Option<Fragment> {
    let name = regex::escape(name);
    let pattern = format!(r"(?:###|///)\s*\[{name}\]([\s\S]*)(?:###|///)\s*\[{name}\]");
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(body)?;

    let start = caps.get(0)?.start();
    let line = body[..start].split('\n').count() + 1;
    let text = strip_indent(caps.get(1)?.as_str()).trim().to_owned();

    Some(Fragment { line, text })
}

/// Keep lines `from..=to` (1-based), with common indentation removed.
///
/// A trailing newline gets a single space appended so the fence renderer
/// keeps a blank final line.
#[must_use]
pub fn extract_lines(body: &str, range: LineRange) -> String {
    let skip = range.from.saturating_sub(1);
    let take = range.to.saturating_sub(skip);
    let selected = body.split('\n').skip(skip).take(take).collect::<Vec<_>>();

    let mut text = strip_indent(&selected.join("\n"));
    if text.ends_with('\n') {
        text.push(' ');
    }
    text
}

fn append_line(lang: &mut String, line: usize) {
    if !lang.is_empty() {
        lang.push(' ');
    }
    lang.push_str(&format!(":line={line}"));
}

fn restore_backticks(tokens: &mut [Token]) {
    for token in tokens {
        if token.kind == TokenKind::Code {
            token.text = unescape_backticks(&token.text);
            token.raw = unescape_backticks(&token.raw);
        }
        restore_backticks(&mut token.tokens);
    }
}
