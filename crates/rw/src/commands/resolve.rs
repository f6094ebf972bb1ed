//! `rw resolve` command implementation.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use rw_config::{CliSettings, Config, EmbedConfig};
use rw_embed::{
    Classifier, DocumentCache, DocumentStore, EmbedRenderer, EmbedResolver, Fetch, FsFetcher,
    HttpFetcher, NullStore, Token, TokenList, YamlFrontMatter,
};

use crate::error::CliError;
use crate::output::Output;

/// Maximum characters of token text shown in summary output.
const PREVIEW_CHARS: usize = 60;

/// Output format for resolved tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    /// Token list with link table as JSON.
    Json,
    /// One line per top-level token.
    Summary,
}

/// Arguments for the resolve command.
#[derive(Args)]
pub(crate) struct ResolveArgs {
    /// Markdown file to resolve.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover rw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Origin to fetch relative embed URLs from (overrides config).
    #[arg(long)]
    origin: Option<String>,

    /// Directory embeds are read from when no origin is set (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// HTTP fetch timeout in seconds (overrides config).
    #[arg(long)]
    timeout: Option<u64>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Disable the document cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output (fetch failures and timing logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ResolveArgs {
    /// Execute the resolve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the file cannot be read or
    /// output cannot be written.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            origin: self.origin,
            source_dir: self.source_dir,
            cache_enabled: self.no_cache.then_some(false),
            timeout_secs: self.timeout,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let embed = &config.embed_resolved;

        let raw = std::fs::read_to_string(&self.file)?;
        tracing::info!(file = %self.file.display(), "Resolving embeds");

        match &embed.origin {
            Some(origin) => output.info(&format!("Fetching embeds from {origin}")),
            None => output.info(&format!(
                "Reading embeds from {}",
                embed.source_dir.display()
            )),
        }

        let renderer = build_renderer(embed, &self.file);
        let list = renderer.prerender(&raw);

        match self.format {
            Format::Json => output.data(&serde_json::to_string_pretty(&list)?)?,
            Format::Summary => print_summary(output, &list)?,
        }

        output.success(&format!(
            "Resolved {} tokens, {} link definitions",
            list.len(),
            list.links.len()
        ));
        Ok(())
    }
}

fn build_renderer(embed: &EmbedConfig, file: &Path) -> EmbedRenderer {
    let fetcher: Arc<dyn Fetch> = match &embed.origin {
        Some(origin) => Arc::new(HttpFetcher::new().origin(origin).timeout(embed.timeout)),
        None => Arc::new(FsFetcher::new(&embed.source_dir)),
    };

    let mut resolver = EmbedResolver::new(fetcher);
    if let Some(origin) = &embed.origin {
        resolver = resolver.with_origin(origin);
    }
    if embed.front_matter {
        resolver = resolver.with_front_matter(Arc::new(YamlFrontMatter));
    }

    let mut classifier = Classifier::new();
    if let Some(base) = document_dir(&embed.source_dir, file) {
        classifier = classifier.with_base_path(base);
    }

    let store: Arc<dyn DocumentStore> = if embed.cache_enabled {
        DocumentCache::global()
    } else {
        Arc::new(NullStore)
    };

    EmbedRenderer::new(resolver)
        .with_classifier(classifier)
        .with_store(store)
}

/// Directory of `file` relative to `source_dir`, `/`-separated.
///
/// Returns `None` when the file lies outside the source directory or
/// directly in it.
fn document_dir(source_dir: &Path, file: &Path) -> Option<String> {
    let source_dir = std::path::absolute(source_dir).ok()?;
    let file = std::path::absolute(file).ok()?;
    let relative = file.parent()?.strip_prefix(&source_dir).ok()?;

    let segments: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

fn print_summary(output: &Output, list: &TokenList) -> std::io::Result<()> {
    for (index, token) in list.tokens.iter().enumerate() {
        output.row(&format!("{index:>4} {}", kind_label(token)), &preview(token))?;
    }
    Ok(())
}

fn kind_label(token: &Token) -> String {
    let kind = serde_json::to_value(token.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default();
    match (&token.lang, token.depth) {
        (Some(lang), _) => format!("{kind}[{lang}]"),
        (None, Some(depth)) => format!("{kind}[h{depth}]"),
        (None, None) => kind,
    }
}

fn preview(token: &Token) -> String {
    let line = token.text.lines().next().unwrap_or_default();
    let mut preview: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || token.text.lines().nth(1).is_some() {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rw_embed::TokenKind;

    #[test]
    fn test_document_dir_nested() {
        assert_eq!(
            document_dir(Path::new("/site/docs"), Path::new("/site/docs/guide/setup/a.md")),
            Some("guide/setup".to_owned())
        );
    }

    #[test]
    fn test_document_dir_at_root_or_outside() {
        assert_eq!(document_dir(Path::new("/site/docs"), Path::new("/site/docs/a.md")), None);
        assert_eq!(document_dir(Path::new("/site/docs"), Path::new("/tmp/a.md")), None);
    }

    #[test]
    fn test_kind_label() {
        let heading = Token {
            depth: Some(2),
            ..Token::new(TokenKind::Heading)
        };
        assert_eq!(kind_label(&heading), "heading[h2]");

        let code = Token {
            lang: Some("rs :line=4".to_owned()),
            ..Token::new(TokenKind::Code)
        };
        assert_eq!(kind_label(&code), "code[rs :line=4]");

        assert_eq!(kind_label(&Token::new(TokenKind::ListItem)), "list_item");
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview(&Token::html("one line")), "one line");
        assert_eq!(preview(&Token::html("first\nsecond")), "first...");

        let long = "x".repeat(80);
        assert_eq!(preview(&Token::html(long)), format!("{}...", "x".repeat(60)));
    }

    #[test]
    fn test_build_renderer_reads_from_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("guide")).unwrap();
        std::fs::write(docs.join("guide/part.md"), "# Part\n").unwrap();
        let file = docs.join("guide/index.md");

        let embed = EmbedConfig {
            origin: None,
            source_dir: docs,
            timeout: std::time::Duration::from_secs(1),
            front_matter: true,
            cache_enabled: false,
        };

        let list = build_renderer(&embed, &file).prerender("[part](part.md ':include')\n");
        assert_eq!(list.len(), 2);
        assert_eq!(list.tokens[1].kind, TokenKind::Heading);
    }

    #[test]
    fn test_build_renderer_roots_relative_links() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("guide")).unwrap();
        std::fs::write(docs.join("guide/part.md"), "[y](./y.md)\n").unwrap();
        let file = docs.join("guide/index.md");

        let embed = EmbedConfig {
            origin: None,
            source_dir: docs,
            timeout: std::time::Duration::from_secs(1),
            front_matter: false,
            cache_enabled: false,
        };

        let list = build_renderer(&embed, &file).prerender("[part](part.md ':include')\n");
        assert_eq!(list.len(), 2);
        let link = &list.tokens[1].tokens[0];
        assert_eq!(link.href.as_deref(), Some("/guide/./y.md"));
    }
}
