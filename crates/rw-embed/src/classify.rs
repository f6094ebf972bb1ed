//! Embed classification.
//!
//! Decides whether a link is an embed directive and, if so, what kind of
//! content it pulls in.

use std::path::Path;

use crate::directive::parse_directives;
use crate::util::{has_scheme, join_path};

/// Kind of embedded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    Markdown,
    Code,
    Mermaid,
    Html,
}

impl EmbedKind {
    /// Parse an explicit `:type=` value. Media aliases map to [`EmbedKind::Html`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "markdown" => Some(Self::Markdown),
            "code" => Some(Self::Code),
            "mermaid" => Some(Self::Mermaid),
            "html" | "iframe" | "video" | "audio" => Some(Self::Html),
            _ => None,
        }
    }
}

/// A classified embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedSpec {
    pub kind: EmbedKind,
    /// Fetch target. `None` means the body is given inline in `html`.
    pub url: Option<String>,
    /// Inline body, used when `url` is `None`.
    pub html: Option<String>,
    /// Fence info string for code embeds; the resolver appends `:line=<n>`.
    pub lang: Option<String>,
    /// Named region to extract from a code file.
    pub fragment: Option<String>,
    /// Inclusive 1-based line range to extract from a code file.
    pub lines: Option<LineRange>,
}

impl EmbedSpec {
    fn fetched(kind: EmbedKind, url: String) -> Self {
        Self {
            kind,
            url: Some(url),
            html: None,
            lang: None,
            fragment: None,
            lines: None,
        }
    }

    fn inline(html: String) -> Self {
        Self {
            kind: EmbedKind::Html,
            url: None,
            html: Some(html),
            lang: None,
            fragment: None,
            lines: None,
        }
    }
}

/// Inclusive line range parsed from `from-to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub from: usize,
    pub to: usize,
}

impl LineRange {
    /// Parse the exact form `<int>-<int>`.
    ///
    /// Lines are 1-based, so `from` must be at least 1 and not past `to`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (from, to) = s.split_once('-')?;
        let range = Self {
            from: from.parse().ok()?,
            to: to.parse().ok()?,
        };
        (range.from >= 1 && range.from <= range.to).then_some(range)
    }
}

/// Media flavors rendered as inline markup instead of being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Media {
    Iframe,
    Video,
    Audio,
}

impl Media {
    fn markup(self, url: &str, attrs: &str) -> String {
        match self {
            Self::Iframe => {
                let attrs = non_empty_or(attrs, "width=100% height=400");
                format!("<iframe src=\"{url}\" {attrs}></iframe>")
            }
            Self::Video => {
                let attrs = non_empty_or(attrs, "controls");
                format!("<video src=\"{url}\" {attrs}>Not Support</video>")
            }
            Self::Audio => {
                let attrs = non_empty_or(attrs, "controls");
                format!("<audio src=\"{url}\" {attrs}>Not Support</audio>")
            }
        }
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}

/// Target selected for an embed before type-specific fields are filled in.
enum Target {
    Fetch(EmbedKind),
    Media(Media),
}

/// Classifies link tokens into embeds.
///
/// Relative hrefs are resolved against `base_path`, the directory of the
/// document being rendered.
///
/// # Example
///
/// ```
/// use rw_embed::{Classifier, EmbedKind};
///
/// let classifier = Classifier::new().with_base_path("/docs/guide");
/// let embed = classifier.classify("example.rs", ":include :lines=1-5").unwrap();
/// assert_eq!(embed.kind, EmbedKind::Code);
/// assert_eq!(embed.url.as_deref(), Some("/docs/guide/example.rs"));
/// assert_eq!(embed.lang.as_deref(), Some("rs"));
///
/// assert!(classifier.classify("other.md", "Just a title").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    base_path: Option<String>,
}

impl Classifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory relative hrefs are resolved against.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Classify a link. Returns `None` for ordinary links.
    #[must_use]
    pub fn classify(&self, href: &str, title: &str) -> Option<EmbedSpec> {
        let directives = parse_directives(title);
        if !directives.contains("include") {
            return None;
        }

        let url = self.resolve_href(href);
        let target = directives
            .value("type")
            .and_then(explicit_target)
            .unwrap_or_else(|| infer_target(&url));

        let mut embed = match target {
            Target::Media(media) => EmbedSpec::inline(media.markup(&url, &directives.residual)),
            Target::Fetch(kind) => EmbedSpec::fetched(kind, url),
        };

        if embed.kind == EmbedKind::Code {
            embed.lang = embed.url.as_deref().and_then(lang_from_url);
            embed.fragment = directives.value("fragment").map(str::to_owned);
            embed.lines = directives.value("lines").and_then(LineRange::parse);
        }

        Some(embed)
    }

    fn resolve_href(&self, href: &str) -> String {
        match &self.base_path {
            Some(base) if !has_scheme(href) && !href.starts_with('/') => join_path(base, href),
            _ => href.to_owned(),
        }
    }
}

fn explicit_target(kind: &str) -> Option<Target> {
    match kind {
        "iframe" => Some(Target::Media(Media::Iframe)),
        "video" => Some(Target::Media(Media::Video)),
        "audio" => Some(Target::Media(Media::Audio)),
        other => EmbedKind::parse(other).map(Target::Fetch),
    }
}

fn infer_target(url: &str) -> Target {
    match extension(url).as_deref() {
        Some("md" | "markdown") => Target::Fetch(EmbedKind::Markdown),
        Some("mmd") => Target::Fetch(EmbedKind::Mermaid),
        Some("html" | "htm") => Target::Media(Media::Iframe),
        Some("mp4" | "ogg") => Target::Media(Media::Video),
        Some("mp3") => Target::Media(Media::Audio),
        _ => Target::Fetch(EmbedKind::Code),
    }
}

/// Lowercase file extension of the URL path, ignoring query and fragment.
fn extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn lang_from_url(url: &str) -> Option<String> {
    extension(url).map(|ext| {
        if ext == "md" {
            "markdown".to_owned()
        } else {
            ext
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_link_is_not_embed() {
        let classifier = Classifier::new();
        assert_eq!(classifier.classify("guide.md", ""), None);
        assert_eq!(classifier.classify("guide.md", "Guide :type=code"), None);
    }

    #[test]
    fn test_infer_markdown() {
        let embed = Classifier::new()
            .classify("https://host/docs/page.md", ":include")
            .unwrap();
        assert_eq!(embed.kind, EmbedKind::Markdown);
        assert_eq!(embed.url.as_deref(), Some("https://host/docs/page.md"));
        assert_eq!(embed.lang, None);
    }

    #[test]
    fn test_infer_mermaid() {
        let embed = Classifier::new().classify("flow.mmd", ":include").unwrap();
        assert_eq!(embed.kind, EmbedKind::Mermaid);
    }

    #[test]
    fn test_infer_code_with_lang() {
        let embed = Classifier::new()
            .classify("src/main.rs?raw=1", ":include :fragment=demo")
            .unwrap();
        assert_eq!(embed.kind, EmbedKind::Code);
        assert_eq!(embed.lang.as_deref(), Some("rs"));
        assert_eq!(embed.fragment.as_deref(), Some("demo"));
    }

    #[test]
    fn test_explicit_type_wins() {
        let embed = Classifier::new()
            .classify("notes.md", ":include :type=code")
            .unwrap();
        assert_eq!(embed.kind, EmbedKind::Code);
        assert_eq!(embed.lang.as_deref(), Some("markdown"));
    }

    #[test]
    fn test_unknown_explicit_type_falls_back_to_inference() {
        let embed = Classifier::new()
            .classify("notes.md", ":include :type=pdf")
            .unwrap();
        assert_eq!(embed.kind, EmbedKind::Markdown);
    }

    #[test]
    fn test_symbol_forces_code() {
        let embed = Classifier::new()
            .classify("api.md", ":include :symbol=Client.send")
            .unwrap();
        assert_eq!(embed.kind, EmbedKind::Code);
    }

    #[test]
    fn test_lines_must_be_a_range() {
        let classifier = Classifier::new();
        let embed = classifier.classify("a.py", ":include :lines=3-7").unwrap();
        assert_eq!(embed.lines, Some(LineRange { from: 3, to: 7 }));

        let embed = classifier.classify("a.py", ":include :lines=3").unwrap();
        assert_eq!(embed.lines, None);
    }

    #[test]
    fn test_line_range_rejects_zero_and_reversed() {
        assert_eq!(LineRange::parse("0-5"), None);
        assert_eq!(LineRange::parse("7-3"), None);
        assert_eq!(LineRange::parse("4-4"), Some(LineRange { from: 4, to: 4 }));

        let embed = Classifier::new()
            .classify("a.py", ":include :lines=0-5")
            .unwrap();
        assert_eq!(embed.lines, None);
    }

    #[test]
    fn test_iframe_media_is_inline_html() {
        let embed = Classifier::new()
            .classify("https://example.com/demo.html", ":include")
            .unwrap();
        assert_eq!(embed.kind, EmbedKind::Html);
        assert_eq!(embed.url, None);
        assert_eq!(
            embed.html.as_deref(),
            Some("<iframe src=\"https://example.com/demo.html\" width=100% height=400></iframe>")
        );
    }

    #[test]
    fn test_video_uses_residual_as_attributes() {
        let embed = Classifier::new()
            .classify("clip.mp4", "autoplay loop :include")
            .unwrap();
        assert_eq!(
            embed.html.as_deref(),
            Some("<video src=\"clip.mp4\" autoplay loop>Not Support</video>")
        );
    }

    #[test]
    fn test_explicit_html_is_fetched() {
        let embed = Classifier::new()
            .classify("snippet.html", ":include :type=html")
            .unwrap();
        assert_eq!(embed.kind, EmbedKind::Html);
        assert_eq!(embed.url.as_deref(), Some("snippet.html"));
        assert_eq!(embed.html, None);
    }

    #[test]
    fn test_relative_href_uses_base_path() {
        let classifier = Classifier::new().with_base_path("/docs/guide/");
        let embed = classifier.classify("part.md", ":include").unwrap();
        assert_eq!(embed.url.as_deref(), Some("/docs/guide/part.md"));

        let embed = classifier.classify("/root.md", ":include").unwrap();
        assert_eq!(embed.url.as_deref(), Some("/root.md"));

        let embed = classifier
            .classify("https://host/x.md", ":include")
            .unwrap();
        assert_eq!(embed.url.as_deref(), Some("https://host/x.md"));
    }

    #[test]
    fn test_classify_is_deterministic() {
        let classifier = Classifier::new().with_base_path("docs");
        let a = classifier.classify("x.js", ":include :lines=1-2");
        let b = classifier.classify("x.js", ":include :lines=1-2");
        assert_eq!(a, b);
    }
}
