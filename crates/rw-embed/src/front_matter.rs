//! Front matter stripping for embedded markdown.

/// Hook applied to markdown embeds before lexing.
pub trait FrontMatter: Send + Sync {
    /// Return `text` with its front matter block removed.
    fn strip(&self, text: &str) -> String;
}

/// Strips a leading YAML block delimited by `---` and `---` (or `...`).
///
/// Text without a complete leading block is returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFrontMatter;

impl FrontMatter for YamlFrontMatter {
    fn strip(&self, text: &str) -> String {
        let body = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut lines = body.split_inclusive('\n');
        let Some(first) = lines.next() else {
            return text.to_owned();
        };
        if first.trim_end() != "---" {
            return text.to_owned();
        }

        let mut offset = first.len();
        for line in lines {
            offset += line.len();
            let trimmed = line.trim_end();
            if trimmed == "---" || trimmed == "..." {
                return body[offset..].to_owned();
            }
        }

        text.to_owned()
    }
}
