//! Shared text and path helpers.

use pulldown_cmark::HeadingLevel;

/// Placeholder standing in for a backtick while code is wrapped in a fence.
pub const QUOTE_MARK: &str = "@QM@";

/// Escape character for literal `@` in fenced code bodies.
const ESCAPE: char = '@';

/// Convert heading level enum to number (1-6).
#[must_use]
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Replace backticks with [`QUOTE_MARK`] so a body cannot close its fence.
///
/// Literal `@` is doubled first, which keeps the substitution reversible even
/// when the body already contains the placeholder text.
///
/// ```
/// use rw_embed::{escape_backticks, unescape_backticks};
///
/// let body = "let s = `@QM@`;";
/// let escaped = escape_backticks(body);
/// assert!(!escaped.contains('`'));
/// assert_eq!(unescape_backticks(&escaped), body);
/// ```
#[must_use]
pub fn escape_backticks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            ESCAPE => {
                out.push(ESCAPE);
                out.push(ESCAPE);
            }
            '`' => out.push_str(QUOTE_MARK),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse [`escape_backticks`].
///
/// Sequences that are not produced by the escape step pass through unchanged.
#[must_use]
pub fn unescape_backticks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(ESCAPE) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("@@") {
            out.push(ESCAPE);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(QUOTE_MARK) {
            out.push('`');
            rest = after;
        } else {
            out.push(ESCAPE);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Remove the common leading indentation (spaces and tabs) from every line.
///
/// Lines that are entirely whitespace do not count towards the minimum.
#[must_use]
pub fn strip_indent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    if indent == 0 {
        return text.to_owned();
    }

    text.split('\n')
        .map(|line| {
            let strip = line
                .bytes()
                .take(indent)
                .take_while(|b| *b == b' ' || *b == b'\t')
                .count();
            &line[strip..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop the last path segment: `https://host/docs/page.md` -> `https://host/docs`.
#[must_use]
pub fn parent_path(url: &str) -> &str {
    url.rfind('/').map_or("", |pos| &url[..pos])
}

/// Whether `url` carries a scheme or is protocol-relative.
#[must_use]
pub fn has_scheme(url: &str) -> bool {
    url.contains("://") || url.starts_with("//")
}

/// Join a relative `href` onto a directory, collapsing duplicate slashes.
#[must_use]
pub(crate) fn join_path(dir: &str, href: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let href = href.trim_start_matches('/');
    if dir.is_empty() {
        href.to_owned()
    } else {
        format!("{dir}/{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_escape_removes_backticks() {
        let escaped = escape_backticks("```\ncode\n```");
        assert!(!escaped.contains('`'));
        assert_eq!(escaped, "@QM@@QM@@QM@\ncode\n@QM@@QM@@QM@");
    }

    #[test]
    fn test_escape_round_trip_with_placeholder_in_body() {
        for body in ["@QM@", "@@QM@", "`@QM@`", "a@b", "@", "@@@", "email@example.com `x`"] {
            assert_eq!(unescape_backticks(&escape_backticks(body)), body, "body: {body}");
        }
    }

    #[test]
    fn test_unescape_passes_through_stray_escape() {
        assert_eq!(unescape_backticks("a@b"), "a@b");
        assert_eq!(unescape_backticks("trailing@"), "trailing@");
    }

    proptest! {
        #[test]
        fn prop_escape_round_trip(body in ".*") {
            prop_assert_eq!(unescape_backticks(&escape_backticks(&body)), body);
        }

        #[test]
        fn prop_escape_round_trip_placeholder_heavy(body in "[@QM`\n a]*") {
            let escaped = escape_backticks(&body);
            prop_assert!(!escaped.contains('`'));
            prop_assert_eq!(unescape_backticks(&escaped), body);
        }
    }

    #[test]
    fn test_strip_indent() {
        assert_eq!(strip_indent("    a\n      b\n    c"), "a\n  b\nc");
    }

    #[test]
    fn test_strip_indent_ignores_blank_lines() {
        assert_eq!(strip_indent("  a\n\n  b\n"), "a\n\nb\n");
    }

    #[test]
    fn test_strip_indent_no_indent() {
        assert_eq!(strip_indent("a\n  b"), "a\n  b");
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("https://host/docs/page.md"), "https://host/docs");
        assert_eq!(parent_path("/docs/page.md"), "/docs");
        assert_eq!(parent_path("page.md"), "");
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://host/a.md"));
        assert!(has_scheme("//cdn.example.com/a.js"));
        assert!(!has_scheme("/docs/a.md"));
        assert!(!has_scheme("a.md"));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("docs/guide", "a.md"), "docs/guide/a.md");
        assert_eq!(join_path("docs/", "a.md"), "docs/a.md");
        assert_eq!(join_path("", "a.md"), "a.md");
    }
}
