//! Directive string parsing.
//!
//! Parses the `:key` / `:key=value` annotations that trail an embed link's
//! title, e.g. `':include :type=code :fragment=demo'`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// `:key` or `:key=value`, at the start of the string or after whitespace.
static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s):([\w-]+:?)=?([\w%.-]+)?").expect("directive pattern is valid")
});

/// Value of a single directive option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Key given without a value (`:include`).
    Flag,
    /// Key given with a value (`:type=code`).
    Value(String),
}

impl OptionValue {
    /// String value, or `None` for a bare flag.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Flag => None,
            Self::Value(value) => Some(value),
        }
    }
}

/// Parsed directive string.
///
/// # Example
///
/// ```
/// use rw_embed::{OptionValue, parse_directives};
///
/// let parsed = parse_directives(":include :type=code :fragment=demo");
/// assert_eq!(parsed.residual, "");
/// assert_eq!(parsed.get("include"), Some(&OptionValue::Flag));
/// assert_eq!(parsed.value("type"), Some("code"));
/// assert_eq!(parsed.value("fragment"), Some("demo"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Directives {
    /// Input with all recognized options removed, trimmed.
    pub residual: String,
    /// Recognized options.
    pub options: BTreeMap<String, OptionValue>,
}

impl Directives {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// String value of an option; `None` when missing or a bare flag.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }
}

/// Parse a directive string into options and the residual text.
///
/// Keys ending in a colon (`:key:`) are not directives and stay in the
/// residual. A `symbol` option always implies `type=code`.
#[must_use]
pub fn parse_directives(input: &str) -> Directives {
    let mut options = BTreeMap::new();

    let stripped = strip_quotes(input);
    let residual = DIRECTIVE_RE
        .replace_all(stripped, |caps: &Captures<'_>| {
            let key = &caps[1];
            if key.contains(':') {
                return caps[0].to_owned();
            }
            let value = caps
                .get(2)
                .map(|m| m.as_str().replace("&quot;", ""))
                .filter(|v| !v.is_empty())
                .map_or(OptionValue::Flag, OptionValue::Value);
            options.insert(key.to_owned(), value);
            String::new()
        })
        .trim()
        .to_owned();

    if options.contains_key("symbol") {
        options.insert("type".to_owned(), OptionValue::Value("code".to_owned()));
    }

    Directives { residual, options }
}

/// Strip one leading and one trailing quote character.
fn strip_quotes(input: &str) -> &str {
    let input = input.strip_prefix(['\'', '"']).unwrap_or(input);
    input.strip_suffix(['\'', '"']).unwrap_or(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(s: &str) -> OptionValue {
        OptionValue::Value(s.to_owned())
    }

    #[test]
    fn test_parse_include_type_fragment() {
        let parsed = parse_directives(":include :type=code :fragment=demo");

        let expected: BTreeMap<String, OptionValue> = [
            ("include".to_owned(), OptionValue::Flag),
            ("type".to_owned(), value("code")),
            ("fragment".to_owned(), value("demo")),
        ]
        .into_iter()
        .collect();

        assert_eq!(parsed.options, expected);
        assert_eq!(parsed.residual, "");
    }

    #[test]
    fn test_parse_keeps_residual_title() {
        let parsed = parse_directives("My title :include");
        assert_eq!(parsed.residual, "My title");
        assert!(parsed.contains("include"));
    }

    #[test]
    fn test_parse_strips_surrounding_quotes() {
        let parsed = parse_directives("':include :type=markdown'");
        assert_eq!(parsed.value("type"), Some("markdown"));
        assert_eq!(parsed.residual, "");
    }

    #[test]
    fn test_parse_value_with_dot_and_percent() {
        let parsed = parse_directives(":include :symbol=MyClass.foo :width=100%");
        assert_eq!(parsed.value("symbol"), Some("MyClass.foo"));
        assert_eq!(parsed.value("width"), Some("100%"));
    }

    #[test]
    fn test_symbol_implies_code() {
        let parsed = parse_directives(":include :type=markdown :symbol=Foo");
        assert_eq!(parsed.value("type"), Some("code"));
    }

    #[test]
    fn test_key_with_colon_is_left_untouched() {
        let parsed = parse_directives("see :note: here");
        assert!(parsed.options.is_empty());
        assert_eq!(parsed.residual, "see :note: here");
    }

    #[test]
    fn test_colon_inside_word_is_not_a_directive() {
        let parsed = parse_directives("time 10:30");
        assert!(parsed.options.is_empty());
        assert_eq!(parsed.residual, "time 10:30");
    }

    #[test]
    fn test_lines_value() {
        let parsed = parse_directives(":include :lines=10-20");
        assert_eq!(parsed.value("lines"), Some("10-20"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_directives(""), Directives::default());
    }

    #[test]
    fn test_parse_is_pure() {
        let input = "Title :include :type=code :lines=1-2";
        assert_eq!(parse_directives(input), parse_directives(input));
    }
}
