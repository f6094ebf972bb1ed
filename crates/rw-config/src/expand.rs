//! `${VAR}` and `${VAR:-default}` expansion for configuration strings.

use crate::ConfigError;

/// Expand environment variable references in `value`.
///
/// Only the braced form is expanded; bare `$VAR` is kept literally.
/// `field` names the config key in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var)
            .map(Some)
            .map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Name of a variable that was referenced without a default but is unset.
struct UnsetVar(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_var_with_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("RW_EMBED_UNSET_TEST");
        }
        let result = expand_env("${RW_EMBED_UNSET_TEST:-https://fallback}", "embed.origin").unwrap();
        assert_eq!(result, "https://fallback");
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("RW_EMBED_HOST_TEST", "docs.example.com");
        }
        let result = expand_env("https://${RW_EMBED_HOST_TEST}/v1", "embed.origin").unwrap();
        assert_eq!(result, "https://docs.example.com/v1");
        unsafe {
            std::env::remove_var("RW_EMBED_HOST_TEST");
        }
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("RW_EMBED_MISSING_TEST");
        }
        let err = expand_env("${RW_EMBED_MISSING_TEST}", "embed.origin").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("RW_EMBED_MISSING_TEST"));
        assert!(err.to_string().contains("embed.origin"));
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        assert_eq!(expand_env("docs/$draft", "embed.source_dir").unwrap(), "docs/$draft");
    }
}
