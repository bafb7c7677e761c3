//! `${VAR}` and `${VAR:-default}` expansion for configuration strings.

use crate::ConfigError;

/// Expand environment variable references in `value`.
///
/// Strings without `${` are returned unchanged, so a bare `$` (as in a
/// directory named `$web`) is never touched.
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

struct UnsetVar(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("LA_TEST_SITE_DIR", "/srv/site");
        }
        let result = expand_env("${LA_TEST_SITE_DIR}/public", "content.root").unwrap();
        assert_eq!(result, "/srv/site/public");
        unsafe {
            std::env::remove_var("LA_TEST_SITE_DIR");
        }
    }

    #[test]
    fn test_expand_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("LA_TEST_UNSET_DIR");
        }
        let result = expand_env("${LA_TEST_UNSET_DIR:-content}", "content.root").unwrap();
        assert_eq!(result, "content");
    }

    #[test]
    fn test_expand_missing_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("LA_TEST_MISSING_DIR");
        }
        let err = expand_env("${LA_TEST_MISSING_DIR}", "content.root").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert_eq!(
            err.to_string(),
            "Environment variable error in content.root: ${LA_TEST_MISSING_DIR} not set"
        );
    }

    #[test]
    fn test_bare_dollar_unchanged() {
        assert_eq!(expand_env("site/$web", "content.root").unwrap(), "site/$web");
    }
}
