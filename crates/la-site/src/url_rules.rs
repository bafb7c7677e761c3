//! Ordered redirect/rewrite/proxy rules applied before content resolution.
//!
//! Each rule is a regex and a replacement template. The first rule whose
//! replacement changes the URL decides the outcome:
//!
//! - an empty replacement result means not found
//! - `redirect` and `proxy` stop with the new URL
//! - `rewrite` replaces the request path and stops rule evaluation
//!
//! Redirect patterns that mention a scheme separator are matched against
//! `scheme://host/path?query` instead of the bare path.
//!
//! Replacement templates use `$1`, `$&` and `$$` as in JavaScript: `$1_v2`
//! means group 1 followed by `_v2`. Braced and named references such as
//! `${1}` or `${name}` work as well.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::urls::{collapse_slashes, split_path};

/// Error returned when a rule pattern is not a valid regex.
#[derive(Debug, thiserror::Error)]
#[error("Invalid URL rule pattern {pattern:?}: {source}")]
pub struct RuleError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// What a matching rule does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    Redirect,
    Rewrite,
    Proxy,
}

/// A single URL rule.
#[derive(Clone, Debug)]
pub struct UrlRule {
    kind: RuleKind,
    pattern: Regex,
    replacement: String,
}

impl UrlRule {
    /// Compile a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if `pattern` is not a valid regex.
    pub fn new(kind: RuleKind, pattern: &str, replacement: impl Into<String>) -> Result<Self, RuleError> {
        let pattern = Regex::new(pattern).map_err(|source| RuleError {
            pattern: pattern.to_owned(),
            source,
        })?;
        let replacement = replacement.into();
        Ok(Self {
            kind,
            pattern,
            replacement: brace_group_refs(&replacement).into_owned(),
        })
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Whether the rule is tested against the absolute URL.
    fn matches_absolute(&self) -> bool {
        let source = self.pattern.as_str();
        self.kind == RuleKind::Redirect && (source.contains("://") || source.contains(r":\/\/"))
    }
}

/// Numbered group references and `$&` in a replacement template.
static GROUP_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\$|\$&|\$(\d+)").unwrap());

/// Brace bare `$N` references so a following word character is not read as
/// part of the group name.
fn brace_group_refs(template: &str) -> Cow<'_, str> {
    GROUP_REF.replace_all(template, |caps: &Captures<'_>| match (&caps[0], caps.get(1)) {
        (_, Some(group)) => format!("${{{}}}", group.as_str()),
        ("$&", None) => "${0}".to_owned(),
        _ => "$$".to_owned(),
    })
}

/// The parts of an incoming request the rules look at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestTarget {
    /// Request scheme, e.g. `https`.
    pub scheme: String,
    /// Host header value, including any port.
    pub host: String,
    /// Path with query string, e.g. `/blog?page=2`.
    pub path_and_query: String,
}

impl RequestTarget {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        path_and_query: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path_and_query: path_and_query.into(),
        }
    }

    fn absolute(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path_and_query)
    }
}

/// Result of running the rules for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Resolve content for this path (rewritten or unchanged).
    Continue(String),
    /// Send an HTTP redirect.
    Redirect(String),
    /// Stream the response of this absolute URL.
    Proxy(String),
    /// Respond with not found.
    NotFound,
}

/// Ordered list of URL rules.
#[derive(Clone, Debug, Default)]
pub struct UrlRules {
    rules: Vec<UrlRule>,
}

impl UrlRules {
    #[must_use]
    pub fn new(rules: Vec<UrlRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate the rules for a request.
    ///
    /// A path containing repeated slashes redirects to its collapsed form
    /// before any rule is consulted.
    pub fn apply(&self, target: &RequestTarget) -> RuleOutcome {
        let (path, query) = split_path(&target.path_and_query);
        let collapsed = collapse_slashes(path);
        if collapsed != path {
            return RuleOutcome::Redirect(format!("{collapsed}{query}"));
        }

        for rule in &self.rules {
            let test_url = if rule.matches_absolute() {
                target.absolute()
            } else {
                target.path_and_query.clone()
            };

            let new_url = rule.pattern.replace(&test_url, rule.replacement.as_str());
            tracing::debug!(
                target: "la_site::url_rules",
                url = %test_url,
                pattern = rule.pattern.as_str(),
                result = %new_url,
                "Matching URL rule"
            );
            if new_url == test_url {
                continue;
            }
            if new_url.is_empty() {
                return RuleOutcome::NotFound;
            }

            let new_url = new_url.into_owned();
            return match rule.kind {
                RuleKind::Redirect => RuleOutcome::Redirect(new_url),
                RuleKind::Proxy => RuleOutcome::Proxy(new_url),
                RuleKind::Rewrite => RuleOutcome::Continue(new_url),
            };
        }

        RuleOutcome::Continue(target.path_and_query.clone())
    }
}
