//! Configuration management for losangeles.
//!
//! Parses `losangeles.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ```toml
//! [content]
//! root = "${SITE_DIR:-.}/public"
//! cache = true
//! cache_max_pages = 100
//!
//! [markdown]
//! no_highlight = false
//!
//! [external]
//! timeout_secs = 10
//!
//! [[url_rules]]
//! rewrite = "^/spaApp/.*$"
//! to = "/spaApp/index.html"
//! ```
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Defaults from the environment
//!
//! - `LOSANGELES_CONTENT_ROOT`: base directory whose `public` subdirectory is
//!   the content root when `content.root` is not set
//! - `LOSANGELES_ENV=production`: enables the page cache unless
//!   `content.cache` says otherwise
//!
//! `content.root` supports `${VAR}` and `${VAR:-default}` expansion.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "losangeles.toml";

/// Environment variable naming the content base directory.
pub const CONTENT_ROOT_ENV: &str = "LOSANGELES_CONTENT_ROOT";

/// Environment variable naming the deployment environment.
pub const ENVIRONMENT_ENV: &str = "LOSANGELES_ENV";

/// Content directory below the base directory.
const DEFAULT_CONTENT_DIR: &str = "public";

const DEFAULT_CACHE_MAX_PAGES: usize = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override content root directory.
    pub content_root: Option<PathBuf>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override page cache capacity.
    pub cache_max_pages: Option<usize>,
    /// Override server-side highlighting switch.
    pub no_highlight: Option<bool>,
}

/// Process environment consulted for defaults.
#[derive(Debug, Default)]
struct Env {
    content_root: Option<PathBuf>,
    production: bool,
}

impl Env {
    fn from_process() -> Self {
        Self {
            content_root: std::env::var_os(CONTENT_ROOT_ENV).map(PathBuf::from),
            production: std::env::var(ENVIRONMENT_ENV).is_ok_and(|env| env == "production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content configuration (paths are relative strings from TOML).
    content: ContentConfigRaw,
    /// Markdown rendering configuration.
    pub markdown: MarkdownConfig,
    /// `externalBody` fetching configuration.
    pub external: ExternalConfig,
    /// Ordered URL rules.
    pub url_rules: Vec<UrlRuleConfig>,

    /// Resolved content configuration (set after loading).
    #[serde(skip)]
    pub content_resolved: ContentConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."), &Env::default())
    }
}

/// Raw content configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContentConfigRaw {
    root: Option<String>,
    cache: Option<bool>,
    cache_max_pages: Option<usize>,
}

/// Resolved content configuration with an absolute root.
#[derive(Debug, Default)]
pub struct ContentConfig {
    /// Directory holding the content files.
    pub root: PathBuf,
    /// Whether the page cache is enabled.
    pub cache_enabled: bool,
    /// Page cache capacity.
    pub cache_max_pages: usize,
}

/// Markdown rendering configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Disable server-side syntax highlighting for every document.
    pub no_highlight: bool,
}

/// External body configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ExternalConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What a URL rule does when it matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlRuleAction {
    Redirect,
    Rewrite,
    Proxy,
}

/// A `[[url_rules]]` entry: one of `redirect`, `rewrite` or `proxy` holding
/// the pattern, and `to` holding the replacement.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UrlRuleConfig {
    pub redirect: Option<String>,
    pub rewrite: Option<String>,
    pub proxy: Option<String>,
    /// Replacement template. `$1` is capture group 1 even when word
    /// characters follow (`/x/$1_v2`), `$&` is the whole match and `$$` a
    /// literal dollar.
    pub to: String,
}

impl UrlRuleConfig {
    /// The rule's action and pattern.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` unless exactly one action is set.
    pub fn action(&self) -> Result<(UrlRuleAction, &str), ConfigError> {
        match (&self.redirect, &self.rewrite, &self.proxy) {
            (Some(pattern), None, None) => Ok((UrlRuleAction::Redirect, pattern)),
            (None, Some(pattern), None) => Ok((UrlRuleAction::Rewrite, pattern)),
            (None, None, Some(pattern)) => Ok((UrlRuleAction::Proxy, pattern)),
            _ => Err(ConfigError::Validation(format!(
                "url rule to {:?} must set exactly one of redirect, rewrite or proxy",
                self.to
            ))),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`content.root`").
        field: String,
        /// Error message (e.g., "${`SITE_DIR`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `losangeles.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let env = Env::from_process();
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path, &env)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered, &env)?
        } else {
            let cwd = std::env::current_dir().unwrap_or_default();
            Self::default_with_base(&cwd, &env)
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root) = &settings.content_root {
            self.content_resolved.root.clone_from(root);
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.content_resolved.cache_enabled = cache_enabled;
        }
        if let Some(max_pages) = settings.cache_max_pages {
            self.content_resolved.cache_max_pages = max_pages;
        }
        if let Some(no_highlight) = settings.no_highlight {
            self.markdown.no_highlight = no_highlight;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with the content root under `base`.
    fn default_with_base(base: &Path, env: &Env) -> Self {
        Self {
            content: ContentConfigRaw::default(),
            markdown: MarkdownConfig::default(),
            external: ExternalConfig::default(),
            url_rules: Vec::new(),
            content_resolved: ContentConfig {
                root: env
                    .content_root
                    .as_deref()
                    .unwrap_or(base)
                    .join(DEFAULT_CONTENT_DIR),
                cache_enabled: env.production,
                cache_max_pages: DEFAULT_CACHE_MAX_PAGES,
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path, env: &Env) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_content(config_dir, env)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying CLI
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_resolved.cache_max_pages == 0 {
            return Err(ConfigError::Validation(
                "content.cache_max_pages must be greater than 0".to_owned(),
            ));
        }
        if self.external.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "external.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        for rule in &self.url_rules {
            rule.action()?;
        }
        Ok(())
    }

    /// Resolve the content root against the config directory and apply
    /// environment defaults.
    fn resolve_content(&mut self, config_dir: &Path, env: &Env) -> Result<(), ConfigError> {
        let root = match &self.content.root {
            Some(root) => config_dir.join(expand::expand_env(root, "content.root")?),
            None => env
                .content_root
                .as_deref()
                .unwrap_or(config_dir)
                .join(DEFAULT_CONTENT_DIR),
        };

        self.content_resolved = ContentConfig {
            root,
            cache_enabled: self.content.cache.unwrap_or(env.production),
            cache_max_pages: self
                .content
                .cache_max_pages
                .unwrap_or(DEFAULT_CACHE_MAX_PAGES),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(toml: &str, env: &Env) -> Config {
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_content(Path::new("/site"), env).unwrap();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"), &Env::default());
        assert_eq!(config.content_resolved.root, PathBuf::from("/test/public"));
        assert!(!config.content_resolved.cache_enabled);
        assert_eq!(config.content_resolved.cache_max_pages, 50);
        assert!(!config.markdown.no_highlight);
        assert_eq!(config.external.timeout(), Duration::from_secs(30));
        assert!(config.url_rules.is_empty());
    }

    #[test]
    fn test_default_config_from_env() {
        let env = Env {
            content_root: Some(PathBuf::from("/srv/site")),
            production: true,
        };
        let config = Config::default_with_base(Path::new("/test"), &env);
        assert_eq!(config.content_resolved.root, PathBuf::from("/srv/site/public"));
        assert!(config.content_resolved.cache_enabled);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = parse("", &Env::default());
        assert_eq!(config.content_resolved.root, PathBuf::from("/site/public"));
        assert!(!config.content_resolved.cache_enabled);
    }

    #[test]
    fn test_parse_content_config() {
        let toml = r#"
[content]
root = "pages"
cache = true
cache_max_pages = 10

[markdown]
no_highlight = true

[external]
timeout_secs = 5
"#;
        let config = parse(toml, &Env::default());
        assert_eq!(config.content_resolved.root, PathBuf::from("/site/pages"));
        assert!(config.content_resolved.cache_enabled);
        assert_eq!(config.content_resolved.cache_max_pages, 10);
        assert!(config.markdown.no_highlight);
        assert_eq!(config.external.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_absolute_root_kept() {
        let config = parse("[content]\nroot = \"/var/www\"\n", &Env::default());
        assert_eq!(config.content_resolved.root, PathBuf::from("/var/www"));
    }

    #[test]
    fn test_explicit_cache_overrides_production() {
        let env = Env {
            content_root: None,
            production: true,
        };
        assert!(parse("", &env).content_resolved.cache_enabled);
        assert!(!parse("[content]\ncache = false\n", &env).content_resolved.cache_enabled);
    }

    #[test]
    fn test_root_env_expansion() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("LA_CONFIG_TEST_BASE", "/data");
        }
        let config = parse(
            "[content]\nroot = \"${LA_CONFIG_TEST_BASE}/public\"\n",
            &Env::default(),
        );
        assert_eq!(config.content_resolved.root, PathBuf::from("/data/public"));
        unsafe {
            std::env::remove_var("LA_CONFIG_TEST_BASE");
        }
    }

    #[test]
    fn test_parse_url_rules() {
        let toml = r#"
[[url_rules]]
rewrite = "^/spaApp/.*$"
to = "/spaApp/index.html"

[[url_rules]]
redirect = "^/old/(.*)$"
to = "/new/$1"

[[url_rules]]
proxy = "^/api/(.*)$"
to = "http://backend:8080/$1"
"#;
        let config = parse(toml, &Env::default());
        let actions: Vec<_> = config
            .url_rules
            .iter()
            .map(|rule| rule.action().unwrap())
            .collect();
        assert_eq!(
            actions,
            [
                (UrlRuleAction::Rewrite, "^/spaApp/.*$"),
                (UrlRuleAction::Redirect, "^/old/(.*)$"),
                (UrlRuleAction::Proxy, "^/api/(.*)$"),
            ]
        );
        assert_eq!(config.url_rules[1].to, "/new/$1");
        config.validate().unwrap();
    }

    #[test]
    fn test_url_rule_unknown_field_rejected() {
        let result = toml::from_str::<Config>("[[url_rules]]\nforward = \"^/a\"\nto = \"/b\"\n");
        assert!(result.is_err());
    }

    fn assert_validation_error(config: &Config, expected: &str) {
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(
            err.to_string().contains(expected),
            "{err} should contain {expected}"
        );
    }

    #[test]
    fn test_validate_default_config_passes() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_validate_url_rule_needs_one_action() {
        let config = parse("[[url_rules]]\nto = \"/b\"\n", &Env::default());
        assert_validation_error(&config, "exactly one of redirect, rewrite or proxy");

        let config = parse(
            "[[url_rules]]\nredirect = \"^/a\"\nproxy = \"^/a\"\nto = \"/b\"\n",
            &Env::default(),
        );
        assert_validation_error(&config, "exactly one");
    }

    #[test]
    fn test_validate_zero_cache_pages() {
        let config = parse("[content]\ncache_max_pages = 0\n", &Env::default());
        assert_validation_error(&config, "content.cache_max_pages");
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = parse("[external]\ntimeout_secs = 0\n", &Env::default());
        assert_validation_error(&config, "external.timeout_secs");
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"), &Env::default());
        config.apply_cli_settings(&CliSettings {
            content_root: Some(PathBuf::from("/other")),
            cache_enabled: Some(true),
            cache_max_pages: Some(5),
            no_highlight: Some(true),
        });
        assert_eq!(config.content_resolved.root, PathBuf::from("/other"));
        assert!(config.content_resolved.cache_enabled);
        assert_eq!(config.content_resolved.cache_max_pages, 5);
        assert!(config.markdown.no_highlight);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"), &Env::default());
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.content_resolved.root, PathBuf::from("/test/public"));
        assert!(!config.content_resolved.cache_enabled);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[content]\nroot = \"content\"\n").unwrap();

        let config = Config::load_from_file(&path, &Env::default()).unwrap();
        assert_eq!(config.content_resolved.root, dir.path().join("content"));
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
