//! CLI command implementations.

pub(crate) mod load;
pub(crate) mod route;

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Args;
use la_config::{CliSettings, Config, UrlRuleAction};
use la_site::{RuleKind, Site, SiteConfig, UrlRule, UrlRules};

use crate::error::CliError;

pub(crate) use load::LoadArgs;
pub(crate) use route::RouteArgs;

/// Arguments shared by commands that open a site.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover losangeles.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content root directory (overrides config).
    #[arg(short = 'r', long)]
    content_root: Option<PathBuf>,

    /// Enable the page cache (default: enabled in production).
    #[arg(long)]
    cache: Option<bool>,

    /// Disable the page cache.
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,

    /// Disable server-side syntax highlighting.
    #[arg(long)]
    no_highlight: bool,

    /// Enable verbose output (show load and cache logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SiteArgs {
    /// Load the configuration and open the site it describes.
    pub(crate) fn open(&self) -> Result<Site, CliError> {
        let cli_settings = CliSettings {
            content_root: self.content_root.clone(),
            cache_enabled: self.resolve_cache_enabled(),
            cache_max_pages: None,
            no_highlight: self.no_highlight.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        site_from_config(&config)
    }

    /// Resolve `cache_enabled` from --cache/--no-cache flags.
    fn resolve_cache_enabled(&self) -> Option<bool> {
        self.no_cache.then_some(false).or(self.cache)
    }
}

/// Build a [`Site`] from loaded configuration.
fn site_from_config(config: &Config) -> Result<Site, CliError> {
    let cache_max_pages = NonZeroUsize::new(config.content_resolved.cache_max_pages)
        .ok_or_else(|| {
            CliError::Validation("content.cache_max_pages must be greater than 0".to_owned())
        })?;

    let mut rules = Vec::with_capacity(config.url_rules.len());
    for rule in &config.url_rules {
        let (action, pattern) = rule.action()?;
        let kind = match action {
            UrlRuleAction::Redirect => RuleKind::Redirect,
            UrlRuleAction::Rewrite => RuleKind::Rewrite,
            UrlRuleAction::Proxy => RuleKind::Proxy,
        };
        rules.push(UrlRule::new(kind, pattern, rule.to.as_str())?);
    }

    let site_config = SiteConfig {
        content_root: config.content_resolved.root.clone(),
        cache_enabled: config.content_resolved.cache_enabled,
        cache_max_pages,
        no_highlight: config.markdown.no_highlight,
        fetch_timeout: config.external.timeout(),
    };
    tracing::info!(
        content_root = %site_config.content_root.display(),
        cache = site_config.cache_enabled,
        rules = rules.len(),
        "Opening site"
    );
    Ok(Site::with_rules(site_config, UrlRules::new(rules)))
}
