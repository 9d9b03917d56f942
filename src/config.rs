//! TOML configuration for a search page.
//!
//! One file describes one deployment of the search box: which endpoint it
//! talks to, how long the keystroke quiet period is, whether the page
//! searches on load, and how rendered entries are expanded. Anything left
//! out of `[controller]` and `[render]` falls back to the defaults of the
//! endpoint kind (see [`PagePreset`]).

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::EndpointKind;
use crate::render::ExpandPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    /// URL the endpoint path is resolved against. When unset, the endpoint
    /// is resolved against the page URL, the way a relative fetch would be.
    #[serde(default)]
    pub base_url: Option<String>,
    pub kind: EndpointKind,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default)]
    pub debounce_ms: Option<u64>,
    #[serde(default = "default_search_on_load")]
    pub search_on_load: bool,
    #[serde(default)]
    pub discard_stale_responses: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: None,
            search_on_load: true,
            discard_stale_responses: false,
        }
    }
}

fn default_search_on_load() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RenderConfig {
    #[serde(default)]
    pub expand_policy: Option<ExpandPolicy>,
}

/// Built-in defaults for the two page kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePreset {
    pub debounce: Duration,
    pub expand_policy: ExpandPolicy,
}

impl PagePreset {
    pub fn for_kind(kind: EndpointKind) -> Self {
        match kind {
            EndpointKind::Predict => Self {
                debounce: Duration::from_millis(1000),
                expand_policy: ExpandPolicy::NewestOnly,
            },
            EndpointKind::Search => Self {
                debounce: Duration::from_millis(500),
                expand_policy: ExpandPolicy::SingleResult,
            },
        }
    }
}

impl Config {
    /// Configuration with every setting at the defaults for `kind`.
    pub fn preset(kind: EndpointKind) -> Self {
        Self {
            endpoint: EndpointConfig {
                base_url: None,
                kind,
                timeout_secs: default_timeout_secs(),
            },
            controller: ControllerConfig::default(),
            render: RenderConfig::default(),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.controller
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| PagePreset::for_kind(self.endpoint.kind).debounce)
    }

    pub fn expand_policy(&self) -> ExpandPolicy {
        self.render
            .expand_policy
            .unwrap_or_else(|| PagePreset::for_kind(self.endpoint.kind).expand_policy)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate endpoint
    if let Some(base) = &config.endpoint.base_url {
        let url = Url::parse(base)
            .with_context(|| format!("endpoint.base_url is not a valid URL: {}", base))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!(
                "endpoint.base_url must use http or https, got '{}'",
                url.scheme()
            );
        }
    }
    if config.endpoint.timeout_secs == 0 {
        anyhow::bail!("endpoint.timeout_secs must be > 0");
    }

    // Validate controller
    if config.controller.debounce_ms == Some(0) {
        anyhow::bail!("controller.debounce_ms must be > 0");
    }

    Ok(config)
}
