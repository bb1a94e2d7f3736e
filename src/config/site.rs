//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub content_dir: String,
    pub static_dir: String,
    pub public_dir: String,
    pub blog_dir: String,
    pub post_dir: String,
    pub tag_dir: String,

    // Writing
    #[serde(default)]
    pub external_link: ExternalLinkConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Pagination
    pub per_page: usize,
    pub pagination_dir: String,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Folio".to_string(),
            description: String::new(),
            author: "John Doe".to_string(),

            url: String::new(),
            root: "/".to_string(),

            content_dir: "posts".to_string(),
            static_dir: "static".to_string(),
            public_dir: "public".to_string(),
            blog_dir: "blog".to_string(),
            post_dir: "posts".to_string(),
            tag_dir: "tags".to_string(),

            external_link: ExternalLinkConfig::default(),
            highlight: HighlightConfig::default(),

            per_page: 8,
            pagination_dir: "page".to_string(),

            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        if config.per_page == 0 {
            anyhow::bail!("per_page must be at least 1");
        }
        Ok(config)
    }

    /// Host part of the site url, used to tell internal links from external ones
    pub fn host(&self) -> Option<String> {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let host = rest.split(['/', '?', '#']).next().unwrap_or("");
        let host = host.rsplit('@').next().unwrap_or(host);
        let host = host.split(':').next().unwrap_or(host);
        if host.is_empty() {
            None
        } else {
            Some(host.to_ascii_lowercase())
        }
    }
}

/// External link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalLinkConfig {
    pub enable: bool,
    /// Hosts that are never treated as external
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ExternalLinkConfig {
    fn default() -> Self {
        Self {
            enable: true,
            exclude: Vec::new(),
        }
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    /// syntect theme name
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            theme: "base16-ocean.dark".to_string(),
        }
    }
}
