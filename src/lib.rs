//! folio: the blog half of a personal portfolio site
//!
//! Posts are Markdown files with front-matter in a content directory. The
//! crate loads them, sorts and paginates them, indexes their tags, renders
//! their bodies and writes one static page per post, tag and index page.
//! A development server renders the same pages per request.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

use content::ContentLoader;
use generator::BuildReport;

/// Name of the site configuration file in the base directory
pub const CONFIG_FILE: &str = "_config.yml";

/// A site rooted at a base directory
#[derive(Debug, Clone)]
pub struct Folio {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Directory holding the post sources
    pub content_dir: PathBuf,
    /// Directory copied verbatim into the output
    pub static_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Folio {
    /// Open the site in `base_dir`, using default settings when it has no
    /// `_config.yml`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let content_dir = base_dir.join(&config.content_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            content_dir,
            static_dir,
            public_dir,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Loader over this site's content directory
    pub fn loader(&self) -> ContentLoader {
        ContentLoader::new(&self.content_dir)
    }

    /// Generate the static site
    pub fn generate(&self) -> Result<BuildReport> {
        commands::generate::run(self)
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Create a new post
    pub fn new_post(&self, title: &str, slug: Option<&str>) -> Result<PathBuf> {
        commands::new::create_post(self, title, slug)
    }
}
