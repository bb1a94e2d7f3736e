//! Built-in site templates using the Tera template engine
//!
//! The templates are embedded in the binary. Autoescaping is off, so every
//! text field of the data structs below is HTML-escaped when it is built and
//! URLs are written as-is.

mod pages;

use chrono::format::{Item, StrftimeItems};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{Heading, Page, PostMeta};
use crate::helpers::{blog_url, cover_url, html_escape, post_url, tag_url, tags_url, url_for};

pub use pages::SitePages;

/// Date format used when a template does not pass one
const DISPLAY_DATE_FORMAT: &str = "%B %-d, %Y";

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("blog.html", include_str!("site/blog.html")),
            ("post.html", include_str!("site/post.html")),
            ("tag.html", include_str!("site/tag.html")),
            ("tags.html", include_str!("site/tags.html")),
            (
                "partials/post_list.html",
                include_str!("site/partials/post_list.html"),
            ),
            (
                "partials/pager.html",
                include_str!("site/partials/pager.html"),
            ),
        ])?;

        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(template_name, context)
    }
}

/// Tera filter: format a `YYYY-MM-DD` date string with a strftime pattern
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => DISPLAY_DATE_FORMAT.to_string(),
    };

    if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
        return Err(tera::Error::msg(format!("invalid date format `{}`", format)));
    }

    match chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        Ok(date) => Ok(tera::Value::String(date.format(&format).to_string())),
        // Not a date, leave it alone
        Err(_) => Ok(tera::Value::String(s)),
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub root: String,
    pub blog_url: String,
    pub tags_url: String,
}

impl SiteData {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            title: html_escape(&config.title),
            description: html_escape(&config.description),
            author: html_escape(&config.author),
            root: url_for(config, ""),
            blog_url: blog_url(config, 1),
            tags_url: tags_url(config),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagLink {
    pub name: String,
    pub url: String,
}

impl TagLink {
    pub fn new(config: &SiteConfig, tag: &str) -> Self {
        Self {
            name: html_escape(tag),
            url: tag_url(config, tag),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagSummary {
    pub name: String,
    pub url: String,
    pub count: usize,
}

/// A post as shown in listings and on its own page
#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub id: String,
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub excerpt: String,
    pub url: String,
    pub cover_url: Option<String>,
    pub image_alt: String,
    pub tags: Vec<TagLink>,
}

impl PostData {
    pub fn new(config: &SiteConfig, meta: &PostMeta) -> Self {
        Self {
            id: meta.id.clone(),
            title: html_escape(&meta.title),
            date: meta.date.format("%Y-%m-%d").to_string(),
            excerpt: html_escape(&meta.excerpt),
            url: post_url(config, &meta.id),
            cover_url: cover_url(config, &meta.id, &meta.cover_image).map(|u| html_escape(&u)),
            image_alt: html_escape(&meta.image_alt),
            tags: meta.tags.iter().map(|t| TagLink::new(config, t)).collect(),
        }
    }
}

/// Pagination controls. A missing link means the control is disabled.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub per_page: usize,
    pub total: usize,
    pub total_posts: usize,
    pub current: usize,
    pub current_url: String,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    /// One link per page, in order
    pub pages: Vec<PageLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageLink {
    pub number: usize,
    pub url: String,
    pub current: bool,
}

impl PaginationData {
    pub fn new(config: &SiteConfig, page: &Page) -> Self {
        Self {
            per_page: page.page_length,
            total: page.total_pages,
            total_posts: page.total_posts,
            current: page.current_page,
            current_url: blog_url(config, page.current_page),
            prev_url: page.prev().map(|n| blog_url(config, n)),
            next_url: page.next().map(|n| blog_url(config, n)),
            pages: (1..=page.total_pages)
                .map(|number| PageLink {
                    number,
                    url: blog_url(config, number),
                    current: number == page.current_page,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub id: String,
    pub text: String,
}

impl From<&Heading> for TocEntry {
    fn from(heading: &Heading) -> Self {
        Self {
            level: heading.level,
            id: html_escape(&heading.id),
            text: html_escape(&heading.text),
        }
    }
}
