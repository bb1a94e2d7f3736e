//! Create a new post

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::content::FrontMatter;
use crate::Folio;

/// Create a new post in the content directory and return its path.
///
/// The file name, and so the post id, is `slug` or the slugified title.
pub fn create_post(folio: &Folio, title: &str, slug: Option<&str>) -> Result<PathBuf> {
    let id = slug::slugify(slug.unwrap_or(title));
    if id.is_empty() {
        anyhow::bail!("Cannot derive a file name from {:?}", slug.unwrap_or(title));
    }

    fs::create_dir_all(&folio.content_dir)?;
    let file_path = folio.content_dir.join(format!("{}.md", id));

    // Check if file already exists
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let today = chrono::Local::now().date_naive();
    let front_matter = FrontMatter {
        title: Some(title.to_string()),
        date: Some(today.format("%Y-%m-%d").to_string()),
        excerpt: Some(String::new()),
        cover_image: Some(String::new()),
        image_alt: Some(String::new()),
        tags: Some(Vec::new()),
    };
    let yaml = serde_yaml::to_string(&front_matter)?;
    let content = format!("---\n{}---\n\n", yaml);

    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}
