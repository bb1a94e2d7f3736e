//! Post and PostMeta models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A blog post parsed from a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Identifier, the file stem of the source file
    pub id: String,

    /// Post title
    pub title: String,

    /// Publication date, the only sort key
    pub date: NaiveDate,

    /// Short summary shown in listings
    pub excerpt: String,

    /// Cover image file name, relative to the post's image folder
    pub cover_image: String,

    /// Alt text for the cover image
    pub image_alt: String,

    /// Tags in the order they were written, without duplicates
    pub tags: Vec<String>,

    /// Raw markdown body
    pub body: String,

    /// Full source file path
    pub source: PathBuf,
}

impl Post {
    /// Listing projection of this post, without the body
    pub fn meta(&self) -> PostMeta {
        PostMeta {
            id: self.id.clone(),
            title: self.title.clone(),
            date: self.date,
            excerpt: self.excerpt.clone(),
            cover_image: self.cover_image.clone(),
            image_alt: self.image_alt.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Whether the post carries `tag` (exact, case-sensitive)
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The subset of a post needed by index and tag pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMeta {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub excerpt: String,
    pub cover_image: String,
    pub image_alt: String,
    pub tags: Vec<String>,
}

impl PostMeta {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Anything that can be ordered newest first
pub trait Dated {
    fn id(&self) -> &str;
    fn date(&self) -> NaiveDate;
}

impl Dated for Post {
    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for PostMeta {
    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_drops_body() {
        let post = Post {
            id: "hello".to_string(),
            title: "Hello".to_string(),
            date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            excerpt: "hi".to_string(),
            cover_image: "cover.jpg".to_string(),
            image_alt: "a cover".to_string(),
            tags: vec!["rust".to_string()],
            body: "# Hello".to_string(),
            source: PathBuf::from("posts/hello.md"),
        };

        let meta = post.meta();
        assert_eq!(meta.id, "hello");
        assert_eq!(meta.cover_image, "cover.jpg");
        assert!(meta.has_tag("rust"));
        assert!(!meta.has_tag("Rust"));

        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("body").is_none());
    }
}
