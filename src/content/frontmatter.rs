//! Front-matter parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use super::Post;
use crate::error::ContentError;

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Like [`string_or_vec`], but keeps an absent key apart from an empty list
fn optional_string_or_vec<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    string_or_vec(deserializer).map(Some)
}

/// Front-matter data from a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub image_alt: Option<String>,
    #[serde(deserialize_with = "optional_string_or_vec", default)]
    pub tags: Option<Vec<String>>,
}

fn require<T>(id: &str, field: &str, value: Option<T>) -> Result<T, ContentError> {
    value.ok_or_else(|| ContentError::parse(id, format!("missing required field `{}`", field)))
}

impl FrontMatter {
    /// Parse front-matter from content string.
    /// Returns (front_matter, remaining_content).
    ///
    /// `id` is only used to attribute errors.
    pub fn parse<'a>(id: &str, content: &'a str) -> Result<(Self, &'a str), ContentError> {
        let content = content.trim_start_matches('\u{feff}').trim_start();

        if content.starts_with("---") {
            return Self::parse_yaml(id, content);
        }

        if content.starts_with(";;;") || content.starts_with('{') {
            return Self::parse_json(id, content);
        }

        Err(ContentError::parse(id, "missing front-matter block"))
    }

    fn parse_yaml<'a>(id: &str, content: &'a str) -> Result<(Self, &'a str), ContentError> {
        let rest = &content[3..];
        let rest = rest.trim_start_matches(['\n', '\r']);

        // An empty block closes immediately
        let (yaml_content, remaining) = if let Some(after) = rest.strip_prefix("---") {
            ("", after)
        } else if let Some(end_pos) = rest.find("\n---") {
            (&rest[..end_pos], &rest[end_pos + 4..])
        } else {
            return Err(ContentError::parse(id, "front-matter block is not closed"));
        };
        let remaining = remaining.trim_start_matches(['\n', '\r']);

        if yaml_content.trim().is_empty() {
            return Err(ContentError::parse(id, "front-matter block is empty"));
        }

        let fm = serde_yaml::from_str::<FrontMatter>(yaml_content)
            .map_err(|e| ContentError::parse(id, format!("invalid YAML front-matter: {}", e)))?;
        Ok((fm, remaining))
    }

    fn parse_json<'a>(id: &str, content: &'a str) -> Result<(Self, &'a str), ContentError> {
        // JSON front-matter ends with ;;;
        if let Some(rest) = content.strip_prefix(";;;") {
            let end_pos = rest
                .find(";;;")
                .ok_or_else(|| ContentError::parse(id, "front-matter block is not closed"))?;
            let json_content = &rest[..end_pos];
            let remaining = rest[end_pos + 3..].trim_start_matches(['\n', '\r']);

            let fm: FrontMatter = serde_json::from_str(json_content).map_err(|e| {
                ContentError::parse(id, format!("invalid JSON front-matter: {}", e))
            })?;
            return Ok((fm, remaining));
        }

        let end_pos = json_object_end(content)
            .ok_or_else(|| ContentError::parse(id, "front-matter block is not closed"))?;
        let json_content = &content[..end_pos];
        let remaining = content[end_pos..].trim_start_matches(['\n', '\r']);

        let fm: FrontMatter = serde_json::from_str(json_content)
            .map_err(|e| ContentError::parse(id, format!("invalid JSON front-matter: {}", e)))?;
        Ok((fm, remaining))
    }

    /// Validate the metadata and build a post from it
    pub fn into_post(self, id: &str, body: &str, source: &Path) -> Result<Post, ContentError> {
        let title = require(id, "title", self.title.filter(|t| !t.trim().is_empty()))?;
        let raw_date = require(id, "date", self.date)?;
        let date = parse_date_string(&raw_date)
            .ok_or_else(|| ContentError::parse(id, format!("invalid date `{}`", raw_date)))?;
        let excerpt = require(id, "excerpt", self.excerpt)?;
        let cover_image = require(id, "cover_image", self.cover_image)?;
        let image_alt = require(id, "image_alt", self.image_alt)?;
        let raw_tags = require(id, "tags", self.tags)?;

        let mut tags: Vec<String> = Vec::with_capacity(raw_tags.len());
        for tag in raw_tags {
            let tag = tag.trim().to_string();
            if tag.is_empty() {
                return Err(ContentError::parse(id, "empty tag"));
            }
            if tag.contains('/') || tag.starts_with('.') {
                return Err(ContentError::parse(
                    id,
                    format!("tag `{}` cannot be used as a path segment", tag),
                ));
            }
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Ok(Post {
            id: id.to_string(),
            // An empty alt text still describes the image by its post
            image_alt: if image_alt.trim().is_empty() {
                title.clone()
            } else {
                image_alt
            },
            title,
            date,
            excerpt,
            cover_image: cover_image.trim().to_string(),
            tags,
            body: body.to_string(),
            source: source.to_path_buf(),
        })
    }
}

/// Byte offset just past the closing brace of a leading JSON object
fn json_object_end(content: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in content.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a date string in various formats, keeping only the calendar date
pub fn parse_date_string(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    // RFC 3339 keeps the date as written, not shifted to local time
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}
