//! Tag index derived from the posts

use std::collections::BTreeMap;

use super::paginate::sort_posts;
use super::PostMeta;

/// Mapping from tag to the posts carrying it, newest first
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    tags: BTreeMap<String, Vec<PostMeta>>,
}

impl TagIndex {
    /// Build the index from a set of posts in any order
    pub fn build<'a, I>(posts: I) -> Self
    where
        I: IntoIterator<Item = &'a PostMeta>,
    {
        let mut tags: BTreeMap<String, Vec<PostMeta>> = BTreeMap::new();

        for post in posts {
            for tag in &post.tags {
                let entries = tags.entry(tag.clone()).or_default();
                // Tags are a set per post
                if !entries.iter().any(|p| p.id == post.id) {
                    entries.push(post.clone());
                }
            }
        }

        for entries in tags.values_mut() {
            sort_posts(entries);
        }

        Self { tags }
    }

    /// All tags, sorted and without duplicates
    pub fn tags(&self) -> Vec<&str> {
        self.tags.keys().map(String::as_str).collect()
    }

    /// Posts carrying `tag`, empty when no post does
    pub fn posts(&self, tag: &str) -> &[PostMeta] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identifiers of the posts carrying `tag`
    pub fn post_ids(&self, tag: &str) -> Vec<&str> {
        self.posts(tag).iter().map(|p| p.id.as_str()).collect()
    }

    /// Tags with the number of posts for each, sorted by tag
    pub fn counts(&self) -> Vec<(&str, usize)> {
        self.tags
            .iter()
            .map(|(tag, posts)| (tag.as_str(), posts.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn meta(id: &str, day: u32, tags: &[&str]) -> PostMeta {
        PostMeta {
            id: id.to_string(),
            title: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            excerpt: String::new(),
            cover_image: String::new(),
            image_alt: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_post_appears_under_each_of_its_tags() {
        let posts = vec![meta("polyglot", 1, &["go", "rust"])];
        let index = TagIndex::build(&posts);

        assert_eq!(index.post_ids("go"), vec!["polyglot"]);
        assert_eq!(index.post_ids("rust"), vec!["polyglot"]);
        assert!(index.posts("python").is_empty());
    }

    #[test]
    fn test_tags_are_deduplicated_and_sorted() {
        let posts = vec![
            meta("a", 1, &["rust", "web"]),
            meta("b", 2, &["rust"]),
            meta("c", 3, &["go", "go"]),
        ];
        let index = TagIndex::build(&posts);

        assert_eq!(index.tags(), vec!["go", "rust", "web"]);
        assert_eq!(index.counts(), vec![("go", 1), ("rust", 2), ("web", 1)]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_tag_listing_is_newest_first() {
        let posts = vec![
            meta("old", 1, &["rust"]),
            meta("new", 9, &["rust"]),
            meta("mid", 5, &["rust"]),
        ];
        let index = TagIndex::build(&posts);
        assert_eq!(index.post_ids("rust"), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_tag_match_is_case_sensitive() {
        let posts = vec![meta("a", 1, &["Rust"])];
        let index = TagIndex::build(&posts);
        assert!(index.posts("rust").is_empty());
        assert_eq!(index.post_ids("Rust"), vec!["a"]);
    }

    #[test]
    fn test_every_tag_contains_its_posts() {
        let posts = vec![
            meta("a", 1, &["x", "y"]),
            meta("b", 2, &["y", "z"]),
            meta("c", 3, &[]),
        ];
        let index = TagIndex::build(&posts);
        for post in &posts {
            for tag in &post.tags {
                assert!(index.post_ids(tag).contains(&post.id.as_str()));
            }
        }
        assert!(!index.is_empty());
    }
}
