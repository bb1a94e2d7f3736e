//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped in a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Encode one path segment, e.g. a tag name
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// URL of page `page` of the blog index. Page 1 is the index itself.
pub fn blog_url(config: &SiteConfig, page: usize) -> String {
    if page <= 1 {
        url_for(config, &format!("{}/", config.blog_dir))
    } else {
        url_for(
            config,
            &format!("{}/{}/{}/", config.blog_dir, config.pagination_dir, page),
        )
    }
}

pub fn post_url(config: &SiteConfig, id: &str) -> String {
    url_for(
        config,
        &format!("{}/{}/", config.post_dir, encode_segment(id)),
    )
}

pub fn tag_url(config: &SiteConfig, tag: &str) -> String {
    url_for(
        config,
        &format!("{}/{}/", config.tag_dir, encode_segment(tag)),
    )
}

pub fn tags_url(config: &SiteConfig) -> String {
    url_for(config, &format!("{}/", config.tag_dir))
}

/// Cover image location for a post, `None` when it has no cover
pub fn cover_url(config: &SiteConfig, id: &str, cover_image: &str) -> Option<String> {
    if cover_image.is_empty() {
        return None;
    }
    if cover_image.starts_with("http://") || cover_image.starts_with("https://") {
        return Some(cover_image.to_string());
    }
    let path = cover_image
        .trim_start_matches('/')
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/");
    Some(url_for(
        config,
        &format!("images/posts/{}/{}", encode_segment(id), path),
    ))
}
