//! Ordering and pagination of post listings

use serde::Serialize;
use std::cmp::Ordering;

use super::{Dated, PostMeta};
use crate::error::ContentError;

/// Newest first, identifier ascending when dates are equal
pub fn compare_posts<T: Dated>(a: &T, b: &T) -> Ordering {
    b.date().cmp(&a.date()).then_with(|| a.id().cmp(b.id()))
}

/// Sort posts newest first. The result never depends on the input order.
pub fn sort_posts<T: Dated>(posts: &mut [T]) {
    posts.sort_by(compare_posts);
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub posts: Vec<PostMeta>,
    pub current_page: usize,
    pub total_pages: usize,
    pub page_length: usize,
    pub total_posts: usize,
}

impl Page {
    /// Previous page number, `None` on the first page
    pub fn prev(&self) -> Option<usize> {
        (self.current_page > 1).then(|| self.current_page - 1)
    }

    /// Next page number, `None` on the last page
    pub fn next(&self) -> Option<usize> {
        (self.current_page < self.total_pages).then(|| self.current_page + 1)
    }
}

/// Slices sorted listings into pages of a fixed length
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_length: usize,
}

impl Paginator {
    /// Create a paginator. A zero page length is treated as one.
    pub fn new(page_length: usize) -> Self {
        Self {
            page_length: page_length.max(1),
        }
    }

    pub fn page_length(&self) -> usize {
        self.page_length
    }

    /// `ceil(total_posts / page_length)`, but never less than one so that
    /// an empty listing still has a (blank) first page
    pub fn total_pages(&self, total_posts: usize) -> usize {
        total_posts.div_ceil(self.page_length).max(1)
    }

    /// Return the 1-based page `page` of already sorted `posts`
    pub fn page(&self, posts: &[PostMeta], page: usize) -> Result<Page, ContentError> {
        let total_pages = self.total_pages(posts.len());
        if page == 0 || page > total_pages {
            return Err(ContentError::OutOfRange {
                page: page as i64,
                total_pages,
            });
        }

        let start = (page - 1) * self.page_length;
        let end = (start + self.page_length).min(posts.len());

        Ok(Page {
            posts: posts[start..end].to_vec(),
            current_page: page,
            total_pages,
            page_length: self.page_length,
            total_posts: posts.len(),
        })
    }

    /// Every page of the listing, in order
    pub fn pages(&self, posts: &[PostMeta]) -> Vec<Page> {
        (1..=self.total_pages(posts.len()))
            .filter_map(|n| self.page(posts, n).ok())
            .collect()
    }
}

/// Interpret a `page` query parameter.
///
/// Absent or non-numeric values mean page 1. Numbers below 1 are out of
/// range; the upper bound is checked by [`Paginator::page`].
pub fn parse_page_param(raw: Option<&str>) -> Result<usize, ContentError> {
    let Some(value) = raw.map(str::trim) else {
        return Ok(1);
    };
    match value.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(usize::try_from(n).unwrap_or(usize::MAX)),
        Ok(n) => Err(ContentError::OutOfRange {
            page: n,
            total_pages: 0,
        }),
        Err(_) => Ok(1),
    }
}
