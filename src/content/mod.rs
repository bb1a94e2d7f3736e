//! Content module - loads, orders, paginates, indexes and renders posts

mod collection;
mod components;
mod frontmatter;
pub mod loader;
mod markdown;
pub mod paginate;
mod post;
mod tags;

pub use collection::Collection;
pub use components::{Component, ComponentProps, ComponentRegistry, InfoText};
pub use frontmatter::{parse_date_string, FrontMatter};
pub use loader::{ContentLoader, LoadFailure, LoadReport};
pub use markdown::{Heading, MarkdownRenderer, RenderedBody};
pub use paginate::{parse_page_param, sort_posts, Page, Paginator};
pub use post::{Dated, Post, PostMeta};
pub use tags::TagIndex;
