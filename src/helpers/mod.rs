//! Helper functions shared by the renderer, templates and server
//!
//! URL helpers know the site layout (blog index, post and tag pages), so the
//! generator and the dev server link to the same places.

mod html;
mod url;

pub use html::*;
pub use url::*;
