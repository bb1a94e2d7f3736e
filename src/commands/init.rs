//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const CONFIG_TEMPLATE: &str = r#"# Site
title: My Portfolio
description: ''
author: John Doe

# URL
## The site's own host is never treated as an external link
url: ''
root: /

# Directory
content_dir: posts
static_dir: static
public_dir: public
blog_dir: blog
post_dir: posts
tag_dir: tags

# Writing
external_link:
  enable: true
  exclude: []
highlight:
  enable: true
  theme: base16-ocean.dark

# Pagination
per_page: 8
pagination_dir: page
"#;

const STYLESHEET: &str = r#"body { max-width: 48rem; margin: 0 auto; padding: 1rem; font-family: sans-serif; }
.site-header { display: flex; justify-content: space-between; }
.post-list { list-style: none; padding: 0; }
.post-tags { list-style: none; padding: 0; display: flex; gap: .5rem; }
.pager { display: flex; justify-content: space-between; }
.pager .disabled { opacity: .4; }
.pager-pages { display: flex; gap: .5em; list-style: none; margin: 0; padding: 0; }
.pager-page.active { font-weight: bold; }
.info-text { border-left: 4px solid #3b82f6; padding: .5rem 1rem; background: #eff6ff; }
.info-text-warning { border-color: #f59e0b; background: #fffbeb; }
.anchor { margin-right: .25rem; text-decoration: none; opacity: .3; }
figure.highlight pre { padding: 1rem; overflow-x: auto; }
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }

    // Create directory structure
    fs::create_dir_all(target_dir.join("posts"))?;
    fs::create_dir_all(target_dir.join("static/css"))?;
    fs::create_dir_all(target_dir.join("static/images/posts/hello-world"))?;

    fs::write(&config_path, CONFIG_TEMPLATE)?;
    fs::write(target_dir.join("static/css/style.css"), STYLESHEET)?;

    // Create a sample post
    let today = chrono::Local::now().date_naive();
    let sample_post = format!(
        r#"---
title: Hello World
date: {}
excerpt: The first post on this blog.
cover_image: ''
image_alt: ''
tags: [meta]
---

Welcome! This post lives in `posts/hello-world.md`.

## Writing posts

Create a new one with:

```bash
$ folio new "My New Post"
```

<InfoText tone="warning">
Every post needs `title`, `date`, `excerpt`, `cover_image`, `image_alt` and `tags`
in its front-matter. Only `title` and `date` must have a value.
</InfoText>

## Building the site

```bash
$ folio generate
$ folio server
```
"#,
        today.format("%Y-%m-%d")
    );

    fs::write(target_dir.join("posts/hello-world.md"), sample_post)?;
    tracing::info!("Initialized site in {:?}", target_dir);

    Ok(())
}
