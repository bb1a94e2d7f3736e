//! List site content

use anyhow::Result;

use crate::content::Collection;
use crate::Folio;

/// List posts or tags
pub fn run(folio: &Folio, content_type: &str) -> Result<()> {
    let (collection, failures) = Collection::load(&folio.loader());

    match content_type {
        "post" | "posts" => {
            println!("Posts ({}):", collection.len());
            for post in collection.posts() {
                println!(
                    "  {} - {} [{}]",
                    post.date.format("%Y-%m-%d"),
                    post.title,
                    post.id
                );
            }
            if !failures.is_empty() {
                println!("Failed ({}):", failures.len());
                for failure in &failures {
                    println!("  {} - {}", failure.id, failure.error);
                }
            }
        }
        "tag" | "tags" => {
            let tags = collection.tags();
            println!("Tags ({}):", tags.len());
            let mut counts = tags.counts();
            // Most used first, then by name
            counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            for (tag, count) in counts {
                println!("  {} ({})", tag, count);
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, tag", content_type);
        }
    }

    Ok(())
}
