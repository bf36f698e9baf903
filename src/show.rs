//! Read-side CLI commands: content detail, detection listings, stats.

use anyhow::{bail, Result};
use sqlx::SqlitePool;

use crate::models::ReviewStatus;
use crate::store;

pub async fn run_show(pool: &SqlitePool, content_id: &str) -> Result<()> {
    let Some(content) = store::get_content(pool, content_id).await? else {
        bail!("content not found: {}", content_id);
    };

    println!("content {}", content.id);
    println!("  image url: {}", content.image_url);
    if let Some(title) = &content.title {
        println!("  title: {}", title);
    }
    println!("  analysis status: {}", content.analysis_status.as_str());
    if let Some(message) = &content.status_message {
        println!("  status message: {}", message);
    }
    println!("  created: {}", content.created_at.to_rfc3339());
    println!("  updated: {}", content.updated_at.to_rfc3339());

    let labels = store::get_labels(pool, content_id).await?;
    if labels.is_empty() {
        println!("  labels: (none)");
    } else {
        println!("  labels:");
        for label in &labels {
            println!("    {} ({:.2})", label.description, label.score);
        }
    }

    match store::get_text(pool, content_id).await? {
        Some(text) => {
            println!("  text: {}", text.full_text);
            println!("  words: {}", text.words.len());
        }
        None => println!("  text: (none)"),
    }

    Ok(())
}

pub async fn run_detections(
    pool: &SqlitePool,
    content_id: &str,
    status: Option<&str>,
) -> Result<()> {
    let filter = match status {
        Some(s) => match ReviewStatus::parse(s) {
            Some(status) => Some(status),
            None => bail!(
                "unknown review status: '{}'. Must be pending, match, no_match, or cannot_compare",
                s
            ),
        },
        None => None,
    };

    let detections = store::list_detections(pool, content_id, filter).await?;
    if detections.is_empty() {
        println!("no detections");
        return Ok(());
    }

    for d in &detections {
        println!(
            "{}  [{}] [{}]  {}",
            d.id,
            d.detection_type.as_str(),
            d.review_status.as_str(),
            d.source_url
        );
        println!("    image: {}", d.image_url);
        if let Some(title) = &d.page_title {
            println!("    page title: {}", title);
        }
        if let Some(reviewer) = &d.reviewed_by {
            let when = d
                .reviewed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            println!("    reviewed by {} at {}", reviewer, when);
        }
    }
    println!("{} detection(s)", detections.len());

    Ok(())
}

pub async fn run_stats(pool: &SqlitePool, content_id: &str) -> Result<()> {
    if store::get_content(pool, content_id).await?.is_none() {
        bail!("content not found: {}", content_id);
    }

    let counts = store::detection_counts(pool, content_id).await?;
    println!("detections for {}", content_id);
    if counts.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    let mut total = 0;
    for (status, n) in &counts {
        println!("  {}: {}", status, n);
        total += n;
    }
    println!("  total: {}", total);

    Ok(())
}
