//! Reviewer actions: the human side of the two state machines.
//!
//! Verdicts on detection records and completion of content items are only
//! ever made here — the analysis pipeline never touches review status and
//! never sets a content complete.

use anyhow::{bail, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{AnalysisStatus, ReviewStatus};
use crate::store;

/// Record a reviewer's verdict on a detection.
///
/// Only the three non-pending verdicts are accepted; moving a record off
/// pending also records who decided and when.
pub async fn record_verdict(
    pool: &SqlitePool,
    detection_id: &str,
    verdict: ReviewStatus,
    reviewer: &str,
) -> Result<()> {
    if verdict == ReviewStatus::Pending {
        bail!("a verdict must be match, no_match, or cannot_compare");
    }
    if reviewer.is_empty() {
        bail!("reviewer identity is required");
    }

    let result = sqlx::query(
        "UPDATE detections SET review_status = ?, reviewed_by = ?, reviewed_at = ? WHERE id = ?",
    )
    .bind(verdict.as_str())
    .bind(reviewer)
    .bind(Utc::now().timestamp())
    .bind(detection_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("detection not found: {}", detection_id);
    }

    Ok(())
}

/// Mark a content item complete, with an optional user-facing note.
///
/// This is the explicit, human transition the analysis pipeline never makes.
pub async fn complete_content(
    pool: &SqlitePool,
    content_id: &str,
    note: Option<&str>,
) -> Result<()> {
    if store::get_content(pool, content_id).await?.is_none() {
        bail!("content not found: {}", content_id);
    }

    store::set_analysis_state(pool, content_id, AnalysisStatus::Complete, note).await
}
