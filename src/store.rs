//! SQLite reads and writes for contents, labels, text, and detections.
//!
//! Label and text data are fully replaced on each write (delete + insert in
//! one transaction); detections are insert-only from the analysis pipeline
//! and only their review fields ever change afterwards.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    AnalysisStatus, Content, DetectionCandidate, DetectionRecord, DetectionType, LabelEntry,
    ReviewStatus, TextData,
};

pub async fn create_content(
    pool: &SqlitePool,
    image_url: &str,
    title: Option<&str>,
) -> Result<Content> {
    let now = Utc::now();
    let content = Content {
        id: Uuid::new_v4().to_string(),
        image_url: image_url.to_string(),
        title: title.map(|t| t.to_string()),
        analysis_status: AnalysisStatus::Pending,
        status_message: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO contents (id, image_url, title, analysis_status, status_message, created_at, updated_at)
        VALUES (?, ?, ?, ?, NULL, ?, ?)
        "#,
    )
    .bind(&content.id)
    .bind(&content.image_url)
    .bind(&content.title)
    .bind(content.analysis_status.as_str())
    .bind(now.timestamp())
    .bind(now.timestamp())
    .execute(pool)
    .await?;

    Ok(content)
}

pub async fn get_content(pool: &SqlitePool, content_id: &str) -> Result<Option<Content>> {
    let row = sqlx::query(
        r#"
        SELECT id, image_url, title, analysis_status, status_message, created_at, updated_at
        FROM contents WHERE id = ?
        "#,
    )
    .bind(content_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let status: String = row.try_get("analysis_status")?;
        Ok(Content {
            id: row.try_get("id")?,
            image_url: row.try_get("image_url")?,
            title: row.try_get("title")?,
            analysis_status: AnalysisStatus::parse(&status)
                .ok_or_else(|| anyhow!("unknown analysis status: {}", status))?,
            status_message: row.try_get("status_message")?,
            created_at: timestamp(row.try_get("created_at")?),
            updated_at: timestamp(row.try_get("updated_at")?),
        })
    })
    .transpose()
}

/// Persist one analysis-status transition (status plus optional message).
pub async fn set_analysis_state(
    pool: &SqlitePool,
    content_id: &str,
    status: AnalysisStatus,
    message: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE contents SET analysis_status = ?, status_message = ?, updated_at = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(message)
    .bind(Utc::now().timestamp())
    .bind(content_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Source URLs already recorded for a content item, across all past runs.
pub async fn existing_source_urls(
    pool: &SqlitePool,
    content_id: &str,
) -> Result<HashSet<String>> {
    let urls: Vec<String> =
        sqlx::query_scalar("SELECT source_url FROM detections WHERE content_id = ?")
            .bind(content_id)
            .fetch_all(pool)
            .await?;
    Ok(urls.into_iter().collect())
}

/// Overwrite the stored label data for a content item.
pub async fn replace_labels(
    pool: &SqlitePool,
    content_id: &str,
    labels: &[LabelEntry],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM labels WHERE content_id = ?")
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

    for (index, label) in labels.iter().enumerate() {
        sqlx::query(
            "INSERT INTO labels (content_id, label_index, description, score) VALUES (?, ?, ?, ?)",
        )
        .bind(content_id)
        .bind(index as i64)
        .bind(&label.description)
        .bind(label.score)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn clear_labels(pool: &SqlitePool, content_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM labels WHERE content_id = ?")
        .bind(content_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_labels(pool: &SqlitePool, content_id: &str) -> Result<Vec<LabelEntry>> {
    let rows = sqlx::query(
        "SELECT description, score FROM labels WHERE content_id = ? ORDER BY label_index",
    )
    .bind(content_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(LabelEntry {
                description: row.try_get("description")?,
                score: row.try_get("score")?,
            })
        })
        .collect()
}

/// Overwrite the stored text data for a content item.
pub async fn replace_text(pool: &SqlitePool, content_id: &str, text: &TextData) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE contents SET text_full = ?, updated_at = ? WHERE id = ?")
        .bind(&text.full_text)
        .bind(Utc::now().timestamp())
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM text_words WHERE content_id = ?")
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

    for (index, word) in text.words.iter().enumerate() {
        sqlx::query("INSERT INTO text_words (content_id, word_index, word) VALUES (?, ?, ?)")
            .bind(content_id)
            .bind(index as i64)
            .bind(word)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn clear_text(pool: &SqlitePool, content_id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE contents SET text_full = NULL, updated_at = ? WHERE id = ?")
        .bind(Utc::now().timestamp())
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM text_words WHERE content_id = ?")
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn get_text(pool: &SqlitePool, content_id: &str) -> Result<Option<TextData>> {
    let full_text: Option<String> =
        sqlx::query_scalar::<_, Option<String>>("SELECT text_full FROM contents WHERE id = ?")
            .bind(content_id)
            .fetch_optional(pool)
            .await?
            .flatten();

    let Some(full_text) = full_text else {
        return Ok(None);
    };

    let words: Vec<String> = sqlx::query_scalar(
        "SELECT word FROM text_words WHERE content_id = ? ORDER BY word_index",
    )
    .bind(content_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(TextData { full_text, words }))
}

/// Insert accepted candidates as new detection records, review pending.
pub async fn insert_detections(
    pool: &SqlitePool,
    content_id: &str,
    candidates: &[DetectionCandidate],
) -> Result<usize> {
    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for candidate in candidates {
        sqlx::query(
            r#"
            INSERT INTO detections
                (id, content_id, source_url, image_url, page_title, detection_type, review_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(content_id)
        .bind(&candidate.source_url)
        .bind(&candidate.image_url)
        .bind(&candidate.page_title)
        .bind(candidate.detection_type.as_str())
        .bind(ReviewStatus::Pending.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(candidates.len())
}

pub async fn list_detections(
    pool: &SqlitePool,
    content_id: &str,
    review_status: Option<ReviewStatus>,
) -> Result<Vec<DetectionRecord>> {
    let base = r#"
        SELECT id, content_id, source_url, image_url, page_title, detection_type,
               review_status, reviewed_by, reviewed_at, created_at
        FROM detections WHERE content_id = ?
    "#;

    let rows = match review_status {
        Some(status) => {
            sqlx::query(&format!("{} AND review_status = ? ORDER BY created_at", base))
                .bind(content_id)
                .bind(status.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query(&format!("{} ORDER BY created_at", base))
                .bind(content_id)
                .fetch_all(pool)
                .await?
        }
    };

    rows.into_iter()
        .map(|row| {
            let detection_type: String = row.try_get("detection_type")?;
            let review_status: String = row.try_get("review_status")?;
            let reviewed_at: Option<i64> = row.try_get("reviewed_at")?;
            Ok(DetectionRecord {
                id: row.try_get("id")?,
                content_id: row.try_get("content_id")?,
                source_url: row.try_get("source_url")?,
                image_url: row.try_get("image_url")?,
                page_title: row.try_get("page_title")?,
                detection_type: DetectionType::parse(&detection_type)
                    .ok_or_else(|| anyhow!("unknown detection type: {}", detection_type))?,
                review_status: ReviewStatus::parse(&review_status)
                    .ok_or_else(|| anyhow!("unknown review status: {}", review_status))?,
                reviewed_by: row.try_get("reviewed_by")?,
                reviewed_at: reviewed_at.map(timestamp),
                created_at: timestamp(row.try_get("created_at")?),
            })
        })
        .collect()
}

/// Counts by review status for one content item, for the stats command.
pub async fn detection_counts(
    pool: &SqlitePool,
    content_id: &str,
) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        "SELECT review_status, COUNT(*) AS n FROM detections WHERE content_id = ? GROUP BY review_status",
    )
    .bind(content_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| Ok((row.try_get("review_status")?, row.try_get("n")?)))
        .collect()
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}
