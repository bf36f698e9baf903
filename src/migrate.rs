use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema creation, shared with tests that run on a temp pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contents (
            id TEXT PRIMARY KEY,
            image_url TEXT NOT NULL,
            title TEXT,
            analysis_status TEXT NOT NULL DEFAULT 'pending',
            status_message TEXT,
            text_full TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS labels (
            content_id TEXT NOT NULL,
            label_index INTEGER NOT NULL,
            description TEXT NOT NULL,
            score REAL NOT NULL,
            PRIMARY KEY (content_id, label_index),
            FOREIGN KEY (content_id) REFERENCES contents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS text_words (
            content_id TEXT NOT NULL,
            word_index INTEGER NOT NULL,
            word TEXT NOT NULL,
            PRIMARY KEY (content_id, word_index),
            FOREIGN KEY (content_id) REFERENCES contents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // UNIQUE(content_id, source_url) backs the cross-request dedup
    // invariant: a source page is recorded at most once per content.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS detections (
            id TEXT PRIMARY KEY,
            content_id TEXT NOT NULL,
            source_url TEXT NOT NULL,
            image_url TEXT NOT NULL,
            page_title TEXT,
            detection_type TEXT NOT NULL,
            review_status TEXT NOT NULL DEFAULT 'pending',
            reviewed_by TEXT,
            reviewed_at INTEGER,
            created_at INTEGER NOT NULL,
            UNIQUE(content_id, source_url),
            FOREIGN KEY (content_id) REFERENCES contents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_detections_content_id ON detections(content_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_detections_review_status ON detections(review_status)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contents_analysis_status ON contents(analysis_status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
