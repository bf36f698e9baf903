//! Analysis orchestration.
//!
//! Drives one annotation call, the three result extractors, and detection
//! dedup, then persists results and the analysis status. Two rules shape the
//! flow: a service failure is recorded as an in-progress state with a
//! message (there is no terminal failure status), and a successful run never
//! sets the content complete — that transition belongs to a human reviewer.

use anyhow::{anyhow, bail, Result};
use sqlx::SqlitePool;

use crate::annotate::{Annotator, FeatureSet};
use crate::extract;
use crate::models::{AnalysisStatus, AnalysisSummary, Content};
use crate::store;
use crate::validate::ImageProbe;

/// Single feature for the redetect path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedetectFeature {
    Label,
    Text,
}

/// Run one full analysis pass for a content item.
///
/// On a re-analysis, previously recorded source URLs are loaded first so the
/// web-detection extraction only yields pages never seen before — running
/// the same service response twice produces zero new detections.
pub async fn run_analysis(
    pool: &SqlitePool,
    annotator: &dyn Annotator,
    probe: &dyn ImageProbe,
    content_id: &str,
    features: FeatureSet,
    reanalysis: bool,
) -> Result<AnalysisSummary> {
    let content = require_content(pool, content_id).await?;

    if !reanalysis {
        store::set_analysis_state(pool, content_id, AnalysisStatus::InProgress, None).await?;
    }

    let annotation = match annotator.annotate(&content.image_url, &features).await {
        Ok(annotation) => annotation,
        Err(e) => {
            // Record the failure on the content, then surface it. Nothing
            // else is persisted for this run.
            store::set_analysis_state(
                pool,
                content_id,
                AnalysisStatus::InProgress,
                Some(&e.to_string()),
            )
            .await?;
            return Err(anyhow!(e).context("annotation call failed"));
        }
    };

    let mut summary = AnalysisSummary::default();

    if features.label {
        if let Some(labels) = extract::extract_labels(&annotation) {
            summary.labels = labels.len();
            store::replace_labels(pool, content_id, &labels).await?;
        }
    }

    if features.text {
        if let Some(text) = extract::extract_text(&annotation) {
            summary.text_found = true;
            store::replace_text(pool, content_id, &text).await?;
        }
    }

    if features.web {
        let existing = if reanalysis {
            store::existing_source_urls(pool, content_id).await?
        } else {
            Default::default()
        };
        let candidates = extract::extract_web_detections(&annotation, probe, &existing).await;
        summary.new_detections = store::insert_detections(pool, content_id, &candidates).await?;
    }

    tracing::info!(
        content_id,
        labels = summary.labels,
        text_found = summary.text_found,
        new_detections = summary.new_detections,
        reanalysis,
        "analysis run finished"
    );

    Ok(summary)
}

/// Re-run a single feature and unconditionally overwrite its stored data.
///
/// Unlike [`run_analysis`] this path has no dependency on prior state: no
/// dedup, no merge, and a `None` extraction clears the stored datum.
pub async fn run_redetect(
    pool: &SqlitePool,
    annotator: &dyn Annotator,
    content_id: &str,
    feature: RedetectFeature,
) -> Result<AnalysisSummary> {
    let content = require_content(pool, content_id).await?;

    let features = match feature {
        RedetectFeature::Label => FeatureSet {
            label: true,
            ..Default::default()
        },
        RedetectFeature::Text => FeatureSet {
            text: true,
            ..Default::default()
        },
    };

    let annotation = match annotator.annotate(&content.image_url, &features).await {
        Ok(annotation) => annotation,
        Err(e) => {
            store::set_analysis_state(
                pool,
                content_id,
                AnalysisStatus::InProgress,
                Some(&e.to_string()),
            )
            .await?;
            return Err(anyhow!(e).context("annotation call failed"));
        }
    };

    let mut summary = AnalysisSummary::default();

    match feature {
        RedetectFeature::Label => match extract::extract_labels(&annotation) {
            Some(labels) => {
                summary.labels = labels.len();
                store::replace_labels(pool, content_id, &labels).await?;
            }
            None => store::clear_labels(pool, content_id).await?,
        },
        RedetectFeature::Text => match extract::extract_text(&annotation) {
            Some(text) => {
                summary.text_found = true;
                store::replace_text(pool, content_id, &text).await?;
            }
            None => store::clear_text(pool, content_id).await?,
        },
    }

    Ok(summary)
}

async fn require_content(pool: &SqlitePool, content_id: &str) -> Result<Content> {
    match store::get_content(pool, content_id).await? {
        Some(content) => Ok(content),
        None => bail!("content not found: {}", content_id),
    }
}
