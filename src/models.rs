//! Core data models for the analysis and review pipeline.
//!
//! These types represent the content items under analysis, the detection
//! records produced for them, and the two independent state machines that
//! drive the product: analysis status (automated) and review status (human).

use chrono::{DateTime, Utc};

/// Automated analysis state of a content item.
///
/// `Complete` is only ever set by an explicit reviewer action, never by the
/// analysis pipeline itself — the pipeline stops at `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Pending,
    InProgress,
    Complete,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::InProgress => "in_progress",
            AnalysisStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AnalysisStatus::Pending),
            "in_progress" => Some(AnalysisStatus::InProgress),
            "complete" => Some(AnalysisStatus::Complete),
            _ => None,
        }
    }
}

/// Human verdict on a detection record, independent of analysis status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Pending,
    Match,
    NoMatch,
    CannotCompare,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Match => "match",
            ReviewStatus::NoMatch => "no_match",
            ReviewStatus::CannotCompare => "cannot_compare",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReviewStatus::Pending),
            "match" => Some(ReviewStatus::Match),
            "no_match" => Some(ReviewStatus::NoMatch),
            "cannot_compare" => Some(ReviewStatus::CannotCompare),
            _ => None,
        }
    }
}

/// Match tier reported by the annotation service for a detection.
///
/// `Similar` is part of the stored set but is not produced by the
/// web-detection extractor; it is reserved for a visual-similarity path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionType {
    Full,
    Partial,
    Similar,
}

impl DetectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionType::Full => "full",
            DetectionType::Partial => "partial",
            DetectionType::Similar => "similar",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(DetectionType::Full),
            "partial" => Some(DetectionType::Partial),
            "similar" => Some(DetectionType::Similar),
            _ => None,
        }
    }
}

/// A registered image under analysis.
#[derive(Debug, Clone)]
pub struct Content {
    pub id: String,
    pub image_url: String,
    pub title: Option<String>,
    pub analysis_status: AnalysisStatus,
    /// Error description while `InProgress`, completion note when `Complete`,
    /// always `None` while `Pending`.
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One label returned by the annotation service, score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEntry {
    pub description: String,
    pub score: f64,
}

/// Recognized text: the full run plus the individual tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct TextData {
    pub full_text: String,
    pub words: Vec<String>,
}

/// A candidate instance of the original image found elsewhere on the web,
/// produced by web-detection extraction and not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCandidate {
    pub source_url: String,
    pub image_url: String,
    pub page_title: Option<String>,
    pub detection_type: DetectionType,
}

/// A stored, reviewable claim that an external image matches a content item.
#[derive(Debug, Clone)]
pub struct DetectionRecord {
    pub id: String,
    pub content_id: String,
    pub source_url: String,
    pub image_url: String,
    pub page_title: Option<String>,
    pub detection_type: DetectionType,
    pub review_status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Outcome counts reported after one analysis run. A summary, not a state
/// transition: analysis status stays `InProgress` regardless.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSummary {
    pub labels: usize,
    pub text_found: bool,
    pub new_detections: usize,
}
