//! Client for the external image-annotation service.
//!
//! One HTTP POST per analysis call: the image URL plus the requested feature
//! list. The response shape is dynamic — every annotation array is optional —
//! so it is modelled with fully-optional serde structs rather than assumed
//! presence. Retry policy deliberately lives with the caller; this client
//! never batches or retries.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use async_trait::async_trait;

/// Cap on label results requested from the service.
pub const MAX_LABEL_RESULTS: u32 = 10;
/// Cap on candidate pages requested from web detection.
pub const MAX_WEB_PAGES: u32 = 50;

/// Which annotation features a request asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub label: bool,
    pub text: bool,
    pub web: bool,
}

impl FeatureSet {
    pub fn all() -> Self {
        Self {
            label: true,
            text: true,
            web: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.label || self.text || self.web)
    }
}

/// Failures from the annotation call, in order of how early they surface.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// No service credential configured. Surfaced before any network I/O.
    #[error("annotation service credential is not configured")]
    Configuration,

    /// Empty feature set. Caller-correctable, no network call made.
    #[error("no annotation features requested")]
    InvalidRequest,

    /// Could not reach the service at all.
    #[error("annotation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx from the service, with the upstream error body.
    #[error("annotation service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The service answered 2xx but with zero response entries for the
    /// single image submitted.
    #[error("annotation service returned an empty response")]
    EmptyResponse,
}

/// Raw per-image response entry. All arrays optional by design.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnnotation {
    #[serde(default)]
    pub label_annotations: Option<Vec<LabelAnnotation>>,
    #[serde(default)]
    pub text_annotations: Option<Vec<TextAnnotation>>,
    #[serde(default)]
    pub web_detection: Option<WebDetection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelAnnotation {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebDetection {
    #[serde(default)]
    pub pages_with_matching_images: Option<Vec<MatchingPage>>,
}

/// A page elsewhere on the web reported to contain matching images.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub full_matching_images: Option<Vec<MatchingImage>>,
    #[serde(default)]
    pub partial_matching_images: Option<Vec<MatchingImage>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingImage {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageAnnotation>,
}

/// Seam between the orchestrator and the HTTP client, so analysis runs can
/// be driven by stubbed service responses in tests.
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(
        &self,
        image_url: &str,
        features: &FeatureSet,
    ) -> Result<ImageAnnotation, AnnotationError>;
}

/// HTTP client for the annotation service. Holds the credential explicitly
/// rather than reading ambient environment state at call time.
pub struct AnnotationClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl AnnotationClient {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl Annotator for AnnotationClient {
    async fn annotate(
        &self,
        image_url: &str,
        features: &FeatureSet,
    ) -> Result<ImageAnnotation, AnnotationError> {
        let api_key = self.api_key.as_deref().ok_or(AnnotationError::Configuration)?;
        if features.is_empty() {
            return Err(AnnotationError::InvalidRequest);
        }

        let body = build_request(image_url, features);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnnotationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnnotateResponse = response.json().await?;
        parsed
            .responses
            .into_iter()
            .next()
            .ok_or(AnnotationError::EmptyResponse)
    }
}

/// Translate the feature set into the service's request body.
fn build_request(image_url: &str, features: &FeatureSet) -> serde_json::Value {
    let mut feature_list = Vec::new();
    if features.label {
        feature_list.push(json!({
            "type": "LABEL_DETECTION",
            "maxResults": MAX_LABEL_RESULTS,
        }));
    }
    if features.text {
        feature_list.push(json!({ "type": "TEXT_DETECTION" }));
    }
    if features.web {
        feature_list.push(json!({
            "type": "WEB_DETECTION",
            "maxResults": MAX_WEB_PAGES,
        }));
    }

    json!({
        "requests": [{
            "image": { "source": { "imageUri": image_url } },
            "features": feature_list,
        }]
    })
}
