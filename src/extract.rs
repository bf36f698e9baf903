//! Transforms from raw annotation responses into storage shapes.
//!
//! Label and text extraction are pure. Web-detection extraction embeds the
//! cross-request dedup check and candidate-image validation, which is why it
//! takes the existing source-URL set and an [`ImageProbe`]. "Field absent"
//! and "field present but empty" are treated identically as nothing
//! detected; distinguishing "not requested" is the caller's job via the
//! feature set.

use std::collections::HashSet;

use crate::annotate::{ImageAnnotation, MatchingImage, MatchingPage};
use crate::models::{DetectionCandidate, DetectionType, LabelEntry, TextData};
use crate::validate::ImageProbe;

/// Map label annotations to `(description, score)` pairs.
pub fn extract_labels(annotation: &ImageAnnotation) -> Option<Vec<LabelEntry>> {
    let labels = annotation.label_annotations.as_deref()?;
    if labels.is_empty() {
        return None;
    }
    Some(
        labels
            .iter()
            .map(|l| LabelEntry {
                description: l.description.clone().unwrap_or_default(),
                score: l.score.unwrap_or(0.0),
            })
            .collect(),
    )
}

/// Extract the full recognized text plus individual tokens.
///
/// The service's first annotation is the entire text as a single run; it
/// becomes `full_text` and is excluded from `words`.
pub fn extract_text(annotation: &ImageAnnotation) -> Option<TextData> {
    let annotations = annotation.text_annotations.as_deref()?;
    let first = annotations.first()?;
    let full_text = first.description.clone().unwrap_or_default();
    let words = annotations[1..]
        .iter()
        .filter_map(|t| t.description.clone())
        .collect();
    Some(TextData { full_text, words })
}

/// Turn "pages with matching images" into new detection candidates.
///
/// Per page, in service order:
/// 1. pages without a URL are skipped;
/// 2. pages whose URL is already recorded for this content are skipped —
///    this is the only place re-analysis idempotence is enforced, and it
///    dedups by source page URL only, never by image URL;
/// 3. the first full-match image that validates wins as [`DetectionType::Full`];
/// 4. only if no full match was accepted, the first partial-match image that
///    validates wins as [`DetectionType::Partial`];
/// 5. a page where nothing validates yields no candidate, silently.
///
/// At most one candidate per distinct page, full beating partial.
pub async fn extract_web_detections(
    annotation: &ImageAnnotation,
    probe: &dyn ImageProbe,
    existing_source_urls: &HashSet<String>,
) -> Vec<DetectionCandidate> {
    let pages = annotation
        .web_detection
        .as_ref()
        .and_then(|w| w.pages_with_matching_images.as_deref())
        .unwrap_or(&[]);

    let mut candidates = Vec::new();
    let mut seen_this_run: HashSet<&str> = HashSet::new();

    for page in pages {
        let source_url = match page.url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => continue,
        };
        if existing_source_urls.contains(source_url) || !seen_this_run.insert(source_url) {
            continue;
        }

        if let Some(candidate) = first_validated(page, source_url, probe).await {
            candidates.push(candidate);
        }
    }

    candidates
}

/// Per-page first-success-wins search, full matches before partial.
async fn first_validated(
    page: &MatchingPage,
    source_url: &str,
    probe: &dyn ImageProbe,
) -> Option<DetectionCandidate> {
    if let Some(image_url) =
        first_image(page.full_matching_images.as_deref(), probe).await
    {
        return Some(candidate(page, source_url, image_url, DetectionType::Full));
    }
    if let Some(image_url) =
        first_image(page.partial_matching_images.as_deref(), probe).await
    {
        return Some(candidate(page, source_url, image_url, DetectionType::Partial));
    }
    None
}

async fn first_image(
    images: Option<&[MatchingImage]>,
    probe: &dyn ImageProbe,
) -> Option<String> {
    for image in images.unwrap_or(&[]) {
        let url = match image.url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => continue,
        };
        if probe.is_image(url).await {
            return Some(url.to_string());
        }
    }
    None
}

fn candidate(
    page: &MatchingPage,
    source_url: &str,
    image_url: String,
    detection_type: DetectionType,
) -> DetectionCandidate {
    DetectionCandidate {
        source_url: source_url.to_string(),
        image_url,
        page_title: page.page_title.clone(),
        detection_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{LabelAnnotation, TextAnnotation, WebDetection};
    use async_trait::async_trait;

    /// Probe stub that accepts exactly the URLs it was given.
    struct FixedProbe {
        accepted: HashSet<String>,
    }

    impl FixedProbe {
        fn accepting(urls: &[&str]) -> Self {
            Self {
                accepted: urls.iter().map(|u| u.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl ImageProbe for FixedProbe {
        async fn is_image(&self, url: &str) -> bool {
            self.accepted.contains(url)
        }
    }

    fn page(
        url: Option<&str>,
        full: &[&str],
        partial: &[&str],
    ) -> MatchingPage {
        MatchingPage {
            url: url.map(|u| u.to_string()),
            page_title: Some("title".to_string()),
            full_matching_images: Some(
                full.iter()
                    .map(|u| MatchingImage {
                        url: Some(u.to_string()),
                    })
                    .collect(),
            ),
            partial_matching_images: Some(
                partial
                    .iter()
                    .map(|u| MatchingImage {
                        url: Some(u.to_string()),
                    })
                    .collect(),
            ),
        }
    }

    fn with_pages(pages: Vec<MatchingPage>) -> ImageAnnotation {
        ImageAnnotation {
            web_detection: Some(WebDetection {
                pages_with_matching_images: Some(pages),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn labels_absent_and_empty_are_both_none() {
        assert_eq!(extract_labels(&ImageAnnotation::default()), None);
        let empty = ImageAnnotation {
            label_annotations: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(extract_labels(&empty), None);
    }

    #[test]
    fn labels_map_description_and_score() {
        let annotation = ImageAnnotation {
            label_annotations: Some(vec![
                LabelAnnotation {
                    description: Some("Dog".to_string()),
                    score: Some(0.97),
                },
                LabelAnnotation {
                    description: Some("Mammal".to_string()),
                    score: Some(0.84),
                },
            ]),
            ..Default::default()
        };
        let labels = extract_labels(&annotation).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].description, "Dog");
        assert!((labels[0].score - 0.97).abs() < f64::EPSILON);
    }

    #[test]
    fn text_excludes_the_duplicated_first_token() {
        let annotation = ImageAnnotation {
            text_annotations: Some(vec![
                TextAnnotation {
                    description: Some("hello world".to_string()),
                },
                TextAnnotation {
                    description: Some("hello".to_string()),
                },
                TextAnnotation {
                    description: Some("world".to_string()),
                },
            ]),
            ..Default::default()
        };
        let text = extract_text(&annotation).unwrap();
        assert_eq!(text.full_text, "hello world");
        assert_eq!(text.words, vec!["hello", "world"]);
    }

    #[test]
    fn text_absent_and_empty_are_both_none() {
        assert_eq!(extract_text(&ImageAnnotation::default()), None);
        let empty = ImageAnnotation {
            text_annotations: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(extract_text(&empty), None);
    }

    #[tokio::test]
    async fn full_match_beats_partial_on_the_same_page() {
        let annotation = with_pages(vec![page(
            Some("https://a.example/post"),
            &["https://a.example/full.jpg"],
            &["https://a.example/partial.jpg"],
        )]);
        let probe = FixedProbe::accepting(&[
            "https://a.example/full.jpg",
            "https://a.example/partial.jpg",
        ]);
        let candidates = extract_web_detections(&annotation, &probe, &HashSet::new()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].detection_type, DetectionType::Full);
        assert_eq!(candidates[0].image_url, "https://a.example/full.jpg");
    }

    #[tokio::test]
    async fn first_validating_full_match_wins_and_search_stops() {
        let annotation = with_pages(vec![page(
            Some("https://a.example/post"),
            &[
                "https://a.example/broken.jpg",
                "https://a.example/good.jpg",
                "https://a.example/also-good.jpg",
            ],
            &[],
        )]);
        let probe = FixedProbe::accepting(&[
            "https://a.example/good.jpg",
            "https://a.example/also-good.jpg",
        ]);
        let candidates = extract_web_detections(&annotation, &probe, &HashSet::new()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].image_url, "https://a.example/good.jpg");
    }

    #[tokio::test]
    async fn partial_used_only_when_no_full_validates() {
        let annotation = with_pages(vec![page(
            Some("https://a.example/post"),
            &["https://a.example/broken.jpg"],
            &["https://a.example/partial.jpg"],
        )]);
        let probe = FixedProbe::accepting(&["https://a.example/partial.jpg"]);
        let candidates = extract_web_detections(&annotation, &probe, &HashSet::new()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].detection_type, DetectionType::Partial);
    }

    #[tokio::test]
    async fn pages_without_url_are_skipped() {
        let annotation = with_pages(vec![
            page(None, &["https://a.example/full.jpg"], &[]),
            page(Some(""), &["https://a.example/full.jpg"], &[]),
        ]);
        let probe = FixedProbe::accepting(&["https://a.example/full.jpg"]);
        let candidates = extract_web_detections(&annotation, &probe, &HashSet::new()).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn already_recorded_source_urls_are_skipped() {
        let annotation = with_pages(vec![
            page(
                Some("https://seen.example/post"),
                &["https://seen.example/full.jpg"],
                &[],
            ),
            page(
                Some("https://new.example/post"),
                &["https://new.example/full.jpg"],
                &[],
            ),
        ]);
        let probe = FixedProbe::accepting(&[
            "https://seen.example/full.jpg",
            "https://new.example/full.jpg",
        ]);
        let existing: HashSet<String> =
            ["https://seen.example/post".to_string()].into_iter().collect();
        let candidates = extract_web_detections(&annotation, &probe, &existing).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_url, "https://new.example/post");
    }

    #[tokio::test]
    async fn duplicate_pages_within_one_response_yield_one_candidate() {
        let annotation = with_pages(vec![
            page(
                Some("https://a.example/post"),
                &["https://a.example/full.jpg"],
                &[],
            ),
            page(
                Some("https://a.example/post"),
                &["https://a.example/other.jpg"],
                &[],
            ),
        ]);
        let probe = FixedProbe::accepting(&[
            "https://a.example/full.jpg",
            "https://a.example/other.jpg",
        ]);
        let candidates = extract_web_detections(&annotation, &probe, &HashSet::new()).await;
        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn page_where_nothing_validates_is_dropped_silently() {
        let annotation = with_pages(vec![page(
            Some("https://a.example/post"),
            &["https://a.example/broken.jpg"],
            &["https://a.example/also-broken.jpg"],
        )]);
        let probe = FixedProbe::accepting(&[]);
        let candidates = extract_web_detections(&annotation, &probe, &HashSet::new()).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn no_web_detection_yields_no_candidates() {
        let probe = FixedProbe::accepting(&[]);
        let candidates =
            extract_web_detections(&ImageAnnotation::default(), &probe, &HashSet::new()).await;
        assert!(candidates.is_empty());
    }
}
